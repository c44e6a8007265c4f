//! Shared command context for CLI commands

use pr_monitor::aggregate::DEFAULT_TIMEOUT;
use pr_monitor::collect::Scope;
use pr_monitor::error::Result;
use pr_monitor::store::{FileProviderStore, ProviderFilter, ProviderStore};
use pr_monitor::types::Provider;
use std::path::Path;

/// Setup shared by every command
///
/// Holds the provider directory and the invocation scope. The scope's
/// one-minute deadline bounds every network call the command makes.
pub struct CommandContext {
    /// Provider directory
    pub store: FileProviderStore,
    /// Root scope for this invocation
    pub scope: Scope,
}

impl CommandContext {
    /// Create a context over the directory at `config`, or the default location
    pub fn new(config: Option<&Path>) -> Result<Self> {
        let store = match config {
            Some(path) => FileProviderStore::new(path),
            None => FileProviderStore::open_default()?,
        };

        Ok(Self {
            store,
            scope: Scope::with_timeout(DEFAULT_TIMEOUT),
        })
    }

    /// Stored providers passing `filter`
    pub fn providers(&self, filter: &ProviderFilter) -> Result<Vec<Provider>> {
        self.store.list(filter)
    }
}
