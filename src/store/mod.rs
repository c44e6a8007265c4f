//! Provider directory
//!
//! Configured providers with their cached identity and repositories,
//! persisted across invocations.

mod storage;

pub use storage::{FileProviderStore, default_store_path};

use crate::error::Result;
use crate::types::{Provider, ProviderType};

/// Equality filter over stored providers; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderFilter {
    /// Only providers of this type
    pub provider_type: Option<ProviderType>,
    /// Only the provider with this name
    pub name: Option<String>,
}

impl ProviderFilter {
    /// Filter matching every provider
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter matching one provider by name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Whether `provider` passes this filter
    pub fn matches(&self, provider: &Provider) -> bool {
        self.provider_type
            .is_none_or(|t| t == provider.provider_type)
            && self.name.as_deref().is_none_or(|n| n == provider.name)
    }
}

/// Persistent provider directory
pub trait ProviderStore {
    /// Add a provider, stamping its timestamps
    ///
    /// Fails with `ProviderExists` if the name is taken.
    fn create(&self, provider: Provider) -> Result<Provider>;

    /// Replace several stored providers at once
    ///
    /// Fails the whole batch with `ProviderNotFound` if any name is missing.
    /// `created` is preserved and `updated` is stamped.
    fn update_bulk(&self, providers: &[Provider]) -> Result<()>;

    /// Stored providers passing `filter`, in insertion order
    fn list(&self, filter: &ProviderFilter) -> Result<Vec<Provider>>;

    /// Remove a provider; removing a missing name succeeds
    fn delete(&self, name: &str) -> Result<()>;

    /// Remove every provider
    fn purge(&self) -> Result<()>;
}
