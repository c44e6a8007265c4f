//! Shared test utilities

#![allow(dead_code)]

pub mod mock_platform;

pub use mock_platform::*;

use pr_monitor::store::{FileProviderStore, ProviderStore};
use pr_monitor::types::{Identity, Provider, ProviderType};
use std::path::PathBuf;
use tempfile::TempDir;

/// Provider directory in a temporary location
pub struct TempStore {
    pub dir: TempDir,
    pub store: FileProviderStore,
}

impl TempStore {
    /// Empty directory; the file is created on first use
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let store = FileProviderStore::new(dir.path().join("providers.toml"));
        Self { dir, store }
    }

    /// Path to pass as `--config`
    pub fn path(&self) -> PathBuf {
        self.store.path().to_path_buf()
    }

    /// Store a provider
    pub fn add(&self, provider: Provider) -> Provider {
        self.store.create(provider).expect("failed to store provider")
    }
}

/// GitHub provider with a resolved login
pub fn github_provider(name: &str) -> Provider {
    let mut provider = Provider::new(ProviderType::GitHub, name, "https://github.com");
    provider.user = Some(Identity {
        name: Some("octocat".to_string()),
        ..Identity::from_token("ghp_test")
    });
    provider
}

/// Harness provider with a resolved principal and no repositories
pub fn harness_provider(name: &str, host: &str) -> Provider {
    let mut provider = Provider::new(ProviderType::Harness, name, host);
    provider.user = Some(Identity {
        principal_id: Some(7),
        email: Some("dev@example.com".to_string()),
        ..Identity::from_token("pat.acct.tokenid.secret")
    });
    provider
}
