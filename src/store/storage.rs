//! TOML-backed provider directory in `~/.config/prm/`.

use super::{ProviderFilter, ProviderStore};
use crate::error::{Error, Result};
use crate::types::Provider;
use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory under the user's home holding prm state.
const CONFIG_DIR: &str = ".config/prm";

/// Filename for the provider directory.
const PROVIDERS_FILE: &str = "providers.toml";

/// Default provider directory path, `~/.config/prm/providers.toml`.
pub fn default_store_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR).join(PROVIDERS_FILE))
        .ok_or_else(|| Error::Store("could not determine home directory".to_string()))
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProviderDocument {
    #[serde(default)]
    providers: Vec<Provider>,
}

/// Provider directory stored as one TOML document
///
/// Every mutation reads the whole document and writes it back through an
/// atomic temp-file-and-rename.
#[derive(Debug, Clone)]
pub struct FileProviderStore {
    path: PathBuf,
}

impl FileProviderStore {
    /// Store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(default_store_path()?))
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, creating an empty file if none exists.
    fn load(&self) -> Result<ProviderDocument> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "creating empty provider directory");
            let empty = ProviderDocument::default();
            self.save(&empty)?;
            return Ok(empty);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            Error::Store(format!("failed to read {}: {e}", self.path.display()))
        })?;

        toml::from_str(&content)
            .map_err(|e| Error::Store(format!("failed to parse {}: {e}", self.path.display())))
    }

    /// Atomically replace the document on disk.
    fn save(&self, doc: &ProviderDocument) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir)
                .map_err(|e| Error::Store(format!("failed to create {}: {e}", dir.display())))?;
        }

        let content = toml::to_string_pretty(doc)
            .map_err(|e| Error::Store(format!("failed to serialize providers: {e}")))?;
        let content_with_header = format!(
            "# prm provider directory\n# Auto-generated - manual edits may be overwritten\n\n{content}"
        );

        let mut file = AtomicWriteFile::open(&self.path).map_err(|e| {
            Error::Store(format!("failed to open {}: {e}", self.path.display()))
        })?;
        file.write_all(content_with_header.as_bytes())
            .map_err(|e| Error::Store(format!("failed to write {}: {e}", self.path.display())))?;
        file.commit()
            .map_err(|e| Error::Store(format!("failed to save {}: {e}", self.path.display())))?;

        debug!(path = %self.path.display(), count = doc.providers.len(), "saved providers");
        Ok(())
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl ProviderStore for FileProviderStore {
    fn create(&self, mut provider: Provider) -> Result<Provider> {
        let mut doc = self.load()?;
        if doc.providers.iter().any(|p| p.name == provider.name) {
            return Err(Error::ProviderExists(provider.name));
        }

        let now = now_millis();
        provider.created = now;
        provider.updated = now;
        doc.providers.push(provider.clone());
        self.save(&doc)?;
        Ok(provider)
    }

    fn update_bulk(&self, providers: &[Provider]) -> Result<()> {
        let mut doc = self.load()?;

        let stored: HashSet<&str> = doc.providers.iter().map(|p| p.name.as_str()).collect();
        if let Some(missing) = providers.iter().find(|p| !stored.contains(p.name.as_str())) {
            return Err(Error::ProviderNotFound(missing.name.clone()));
        }

        let now = now_millis();
        for update in providers {
            if let Some(slot) = doc.providers.iter_mut().find(|p| p.name == update.name) {
                let created = slot.created;
                *slot = update.clone();
                slot.created = created;
                slot.updated = now;
            }
        }
        self.save(&doc)
    }

    fn list(&self, filter: &ProviderFilter) -> Result<Vec<Provider>> {
        let doc = self.load()?;
        Ok(doc
            .providers
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let mut doc = self.load()?;
        let before = doc.providers.len();
        doc.providers.retain(|p| p.name != name);
        if doc.providers.len() == before {
            debug!(name, "provider not stored, nothing to delete");
            return Ok(());
        }
        self.save(&doc)
    }

    fn purge(&self) -> Result<()> {
        self.save(&ProviderDocument::default())
    }
}
