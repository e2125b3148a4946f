//! File-backed registry store and import directory readers

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::registry::Registry;
use crate::traits::RegistryStore;
use crate::types::*;

fn storage_error(path: &Path, e: std::io::Error) -> ResolveError {
    ResolveError::Storage(format!("{}: {}", path.display(), e))
}

/// Registry snapshot kept in a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the configured registry file of an import directory
    pub fn in_dir(dir: &Path, config: &ResolverConfig) -> Self {
        Self::new(config.registry_path(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> ResolveResult<Registry> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no registry snapshot yet");
            return Ok(Registry::new());
        }
        let registry = Registry::load_from_json(&self.path)?;
        info!(path = %self.path.display(), entries = registry.len(), "loaded registry");
        Ok(registry)
    }

    fn save(&mut self, registry: &Registry) -> ResolveResult<()> {
        // write next to the target, then rename over it
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        registry.save_to_json(&tmp)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, e))?;
        info!(path = %self.path.display(), entries = registry.len(), "saved registry");
        Ok(())
    }
}

/// Transaction files of an import directory, sorted by path
pub fn list_transaction_files(dir: &Path, config: &ResolverConfig) -> ResolveResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| storage_error(dir, e))? {
        let path = entry.map_err(|e| storage_error(dir, e))?.path();
        if path.is_file() && config.is_transaction_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read a personal accounts file: a JSON object of group name to
/// `[{"number": .., "name": .., "initial": ..}]`
pub fn read_personal_accounts_file(path: &Path) -> ResolveResult<PersonalAccounts> {
    let content = std::fs::read_to_string(path).map_err(|e| storage_error(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| ResolveError::Serialization(format!("{}: {}", path.display(), e)))
}
