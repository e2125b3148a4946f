//! Resolver configuration

use bigdecimal::BigDecimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::types::*;

/// File layout of an import directory and resolution defaults
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Registry snapshot file name inside the import directory
    pub registry_file: String,
    /// Personal accounts declaration file name inside the import directory
    pub personal_accounts_file: String,
    /// Extensions of files that are never transaction files
    pub ignored_extensions: Vec<String>,
    /// Initial balance for personal accounts that declare none
    pub default_initial: BigDecimal,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            registry_file: "account_match.json".to_string(),
            personal_accounts_file: "accounts.json".to_string(),
            ignored_extensions: vec!["json".to_string(), "db".to_string()],
            default_initial: BigDecimal::from(0),
        }
    }
}

impl ResolverConfig {
    pub fn from_toml(content: &str) -> ResolveResult<Self> {
        toml::from_str(content).map_err(|e| ResolveError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> ResolveResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ResolveError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn registry_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.registry_file)
    }

    pub fn personal_accounts_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.personal_accounts_file)
    }

    /// True for files that should be read as bank exports
    pub fn is_transaction_file(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => !self
                .ignored_extensions
                .iter()
                .any(|ignored| ignored.eq_ignore_ascii_case(ext)),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::from_toml("").unwrap();
        assert_eq!(config, ResolverConfig::default());
        assert_eq!(
            config.registry_path(Path::new("/data")),
            PathBuf::from("/data/account_match.json")
        );
    }

    #[test]
    fn test_partial_override() {
        let config = ResolverConfig::from_toml(
            r#"
registry_file = "matches.json"
default_initial = "12.50"
"#,
        )
        .unwrap();
        assert_eq!(config.registry_file, "matches.json");
        assert_eq!(config.personal_accounts_file, "accounts.json");
        assert_eq!(config.default_initial, "12.50".parse::<BigDecimal>().unwrap());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ResolverConfig::from_toml("registry_file = ["),
            Err(ResolveError::Config(_))
        ));
    }

    #[test]
    fn test_transaction_file_filter() {
        let config = ResolverConfig::default();
        assert!(config.is_transaction_file(Path::new("statement.csv")));
        assert!(config.is_transaction_file(Path::new("statement")));
        assert!(!config.is_transaction_file(Path::new("accounts.json")));
        assert!(!config.is_transaction_file(Path::new("cache.DB")));
    }
}
