//! Traits for storage abstraction and evidence collection

use std::path::{Path, PathBuf};

use crate::book::AccountBook;
use crate::config::ResolverConfig;
use crate::reconciliation::Evidence;
use crate::registry::Registry;
use crate::types::*;
use crate::utils::file_storage;

/// Storage abstraction for the persisted registry
///
/// A run loads the snapshot once before reconciling and saves it once after
/// success. Implementations do no locking: callers must not run two imports
/// against the same store at the same time.
pub trait RegistryStore {
    /// Load the last saved registry, or an empty one if nothing was saved yet
    fn load(&self) -> ResolveResult<Registry>;

    /// Replace the saved registry
    fn save(&mut self, registry: &Registry) -> ResolveResult<()>;
}

/// Source-specific adapter that enumerates what an import directory contains
///
/// Only `read_accounts` and `read_transactions_file` depend on the bank's file
/// layout; the directory listing and the personal accounts file are shared.
/// Observed identifiers are sanitized when recorded as evidence, so lookups in
/// the book should go through `utils::observed_identifier` as well.
pub trait EvidenceSource {
    /// Transaction type produced by this source's statement parser
    type Transaction;

    /// Bank export files in `dir`, sorted by path
    fn get_transaction_files(&self, dir: &Path, config: &ResolverConfig) -> ResolveResult<Vec<PathBuf>> {
        file_storage::list_transaction_files(dir, config)
    }

    /// Personal account declarations, grouped by name; none if the file is absent
    fn read_personal_accounts(&self, dir: &Path, config: &ResolverConfig) -> ResolveResult<PersonalAccounts> {
        let path = config.personal_accounts_path(dir);
        if !path.exists() {
            return Ok(PersonalAccounts::new());
        }
        file_storage::read_personal_accounts_file(&path)
    }

    /// Every account identifier referenced by one export file
    fn read_accounts(&self, file: &Path) -> ResolveResult<Vec<Identifier>>;

    /// Number of the statement's own account and its transactions, with
    /// counterparties resolved through `book`
    fn read_transactions_file(
        &self,
        file: &Path,
        book: &AccountBook,
    ) -> ResolveResult<(Option<String>, Vec<Self::Transaction>)>;

    /// All identifiers observed in `dir`: export files first, then personal accounts
    fn collect_evidence(
        &self,
        dir: &Path,
        config: &ResolverConfig,
        personal: &PersonalAccounts,
    ) -> ResolveResult<Evidence> {
        let mut evidence = Evidence::new();
        for file in self.get_transaction_files(dir, config)? {
            evidence.extend(self.read_accounts(&file)?)?;
        }
        evidence.observe_personal_accounts(personal)?;
        Ok(evidence)
    }
}
