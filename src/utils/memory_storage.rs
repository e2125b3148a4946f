//! In-memory store and evidence source for testing

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::book::AccountBook;
use crate::config::ResolverConfig;
use crate::registry::Registry;
use crate::traits::*;
use crate::types::*;

fn lock_error<T>(_: T) -> ResolveError {
    ResolveError::Storage("memory store lock poisoned".to_string())
}

/// In-memory registry store, keeping the serialized snapshot like a file would
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Arc<RwLock<Option<String>>>,
    saves: Arc<RwLock<usize>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `registry`
    pub fn with_registry(registry: &Registry) -> ResolveResult<Self> {
        let store = Self::new();
        *store.snapshot.write().map_err(lock_error)? = Some(registry.to_json()?);
        Ok(store)
    }

    /// The last saved snapshot, as it would appear on disk
    pub fn snapshot(&self) -> Option<String> {
        self.snapshot.read().ok().and_then(|s| s.clone())
    }

    /// Number of successful saves
    pub fn saves(&self) -> usize {
        self.saves.read().map(|s| *s).unwrap_or(0)
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> ResolveResult<Registry> {
        match self.snapshot.read().map_err(lock_error)?.as_deref() {
            Some(content) => Registry::from_json(content),
            None => Ok(Registry::new()),
        }
    }

    fn save(&mut self, registry: &Registry) -> ResolveResult<()> {
        let content = registry.to_json()?;
        *self.snapshot.write().map_err(lock_error)? = Some(content);
        *self.saves.write().map_err(lock_error)? += 1;
        Ok(())
    }
}

/// One bank statement held in memory: the statement's own account and its counterparties
#[derive(Debug, Clone)]
pub struct MemoryStatement {
    pub owner: Identifier,
    pub counterparties: Vec<Identifier>,
}

/// Evidence source over in-memory statements and personal accounts
#[derive(Debug, Clone, Default)]
pub struct MemoryEvidence {
    statements: BTreeMap<PathBuf, MemoryStatement>,
    personal: PersonalAccounts,
}

impl MemoryEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement under a file name
    pub fn with_statement(
        mut self,
        file: &str,
        owner: Identifier,
        counterparties: Vec<Identifier>,
    ) -> Self {
        self.statements.insert(
            PathBuf::from(file),
            MemoryStatement {
                owner,
                counterparties,
            },
        );
        self
    }

    /// Declare a personal account in `group`
    pub fn with_personal_account(mut self, group: &str, account: PersonalAccount) -> Self {
        self.personal.entry(group.to_string()).or_default().push(account);
        self
    }

    fn statement(&self, file: &Path) -> ResolveResult<&MemoryStatement> {
        self.statements
            .get(file)
            .ok_or_else(|| ResolveError::Storage(format!("{}: no such statement", file.display())))
    }
}

impl EvidenceSource for MemoryEvidence {
    /// Canonical counterparty of each line
    type Transaction = Identifier;

    fn get_transaction_files(&self, _dir: &Path, _config: &ResolverConfig) -> ResolveResult<Vec<PathBuf>> {
        Ok(self.statements.keys().cloned().collect())
    }

    fn read_personal_accounts(&self, _dir: &Path, _config: &ResolverConfig) -> ResolveResult<PersonalAccounts> {
        Ok(self.personal.clone())
    }

    fn read_accounts(&self, file: &Path) -> ResolveResult<Vec<Identifier>> {
        let statement = self.statement(file)?;
        let mut accounts = vec![statement.owner.clone()];
        accounts.extend(statement.counterparties.iter().cloned());
        Ok(accounts)
    }

    fn read_transactions_file(
        &self,
        file: &Path,
        book: &AccountBook,
    ) -> ResolveResult<(Option<String>, Vec<Identifier>)> {
        let statement = self.statement(file)?;
        let owner = book.get_required(&statement.owner)?;
        let counterparties = statement
            .counterparties
            .iter()
            .map(|c| book.get_required(c).map(Account::identifier))
            .collect::<ResolveResult<Vec<_>>>()?;
        Ok((owner.number.clone(), counterparties))
    }
}
