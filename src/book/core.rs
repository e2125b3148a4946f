//! Run orchestrator that ties evidence, registry storage and the account book together

use std::path::Path;
use tracing::{debug, info};

use crate::book::{AccountBook, AccountGroup};
use crate::config::ResolverConfig;
use crate::reconciliation::{ReconciliationEngine, ReconciliationReport};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::sanitize_identifier;

/// Result of one import run
#[derive(Debug, Clone)]
pub struct Resolution {
    pub book: AccountBook,
    pub groups: Vec<AccountGroup>,
    pub report: ReconciliationReport,
}

/// Main resolver that runs imports against a persisted registry
pub struct Resolver<S: RegistryStore> {
    store: S,
    config: ResolverConfig,
    engine: ReconciliationEngine,
}

impl<S: RegistryStore> Resolver<S> {
    /// Create a new resolver with the default configuration
    pub fn new(store: S) -> Self {
        Self::with_config(store, ResolverConfig::default())
    }

    pub fn with_config(store: S, config: ResolverConfig) -> Self {
        Self {
            store,
            config,
            engine: ReconciliationEngine::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve every account referenced in `dir` and persist the updated registry.
    ///
    /// The store is written only once the whole run succeeded.
    pub fn run<E>(&mut self, source: &E, dir: &Path) -> ResolveResult<Resolution>
    where
        E: EvidenceSource + ?Sized,
    {
        info!(dir = %dir.display(), "starting account resolution");

        let personal = source.read_personal_accounts(dir, &self.config)?;
        let evidence = source.collect_evidence(dir, &self.config, &personal)?;
        let persisted = self.store.load()?;

        let reconciliation = self.engine.reconcile(&evidence, persisted)?;
        let mut book = AccountBook::from_registry(&reconciliation.registry)?;

        let mut groups = Vec::with_capacity(personal.len());
        for (name, declared) in &personal {
            for account in declared {
                let initial = account
                    .initial
                    .clone()
                    .unwrap_or_else(|| self.config.default_initial.clone());
                let identifier = sanitize_identifier(&account.identifier());
                debug!(group = %name, account = %identifier, %initial, "setting initial balance");
                book.set_initial(&identifier, initial)?;
            }
            groups.push(AccountGroup::from_personal_accounts(name.clone(), declared));
        }

        self.store.save(book.registry())?;

        info!(
            accounts = book.len(),
            groups = groups.len(),
            new_accounts = reconciliation.report.new_accounts,
            "account resolution complete"
        );
        Ok(Resolution {
            book,
            groups,
            report: reconciliation.report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::utils::{MemoryEvidence, MemoryStore};
    use bigdecimal::BigDecimal;

    fn alice_iban() -> Identifier {
        Identifier::named("BE68539007547034", "Alice")
    }

    fn source() -> MemoryEvidence {
        MemoryEvidence::new()
            .with_statement(
                "checking.csv",
                alice_iban(),
                vec![Identifier::named("BE71096123456769", "Bob")],
            )
            .with_personal_account(
                "household",
                PersonalAccount {
                    number: Some("539-0075470-34".to_string()),
                    name: Some("Alice".to_string()),
                    initial: Some(BigDecimal::from(250)),
                },
            )
    }

    #[test]
    fn test_run_builds_book_and_groups() {
        let mut resolver = Resolver::new(MemoryStore::new());
        let resolution = resolver.run(&source(), Path::new("import")).unwrap();

        assert_eq!(resolution.book.len(), 2);
        let alice = resolution.book.get_by_number("539-0075470-34").unwrap();
        assert_eq!(alice.identifier(), alice_iban());
        assert_eq!(alice.initial, BigDecimal::from(250));

        assert_eq!(resolution.groups.len(), 1);
        assert_eq!(resolution.groups[0].name(), "household");
        assert_eq!(resolution.report.fresh_groups, 2);
        assert_eq!(resolution.report.new_accounts, 2);
        assert_eq!(resolver.store().saves(), 1);
    }

    #[test]
    fn test_default_initial_from_config() {
        let config = ResolverConfig::from_toml("default_initial = \"12.5\"").unwrap();
        let source = MemoryEvidence::new().with_personal_account(
            "cash",
            PersonalAccount {
                number: None,
                name: Some("Wallet".to_string()),
                initial: None,
            },
        );
        let mut resolver = Resolver::with_config(MemoryStore::new(), config);
        let resolution = resolver.run(&source, Path::new("import")).unwrap();

        let wallet = resolution
            .book
            .get(&Identifier::name_only("Wallet"))
            .unwrap();
        assert_eq!(wallet.initial, "12.5".parse::<BigDecimal>().unwrap());
        assert_eq!(resolution.report.leftovers, 1);
    }

    #[test]
    fn test_padded_personal_account_matches_statement() {
        let source = MemoryEvidence::new()
            .with_statement("checking.csv", alice_iban(), vec![])
            .with_personal_account(
                "household",
                PersonalAccount {
                    number: Some(" BE68539007547034  ".to_string()),
                    name: Some("Alice ".to_string()),
                    initial: Some(BigDecimal::from(7)),
                },
            );
        let mut resolver = Resolver::new(MemoryStore::new());
        let resolution = resolver.run(&source, Path::new("import")).unwrap();

        assert_eq!(resolution.book.len(), 1);
        assert_eq!(resolution.book.get(&alice_iban()).unwrap().initial, BigDecimal::from(7));
        assert!(resolution.groups[0].contains(&alice_iban()));
    }

    #[test]
    fn test_failed_run_does_not_save() {
        // two registered accounts share one number: any fresh group on it is ambiguous
        let persisted = Registry::from_groups(vec![
            (Identifier::named("BE68539007547034", "Alice"), Vec::new()),
            (Identifier::named("BE68539007547034", "Alice Smith"), Vec::new()),
        ])
        .unwrap();
        let store = MemoryStore::with_registry(&persisted).unwrap();
        let mut resolver = Resolver::new(store.clone());

        let source = MemoryEvidence::new().with_statement(
            "checking.csv",
            Identifier::named("BE68539007547034", "A. Smith"),
            vec![],
        );
        let err = resolver.run(&source, Path::new("import")).unwrap_err();

        assert!(matches!(err, ResolveError::AmbiguousMatch { .. }));
        assert_eq!(store.saves(), 0);
        assert_eq!(store.load().unwrap(), persisted);
    }
}
