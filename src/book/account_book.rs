//! Account book: canonical accounts reachable through any of their aliases

use bigdecimal::BigDecimal;
use std::collections::{BTreeMap, HashMap};

use crate::registry::Registry;
use crate::types::*;

/// Canonical accounts keyed by representative, with alias resolution
#[derive(Debug, Clone, Default)]
pub struct AccountBook {
    registry: Registry,
    numbers_index: HashMap<String, Identifier>,
    accounts: BTreeMap<Identifier, Account>,
}

impl AccountBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// One account per representative of `registry`, its group as duplicates
    pub fn from_registry(registry: &Registry) -> ResolveResult<Self> {
        let mut book = Self::new();
        for repr in registry.representatives() {
            let duplicates = registry.find_comp(&repr).cloned().unwrap_or_default();
            book.add_account(Account::from_identifier(&repr), duplicates)?;
        }
        Ok(book)
    }

    /// Register `account` and attach the identifiers known to be the same account.
    ///
    /// An account that is already registered keeps its existing object; only the
    /// missing duplicates are attached.
    pub fn add_account<I>(&mut self, account: Account, duplicates: I) -> ResolveResult<()>
    where
        I: IntoIterator<Item = Identifier>,
    {
        let key = account.identifier();
        match self.registry.find_repr(&key) {
            None => {
                self.registry.add_repres(key.clone())?;
                if let Some(number) = &account.number {
                    self.numbers_index.insert(number.clone(), key.clone());
                }
                self.accounts.insert(key.clone(), account);
            }
            Some(repr) if *repr == key => {}
            Some(_) => return Err(ResolveError::NotARepresentative(key)),
        }

        for duplicate in duplicates {
            if duplicate == key || self.registry.find_repr(&duplicate) == Some(&key) {
                continue;
            }
            if let Some(number) = &duplicate.number {
                self.numbers_index.insert(number.clone(), key.clone());
            }
            self.registry.add_elem(duplicate, &key)?;
        }
        Ok(())
    }

    /// Account of `identifier`, resolving aliases
    pub fn get(&self, identifier: &Identifier) -> Option<&Account> {
        self.accounts.get(identifier).or_else(|| {
            self.registry
                .find_repr(identifier)
                .and_then(|repr| self.accounts.get(repr))
        })
    }

    /// Account of `identifier`, returning an error if unknown
    pub fn get_required(&self, identifier: &Identifier) -> ResolveResult<&Account> {
        self.get(identifier)
            .ok_or_else(|| ResolveError::UnknownIdentifier(identifier.clone()))
    }

    pub fn get_mut(&mut self, identifier: &Identifier) -> Option<&mut Account> {
        let key = self.canonical_key(identifier)?;
        self.accounts.get_mut(&key)
    }

    /// Account holding `number` in any of its identifiers
    pub fn get_by_number(&self, number: &str) -> Option<&Account> {
        let key = self.numbers_index.get(number)?;
        self.get(key)
    }

    /// Look up by identifier first, then by its number
    pub fn get_by_match(&self, identifier: &Identifier) -> Option<&Account> {
        self.get(identifier)
            .or_else(|| identifier.number().and_then(|n| self.get_by_number(n)))
    }

    /// Accounts having an identifier whose name contains `query`
    pub fn search_by_name(&self, query: &str) -> Vec<&Account> {
        self.accounts
            .iter()
            .filter(|(key, _)| {
                self.registry.find_comp(key).is_some_and(|members| {
                    members
                        .iter()
                        .any(|m| m.name().is_some_and(|name| name.contains(query)))
                })
            })
            .map(|(_, account)| account)
            .collect()
    }

    /// Set the opening balance of the account owning `identifier`
    pub fn set_initial(&mut self, identifier: &Identifier, initial: BigDecimal) -> ResolveResult<()> {
        let account = self
            .get_mut(identifier)
            .ok_or_else(|| ResolveError::UnknownIdentifier(identifier.clone()))?;
        account.initial = initial;
        Ok(())
    }

    /// Make `new` the canonical identifier of the account currently keyed by `old`.
    ///
    /// The account object is kept (with its balance) and takes `new`'s number and name.
    pub fn promote(&mut self, old: &Identifier, new: Identifier) -> ResolveResult<&Account> {
        if !self.accounts.contains_key(old) {
            return Err(ResolveError::NotARepresentative(old.clone()));
        }
        self.registry.update_repr(old, &new)?;
        let mut account = self
            .accounts
            .remove(old)
            .ok_or_else(|| ResolveError::NotARepresentative(old.clone()))?;
        account.number = new.number.clone();
        account.name = new.name.clone();
        if let Some(number) = &new.number {
            self.numbers_index.insert(number.clone(), new.clone());
        }
        Ok(self.accounts.entry(new).or_insert(account))
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.get(identifier).is_some()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Accounts in representative order
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Identifiers equivalent to `identifier`, itself included
    pub fn aliases(&self, identifier: &Identifier) -> Vec<Identifier> {
        self.registry
            .find_comp(identifier)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The resolved registry, as persisted after a run
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn canonical_key(&self, identifier: &Identifier) -> Option<Identifier> {
        if self.accounts.contains_key(identifier) {
            return Some(identifier.clone());
        }
        self.registry.find_repr(identifier).cloned()
    }
}
