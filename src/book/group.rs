//! Named groups of personal accounts

use std::collections::BTreeSet;

use crate::book::AccountBook;
use crate::types::*;
use crate::utils::validation::sanitize_identifier;

/// A user-declared set of personal accounts, such as a household
#[derive(Debug, Clone, PartialEq)]
pub struct AccountGroup {
    name: String,
    members: BTreeSet<Identifier>,
}

impl AccountGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeSet::new(),
        }
    }

    /// Group holding the identifiers of the declared accounts
    pub fn from_personal_accounts(name: impl Into<String>, accounts: &[PersonalAccount]) -> Self {
        Self {
            name: name.into(),
            members: accounts
                .iter()
                .map(|account| sanitize_identifier(&account.identifier()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> impl Iterator<Item = &Identifier> {
        self.members.iter()
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.members.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Canonical accounts of the group; members sharing an account appear once
    pub fn accounts<'a>(&self, book: &'a AccountBook) -> ResolveResult<Vec<&'a Account>> {
        let mut seen = BTreeSet::new();
        let mut accounts = Vec::new();
        for member in &self.members {
            let account = book.get_required(member)?;
            if seen.insert(account.identifier()) {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    /// Account of a group member by number
    pub fn get_by_number<'a>(&self, book: &'a AccountBook, number: &str) -> ResolveResult<&'a Account> {
        let member = self
            .members
            .iter()
            .find(|m| m.number() == Some(number))
            .ok_or_else(|| {
                ResolveError::Validation(format!("{} is not in group {}", number, self.name))
            })?;
        book.get_required(member)
    }

    /// Add an identifier the book already knows
    pub fn add_account(&mut self, book: &AccountBook, identifier: Identifier) -> ResolveResult<()> {
        if !book.contains(&identifier) {
            return Err(ResolveError::UnknownIdentifier(identifier));
        }
        self.members.insert(identifier);
        Ok(())
    }
}
