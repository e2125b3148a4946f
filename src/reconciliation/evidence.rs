//! Identifiers observed during one import run

use std::collections::HashSet;

use crate::types::*;
use crate::utils::validation::{sanitize_identifier, validate_identifier};

/// Distinct identifiers observed in one run, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    observed: Vec<Identifier>,
    seen: HashSet<Identifier>,
}

impl Evidence {
    /// Create an empty evidence set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build evidence from a list of identifiers
    pub fn from_identifiers<I>(identifiers: I) -> ResolveResult<Self>
    where
        I: IntoIterator<Item = Identifier>,
    {
        let mut evidence = Self::new();
        evidence.extend(identifiers)?;
        Ok(evidence)
    }

    /// Record a sanitized observation. Returns false if it was already recorded.
    pub fn observe(&mut self, identifier: Identifier) -> ResolveResult<bool> {
        let identifier = sanitize_identifier(&identifier);
        validate_identifier(&identifier)?;
        if !self.seen.insert(identifier.clone()) {
            return Ok(false);
        }
        self.observed.push(identifier);
        Ok(true)
    }

    pub fn extend<I>(&mut self, identifiers: I) -> ResolveResult<()>
    where
        I: IntoIterator<Item = Identifier>,
    {
        for identifier in identifiers {
            self.observe(identifier)?;
        }
        Ok(())
    }

    /// Add every declared personal account
    pub fn observe_personal_accounts(&mut self, personal: &PersonalAccounts) -> ResolveResult<()> {
        for accounts in personal.values() {
            self.extend(accounts.iter().map(PersonalAccount::identifier))?;
        }
        Ok(())
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.seen.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.observed.iter()
    }
}
