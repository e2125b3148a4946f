//! Core types and data structures for account identity resolution

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An observed account reference: an optional account number and an optional holder name.
///
/// Two identifiers are the same key only if both components are equal. Ordering is
/// derived (number first, absent before present) so registries iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    /// Account number as it appeared in the source (IBAN, legacy format, card number...)
    pub number: Option<String>,
    /// Account holder or counterparty name
    pub name: Option<String>,
}

impl Identifier {
    /// Create a new identifier from its two components
    pub fn new(number: Option<String>, name: Option<String>) -> Self {
        Self { number, name }
    }

    /// Identifier with a number and a name
    pub fn named(number: &str, name: &str) -> Self {
        Self::new(Some(number.to_string()), Some(name.to_string()))
    }

    /// Identifier known only by its number
    pub fn number_only(number: &str) -> Self {
        Self::new(Some(number.to_string()), None)
    }

    /// Identifier known only by its name (typical for card counterparties)
    pub fn name_only(name: &str) -> Self {
        Self::new(None, Some(name.to_string()))
    }

    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True when neither component is present
    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.name.is_none()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})",
            self.number.as_deref().unwrap_or("-"),
            self.name.as_deref().unwrap_or("-")
        )
    }
}

/// Canonical account, one per final representative of the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Number of the representative identifier
    pub number: Option<String>,
    /// Name of the representative identifier
    pub name: Option<String>,
    /// Opening balance, set from personal account declarations
    pub initial: BigDecimal,
    /// When the account object was instantiated
    pub created_at: NaiveDateTime,
}

impl Account {
    /// Create a new account with a zero initial balance
    pub fn new(number: Option<String>, name: Option<String>) -> Self {
        Self {
            number,
            name,
            initial: BigDecimal::from(0),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Create the account owned by a representative identifier
    pub fn from_identifier(identifier: &Identifier) -> Self {
        Self::new(identifier.number.clone(), identifier.name.clone())
    }

    /// The identifier this account is keyed by
    pub fn identifier(&self) -> Identifier {
        Identifier::new(self.number.clone(), self.name.clone())
    }
}

/// A user-declared personal account, read from the personal accounts file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalAccount {
    pub number: Option<String>,
    pub name: Option<String>,
    /// Opening balance; the configured default applies when absent
    #[serde(default)]
    pub initial: Option<BigDecimal>,
}

impl PersonalAccount {
    pub fn identifier(&self) -> Identifier {
        Identifier::new(self.number.clone(), self.name.clone())
    }
}

/// Personal account declarations keyed by group name
pub type PersonalAccounts = BTreeMap<String, Vec<PersonalAccount>>;

/// Errors that can occur while resolving account identities
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Duplicate key: {0} already has a conflicting registry entry")]
    DuplicateKey(Identifier),
    #[error("Missing representative: {0} is not a known representative")]
    MissingRepresentative(Identifier),
    #[error("Ambiguous match for {identifier}: connects to {}", join_identifiers(.candidates))]
    AmbiguousMatch {
        identifier: Identifier,
        candidates: Vec<Identifier>,
    },
    #[error("Not a representative: {0}")]
    NotARepresentative(Identifier),
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(Identifier),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

fn join_identifiers(identifiers: &[Identifier]) -> String {
    identifiers
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for resolution operations
pub type ResolveResult<T> = Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_ordering_puts_absent_first() {
        let a = Identifier::name_only("Shop");
        let b = Identifier::number_only("001-2345678-90");
        let c = Identifier::named("001-2345678-90", "Alice");
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_identifier_display() {
        assert_eq!(
            Identifier::named("539-0075470-34", "Alice").to_string(),
            "(539-0075470-34, Alice)"
        );
        assert_eq!(Identifier::name_only("Shop").to_string(), "(-, Shop)");
    }

    #[test]
    fn test_ambiguous_error_lists_candidates() {
        let err = ResolveError::AmbiguousMatch {
            identifier: Identifier::number_only("X"),
            candidates: vec![Identifier::number_only("A"), Identifier::number_only("B")],
        };
        assert_eq!(
            err.to_string(),
            "Ambiguous match for (X, -): connects to (A, -), (B, -)"
        );
    }

    #[test]
    fn test_account_round_trips_identifier() {
        let id = Identifier::named("BE68539007547034", "Alice");
        let account = Account::from_identifier(&id);
        assert_eq!(account.identifier(), id);
        assert_eq!(account.initial, BigDecimal::from(0));
    }
}
