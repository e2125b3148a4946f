//! # Account Resolver
//!
//! Account identity resolution for bank statement imports: the same real-world
//! account shows up under many spellings across export files, and this crate
//! merges them into stable canonical accounts that survive repeated imports.
//!
//! ## Features
//!
//! - **Identifier normalization**: Belgian IBAN and legacy `NNN-NNNNNNN-NN` equivalence
//! - **Persisted registry**: JSON-serializable groups of equivalent identifiers with one representative each
//! - **Reconciliation**: incremental merge of fresh evidence into the registry, failing loudly on ambiguity
//! - **Account book**: canonical accounts reachable through any alias, with personal account groups
//! - **Storage abstraction**: file-backed and in-memory registry stores behind a trait
//!
//! ## Quick Start
//!
//! ```rust
//! use account_resolver::{Identifier, MemoryEvidence, MemoryStore, Resolver};
//! use std::path::Path;
//!
//! let source = MemoryEvidence::new().with_statement(
//!     "checking.csv",
//!     Identifier::named("BE68539007547034", "Alice"),
//!     vec![Identifier::named("539-0075470-34", "ALICE")],
//! );
//!
//! let mut resolver = Resolver::new(MemoryStore::new());
//! let resolution = resolver.run(&source, Path::new("import")).unwrap();
//!
//! let alice = resolution.book.get_by_number("539-0075470-34").unwrap();
//! assert_eq!(alice.number.as_deref(), Some("BE68539007547034"));
//! assert_eq!(resolution.book.len(), 1);
//! ```

pub mod book;
pub mod config;
pub mod normalize;
pub mod reconciliation;
pub mod registry;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use book::{AccountBook, AccountGroup, Resolution, Resolver};
pub use config::ResolverConfig;
pub use reconciliation::{
    Evidence, MatchRule, Reconciliation, ReconciliationEngine, ReconciliationReport,
};
pub use registry::{Entry, Registry};
pub use traits::*;
pub use types::*;
pub use utils::{JsonFileStore, MemoryEvidence, MemoryStore};
