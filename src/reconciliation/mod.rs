//! Reconciliation of freshly observed account identifiers with persisted identities
//!
//! A run collects [`Evidence`] from the import sources, then the
//! [`ReconciliationEngine`] resolves it against yesterday's registry.

pub mod engine;
pub mod evidence;

pub use engine::*;
pub use evidence::*;
