//! Persisted registry of equivalent identifiers

pub mod disjoint_set;
pub mod wire;

pub use disjoint_set::*;
