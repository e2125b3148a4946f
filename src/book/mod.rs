//! Canonical account book built from the resolved registry

pub mod account_book;
pub mod core;
pub mod group;

pub use account_book::*;
pub use self::core::*;
pub use group::*;
