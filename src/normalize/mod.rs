//! Account number normalization

pub mod iban;

pub use iban::*;
