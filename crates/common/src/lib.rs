//! Shared types and utilities for the gas station workspace.

pub mod types;
pub mod utils;

pub use types::{Address, ParseError, TxHash, Wei};
