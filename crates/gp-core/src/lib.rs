//! # gp-core
//!
//! Shared error taxonomy and input value types for the GP parameter stack.
//!
//! Higher-level crates (`gp-prob`) return [`Result`] from every fallible
//! operation and accept [`Value`] wherever a constrained value is supplied.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::Value;
