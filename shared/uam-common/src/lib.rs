//! UAM Common Library
//!
//! Identifiers and value types shared by the access engine and its hosts.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
