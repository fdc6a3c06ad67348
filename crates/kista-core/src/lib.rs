#![forbid(unsafe_code)]

//! Shared foundations for the kista crates: the error taxonomy,
//! algorithm and namespace identifiers, and pure value validation.

pub mod algorithm;
pub mod error;
pub mod ns;
pub mod validate;

pub use error::{Error, ErrorKind, Result};
