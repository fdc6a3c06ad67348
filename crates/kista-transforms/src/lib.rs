#![forbid(unsafe_code)]

//! Transform handling for the kista XML Security library.
//!
//! A Reference's `<Transforms>` are not run as a sequential byte pipeline.
//! They are read as configuration updates and reduced by [`resolve`] to one
//! [`C14nConfig`]: a canonicalization mode, at most one node-set filter
//! (an XPath predicate or the enveloped-signature transform), and an
//! optional InclusiveNamespaces prefix list. Chains that need more than
//! that are rejected.

pub mod resolve;
pub mod transform;

pub use resolve::{resolve, C14nConfig, NodeFilter};
pub use transform::{Transform, Transforms, XPath};
