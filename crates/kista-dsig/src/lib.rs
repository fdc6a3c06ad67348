#![forbid(unsafe_code)]

//! XML Digital Signature (XML-DSig) implementation.
//!
//! The object model (`DigestMethod`, `Reference`, `SignedInfo`, `KeyInfo`,
//! `Signature`) parses from and serializes to XML. Verification and
//! template signing are built on it.

pub mod context;
pub mod keyinfo;
pub mod method;
pub mod reference;
pub mod sign;
pub mod signature;
pub mod verify;

pub use context::DsigContext;
pub use keyinfo::{KeyInfo, KeyInfoItem};
pub use method::{CanonicalizationMethod, DigestMethod, SignatureMethod};
pub use reference::Reference;
pub use sign::{sign_template, sign_template_with_context};
pub use signature::{Signature, SignedInfo};
pub use verify::{verify_signature, VerifyResult};
