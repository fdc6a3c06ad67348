#![forbid(unsafe_code)]

//! Cryptographic engines for XML-DSig and XML-Enc: digests, signatures,
//! block ciphers, key transport and secure randomness.
//!
//! Signature and encryption engines are bound to a key when they are
//! created, so a mismatched key is rejected before any data is processed.

pub mod cipher;
pub mod digest;
pub mod encryption;
pub mod keytransport;
pub mod random;
pub mod registry;
pub mod sign;

pub use digest::{verify_digest, DigestAlgorithm};
pub use encryption::EncryptionAlgorithm;
pub use random::{generate_guid, generate_symmetric_key, random_bytes};
pub use registry::AlgorithmRegistry;
pub use sign::SignatureAlgorithm;
