#![forbid(unsafe_code)]

//! Key handling for the kista XML Security library.
//!
//! A [`Key`] is one of an RSA public key, an RSA private key, raw symmetric
//! bytes or an X.509 certificate. Keys are loaded from PEM, DER and raw
//! binary files by the functions in [`loader`].

pub mod key;
pub mod loader;

pub use key::{Key, PrivateKey, PublicKey, SymmetricKey, X509Certificate};
pub use loader::{load_key_file, load_pem_auto, load_symmetric_key_file};
