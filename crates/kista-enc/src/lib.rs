#![forbid(unsafe_code)]

//! XML Encryption (XML-Enc) object model and key wrapping.
//!
//! Engines come from `kista-crypto` already bound to a key; the types here
//! check that an engine matches the declared `EncryptionMethod` before they
//! use it.

pub mod cipher_data;
pub mod encrypted;
pub mod method;
pub mod reference_list;
pub mod wrap;

pub use cipher_data::{CipherData, CipherReference};
pub use encrypted::{
    Encrypted, EncryptedAttributes, EncryptedData, EncryptedKey, EncryptedKeyOptions,
    EncryptedType,
};
pub use method::EncryptionMethod;
pub use reference_list::{EncReference, ReferenceList};
pub use wrap::{embedded_key, open, open_embedded, seal, Sealed};
