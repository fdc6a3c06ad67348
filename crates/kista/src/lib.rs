#![forbid(unsafe_code)]

//! kista: XML Digital Signature and XML Encryption processing.

pub use kista_c14n as c14n;
pub use kista_core as core;
pub use kista_crypto as crypto;
pub use kista_dsig as dsig;
pub use kista_enc as enc;
pub use kista_keys as keys;
pub use kista_transforms as transforms;
pub use kista_xml as xml;

pub mod names;
