#![forbid(unsafe_code)]

//! The key-bound encryption engine interface shared by block ciphers and key
//! transport.

use kista_core::{algorithm, Error};
use kista_keys::Key;

/// An encryption engine bound to one key at construction.
pub trait EncryptionAlgorithm: Send + Sync {
    /// Algorithm URI.
    fn algorithm_id(&self) -> &'static str;
    /// Encrypt `plaintext`; the output carries everything needed to decrypt
    /// it with the same key (IV or nonce, tag).
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, Error>;
    /// Decrypt output produced by [`EncryptionAlgorithm::encrypt`].
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Create an encryption engine for any supported block cipher or key
/// transport URI.
pub fn from_uri(uri: &str, key: &Key) -> Result<Box<dyn EncryptionAlgorithm>, Error> {
    from_uri_with_oaep(uri, key, None)
}

/// Like [`from_uri`], passing the decoded `OAEPparams` label to RSA-OAEP.
pub fn from_uri_with_oaep(
    uri: &str,
    key: &Key,
    oaep_params: Option<&[u8]>,
) -> Result<Box<dyn EncryptionAlgorithm>, Error> {
    tracing::debug!(algorithm = uri, key = key.kind_name(), "creating encryption engine");
    if algorithm::KEY_TRANSPORT_ALGORITHMS.contains(&uri) {
        crate::keytransport::from_uri(uri, key, oaep_params)
    } else {
        crate::cipher::from_uri(uri, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kista_core::ErrorKind;
    use kista_keys::SymmetricKey;

    #[test]
    fn test_dispatch() {
        let key: Key = SymmetricKey::new(vec![9u8; 32]).unwrap().into();
        let engine = from_uri(algorithm::AES256_GCM, &key).unwrap();
        assert_eq!(engine.algorithm_id(), algorithm::AES256_GCM);

        let err = from_uri(algorithm::RSA_PKCS1, &key).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = from_uri("http://www.w3.org/2001/04/xmlenc#kw-aes128", &key)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
