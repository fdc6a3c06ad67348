#![forbid(unsafe_code)]

//! Algorithm registry mapping URIs to engine factories.

use crate::digest::DigestAlgorithm;
use crate::encryption::EncryptionAlgorithm;
use crate::sign::SignatureAlgorithm;
use kista_core::{algorithm, Error};
use kista_keys::Key;

/// Central lookup for every supported algorithm.
pub struct AlgorithmRegistry;

impl AlgorithmRegistry {
    /// Look up a digest algorithm by URI.
    pub fn digest(uri: &str) -> Result<Box<dyn DigestAlgorithm>, Error> {
        crate::digest::from_uri(uri)
    }

    /// Look up a signature algorithm by URI, bound to `key`.
    pub fn signature(uri: &str, key: &Key) -> Result<Box<dyn SignatureAlgorithm>, Error> {
        crate::sign::from_uri(uri, key)
    }

    /// Look up a block cipher or key transport algorithm by URI, bound to `key`.
    pub fn encryption(uri: &str, key: &Key) -> Result<Box<dyn EncryptionAlgorithm>, Error> {
        crate::encryption::from_uri(uri, key)
    }

    /// Whether `uri` names any algorithm this registry can construct.
    pub fn is_supported(uri: &str) -> bool {
        algorithm::is_digest(uri) || algorithm::is_signature(uri) || algorithm::is_encryption(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_uris() {
        assert!(AlgorithmRegistry::is_supported(algorithm::SHA256));
        assert!(AlgorithmRegistry::is_supported(algorithm::HMAC_SHA1));
        assert!(AlgorithmRegistry::is_supported(algorithm::RSA_OAEP));
        assert!(AlgorithmRegistry::is_supported(algorithm::TRIPLEDES_CBC));
        assert!(!AlgorithmRegistry::is_supported(algorithm::C14N));
        assert!(!AlgorithmRegistry::is_supported("urn:unknown"));
        assert!(AlgorithmRegistry::digest(algorithm::SHA512).is_ok());
    }
}
