#![forbid(unsafe_code)]

//! Random bytes, identifiers and keys from the operating system CSPRNG.
//!
//! There is no fallback generator: if the OS source fails, the caller gets
//! [`Error::Runtime`].

use kista_core::{algorithm, Error};
use kista_keys::{Key, SymmetricKey};
use rand::rngs::OsRng;
use rand::RngCore;

/// `len` bytes from the operating system CSPRNG.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, Error> {
    if len == 0 {
        return Err(Error::InvalidArgument(
            "random byte count must be greater than zero".into(),
        ));
    }
    let mut buf = vec![0u8; len];
    OsRng.try_fill_bytes(&mut buf).map_err(|e| {
        Error::Runtime(format!(
            "no cryptographically secure random source available: {e}"
        ))
    })?;
    Ok(buf)
}

/// A random identifier: `prefix` followed by a version-4 UUID in its
/// hyphenated lowercase form.
///
/// The result is a valid `xsd:ID` whenever `prefix` starts with a letter or
/// `_`, as the default `_` does.
pub fn generate_guid(prefix: Option<&str>) -> Result<String, Error> {
    let bytes: [u8; 16] = random_bytes(16)?
        .try_into()
        .map_err(|_| Error::Runtime("random source returned a short read".into()))?;
    let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
    Ok(format!("{}{}", prefix.unwrap_or("_"), uuid.hyphenated()))
}

/// Key length in bytes for a block cipher URI.
pub fn cipher_key_size(uri: &str) -> Result<usize, Error> {
    match uri {
        algorithm::AES128_CBC | algorithm::AES128_GCM => Ok(16),
        algorithm::AES192_CBC | algorithm::AES192_GCM | algorithm::TRIPLEDES_CBC => Ok(24),
        algorithm::AES256_CBC | algorithm::AES256_GCM => Ok(32),
        _ => Err(Error::UnsupportedAlgorithm(format!("block cipher: {uri}"))),
    }
}

/// A fresh symmetric key sized for the block cipher `uri`.
pub fn generate_symmetric_key(uri: &str) -> Result<Key, Error> {
    let bytes = random_bytes(cipher_key_size(uri)?)?;
    Ok(SymmetricKey::new(bytes)?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kista_core::ErrorKind;

    #[test]
    fn test_random_bytes() {
        let a = random_bytes(32).unwrap();
        let b = random_bytes(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_length_rejected() {
        let err = random_bytes(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_guid_shape() {
        let guid = generate_guid(None).unwrap();
        assert_eq!(guid.len(), 37);
        assert!(guid.starts_with('_'));
        let groups: Vec<usize> = guid[1..].split('-').map(str::len).collect();
        assert_eq!(groups, [8, 4, 4, 4, 12]);
        assert!(kista_core::validate::valid_ncname(&guid).is_ok());

        let custom = generate_guid(Some("id-")).unwrap();
        assert!(custom.starts_with("id-"));
    }

    #[test]
    fn test_guid_is_version_4() {
        for _ in 0..32 {
            let guid = generate_guid(None).unwrap();
            let groups: Vec<&str> = guid[1..].split('-').collect();
            assert!(groups[2].starts_with('4'), "{guid}");
            assert!(matches!(groups[3].as_bytes()[0], b'8' | b'9' | b'a' | b'b'), "{guid}");
            assert!(guid[1..].chars().all(|c| c == '-' || c.is_ascii_digit() || c.is_ascii_lowercase()));
            assert_eq!(uuid::Uuid::parse_str(&guid[1..]).unwrap().get_version_num(), 4);
        }
    }

    #[test]
    fn test_generated_key_sizes() {
        let key = generate_symmetric_key(algorithm::AES256_GCM).unwrap();
        assert_eq!(key.symmetric_bytes().map(<[u8]>::len), Some(32));
        let key = generate_symmetric_key(algorithm::TRIPLEDES_CBC).unwrap();
        assert_eq!(key.symmetric_bytes().map(<[u8]>::len), Some(24));
        assert!(generate_symmetric_key(algorithm::RSA_OAEP).is_err());
    }
}
