#![forbid(unsafe_code)]

//! The digest registry and constant-time digest comparison.

use digest::Digest;
use kista_core::{algorithm, Error};
use subtle::ConstantTimeEq;

/// An incremental hash selected by algorithm URI.
pub trait DigestAlgorithm: Send {
    /// Feed data into the hash.
    fn update(&mut self, data: &[u8]);
    /// Finalize and return the hash value.
    fn finalize(self: Box<Self>) -> Vec<u8>;
    /// Algorithm URI.
    fn uri(&self) -> &'static str;
}

/// Create a digest algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn DigestAlgorithm>, Error> {
    let hasher = match uri {
        algorithm::SHA1 => hasher::<sha1::Sha1>(algorithm::SHA1),
        algorithm::SHA224 => hasher::<sha2::Sha224>(algorithm::SHA224),
        algorithm::SHA256 => hasher::<sha2::Sha256>(algorithm::SHA256),
        algorithm::SHA384 => hasher::<sha2::Sha384>(algorithm::SHA384),
        algorithm::SHA512 => hasher::<sha2::Sha512>(algorithm::SHA512),
        algorithm::RIPEMD160 => hasher::<ripemd::Ripemd160>(algorithm::RIPEMD160),
        algorithm::SHA3_224 => hasher::<sha3::Sha3_224>(algorithm::SHA3_224),
        algorithm::SHA3_256 => hasher::<sha3::Sha3_256>(algorithm::SHA3_256),
        algorithm::SHA3_384 => hasher::<sha3::Sha3_384>(algorithm::SHA3_384),
        algorithm::SHA3_512 => hasher::<sha3::Sha3_512>(algorithm::SHA3_512),
        _ => {
            return Err(Error::UnsupportedAlgorithm(format!(
                "digest algorithm: {uri}"
            )))
        }
    };
    Ok(hasher)
}

/// Compute a digest in one shot.
pub fn digest(uri: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut hasher = from_uri(uri)?;
    hasher.update(data);
    Ok(hasher.finalize())
}

/// Digest `data` and compare it with `expected` in constant time.
///
/// A mismatch is `Ok(false)`; only an unsupported algorithm is an error.
pub fn verify_digest(data: &[u8], uri: &str, expected: &[u8]) -> Result<bool, Error> {
    let computed = digest(uri, data)?;
    let matches: bool = computed.as_slice().ct_eq(expected).into();
    tracing::debug!(algorithm = uri, matches, "digest comparison");
    Ok(matches)
}

/// Any RustCrypto hash, tagged with the URI it was selected by.
struct Hasher<D> {
    inner: D,
    uri: &'static str,
}

fn hasher<D: Digest + Send + 'static>(uri: &'static str) -> Box<dyn DigestAlgorithm> {
    Box::new(Hasher { inner: D::new(), uri })
}

impl<D: Digest + Send> DigestAlgorithm for Hasher<D> {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.inner, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.inner.finalize().to_vec()
    }

    fn uri(&self) -> &'static str {
        self.uri
    }
}
