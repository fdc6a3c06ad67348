#![forbid(unsafe_code)]

//! Signature algorithm implementations (RSA PKCS#1 v1.5, HMAC).
//!
//! An engine is bound to one algorithm and one key when it is created, and
//! creation fails if the key cannot serve that algorithm family.

use kista_core::{algorithm, Error};
use kista_keys::Key;
use signature::SignatureEncoding;
use subtle::ConstantTimeEq;

/// A signature engine bound to an algorithm and a key.
pub trait SignatureAlgorithm: Send + Sync {
    /// The algorithm URI this engine implements.
    fn uri(&self) -> &'static str;
    /// Sign `data`.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, Error>;
    /// Verify `signature` over `data`.
    ///
    /// Tampered data, a wrong key or malformed signature bytes all give
    /// `Ok(false)`.
    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, Error>;
}

/// Create a signature engine for `uri` bound to `key`.
pub fn from_uri(uri: &str, key: &Key) -> Result<Box<dyn SignatureAlgorithm>, Error> {
    use algorithm::*;
    let engine: Box<dyn SignatureAlgorithm> = match uri {
        RSA_SHA1 => Box::new(RsaPkcs1v15::new(RSA_SHA1, HashType::Sha1, key)?),
        RSA_SHA224 => Box::new(RsaPkcs1v15::new(RSA_SHA224, HashType::Sha224, key)?),
        RSA_SHA256 => Box::new(RsaPkcs1v15::new(RSA_SHA256, HashType::Sha256, key)?),
        RSA_SHA384 => Box::new(RsaPkcs1v15::new(RSA_SHA384, HashType::Sha384, key)?),
        RSA_SHA512 => Box::new(RsaPkcs1v15::new(RSA_SHA512, HashType::Sha512, key)?),
        RSA_RIPEMD160 => Box::new(RsaPkcs1v15::new(RSA_RIPEMD160, HashType::Ripemd160, key)?),

        HMAC_SHA1 => Box::new(HmacSign::new(HMAC_SHA1, HashType::Sha1, key)?),
        HMAC_SHA224 => Box::new(HmacSign::new(HMAC_SHA224, HashType::Sha224, key)?),
        HMAC_SHA256 => Box::new(HmacSign::new(HMAC_SHA256, HashType::Sha256, key)?),
        HMAC_SHA384 => Box::new(HmacSign::new(HMAC_SHA384, HashType::Sha384, key)?),
        HMAC_SHA512 => Box::new(HmacSign::new(HMAC_SHA512, HashType::Sha512, key)?),

        _ => return Err(Error::UnsupportedAlgorithm(format!("signature algorithm: {uri}"))),
    };
    tracing::debug!(algorithm = uri, key = key.kind_name(), "signature engine created");
    Ok(engine)
}

#[derive(Debug, Clone, Copy)]
enum HashType {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Ripemd160,
}

// ── RSA PKCS#1 v1.5 ─────────────────────────────────────────────────

struct RsaPkcs1v15 {
    uri: &'static str,
    hash: HashType,
    public: rsa::RsaPublicKey,
    private: Option<rsa::RsaPrivateKey>,
}

impl RsaPkcs1v15 {
    fn new(uri: &'static str, hash: HashType, key: &Key) -> Result<Self, Error> {
        let public = key.rsa_public_key().ok_or_else(|| {
            Error::Key(format!("{uri} requires an RSA key, got a {}", key.kind_name()))
        })?;
        Ok(Self {
            uri,
            hash,
            public: public.clone(),
            private: key.rsa_private_key().cloned(),
        })
    }
}

impl SignatureAlgorithm for RsaPkcs1v15 {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        use signature::Signer;
        let private_key = self.private.as_ref().ok_or_else(|| {
            Error::InvalidArgument(format!("{} signing requires a private key", self.uri))
        })?;
        macro_rules! do_sign {
            ($hasher:ty) => {{
                let sk = rsa::pkcs1v15::SigningKey::<$hasher>::new(private_key.clone());
                let sig = sk
                    .try_sign(data)
                    .map_err(|e| Error::Crypto(format!("RSA sign: {e}")))?;
                Ok(sig.to_vec())
            }};
        }
        match self.hash {
            HashType::Sha1 => do_sign!(sha1::Sha1),
            HashType::Sha224 => do_sign!(sha2::Sha224),
            HashType::Sha256 => do_sign!(sha2::Sha256),
            HashType::Sha384 => do_sign!(sha2::Sha384),
            HashType::Sha512 => do_sign!(sha2::Sha512),
            HashType::Ripemd160 => do_sign!(ripemd::Ripemd160),
        }
    }

    fn verify(&self, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        use signature::Verifier;
        let Ok(sig) = rsa::pkcs1v15::Signature::try_from(sig_bytes) else {
            return Ok(false);
        };
        macro_rules! do_verify {
            ($hasher:ty) => {{
                let vk = rsa::pkcs1v15::VerifyingKey::<$hasher>::new(self.public.clone());
                vk.verify(data, &sig).is_ok()
            }};
        }
        let valid = match self.hash {
            HashType::Sha1 => do_verify!(sha1::Sha1),
            HashType::Sha224 => do_verify!(sha2::Sha224),
            HashType::Sha256 => do_verify!(sha2::Sha256),
            HashType::Sha384 => do_verify!(sha2::Sha384),
            HashType::Sha512 => do_verify!(sha2::Sha512),
            HashType::Ripemd160 => do_verify!(ripemd::Ripemd160),
        };
        Ok(valid)
    }
}

// ── HMAC ─────────────────────────────────────────────────────────────

struct HmacSign {
    uri: &'static str,
    hash: HashType,
    key: Vec<u8>,
}

impl HmacSign {
    fn new(uri: &'static str, hash: HashType, key: &Key) -> Result<Self, Error> {
        let bytes = key.symmetric_bytes().ok_or_else(|| {
            Error::Key(format!("{uri} requires a symmetric key, got a {}", key.kind_name()))
        })?;
        Ok(Self {
            uri,
            hash,
            key: bytes.to_vec(),
        })
    }
}

impl SignatureAlgorithm for HmacSign {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        compute_hmac(self.hash, &self.key, data)
    }

    /// The full MAC must be present; truncated values never verify.
    fn verify(&self, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        let expected = compute_hmac(self.hash, &self.key, data)?;
        Ok(expected.as_slice().ct_eq(sig_bytes).into())
    }
}

fn compute_hmac(hash: HashType, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    use hmac::{Hmac, Mac};
    macro_rules! hmac_compute {
        ($hasher:ty) => {{
            let mut mac = <Hmac<$hasher>>::new_from_slice(key)
                .map_err(|e| Error::Key(format!("HMAC key: {e}")))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }};
    }
    match hash {
        HashType::Sha1 => hmac_compute!(sha1::Sha1),
        HashType::Sha224 => hmac_compute!(sha2::Sha224),
        HashType::Sha256 => hmac_compute!(sha2::Sha256),
        HashType::Sha384 => hmac_compute!(sha2::Sha384),
        HashType::Sha512 => hmac_compute!(sha2::Sha512),
        HashType::Ripemd160 => hmac_compute!(ripemd::Ripemd160),
    }
}
