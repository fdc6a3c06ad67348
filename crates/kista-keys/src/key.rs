#![forbid(unsafe_code)]

//! Key types.

use kista_core::Error;
use pkcs8::EncodePrivateKey;
use sha2::{Digest, Sha256};
use spki::EncodePublicKey;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An RSA public key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    rsa: rsa::RsaPublicKey,
}

/// An RSA private key, carrying its public half.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    rsa: rsa::RsaPrivateKey,
}

/// Raw secret bytes for HMAC or a block cipher. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: Vec<u8>,
}

/// A DER-encoded X.509 certificate and the RSA key it certifies.
#[derive(Clone, PartialEq, Eq)]
pub struct X509Certificate {
    der: Vec<u8>,
    subject: String,
    public: rsa::RsaPublicKey,
}

impl PublicKey {
    pub fn new(rsa: rsa::RsaPublicKey) -> Self {
        Self { rsa }
    }

    pub fn rsa(&self) -> &rsa::RsaPublicKey {
        &self.rsa
    }
}

impl PrivateKey {
    pub fn new(rsa: rsa::RsaPrivateKey) -> Self {
        Self { rsa }
    }

    pub fn rsa(&self) -> &rsa::RsaPrivateKey {
        &self.rsa
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(self.rsa.to_public_key())
    }
}

impl SymmetricKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::Key("symmetric key must not be empty".into()));
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl X509Certificate {
    pub(crate) fn new(der: Vec<u8>, subject: String, public: rsa::RsaPublicKey) -> Self {
        Self {
            der,
            subject,
            public,
        }
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The subject distinguished name, RFC 4514 style.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn rsa(&self) -> &rsa::RsaPublicKey {
        &self.public
    }
}

/// Key material handed to signature and encryption engines.
#[derive(Clone, PartialEq, Eq)]
pub enum Key {
    Public(PublicKey),
    Private(PrivateKey),
    Symmetric(SymmetricKey),
    Certificate(X509Certificate),
}

impl Key {
    /// A short name for the key form, for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Public(_) => "public key",
            Self::Private(_) => "private key",
            Self::Symmetric(_) => "symmetric key",
            Self::Certificate(_) => "X.509 certificate",
        }
    }

    /// The raw key material: SubjectPublicKeyInfo DER for public keys,
    /// PKCS#8 DER for private keys, the secret bytes for symmetric keys and
    /// the certificate DER for certificates.
    pub fn bytes(&self) -> Result<Vec<u8>, Error> {
        match self {
            Self::Public(k) => spki_der(&k.rsa),
            Self::Private(k) => {
                let doc = k
                    .rsa
                    .to_pkcs8_der()
                    .map_err(|e| Error::Key(format!("failed to encode PKCS#8: {e}")))?;
                Ok(doc.as_bytes().to_vec())
            }
            Self::Symmetric(k) => Ok(k.bytes.clone()),
            Self::Certificate(c) => Ok(c.der.clone()),
        }
    }

    /// An algorithm-agnostic identity: lowercase hex SHA-256 of the public
    /// SubjectPublicKeyInfo, or of the secret bytes for symmetric keys.
    ///
    /// A private key, its public key and a certificate for it share one
    /// identity.
    pub fn identity(&self) -> Result<String, Error> {
        let material = match self.rsa_public_key() {
            Some(public) => spki_der(public)?,
            None => self.bytes()?,
        };
        Ok(hex::encode(Sha256::digest(&material)))
    }

    /// The RSA public key, from any asymmetric form.
    pub fn rsa_public_key(&self) -> Option<&rsa::RsaPublicKey> {
        match self {
            Self::Public(k) => Some(&k.rsa),
            Self::Private(k) => Some(k.rsa.as_ref()),
            Self::Certificate(c) => Some(&c.public),
            Self::Symmetric(_) => None,
        }
    }

    pub fn rsa_private_key(&self) -> Option<&rsa::RsaPrivateKey> {
        match self {
            Self::Private(k) => Some(&k.rsa),
            _ => None,
        }
    }

    pub fn symmetric_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Symmetric(k) => Some(&k.bytes),
            _ => None,
        }
    }

    pub fn is_asymmetric(&self) -> bool {
        !matches!(self, Self::Symmetric(_))
    }
}

impl From<PublicKey> for Key {
    fn from(k: PublicKey) -> Self {
        Self::Public(k)
    }
}

impl From<PrivateKey> for Key {
    fn from(k: PrivateKey) -> Self {
        Self::Private(k)
    }
}

impl From<SymmetricKey> for Key {
    fn from(k: SymmetricKey) -> Self {
        Self::Symmetric(k)
    }
}

impl From<X509Certificate> for Key {
    fn from(c: X509Certificate) -> Self {
        Self::Certificate(c)
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use rsa::traits::PublicKeyParts;
        match self {
            Self::Public(k) => write!(f, "RSA public key ({} bits)", k.rsa.n().bits()),
            Self::Private(k) => write!(f, "RSA private key ({} bits)", k.rsa.n().bits()),
            Self::Symmetric(k) => write!(f, "symmetric key ({} bytes)", k.bytes.len()),
            Self::Certificate(c) => write!(f, "X.509 certificate ({})", c.subject),
        }
    }
}

fn spki_der(public: &rsa::RsaPublicKey) -> Result<Vec<u8>, Error> {
    let doc = public
        .to_public_key_der()
        .map_err(|e| Error::Key(format!("failed to encode SPKI: {e}")))?;
    Ok(doc.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn test_key() -> &'static rsa::RsaPrivateKey {
        static KEY: OnceLock<rsa::RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
    }

    #[test]
    fn test_shared_identity() {
        let private = PrivateKey::new(test_key().clone());
        let public = private.public_key();
        let a = Key::from(private).identity().unwrap();
        let b = Key::from(public).identity().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_bytes_per_form() {
        let private = Key::from(PrivateKey::new(test_key().clone()));
        let public = Key::from(PublicKey::new(test_key().to_public_key()));
        use pkcs8::DecodePrivateKey;
        use spki::DecodePublicKey;
        assert!(rsa::RsaPrivateKey::from_pkcs8_der(&private.bytes().unwrap()).is_ok());
        assert!(rsa::RsaPublicKey::from_public_key_der(&public.bytes().unwrap()).is_ok());

        let secret = Key::from(SymmetricKey::new(vec![7u8; 16]).unwrap());
        assert_eq!(secret.bytes().unwrap(), vec![7u8; 16]);
        assert!(secret.rsa_public_key().is_none());
        assert!(!secret.is_asymmetric());
    }

    #[test]
    fn test_empty_symmetric_key_rejected() {
        assert!(SymmetricKey::new(Vec::new()).is_err());
    }

    #[test]
    fn test_symmetric_key_zeroize() {
        let mut key = SymmetricKey::new(vec![9u8; 16]).unwrap();
        assert_eq!(key.as_bytes(), &[9u8; 16]);
        key.zeroize();
        assert!(key.as_bytes().is_empty());
    }

    #[test]
    fn test_debug_hides_material() {
        let secret = Key::from(SymmetricKey::new(b"hunter2hunter2".to_vec()).unwrap());
        assert_eq!(format!("{secret:?}"), "symmetric key (14 bytes)");
    }
}
