#![forbid(unsafe_code)]

//! Key transport (RSA PKCS#1 v1.5, RSA-OAEP with MGF1-SHA1) bound to an
//! RSA key.

use crate::encryption::EncryptionAlgorithm;
use kista_core::{algorithm, Error};
use kista_keys::Key;
use rand::rngs::OsRng;

/// Create a key transport engine for `uri`. `oaep_params` is the decoded
/// `OAEPparams` label and is only meaningful for RSA-OAEP.
pub fn from_uri(
    uri: &str,
    key: &Key,
    oaep_params: Option<&[u8]>,
) -> Result<Box<dyn EncryptionAlgorithm>, Error> {
    let public = key
        .rsa_public_key()
        .ok_or_else(|| {
            Error::Key(format!(
                "key transport requires an RSA key, got a {}",
                key.kind_name()
            ))
        })?
        .clone();
    let private = key.rsa_private_key().cloned();

    match uri {
        algorithm::RSA_PKCS1 => Ok(Box::new(RsaPkcs1Transport { public, private })),
        algorithm::RSA_OAEP => {
            let label = match oaep_params {
                Some(bytes) if !bytes.is_empty() => Some(
                    String::from_utf8(bytes.to_vec()).map_err(|_| {
                        Error::InvalidArgument("OAEPparams label is not valid UTF-8".into())
                    })?,
                ),
                _ => None,
            };
            Ok(Box::new(RsaOaepTransport {
                public,
                private,
                label,
            }))
        }
        _ => Err(Error::UnsupportedAlgorithm(format!("key transport: {uri}"))),
    }
}

fn require_private<'a>(
    private: &'a Option<rsa::RsaPrivateKey>,
    uri: &str,
) -> Result<&'a rsa::RsaPrivateKey, Error> {
    private.as_ref().ok_or_else(|| {
        Error::InvalidArgument(format!("{uri} decryption requires an RSA private key"))
    })
}

struct RsaPkcs1Transport {
    public: rsa::RsaPublicKey,
    private: Option<rsa::RsaPrivateKey>,
}

impl EncryptionAlgorithm for RsaPkcs1Transport {
    fn algorithm_id(&self) -> &'static str {
        algorithm::RSA_PKCS1
    }

    fn encrypt(&self, key_data: &[u8]) -> Result<Vec<u8>, Error> {
        use rsa::Pkcs1v15Encrypt;
        self.public
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, key_data)
            .map_err(|e| Error::Crypto(format!("RSA PKCS#1 encrypt: {e}")))
    }

    fn decrypt(&self, encrypted: &[u8]) -> Result<Vec<u8>, Error> {
        use rsa::Pkcs1v15Encrypt;
        require_private(&self.private, algorithm::RSA_PKCS1)?
            .decrypt(Pkcs1v15Encrypt, encrypted)
            .map_err(|e| Error::Crypto(format!("RSA PKCS#1 decrypt: {e}")))
    }
}

struct RsaOaepTransport {
    public: rsa::RsaPublicKey,
    private: Option<rsa::RsaPrivateKey>,
    label: Option<String>,
}

impl RsaOaepTransport {
    fn padding(&self) -> rsa::Oaep {
        let mut padding = rsa::Oaep::new::<sha1::Sha1>();
        padding.label = self.label.clone();
        padding
    }
}

impl EncryptionAlgorithm for RsaOaepTransport {
    fn algorithm_id(&self) -> &'static str {
        algorithm::RSA_OAEP
    }

    fn encrypt(&self, key_data: &[u8]) -> Result<Vec<u8>, Error> {
        self.public
            .encrypt(&mut OsRng, self.padding(), key_data)
            .map_err(|e| Error::Crypto(format!("RSA-OAEP encrypt: {e}")))
    }

    fn decrypt(&self, encrypted: &[u8]) -> Result<Vec<u8>, Error> {
        require_private(&self.private, algorithm::RSA_OAEP)?
            .decrypt(self.padding(), encrypted)
            .map_err(|e| Error::Crypto(format!("RSA-OAEP decrypt: {e}")))
    }
}
