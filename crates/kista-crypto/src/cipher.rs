#![forbid(unsafe_code)]

//! Block cipher engines (AES-CBC, AES-GCM, 3DES-CBC) bound to a symmetric
//! key.
//!
//! Ciphertexts use the XML Encryption layout: the IV (or GCM nonce) first,
//! then the encrypted bytes, then the GCM tag.

use crate::encryption::EncryptionAlgorithm;
use crate::random::random_bytes;
use kista_core::{algorithm, Error};
use kista_keys::Key;

/// Create a block cipher engine for `uri` bound to `key`.
pub fn from_uri(uri: &str, key: &Key) -> Result<Box<dyn EncryptionAlgorithm>, Error> {
    use algorithm::*;
    let engine: Box<dyn EncryptionAlgorithm> = match uri {
        AES128_CBC => Box::new(AesCbc::new(AES128_CBC, 16, key)?),
        AES192_CBC => Box::new(AesCbc::new(AES192_CBC, 24, key)?),
        AES256_CBC => Box::new(AesCbc::new(AES256_CBC, 32, key)?),
        AES128_GCM => Box::new(AesGcm::new(AES128_GCM, 16, key)?),
        AES192_GCM => Box::new(AesGcm::new(AES192_GCM, 24, key)?),
        AES256_GCM => Box::new(AesGcm::new(AES256_GCM, 32, key)?),
        TRIPLEDES_CBC => Box::new(TripleDesCbc::new(key)?),
        _ => return Err(Error::UnsupportedAlgorithm(format!("cipher: {uri}"))),
    };
    Ok(engine)
}

fn symmetric_key(uri: &str, key_size: usize, key: &Key) -> Result<Vec<u8>, Error> {
    let bytes = key.symmetric_bytes().ok_or_else(|| {
        Error::Key(format!("{uri} requires a symmetric key, got a {}", key.kind_name()))
    })?;
    if bytes.len() != key_size {
        return Err(Error::Key(format!(
            "{uri} expects a {key_size} byte key, got {}",
            bytes.len()
        )));
    }
    Ok(bytes.to_vec())
}

// ── AES-CBC ──────────────────────────────────────────────────────────

struct AesCbc {
    uri: &'static str,
    key: Vec<u8>,
}

impl AesCbc {
    fn new(uri: &'static str, key_size: usize, key: &Key) -> Result<Self, Error> {
        Ok(Self {
            uri,
            key: symmetric_key(uri, key_size, key)?,
        })
    }
}

impl EncryptionAlgorithm for AesCbc {
    fn algorithm_id(&self) -> &'static str {
        self.uri
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        use cbc::cipher::{BlockEncryptMut, KeyIvInit};

        let iv = random_bytes(16)?;
        let mut buf = pad(plaintext, 16);
        let buf_len = buf.len();

        macro_rules! do_encrypt {
            ($aes:ty) => {{
                let enc = cbc::Encryptor::<$aes>::new_from_slices(&self.key, &iv)
                    .map_err(|e| Error::Crypto(format!("AES-CBC init: {e}")))?;
                enc.encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf, buf_len)
                    .map_err(|e| Error::Crypto(format!("AES-CBC encrypt: {e}")))?;
            }};
        }

        match self.key.len() {
            16 => do_encrypt!(aes::Aes128),
            24 => do_encrypt!(aes::Aes192),
            _ => do_encrypt!(aes::Aes256),
        }

        let mut result = iv;
        result.extend_from_slice(&buf);
        Ok(result)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        use cbc::cipher::{BlockDecryptMut, KeyIvInit};

        if data.len() < 32 || data.len() % 16 != 0 {
            return Err(Error::Crypto("AES-CBC data invalid length".into()));
        }
        let (iv, ciphertext) = data.split_at(16);
        let mut buf = ciphertext.to_vec();

        macro_rules! do_decrypt {
            ($aes:ty) => {{
                let dec = cbc::Decryptor::<$aes>::new_from_slices(&self.key, iv)
                    .map_err(|e| Error::Crypto(format!("AES-CBC init: {e}")))?;
                dec.decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
                    .map_err(|e| Error::Crypto(format!("AES-CBC decrypt: {e}")))?;
            }};
        }

        match self.key.len() {
            16 => do_decrypt!(aes::Aes128),
            24 => do_decrypt!(aes::Aes192),
            _ => do_decrypt!(aes::Aes256),
        }

        unpad(&buf, 16)
    }
}

// ── AES-GCM ──────────────────────────────────────────────────────────

const GCM_NONCE_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;

struct AesGcm {
    uri: &'static str,
    key: Vec<u8>,
}

impl AesGcm {
    fn new(uri: &'static str, key_size: usize, key: &Key) -> Result<Self, Error> {
        Ok(Self {
            uri,
            key: symmetric_key(uri, key_size, key)?,
        })
    }
}

macro_rules! gcm_apply {
    ($key:expr, $op:ident, $nonce:expr, $data:expr, $what:literal) => {{
        use aes_gcm::{aead::Aead, KeyInit};
        let result = match $key.len() {
            16 => aes_gcm::Aes128Gcm::new_from_slice($key)
                .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?
                .$op($nonce, $data),
            24 => {
                use aes_gcm::aead::consts::U12;
                aes_gcm::AesGcm::<aes::Aes192, U12>::new_from_slice($key)
                    .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?
                    .$op($nonce, $data)
            }
            _ => aes_gcm::Aes256Gcm::new_from_slice($key)
                .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?
                .$op($nonce, $data),
        };
        result.map_err(|e| Error::Crypto(format!(concat!("AES-GCM ", $what, ": {}"), e)))
    }};
}

impl EncryptionAlgorithm for AesGcm {
    fn algorithm_id(&self) -> &'static str {
        self.uri
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let nonce_bytes = random_bytes(GCM_NONCE_LEN)?;
        let nonce = aes_gcm::Nonce::from_slice(&nonce_bytes);
        let ct = gcm_apply!(&self.key, encrypt, nonce, plaintext, "encrypt")?;

        let mut result = nonce_bytes;
        result.extend_from_slice(&ct);
        Ok(result)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        if data.len() < GCM_NONCE_LEN + GCM_TAG_LEN {
            return Err(Error::Crypto("AES-GCM data too short".into()));
        }
        let (nonce, ct_and_tag) = data.split_at(GCM_NONCE_LEN);
        let nonce = aes_gcm::Nonce::from_slice(nonce);
        gcm_apply!(&self.key, decrypt, nonce, ct_and_tag, "decrypt")
    }
}

// ── 3DES-CBC ─────────────────────────────────────────────────────────

struct TripleDesCbc {
    key: Vec<u8>,
}

impl TripleDesCbc {
    fn new(key: &Key) -> Result<Self, Error> {
        Ok(Self {
            key: symmetric_key(algorithm::TRIPLEDES_CBC, 24, key)?,
        })
    }
}

impl EncryptionAlgorithm for TripleDesCbc {
    fn algorithm_id(&self) -> &'static str {
        algorithm::TRIPLEDES_CBC
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        use cbc::cipher::{BlockEncryptMut, KeyIvInit};

        let iv = random_bytes(8)?;
        let mut buf = pad(plaintext, 8);
        let buf_len = buf.len();

        let enc = cbc::Encryptor::<des::TdesEde3>::new_from_slices(&self.key, &iv)
            .map_err(|e| Error::Crypto(format!("3DES init: {e}")))?;
        enc.encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf, buf_len)
            .map_err(|e| Error::Crypto(format!("3DES encrypt: {e}")))?;

        let mut result = iv;
        result.extend_from_slice(&buf);
        Ok(result)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        use cbc::cipher::{BlockDecryptMut, KeyIvInit};

        if data.len() < 16 || data.len() % 8 != 0 {
            return Err(Error::Crypto("3DES data invalid length".into()));
        }
        let (iv, ciphertext) = data.split_at(8);
        let mut buf = ciphertext.to_vec();

        let dec = cbc::Decryptor::<des::TdesEde3>::new_from_slices(&self.key, iv)
            .map_err(|e| Error::Crypto(format!("3DES init: {e}")))?;
        dec.decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
            .map_err(|e| Error::Crypto(format!("3DES decrypt: {e}")))?;

        unpad(&buf, 8)
    }
}

// ── Padding ──────────────────────────────────────────────────────────

/// Pad to a whole number of blocks; every pad byte holds the pad length.
fn pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let pad_len = block_size - (data.len() % block_size);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

/// Strip XML Encryption padding. Only the final byte, the pad length, is
/// checked, so both PKCS#7 and ISO 10126 style filler are accepted.
fn unpad(data: &[u8], block_size: usize) -> Result<Vec<u8>, Error> {
    let Some(&pad_byte) = data.last() else {
        return Err(Error::Crypto("empty plaintext block".into()));
    };
    let pad_len = pad_byte as usize;
    if pad_len == 0 || pad_len > block_size || pad_len > data.len() {
        return Err(Error::Crypto("invalid padding".into()));
    }
    Ok(data[..data.len() - pad_len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kista_core::ErrorKind;
    use kista_keys::SymmetricKey;

    fn key(len: usize) -> Key {
        SymmetricKey::new(vec![0x42u8; len]).unwrap().into()
    }

    #[test]
    fn test_padding() {
        let padded = pad(b"hello", 16);
        assert_eq!(padded.len(), 16);
        assert_eq!(padded[15], 11);
        assert_eq!(unpad(&padded, 16).unwrap(), b"hello");
        assert_eq!(pad(&[0u8; 16], 16).len(), 32);

        let mut iso = b"hello world!".to_vec();
        iso.extend_from_slice(&[0xAB, 0xCD, 0xEF, 0x04]);
        assert_eq!(unpad(&iso, 16).unwrap(), b"hello world!");

        assert!(unpad(&[1, 2, 3, 0], 16).is_err());
        assert!(unpad(&[1, 2, 3, 17], 16).is_err());
    }

    #[test]
    fn test_round_trips() {
        for (uri, len) in [
            (algorithm::AES128_CBC, 16),
            (algorithm::AES192_CBC, 24),
            (algorithm::AES256_CBC, 32),
            (algorithm::AES128_GCM, 16),
            (algorithm::AES192_GCM, 24),
            (algorithm::AES256_GCM, 32),
            (algorithm::TRIPLEDES_CBC, 24),
        ] {
            let engine = from_uri(uri, &key(len)).unwrap();
            assert_eq!(engine.algorithm_id(), uri);
            for pt in [&b""[..], b"test data", &[7u8; 48]] {
                let ct = engine.encrypt(pt).unwrap();
                assert_ne!(&ct[..], pt);
                assert_eq!(engine.decrypt(&ct).unwrap(), pt, "{uri}");
            }
        }
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let engine = from_uri(algorithm::AES128_CBC, &key(16)).unwrap();
        assert_ne!(engine.encrypt(b"same").unwrap(), engine.encrypt(b"same").unwrap());
    }

    #[test]
    fn test_gcm_authentication_failure() {
        let engine = from_uri(algorithm::AES128_GCM, &key(16)).unwrap();
        let mut ct = engine.encrypt(b"test message for GCM auth failure").unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0xFF;
        let err = engine.decrypt(&ct).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Crypto);
    }

    #[test]
    fn test_wrong_key_rejected_at_construction() {
        let err = from_uri(algorithm::AES256_CBC, &key(16)).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_truncated_ciphertext() {
        let engine = from_uri(algorithm::AES128_CBC, &key(16)).unwrap();
        assert!(engine.decrypt(&[0u8; 16]).is_err());
        let engine = from_uri(algorithm::TRIPLEDES_CBC, &key(24)).unwrap();
        assert!(engine.decrypt(&[0u8; 12]).is_err());
    }
}
