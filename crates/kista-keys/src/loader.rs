#![forbid(unsafe_code)]

//! Key loading from PEM, DER, X.509 certificates and raw binary files.

use crate::key::{Key, PrivateKey, PublicKey, SymmetricKey, X509Certificate};
use kista_core::Error;
use std::path::Path;

/// Load an RSA private key from PEM data, PKCS#8 first, then PKCS#1.
pub fn load_private_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;
    let pem_str = pem_text(pem_data)?;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_pem(pem_str) {
        return Ok(PrivateKey::new(pk).into());
    }
    let pk = rsa::RsaPrivateKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key PEM: {e}")))?;
    Ok(PrivateKey::new(pk).into())
}

/// Load an RSA public key from PEM data, SubjectPublicKeyInfo first, then
/// PKCS#1.
pub fn load_public_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs1::DecodeRsaPublicKey;
    use spki::DecodePublicKey;
    let pem_str = pem_text(pem_data)?;

    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_pem(pem_str) {
        return Ok(PublicKey::new(pk).into());
    }
    let pk = rsa::RsaPublicKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA public key PEM: {e}")))?;
    Ok(PublicKey::new(pk).into())
}

/// Load a certificate from PEM data.
pub fn load_certificate_pem(pem_data: &[u8]) -> Result<Key, Error> {
    let (label, der_bytes) = pem_rfc7468::decode_vec(pem_text(pem_data)?.trim().as_bytes())
        .map_err(|e| Error::Key(format!("failed to decode certificate PEM: {e}")))?;
    if label != "CERTIFICATE" {
        return Err(Error::Key(format!(
            "expected CERTIFICATE PEM label, got: {label}"
        )));
    }
    load_certificate_der(&der_bytes)
}

/// Load a certificate from DER data. Only RSA subject keys are supported.
pub fn load_certificate_der(data: &[u8]) -> Result<Key, Error> {
    use der::{Decode, Encode};
    use spki::DecodePublicKey;
    use x509_cert::Certificate;

    let cert = Certificate::from_der(data)
        .map_err(|e| Error::Key(format!("failed to parse X.509 certificate: {e}")))?;
    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Key(format!("failed to encode SPKI: {e}")))?;
    let public = rsa::RsaPublicKey::from_public_key_der(&spki_der).map_err(|e| {
        Error::Key(format!("unsupported public key algorithm in X.509 certificate: {e}"))
    })?;
    let subject = cert.tbs_certificate.subject.to_string();
    tracing::debug!(%subject, "loaded X.509 certificate");
    Ok(X509Certificate::new(data.to_vec(), subject, public).into())
}

/// Auto-detect the PEM block type by its label and load it.
pub fn load_pem_auto(pem_data: &[u8]) -> Result<Key, Error> {
    let pem_str = pem_text(pem_data)?.trim();
    let (label, _) = pem_rfc7468::decode_vec(pem_str.as_bytes())
        .map_err(|e| Error::Key(format!("failed to decode PEM: {e}")))?;
    match label {
        "PRIVATE KEY" | "RSA PRIVATE KEY" => load_private_pem(pem_str.as_bytes()),
        "PUBLIC KEY" | "RSA PUBLIC KEY" => load_public_pem(pem_str.as_bytes()),
        "CERTIFICATE" => load_certificate_pem(pem_str.as_bytes()),
        "ENCRYPTED PRIVATE KEY" => Err(Error::Key(
            "encrypted private keys are not supported".into(),
        )),
        other => Err(Error::Key(format!("unsupported PEM label: {other}"))),
    }
}

/// Load a DER blob: PKCS#8 or PKCS#1 private key, SubjectPublicKeyInfo, or
/// certificate.
pub fn load_der_auto(data: &[u8]) -> Result<Key, Error> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;
    use spki::DecodePublicKey;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(data) {
        return Ok(PrivateKey::new(pk).into());
    }
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs1_der(data) {
        return Ok(PrivateKey::new(pk).into());
    }
    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_der(data) {
        return Ok(PublicKey::new(pk).into());
    }
    if let Ok(key) = load_certificate_der(data) {
        return Ok(key);
    }
    Err(Error::Key("unable to auto-detect key format from DER data".into()))
}

/// Load an asymmetric key or certificate from a file, auto-detecting the
/// format.
pub fn load_key_file(path: &Path) -> Result<Key, Error> {
    let data = std::fs::read(path)?;
    tracing::debug!(path = %path.display(), "loading key file");

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if ext.eq_ignore_ascii_case("crt") || ext.eq_ignore_ascii_case("cer") {
        if data.starts_with(b"-----BEGIN") {
            return load_certificate_pem(&data);
        }
        return load_certificate_der(&data);
    }

    if data.starts_with(b"-----BEGIN") {
        return load_pem_auto(&data);
    }
    load_der_auto(&data).map_err(|_| {
        Error::Key(format!(
            "unable to auto-detect key format from file: {}",
            path.display()
        ))
    })
}

/// Load raw symmetric key bytes (HMAC secret, AES or 3DES key) from a file.
pub fn load_symmetric_key_file(path: &Path) -> Result<Key, Error> {
    let data = std::fs::read(path)?;
    Ok(SymmetricKey::new(data)?.into())
}

fn pem_text(pem_data: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(pem_data).map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))
}
