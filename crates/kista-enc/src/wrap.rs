#![forbid(unsafe_code)]

//! Hybrid encryption: a fresh session key encrypts the payload and is
//! itself wrapped for the recipient.
//!
//! The session key lives only for the duration of [`seal`] or [`open`].

use crate::encrypted::{
    Encrypted, EncryptedAttributes, EncryptedData, EncryptedKey, EncryptedKeyOptions,
};
use crate::method::EncryptionMethod;
use crate::reference_list::{EncReference, ReferenceList};
use kista_core::{ns, Error};
use kista_dsig::{KeyInfo, KeyInfoItem};
use kista_keys::Key;
use kista_xml::{Chunk, XmlWriter};

/// The output of [`seal`].
///
/// `data` also carries a copy of `key` inside its `<ds:KeyInfo>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub data: EncryptedData,
    pub key: EncryptedKey,
}

/// Encrypt `plaintext` under a new session key for `data_method` and wrap
/// that key for `recipient_key` with `key_method`.
pub fn seal(
    plaintext: &[u8],
    data_method: EncryptionMethod,
    key_method: EncryptionMethod,
    recipient_key: &Key,
) -> Result<Sealed, Error> {
    let session_key = kista_crypto::generate_symmetric_key(data_method.algorithm())?;
    let data_id = kista_crypto::generate_guid(None)?;

    let key_engine = key_method.engine(recipient_key)?;
    let options = EncryptedKeyOptions {
        reference_list: Some(ReferenceList::new(
            vec![EncReference::new(format!("#{data_id}"), vec![])?],
            vec![],
        )?),
        ..Default::default()
    };
    let key = EncryptedKey::from_key(&session_key, key_engine.as_ref(), key_method, options)?;

    let mut w = XmlWriter::new();
    key.to_xml(&mut w)?;
    let key_info = KeyInfo::new(None, vec![KeyInfoItem::Other(Chunk::parse(&w.into_string()?)?)])?;

    let data_engine = data_method.engine(&session_key)?;
    let attributes = EncryptedAttributes {
        id: Some(data_id),
        ..Default::default()
    };
    let data = EncryptedData::encrypt(
        plaintext,
        data_engine.as_ref(),
        data_method,
        Some(key_info),
        attributes,
    )?;
    tracing::debug!(id = data.id().unwrap_or(""), "sealed payload");
    Ok(Sealed { data, key })
}

/// Unwrap `key` with `recipient_key` and decrypt `data` with the result.
///
/// When the key lists the data it protects, `data` must be among them.
pub fn open(data: &EncryptedData, key: &EncryptedKey, recipient_key: &Key) -> Result<Vec<u8>, Error> {
    if let (Some(list), Some(id)) = (key.reference_list(), data.id()) {
        if !list.data_references().is_empty() && !list.references_data(id) {
            return Err(Error::InvalidArgument(format!(
                "EncryptedKey does not reference EncryptedData \"{id}\""
            )));
        }
    }
    let key_method = key
        .encryption_method()
        .ok_or_else(|| Error::MissingElement("EncryptionMethod in EncryptedKey".into()))?;
    let data_method = data
        .encryption_method()
        .ok_or_else(|| Error::MissingElement("EncryptionMethod in EncryptedData".into()))?;

    let key_engine = key_method.engine(recipient_key)?;
    let session_key = key.decrypt_key(key_engine.as_ref())?;
    let data_engine = data_method.engine(&session_key)?;
    data.decrypt(data_engine.as_ref())
}

/// [`open`] with the EncryptedKey taken from the data's own KeyInfo.
pub fn open_embedded(data: &EncryptedData, recipient_key: &Key) -> Result<Vec<u8>, Error> {
    let key = embedded_key(data)?;
    open(data, &key, recipient_key)
}

/// The single `<xenc:EncryptedKey>` inside the KeyInfo of `data`.
pub fn embedded_key(data: &EncryptedData) -> Result<EncryptedKey, Error> {
    let mut found = data
        .key_info()
        .map(|ki| ki.items())
        .unwrap_or_default()
        .iter()
        .filter_map(|item| match item {
            KeyInfoItem::Other(chunk)
                if chunk.namespace_uri() == Some(ns::ENC)
                    && chunk.local_name() == ns::node::ENCRYPTED_KEY =>
            {
                Some(chunk)
            }
            _ => None,
        });
    let chunk = found
        .next()
        .ok_or_else(|| Error::MissingElement("EncryptedKey in KeyInfo".into()))?;
    if found.next().is_some() {
        return Err(Error::TooManyElements("more than one EncryptedKey in KeyInfo".into()));
    }
    let doc = kista_xml::parse(chunk.as_str())?;
    EncryptedKey::from_xml(doc.root_element())
}
