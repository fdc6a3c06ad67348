#![forbid(unsafe_code)]

//! `<xenc:EncryptedData>` and `<xenc:EncryptedKey>`.
//!
//! Both share the content model of the abstract `EncryptedType`, held here
//! as [`EncryptedType`] and exposed through the [`Encrypted`] trait.

use crate::cipher_data::CipherData;
use crate::method::EncryptionMethod;
use crate::reference_list::ReferenceList;
use kista_core::{ns, validate, Error};
use kista_crypto::EncryptionAlgorithm;
use kista_dsig::KeyInfo;
use kista_keys::{Key, SymmetricKey};
use kista_xml::document::{expect_element, optional_child, required_child, text_content};
use kista_xml::XmlWriter;
use roxmltree::Node;

/// The optional attributes common to encrypted elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedAttributes {
    pub id: Option<String>,
    pub type_: Option<String>,
    pub mime_type: Option<String>,
    pub encoding: Option<String>,
}

impl EncryptedAttributes {
    fn validate(&self) -> Result<(), Error> {
        if let Some(id) = &self.id {
            validate::valid_ncname(id)?;
        }
        if let Some(t) = &self.type_ {
            validate::valid_uri(t)?;
        }
        if let Some(m) = &self.mime_type {
            validate::valid_mime_type(m)?;
        }
        if let Some(e) = &self.encoding {
            validate::valid_uri(e)?;
        }
        Ok(())
    }

    fn from_xml(node: Node<'_, '_>) -> Self {
        let get = |name: &str| node.attribute(name).map(str::to_owned);
        Self {
            id: get(ns::attr::ID),
            type_: get(ns::attr::TYPE),
            mime_type: get(ns::attr::MIME_TYPE),
            encoding: get(ns::attr::ENCODING),
        }
    }

    fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.optional_attribute(ns::attr::ID, self.id.as_deref())?;
        w.optional_attribute(ns::attr::TYPE, self.type_.as_deref())?;
        w.optional_attribute(ns::attr::MIME_TYPE, self.mime_type.as_deref())?;
        w.optional_attribute(ns::attr::ENCODING, self.encoding.as_deref())
    }
}

/// The content model shared by EncryptedData and EncryptedKey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedType {
    attributes: EncryptedAttributes,
    encryption_method: Option<EncryptionMethod>,
    key_info: Option<KeyInfo>,
    cipher_data: CipherData,
}

impl EncryptedType {
    pub fn new(
        cipher_data: CipherData,
        encryption_method: Option<EncryptionMethod>,
        key_info: Option<KeyInfo>,
        attributes: EncryptedAttributes,
    ) -> Result<Self, Error> {
        attributes.validate()?;
        Ok(Self {
            attributes,
            encryption_method,
            key_info,
            cipher_data,
        })
    }

    fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        let encryption_method = optional_child(node, ns::ENC, ns::node::ENCRYPTION_METHOD)?
            .map(EncryptionMethod::from_xml)
            .transpose()?;
        let key_info = optional_child(node, ns::DSIG, ns::node::KEY_INFO)?
            .map(KeyInfo::from_xml)
            .transpose()?;
        let cipher_data =
            CipherData::from_xml(required_child(node, ns::ENC, ns::node::CIPHER_DATA)?)?;
        Self::new(
            cipher_data,
            encryption_method,
            key_info,
            EncryptedAttributes::from_xml(node),
        )
    }

    fn write_children(&self, w: &mut XmlWriter) -> Result<(), Error> {
        if let Some(method) = &self.encryption_method {
            method.to_xml(w)?;
        }
        if let Some(key_info) = &self.key_info {
            key_info.to_xml(w)?;
        }
        self.cipher_data.to_xml(w)
    }

    /// Decrypt the literal CipherValue with `engine`.
    ///
    /// The engine must implement the declared EncryptionMethod; this is
    /// checked before any cryptographic work.
    fn decrypt(&self, engine: &dyn EncryptionAlgorithm) -> Result<Vec<u8>, Error> {
        let Some(ciphertext) = self.cipher_data.value() else {
            tracing::warn!("refusing to decrypt a CipherReference");
            return Err(Error::InvalidArgument(
                "decrypting by reference is not supported".into(),
            ));
        };
        let method = self
            .encryption_method
            .as_ref()
            .ok_or_else(|| Error::MissingElement("EncryptionMethod".into()))?;
        if engine.algorithm_id() != method.algorithm() {
            return Err(Error::InvalidArgument(format!(
                "algorithm mismatch: element uses {}, engine implements {}",
                method.algorithm(),
                engine.algorithm_id()
            )));
        }
        let plaintext = engine.decrypt(ciphertext)?;
        tracing::debug!(algorithm = method.algorithm(), len = plaintext.len(), "decrypted");
        Ok(plaintext)
    }
}

/// Read access to the shared encrypted-element content.
pub trait Encrypted {
    fn encrypted_type(&self) -> &EncryptedType;

    fn id(&self) -> Option<&str> {
        self.encrypted_type().attributes.id.as_deref()
    }

    fn type_(&self) -> Option<&str> {
        self.encrypted_type().attributes.type_.as_deref()
    }

    fn mime_type(&self) -> Option<&str> {
        self.encrypted_type().attributes.mime_type.as_deref()
    }

    fn encoding(&self) -> Option<&str> {
        self.encrypted_type().attributes.encoding.as_deref()
    }

    fn encryption_method(&self) -> Option<&EncryptionMethod> {
        self.encrypted_type().encryption_method.as_ref()
    }

    fn key_info(&self) -> Option<&KeyInfo> {
        self.encrypted_type().key_info.as_ref()
    }

    fn cipher_data(&self) -> &CipherData {
        &self.encrypted_type().cipher_data
    }
}

/// Encrypted content: an element, element content or arbitrary octets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    inner: EncryptedType,
}

impl Encrypted for EncryptedData {
    fn encrypted_type(&self) -> &EncryptedType {
        &self.inner
    }
}

impl EncryptedData {
    pub fn new(inner: EncryptedType) -> Self {
        Self { inner }
    }

    /// Encrypt `plaintext` with `engine`, which must implement `method`.
    pub fn encrypt(
        plaintext: &[u8],
        engine: &dyn EncryptionAlgorithm,
        method: EncryptionMethod,
        key_info: Option<KeyInfo>,
        attributes: EncryptedAttributes,
    ) -> Result<Self, Error> {
        check_engine(engine, &method)?;
        let ciphertext = engine.encrypt(plaintext)?;
        Ok(Self::new(EncryptedType::new(
            CipherData::Value(ciphertext),
            Some(method),
            key_info,
            attributes,
        )?))
    }

    pub fn decrypt(&self, engine: &dyn EncryptionAlgorithm) -> Result<Vec<u8>, Error> {
        self.inner.decrypt(engine)
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::ENC, ns::node::ENCRYPTED_DATA)?;
        EncryptedType::from_xml(node).map(Self::new)
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::ENC, ns::prefix::ENC, ns::node::ENCRYPTED_DATA)?;
        self.inner.attributes.to_xml(w)?;
        self.inner.write_children(w)?;
        w.end_element()
    }
}

/// Everything of an EncryptedKey besides its method and ciphertext.
#[derive(Debug, Clone, Default)]
pub struct EncryptedKeyOptions {
    pub attributes: EncryptedAttributes,
    pub key_info: Option<KeyInfo>,
    pub recipient: Option<String>,
    pub carried_key_name: Option<String>,
    pub reference_list: Option<ReferenceList>,
}

/// An encrypted key, usually wrapped under a recipient's public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedKey {
    inner: EncryptedType,
    recipient: Option<String>,
    carried_key_name: Option<String>,
    reference_list: Option<ReferenceList>,
}

impl Encrypted for EncryptedKey {
    fn encrypted_type(&self) -> &EncryptedType {
        &self.inner
    }
}

impl EncryptedKey {
    pub fn new(
        inner: EncryptedType,
        recipient: Option<String>,
        carried_key_name: Option<String>,
        reference_list: Option<ReferenceList>,
    ) -> Self {
        Self {
            inner,
            recipient,
            carried_key_name,
            reference_list,
        }
    }

    /// Encrypt the raw material of `key` with `engine`, which must
    /// implement `method`.
    pub fn from_key(
        key: &Key,
        engine: &dyn EncryptionAlgorithm,
        method: EncryptionMethod,
        options: EncryptedKeyOptions,
    ) -> Result<Self, Error> {
        check_engine(engine, &method)?;
        let ciphertext = engine.encrypt(&key.bytes()?)?;
        let inner = EncryptedType::new(
            CipherData::Value(ciphertext),
            Some(method),
            options.key_info,
            options.attributes,
        )?;
        Ok(Self::new(
            inner,
            options.recipient,
            options.carried_key_name,
            options.reference_list,
        ))
    }

    /// Recover the raw key bytes.
    ///
    /// A key carried by CipherReference is refused, as is an engine that
    /// does not implement the declared EncryptionMethod.
    pub fn decrypt(&self, engine: &dyn EncryptionAlgorithm) -> Result<Vec<u8>, Error> {
        self.inner.decrypt(engine)
    }

    /// [`decrypt`](Self::decrypt) into a symmetric key.
    pub fn decrypt_key(&self, engine: &dyn EncryptionAlgorithm) -> Result<Key, Error> {
        Ok(SymmetricKey::new(self.decrypt(engine)?)?.into())
    }

    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    pub fn carried_key_name(&self) -> Option<&str> {
        self.carried_key_name.as_deref()
    }

    pub fn reference_list(&self) -> Option<&ReferenceList> {
        self.reference_list.as_ref()
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::ENC, ns::node::ENCRYPTED_KEY)?;
        let inner = EncryptedType::from_xml(node)?;
        let reference_list = optional_child(node, ns::ENC, ns::node::REFERENCE_LIST)?
            .map(ReferenceList::from_xml)
            .transpose()?;
        let carried_key_name = optional_child(node, ns::ENC, ns::node::CARRIED_KEY_NAME)?
            .map(|n| text_content(n).trim().to_owned());
        Ok(Self::new(
            inner,
            node.attribute(ns::attr::RECIPIENT).map(str::to_owned),
            carried_key_name,
            reference_list,
        ))
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::ENC, ns::prefix::ENC, ns::node::ENCRYPTED_KEY)?;
        self.inner.attributes.to_xml(w)?;
        w.optional_attribute(ns::attr::RECIPIENT, self.recipient.as_deref())?;
        self.inner.write_children(w)?;
        if let Some(list) = &self.reference_list {
            list.to_xml(w)?;
        }
        if let Some(name) = &self.carried_key_name {
            w.text_element(ns::ENC, ns::prefix::ENC, ns::node::CARRIED_KEY_NAME, name)?;
        }
        w.end_element()
    }
}

fn check_engine(engine: &dyn EncryptionAlgorithm, method: &EncryptionMethod) -> Result<(), Error> {
    if engine.algorithm_id() == method.algorithm() {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "engine implements {}, method declares {}",
            engine.algorithm_id(),
            method.algorithm()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher_data::CipherReference;
    use crate::reference_list::EncReference;
    use kista_core::{algorithm, ErrorKind};
    use kista_keys::PrivateKey;
    use std::sync::OnceLock;

    fn rsa_key() -> &'static Key {
        static KEY: OnceLock<Key> = OnceLock::new();
        KEY.get_or_init(|| {
            let rsa = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
            PrivateKey::new(rsa).into()
        })
    }

    fn aes_key() -> Key {
        SymmetricKey::new(vec![7u8; 16]).unwrap().into()
    }

    fn method(uri: &str) -> EncryptionMethod {
        EncryptionMethod::with_algorithm(uri).unwrap()
    }

    fn to_string<F: FnOnce(&mut XmlWriter) -> Result<(), Error>>(f: F) -> String {
        let mut w = XmlWriter::new();
        f(&mut w).unwrap();
        w.into_string().unwrap()
    }

    #[test]
    fn test_encrypted_data_round_trip() {
        let key = aes_key();
        let m = method(algorithm::AES128_CBC);
        let engine = m.engine(&key).unwrap();
        let attributes = EncryptedAttributes {
            id: Some("ed-1".into()),
            type_: Some(ns::ENC_TYPE_CONTENT.into()),
            mime_type: Some("text/plain".into()),
            encoding: None,
        };
        let data = EncryptedData::encrypt(
            b"secret payload",
            engine.as_ref(),
            m,
            Some(KeyInfo::with_key_name("k")),
            attributes,
        )
        .unwrap();

        let xml = to_string(|w| data.to_xml(w));
        let doc = kista_xml::parse(&xml).unwrap();
        let parsed = EncryptedData::from_xml(doc.root_element()).unwrap();
        assert_eq!(parsed, data);
        assert_eq!(parsed.id(), Some("ed-1"));
        assert_eq!(parsed.mime_type(), Some("text/plain"));
        assert_eq!(parsed.key_info().unwrap().key_name(), Some("k"));
        assert_eq!(parsed.decrypt(engine.as_ref()).unwrap(), b"secret payload");
    }

    #[test]
    fn test_encrypted_key_wrap_and_unwrap() {
        let m = method(algorithm::RSA_OAEP);
        let engine = m.engine(rsa_key()).unwrap();
        let options = EncryptedKeyOptions {
            attributes: EncryptedAttributes {
                id: Some("ek-1".into()),
                ..Default::default()
            },
            recipient: Some("bob".into()),
            carried_key_name: Some("session".into()),
            reference_list: Some(
                ReferenceList::new(vec![EncReference::new("#ed-1", vec![]).unwrap()], vec![])
                    .unwrap(),
            ),
            ..Default::default()
        };
        let key = EncryptedKey::from_key(&aes_key(), engine.as_ref(), m, options).unwrap();

        let xml = to_string(|w| key.to_xml(w));
        let recipient = xml.find("Recipient=").unwrap();
        assert!(xml.find("Id=").unwrap() < recipient);
        let cipher_data = xml.find("CipherData").unwrap();
        assert!(cipher_data < xml.find("ReferenceList").unwrap());
        assert!(xml.find("ReferenceList").unwrap() < xml.find("CarriedKeyName").unwrap());

        let doc = kista_xml::parse(&xml).unwrap();
        let parsed = EncryptedKey::from_xml(doc.root_element()).unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.recipient(), Some("bob"));
        assert_eq!(parsed.carried_key_name(), Some("session"));
        assert!(parsed.reference_list().unwrap().references_data("ed-1"));
        assert_eq!(parsed.decrypt(engine.as_ref()).unwrap(), vec![7u8; 16]);
        assert_eq!(
            parsed.decrypt_key(engine.as_ref()).unwrap().symmetric_bytes(),
            Some(&[7u8; 16][..])
        );
    }

    #[test]
    fn test_algorithm_mismatch_rejected() {
        let oaep = method(algorithm::RSA_OAEP);
        let engine = oaep.engine(rsa_key()).unwrap();
        let key = EncryptedKey::from_key(&aes_key(), engine.as_ref(), oaep, Default::default())
            .unwrap();

        let pkcs1 = method(algorithm::RSA_PKCS1).engine(rsa_key()).unwrap();
        let err = key.decrypt(pkcs1.as_ref()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = EncryptedKey::from_key(
            &aes_key(),
            pkcs1.as_ref(),
            method(algorithm::RSA_OAEP),
            Default::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_cipher_reference_not_decrypted() {
        let inner = EncryptedType::new(
            CipherData::Reference(CipherReference::new("http://example.com/key", None).unwrap()),
            Some(method(algorithm::RSA_OAEP)),
            None,
            EncryptedAttributes::default(),
        )
        .unwrap();
        let key = EncryptedKey::new(inner, None, None, None);
        let engine = method(algorithm::RSA_OAEP).engine(rsa_key()).unwrap();
        assert_eq!(
            key.decrypt(engine.as_ref()).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_missing_method_on_decrypt() {
        let inner = EncryptedType::new(
            CipherData::Value(vec![0; 32]),
            None,
            None,
            EncryptedAttributes::default(),
        )
        .unwrap();
        let engine = method(algorithm::AES128_CBC).engine(&aes_key()).unwrap();
        let err = EncryptedData::new(inner).decrypt(engine.as_ref()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingElement);
    }

    #[test]
    fn test_structure_checks() {
        let xml = format!(r#"<xenc:EncryptedData xmlns:xenc="{}"/>"#, ns::ENC);
        let doc = kista_xml::parse(&xml).unwrap();
        let err = EncryptedData::from_xml(doc.root_element()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingElement);

        let xml = format!(
            r#"<xenc:EncryptedKey xmlns:xenc="{0}"><xenc:CipherData><xenc:CipherValue>AQID</xenc:CipherValue></xenc:CipherData><xenc:CarriedKeyName>a</xenc:CarriedKeyName><xenc:CarriedKeyName>b</xenc:CarriedKeyName></xenc:EncryptedKey>"#,
            ns::ENC
        );
        let doc = kista_xml::parse(&xml).unwrap();
        let err = EncryptedKey::from_xml(doc.root_element()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyElements);

        let err = EncryptedType::new(
            CipherData::Value(vec![]),
            None,
            None,
            EncryptedAttributes {
                id: Some("not an id".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);

        let mime = |mime_type: &str| {
            EncryptedType::new(
                CipherData::Value(vec![1]),
                None,
                None,
                EncryptedAttributes {
                    mime_type: Some(mime_type.into()),
                    ..Default::default()
                },
            )
        };
        assert!(mime("text/xml").is_ok());
        assert_eq!(mime("not a type").unwrap_err().kind(), ErrorKind::SchemaViolation);

        let xml = format!(
            r#"<xenc:EncryptedData xmlns:xenc="{0}"/>"#,
            ns::DSIG
        );
        let doc = kista_xml::parse(&xml).unwrap();
        assert!(EncryptedData::from_xml(doc.root_element()).is_err());
    }
}
