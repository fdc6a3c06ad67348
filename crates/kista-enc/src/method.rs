#![forbid(unsafe_code)]

//! `<xenc:EncryptionMethod>`.

use kista_core::{algorithm, ns, validate, Error};
use kista_crypto::EncryptionAlgorithm;
use kista_keys::Key;
use kista_xml::document::{child_elements, expect_element, is_named, required_attribute, text_content};
use kista_xml::{Chunk, XmlWriter};
use roxmltree::Node;

/// An encryption algorithm with its optional `KeySize` and `OAEPparams`.
///
/// Children other than those two are kept as [`Chunk`]s, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionMethod {
    algorithm: String,
    key_size: Option<u64>,
    oaep_params: Option<String>,
    children: Vec<Chunk>,
}

impl EncryptionMethod {
    pub fn new(
        algorithm: impl Into<String>,
        key_size: Option<u64>,
        oaep_params: Option<String>,
        children: Vec<Chunk>,
    ) -> Result<Self, Error> {
        let algorithm = algorithm.into();
        validate::valid_uri(&algorithm)?;
        if !algorithm::is_encryption(&algorithm) {
            return Err(Error::UnsupportedAlgorithm(format!(
                "encryption method: {algorithm}"
            )));
        }
        if let Some(params) = &oaep_params {
            validate::valid_base64(params)?;
        }
        Ok(Self {
            algorithm,
            key_size,
            oaep_params,
            children,
        })
    }

    /// A method with only an algorithm.
    pub fn with_algorithm(algorithm: impl Into<String>) -> Result<Self, Error> {
        Self::new(algorithm, None, None, Vec::new())
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Key size in bits.
    pub fn key_size(&self) -> Option<u64> {
        self.key_size
    }

    /// The base64 `OAEPparams` text.
    pub fn oaep_params(&self) -> Option<&str> {
        self.oaep_params.as_deref()
    }

    /// The decoded OAEP label.
    pub fn oaep_label(&self) -> Result<Option<Vec<u8>>, Error> {
        self.oaep_params
            .as_deref()
            .map(validate::decode_base64)
            .transpose()
    }

    pub fn children(&self) -> &[Chunk] {
        &self.children
    }

    /// Create the engine this method describes, bound to `key`.
    ///
    /// A declared `KeySize` must match the length of a symmetric key.
    pub fn engine(&self, key: &Key) -> Result<Box<dyn EncryptionAlgorithm>, Error> {
        if let (Some(bits), Some(bytes)) = (self.key_size, key.symmetric_bytes()) {
            if bits != bytes.len() as u64 * 8 {
                return Err(Error::Key(format!(
                    "KeySize {bits} does not match a {} bit key",
                    bytes.len() * 8
                )));
            }
        }
        let label = self.oaep_label()?;
        kista_crypto::encryption::from_uri_with_oaep(&self.algorithm, key, label.as_deref())
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::ENC, ns::node::ENCRYPTION_METHOD)?;
        let algorithm = required_attribute(node, ns::attr::ALGORITHM)?;

        let mut key_size = None;
        let mut oaep_params = None;
        let mut children = Vec::new();
        for child in child_elements(node) {
            if is_named(child, ns::ENC, ns::node::KEY_SIZE) {
                if key_size.is_some() {
                    return Err(Error::TooManyElements(
                        "KeySize cannot be set more than once".into(),
                    ));
                }
                key_size = Some(validate::valid_non_negative_int(&text_content(child))?);
            } else if is_named(child, ns::ENC, ns::node::OAEP_PARAMS) {
                if oaep_params.is_some() {
                    return Err(Error::TooManyElements(
                        "OAEPparams cannot be set more than once".into(),
                    ));
                }
                oaep_params = Some(text_content(child).trim().to_owned());
            } else {
                children.push(Chunk::from_node(child)?);
            }
        }
        Self::new(algorithm, key_size, oaep_params, children)
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::ENC, ns::prefix::ENC, ns::node::ENCRYPTION_METHOD)?;
        w.attribute(ns::attr::ALGORITHM, &self.algorithm)?;
        if let Some(size) = self.key_size {
            w.text_element(ns::ENC, ns::prefix::ENC, ns::node::KEY_SIZE, &size.to_string())?;
        }
        if let Some(params) = &self.oaep_params {
            w.text_element(ns::ENC, ns::prefix::ENC, ns::node::OAEP_PARAMS, params)?;
        }
        for child in &self.children {
            w.raw(child.as_str())?;
        }
        w.end_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kista_core::ErrorKind;
    use kista_keys::SymmetricKey;

    fn parse(body: &str) -> Result<EncryptionMethod, Error> {
        let xml = format!(
            r#"<xenc:EncryptionMethod xmlns:xenc="{}" xmlns:ds="{}" Algorithm="{}">{body}</xenc:EncryptionMethod>"#,
            ns::ENC,
            ns::DSIG,
            algorithm::RSA_OAEP
        );
        let doc = kista_xml::parse(&xml).unwrap();
        EncryptionMethod::from_xml(doc.root_element())
    }

    #[test]
    fn test_parse_and_round_trip() {
        let method = parse(
            r#"<xenc:KeySize>2048</xenc:KeySize><xenc:OAEPparams> bGFiZWw= </xenc:OAEPparams><ds:DigestMethod Algorithm="http://www.w3.org/2000/09/xmldsig#sha1"/><other xmlns="urn:x">1</other>"#,
        )
        .unwrap();
        assert_eq!(method.key_size(), Some(2048));
        assert_eq!(method.oaep_params(), Some("bGFiZWw="));
        assert_eq!(method.oaep_label().unwrap(), Some(b"label".to_vec()));
        assert_eq!(method.children().len(), 2);
        assert_eq!(method.children()[0].local_name(), "DigestMethod");
        assert_eq!(method.children()[1].namespace_uri(), Some("urn:x"));

        let mut w = XmlWriter::new();
        method.to_xml(&mut w).unwrap();
        let xml = w.into_string().unwrap();
        let doc = kista_xml::parse(&xml).unwrap();
        assert_eq!(EncryptionMethod::from_xml(doc.root_element()).unwrap(), method);
    }

    #[test]
    fn test_repeated_children_rejected() {
        let err = parse("<xenc:KeySize>128</xenc:KeySize><xenc:KeySize>256</xenc:KeySize>")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyElements);
        let err = parse("<xenc:OAEPparams>YQ==</xenc:OAEPparams><xenc:OAEPparams>Yg==</xenc:OAEPparams>")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyElements);
    }

    #[test]
    fn test_invalid_values() {
        let err = parse("<xenc:KeySize>-1</xenc:KeySize>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        let err = parse("<xenc:OAEPparams>not*base64</xenc:OAEPparams>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        let err = EncryptionMethod::with_algorithm("bad uri").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        let err = EncryptionMethod::with_algorithm(algorithm::SHA256).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_engine_checks_key_size() {
        let key: Key = SymmetricKey::new(vec![1u8; 16]).unwrap().into();
        let method = EncryptionMethod::new(algorithm::AES128_CBC, Some(128), None, vec![]).unwrap();
        assert_eq!(method.engine(&key).unwrap().algorithm_id(), algorithm::AES128_CBC);
        let method = EncryptionMethod::new(algorithm::AES128_CBC, Some(256), None, vec![]).unwrap();
        assert_eq!(method.engine(&key).err().unwrap().kind(), ErrorKind::InvalidArgument);
    }
}
