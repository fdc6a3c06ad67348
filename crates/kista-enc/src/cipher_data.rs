#![forbid(unsafe_code)]

//! `<xenc:CipherData>`: literal ciphertext or a pointer to it.

use base64::Engine;
use kista_core::{ns, validate, Error};
use kista_xml::document::{
    child_elements, expect_element, optional_child, required_attribute, text_content,
};
use kista_xml::{Chunk, XmlWriter};
use roxmltree::Node;

/// `<xenc:CipherReference>`. The transform chain is carried verbatim;
/// retrieving the referenced ciphertext is not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherReference {
    uri: String,
    transforms: Option<Chunk>,
}

impl CipherReference {
    pub fn new(uri: impl Into<String>, transforms: Option<Chunk>) -> Result<Self, Error> {
        let uri = uri.into();
        validate::valid_uri(&uri)?;
        Ok(Self { uri, transforms })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn transforms(&self) -> Option<&Chunk> {
        self.transforms.as_ref()
    }
}

/// Exactly one of CipherValue or CipherReference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherData {
    /// Decoded `<xenc:CipherValue>` bytes.
    Value(Vec<u8>),
    Reference(CipherReference),
}

impl CipherData {
    /// The literal ciphertext, if carried inline.
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Self::Value(v) => Some(v),
            Self::Reference(_) => None,
        }
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::ENC, ns::node::CIPHER_DATA)?;
        let value = optional_child(node, ns::ENC, ns::node::CIPHER_VALUE)?;
        let reference = optional_child(node, ns::ENC, ns::node::CIPHER_REFERENCE)?;
        match (value, reference) {
            (Some(v), None) => Ok(Self::Value(validate::decode_base64(&text_content(v))?)),
            (None, Some(r)) => {
                let transforms = child_elements(r).next().map(Chunk::from_node).transpose()?;
                Ok(Self::Reference(CipherReference::new(
                    required_attribute(r, ns::attr::URI)?,
                    transforms,
                )?))
            }
            (Some(_), Some(_)) => Err(Error::TooManyElements(
                "CipherData holds both CipherValue and CipherReference".into(),
            )),
            (None, None) => Err(Error::MissingElement(
                "CipherValue or CipherReference in CipherData".into(),
            )),
        }
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::ENC, ns::prefix::ENC, ns::node::CIPHER_DATA)?;
        match self {
            Self::Value(bytes) => {
                let value = base64::engine::general_purpose::STANDARD.encode(bytes);
                w.text_element(ns::ENC, ns::prefix::ENC, ns::node::CIPHER_VALUE, &value)?;
            }
            Self::Reference(r) => {
                w.start_element(ns::ENC, ns::prefix::ENC, ns::node::CIPHER_REFERENCE)?;
                w.attribute(ns::attr::URI, &r.uri)?;
                if let Some(transforms) = &r.transforms {
                    w.raw(transforms.as_str())?;
                }
                w.end_element()?;
            }
        }
        w.end_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kista_core::ErrorKind;

    fn parse(body: &str) -> Result<CipherData, Error> {
        let xml = format!(
            r#"<xenc:CipherData xmlns:xenc="{}">{body}</xenc:CipherData>"#,
            ns::ENC
        );
        let doc = kista_xml::parse(&xml).unwrap();
        CipherData::from_xml(doc.root_element())
    }

    fn reserialize(data: &CipherData) -> CipherData {
        let mut w = XmlWriter::new();
        data.to_xml(&mut w).unwrap();
        let xml = w.into_string().unwrap();
        let doc = kista_xml::parse(&xml).unwrap();
        CipherData::from_xml(doc.root_element()).unwrap()
    }

    #[test]
    fn test_value() {
        let data = parse("<xenc:CipherValue>\n  AQID\n</xenc:CipherValue>").unwrap();
        assert_eq!(data.value(), Some(&[1u8, 2, 3][..]));
        assert_eq!(reserialize(&data), data);
    }

    #[test]
    fn test_reference_keeps_transforms() {
        let data = parse(
            r#"<xenc:CipherReference URI="http://example.com/ct"><xenc:Transforms><t xmlns="urn:t"/></xenc:Transforms></xenc:CipherReference>"#,
        )
        .unwrap();
        let CipherData::Reference(r) = &data else {
            panic!("expected a reference");
        };
        assert_eq!(r.uri(), "http://example.com/ct");
        assert_eq!(r.transforms().unwrap().local_name(), "Transforms");
        assert_eq!(data.value(), None);
        assert_eq!(reserialize(&data), data);
    }

    #[test]
    fn test_cardinality() {
        assert_eq!(parse("").unwrap_err().kind(), ErrorKind::MissingElement);
        let err = parse(r##"<xenc:CipherValue>AQID</xenc:CipherValue><xenc:CipherReference URI="#x"/>"##)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyElements);
        let err = parse("<xenc:CipherValue>AQ</xenc:CipherValue><xenc:CipherValue>AQ</xenc:CipherValue>")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyElements);
        let err = parse("<xenc:CipherValue>%%%</xenc:CipherValue>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }
}
