#![forbid(unsafe_code)]

//! `<xenc:ReferenceList>`: the items an EncryptedKey was used for.

use kista_core::{ns, validate, Error};
use kista_xml::document::{child_elements, expect_element, is_named, required_attribute};
use kista_xml::{Chunk, XmlWriter};
use roxmltree::Node;

/// A `<xenc:DataReference>` or `<xenc:KeyReference>`: a URI plus any
/// extension children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncReference {
    uri: String,
    elements: Vec<Chunk>,
}

impl EncReference {
    pub fn new(uri: impl Into<String>, elements: Vec<Chunk>) -> Result<Self, Error> {
        let uri = uri.into();
        validate::valid_uri(&uri)?;
        Ok(Self { uri, elements })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn elements(&self) -> &[Chunk] {
        &self.elements
    }

    fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        let elements = child_elements(node)
            .map(Chunk::from_node)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(required_attribute(node, ns::attr::URI)?, elements)
    }

    fn to_xml(&self, w: &mut XmlWriter, local: &str) -> Result<(), Error> {
        w.start_element(ns::ENC, ns::prefix::ENC, local)?;
        w.attribute(ns::attr::URI, &self.uri)?;
        for elt in &self.elements {
            w.raw(elt.as_str())?;
        }
        w.end_element()
    }
}

/// Data and key references. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceList {
    data_references: Vec<EncReference>,
    key_references: Vec<EncReference>,
}

impl ReferenceList {
    pub fn new(
        data_references: Vec<EncReference>,
        key_references: Vec<EncReference>,
    ) -> Result<Self, Error> {
        if data_references.is_empty() && key_references.is_empty() {
            return Err(Error::MissingElement(
                "DataReference or KeyReference in ReferenceList".into(),
            ));
        }
        Ok(Self {
            data_references,
            key_references,
        })
    }

    pub fn data_references(&self) -> &[EncReference] {
        &self.data_references
    }

    pub fn key_references(&self) -> &[EncReference] {
        &self.key_references
    }

    /// Whether some DataReference points at `#id`.
    pub fn references_data(&self, id: &str) -> bool {
        self.data_references
            .iter()
            .any(|r| r.uri.strip_prefix('#') == Some(id))
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::ENC, ns::node::REFERENCE_LIST)?;
        let mut data = Vec::new();
        let mut keys = Vec::new();
        for child in child_elements(node) {
            if is_named(child, ns::ENC, ns::node::DATA_REFERENCE) {
                data.push(EncReference::from_xml(child)?);
            } else if is_named(child, ns::ENC, ns::node::KEY_REFERENCE) {
                keys.push(EncReference::from_xml(child)?);
            }
        }
        Self::new(data, keys)
    }

    /// DataReferences are written before KeyReferences.
    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::ENC, ns::prefix::ENC, ns::node::REFERENCE_LIST)?;
        for r in &self.data_references {
            r.to_xml(w, ns::node::DATA_REFERENCE)?;
        }
        for r in &self.key_references {
            r.to_xml(w, ns::node::KEY_REFERENCE)?;
        }
        w.end_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kista_core::ErrorKind;

    #[test]
    fn test_round_trip_orders_data_first() {
        let xml = format!(
            r##"<xenc:ReferenceList xmlns:xenc="{}"><xenc:KeyReference URI="#k1"/><xenc:DataReference URI="#d1"><x xmlns="urn:x"/></xenc:DataReference></xenc:ReferenceList>"##,
            ns::ENC
        );
        let doc = kista_xml::parse(&xml).unwrap();
        let list = ReferenceList::from_xml(doc.root_element()).unwrap();
        assert_eq!(list.data_references()[0].uri(), "#d1");
        assert_eq!(list.data_references()[0].elements().len(), 1);
        assert_eq!(list.key_references()[0].uri(), "#k1");
        assert!(list.references_data("d1"));
        assert!(!list.references_data("k1"));

        let mut w = XmlWriter::new();
        list.to_xml(&mut w).unwrap();
        let out = w.into_string().unwrap();
        assert!(out.find("DataReference").unwrap() < out.find("KeyReference").unwrap());
        let doc = kista_xml::parse(&out).unwrap();
        assert_eq!(ReferenceList::from_xml(doc.root_element()).unwrap(), list);
    }

    #[test]
    fn test_empty_list_rejected() {
        assert_eq!(
            ReferenceList::new(vec![], vec![]).unwrap_err().kind(),
            ErrorKind::MissingElement
        );
        let xml = format!(r#"<xenc:ReferenceList xmlns:xenc="{}"/>"#, ns::ENC);
        let doc = kista_xml::parse(&xml).unwrap();
        let err = ReferenceList::from_xml(doc.root_element()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingElement);
    }

    #[test]
    fn test_uri_required() {
        let xml = format!(
            r#"<xenc:ReferenceList xmlns:xenc="{}"><xenc:DataReference/></xenc:ReferenceList>"#,
            ns::ENC
        );
        let doc = kista_xml::parse(&xml).unwrap();
        let err = ReferenceList::from_xml(doc.root_element()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingElement);
    }
}
