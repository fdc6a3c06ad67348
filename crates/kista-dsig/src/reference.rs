#![forbid(unsafe_code)]

//! `<ds:Reference>` and same-document dereferencing.

use crate::method::DigestMethod;
use base64::Engine;
use kista_core::{ns, validate, Error};
use kista_transforms::Transforms;
use kista_xml::document::{expect_element, optional_child, required_child, text_content};
use kista_xml::xpath::parse_same_document_ref;
use kista_xml::XmlWriter;
use roxmltree::{Document, Node, NodeId};
use std::collections::HashMap;

/// A pointer to signed content with its transform chain and digest.
///
/// The stored digest value is only ever compared against a recomputed one;
/// verification never overwrites it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    id: Option<String>,
    uri: Option<String>,
    type_: Option<String>,
    transforms: Transforms,
    digest_method: DigestMethod,
    digest_value: Vec<u8>,
}

impl Reference {
    pub fn new(
        uri: Option<String>,
        transforms: Transforms,
        digest_method: DigestMethod,
        digest_value: Vec<u8>,
    ) -> Result<Self, Error> {
        if let Some(uri) = &uri {
            validate::valid_uri(uri)?;
        }
        Ok(Self {
            id: None,
            uri,
            type_: None,
            transforms,
            digest_method,
            digest_value,
        })
    }

    /// Set the `Id` and `Type` attributes.
    pub fn with_attributes(mut self, id: Option<String>, type_: Option<String>) -> Result<Self, Error> {
        if let Some(id) = &id {
            validate::valid_ncname(id)?;
        }
        if let Some(t) = &type_ {
            validate::valid_uri(t)?;
        }
        self.id = id;
        self.type_ = type_;
        Ok(self)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn type_(&self) -> Option<&str> {
        self.type_.as_deref()
    }

    pub fn transforms(&self) -> &Transforms {
        &self.transforms
    }

    pub fn digest_method(&self) -> &DigestMethod {
        &self.digest_method
    }

    pub fn digest_value(&self) -> &[u8] {
        &self.digest_value
    }

    /// Find the element this Reference points at.
    ///
    /// `""` (or no URI) is the document element; `#id` is the element
    /// registered under `id` in `id_map`. Anything else is refused.
    pub fn dereference<'a, 'input>(
        &self,
        doc: &'a Document<'input>,
        id_map: &HashMap<String, NodeId>,
    ) -> Result<Node<'a, 'input>, Error> {
        let uri = self.uri.as_deref().unwrap_or("");
        if uri.is_empty() {
            return Ok(doc.root_element());
        }
        let Some(id) = parse_same_document_ref(uri) else {
            return Err(Error::InvalidArgument(format!(
                "only same-document references are supported: {uri}"
            )));
        };
        if id.starts_with("xpointer(") {
            return Err(Error::InvalidArgument(format!(
                "XPointer references are not supported: {uri}"
            )));
        }
        id_map
            .get(id)
            .and_then(|node_id| doc.get_node(*node_id))
            .ok_or_else(|| Error::MissingElement(format!("no element with ID \"{id}\"")))
    }

    /// The canonical bytes the digest covers.
    ///
    /// `signature` is the enclosing `<ds:Signature>`, needed by the
    /// enveloped-signature transform.
    pub fn canonicalize(
        &self,
        doc: &Document<'_>,
        signature: Option<Node<'_, '_>>,
        id_map: &HashMap<String, NodeId>,
    ) -> Result<Vec<u8>, Error> {
        let target = self.dereference(doc, id_map)?;
        let mut config = kista_transforms::resolve(self.transforms.as_slice())?;
        // Both supported URI forms dereference to a node set without comments.
        config.mode = config.mode.without_comments();
        config.canonicalize(target, signature)
    }

    /// Canonicalize the referenced content and digest it.
    pub fn compute_digest(
        &self,
        doc: &Document<'_>,
        signature: Option<Node<'_, '_>>,
        id_map: &HashMap<String, NodeId>,
    ) -> Result<Vec<u8>, Error> {
        self.digest_method
            .digest(&self.canonicalize(doc, signature, id_map)?)
    }

    /// Recompute the digest and compare it with the stored value.
    pub fn verify(
        &self,
        doc: &Document<'_>,
        signature: Option<Node<'_, '_>>,
        id_map: &HashMap<String, NodeId>,
    ) -> Result<bool, Error> {
        let canonical = self.canonicalize(doc, signature, id_map)?;
        let matches = self.digest_method.verify(&canonical, &self.digest_value)?;
        tracing::debug!(uri = self.uri.as_deref().unwrap_or(""), matches, "reference digest");
        Ok(matches)
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::DSIG, ns::node::REFERENCE)?;
        let transforms = match optional_child(node, ns::DSIG, ns::node::TRANSFORMS)? {
            Some(t) => Transforms::from_xml(t)?,
            None => Transforms::default(),
        };
        let digest_method =
            DigestMethod::from_xml(required_child(node, ns::DSIG, ns::node::DIGEST_METHOD)?)?;
        let digest_value = validate::decode_base64(&text_content(required_child(
            node,
            ns::DSIG,
            ns::node::DIGEST_VALUE,
        )?))?;

        Self::new(
            node.attribute(ns::attr::URI).map(str::to_owned),
            transforms,
            digest_method,
            digest_value,
        )?
        .with_attributes(
            node.attribute(ns::attr::ID).map(str::to_owned),
            node.attribute(ns::attr::TYPE).map(str::to_owned),
        )
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::DSIG, ns::prefix::DSIG, ns::node::REFERENCE)?;
        w.optional_attribute(ns::attr::ID, self.id.as_deref())?;
        w.optional_attribute(ns::attr::URI, self.uri.as_deref())?;
        w.optional_attribute(ns::attr::TYPE, self.type_.as_deref())?;
        if !self.transforms.is_empty() {
            self.transforms.to_xml(w)?;
        }
        self.digest_method.to_xml(w)?;
        let value = base64::engine::general_purpose::STANDARD.encode(&self.digest_value);
        w.text_element(ns::DSIG, ns::prefix::DSIG, ns::node::DIGEST_VALUE, &value)?;
        w.end_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kista_core::{algorithm, ErrorKind};
    use kista_transforms::Transform;
    use kista_xml::document::build_id_map;

    fn sha256() -> DigestMethod {
        DigestMethod::new(algorithm::SHA256, vec![]).unwrap()
    }

    fn reference(uri: &str, transforms: Vec<Transform>) -> Reference {
        Reference::new(Some(uri.into()), Transforms::new(transforms), sha256(), vec![]).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let r = Reference::new(
            Some("#body".into()),
            Transforms::new(vec![Transform::with_algorithm(algorithm::EXC_C14N).unwrap()]),
            sha256(),
            vec![1, 2, 3],
        )
        .unwrap()
        .with_attributes(Some("ref-1".into()), Some("urn:type".into()))
        .unwrap();

        let mut w = XmlWriter::new();
        r.to_xml(&mut w).unwrap();
        let xml = w.into_string().unwrap();
        let doc = kista_xml::parse(&xml).unwrap();
        assert_eq!(Reference::from_xml(doc.root_element()).unwrap(), r);
    }

    #[test]
    fn test_missing_digest_value() {
        let xml = format!(
            r#"<ds:Reference xmlns:ds="{0}" URI=""><ds:DigestMethod Algorithm="{1}"/></ds:Reference>"#,
            ns::DSIG,
            algorithm::SHA256
        );
        let doc = kista_xml::parse(&xml).unwrap();
        let err = Reference::from_xml(doc.root_element()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingElement);
    }

    #[test]
    fn test_dereference() {
        let doc = kista_xml::parse(r#"<root><a Id="x"/><b/></root>"#).unwrap();
        let ids = build_id_map(&doc, &[]);

        let node = reference("", vec![]).dereference(&doc, &ids).unwrap();
        assert_eq!(node.tag_name().name(), "root");
        let node = reference("#x", vec![]).dereference(&doc, &ids).unwrap();
        assert_eq!(node.tag_name().name(), "a");

        let err = reference("#nope", vec![]).dereference(&doc, &ids).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingElement);
        let err = reference("http://example.com/doc.xml", vec![])
            .dereference(&doc, &ids)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = reference("#xpointer(/)", vec![]).dereference(&doc, &ids).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_whole_document_digest_ignores_comments() {
        let doc = kista_xml::parse("<!-- lead --><root><!-- c --><v>1</v></root>").unwrap();
        let ids = build_id_map(&doc, &[]);
        let with_comments = reference("", vec![
            Transform::with_algorithm(algorithm::C14N_WITH_COMMENTS).unwrap(),
        ]);
        let digest = with_comments.compute_digest(&doc, None, &ids).unwrap();
        let expected = sha256().digest(b"<root><v>1</v></root>").unwrap();
        assert_eq!(digest, expected);
    }

    #[test]
    fn test_id_reference_digest() {
        let xml = r#"<root xmlns:u="urn:u"><u:item Id="i1"><u:v>1</u:v></u:item></root>"#;
        let doc = kista_xml::parse(xml).unwrap();
        let ids = build_id_map(&doc, &[]);
        let r = reference("#i1", vec![]);
        let digest = r.compute_digest(&doc, None, &ids).unwrap();
        let expected = sha256()
            .digest(br#"<u:item xmlns:u="urn:u" Id="i1"><u:v>1</u:v></u:item>"#)
            .unwrap();
        assert_eq!(digest, expected);

        let bound = Reference::new(Some("#i1".into()), Transforms::default(), sha256(), digest)
            .unwrap();
        assert!(bound.verify(&doc, None, &ids).unwrap());
    }
}
