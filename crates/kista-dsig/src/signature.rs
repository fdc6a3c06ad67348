#![forbid(unsafe_code)]

//! `<ds:SignedInfo>` and `<ds:Signature>`.

use crate::keyinfo::KeyInfo;
use crate::method::{CanonicalizationMethod, SignatureMethod};
use crate::reference::Reference;
use base64::Engine;
use kista_core::{ns, validate, Error};
use kista_xml::document::{
    child_elements, expect_element, find_child_elements, is_named, optional_child,
    required_child, text_content,
};
use kista_xml::{Chunk, NodeSet, XmlWriter};
use roxmltree::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInfo {
    id: Option<String>,
    canonicalization_method: CanonicalizationMethod,
    signature_method: SignatureMethod,
    references: Vec<Reference>,
}

impl SignedInfo {
    /// At least one Reference is required.
    pub fn new(
        id: Option<String>,
        canonicalization_method: CanonicalizationMethod,
        signature_method: SignatureMethod,
        references: Vec<Reference>,
    ) -> Result<Self, Error> {
        if let Some(id) = &id {
            validate::valid_ncname(id)?;
        }
        if references.is_empty() {
            return Err(Error::MissingElement("Reference in SignedInfo".into()));
        }
        Ok(Self {
            id,
            canonicalization_method,
            signature_method,
            references,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn canonicalization_method(&self) -> &CanonicalizationMethod {
        &self.canonicalization_method
    }

    pub fn signature_method(&self) -> &SignatureMethod {
        &self.signature_method
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::DSIG, ns::node::SIGNED_INFO)?;
        let canonicalization_method = CanonicalizationMethod::from_xml(required_child(
            node,
            ns::DSIG,
            ns::node::CANONICALIZATION_METHOD,
        )?)?;
        let signature_method =
            SignatureMethod::from_xml(required_child(node, ns::DSIG, ns::node::SIGNATURE_METHOD)?)?;
        let references = find_child_elements(node, ns::DSIG, ns::node::REFERENCE)
            .into_iter()
            .map(Reference::from_xml)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(
            node.attribute(ns::attr::ID).map(str::to_owned),
            canonicalization_method,
            signature_method,
            references,
        )
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::DSIG, ns::prefix::DSIG, ns::node::SIGNED_INFO)?;
        w.optional_attribute(ns::attr::ID, self.id.as_deref())?;
        self.canonicalization_method.to_xml(w)?;
        self.signature_method.to_xml(w)?;
        for reference in &self.references {
            reference.to_xml(w)?;
        }
        w.end_element()
    }
}

/// Canonicalize a `<ds:SignedInfo>` element as a document subset, the
/// bytes the SignatureValue covers.
pub fn canonicalize_signed_info(
    signed_info: Node<'_, '_>,
    method: &CanonicalizationMethod,
) -> Result<Vec<u8>, Error> {
    let mode = method.mode();
    let subset = NodeSet::tree(signed_info, mode.with_comments());
    kista_c14n::canonicalize_subset(signed_info.document(), mode, &subset, method.prefixes())
}

/// A parsed `<ds:Signature>`. `<ds:Object>` children are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    id: Option<String>,
    signed_info: SignedInfo,
    signature_value: Vec<u8>,
    key_info: Option<KeyInfo>,
    objects: Vec<Chunk>,
}

impl Signature {
    pub fn new(
        id: Option<String>,
        signed_info: SignedInfo,
        signature_value: Vec<u8>,
        key_info: Option<KeyInfo>,
        objects: Vec<Chunk>,
    ) -> Result<Self, Error> {
        if let Some(id) = &id {
            validate::valid_ncname(id)?;
        }
        Ok(Self {
            id,
            signed_info,
            signature_value,
            key_info,
            objects,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn signed_info(&self) -> &SignedInfo {
        &self.signed_info
    }

    /// The decoded SignatureValue; empty in an unsigned template.
    pub fn signature_value(&self) -> &[u8] {
        &self.signature_value
    }

    pub fn key_info(&self) -> Option<&KeyInfo> {
        self.key_info.as_ref()
    }

    pub fn objects(&self) -> &[Chunk] {
        &self.objects
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::DSIG, ns::node::SIGNATURE)?;
        let signed_info =
            SignedInfo::from_xml(required_child(node, ns::DSIG, ns::node::SIGNED_INFO)?)?;
        let signature_value = validate::decode_base64(&text_content(required_child(
            node,
            ns::DSIG,
            ns::node::SIGNATURE_VALUE,
        )?))?;
        let key_info = optional_child(node, ns::DSIG, ns::node::KEY_INFO)?
            .map(KeyInfo::from_xml)
            .transpose()?;
        let objects = child_elements(node)
            .filter(|n| is_named(*n, ns::DSIG, "Object"))
            .map(Chunk::from_node)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(
            node.attribute(ns::attr::ID).map(str::to_owned),
            signed_info,
            signature_value,
            key_info,
            objects,
        )
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::DSIG, ns::prefix::DSIG, ns::node::SIGNATURE)?;
        w.optional_attribute(ns::attr::ID, self.id.as_deref())?;
        self.signed_info.to_xml(w)?;
        let value = base64::engine::general_purpose::STANDARD.encode(&self.signature_value);
        w.text_element(ns::DSIG, ns::prefix::DSIG, ns::node::SIGNATURE_VALUE, &value)?;
        if let Some(key_info) = &self.key_info {
            key_info.to_xml(w)?;
        }
        for object in &self.objects {
            w.raw(object.as_str())?;
        }
        w.end_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::DigestMethod;
    use kista_c14n::C14nMode;
    use kista_core::{algorithm, ErrorKind};
    use kista_transforms::Transforms;

    fn signed_info() -> SignedInfo {
        let reference = Reference::new(
            Some(String::new()),
            Transforms::default(),
            DigestMethod::new(algorithm::SHA256, vec![]).unwrap(),
            vec![0xAA; 32],
        )
        .unwrap();
        SignedInfo::new(
            None,
            CanonicalizationMethod::new(C14nMode::Exclusive, None),
            SignatureMethod::new(algorithm::RSA_SHA256).unwrap(),
            vec![reference],
        )
        .unwrap()
    }

    #[test]
    fn test_signature_round_trip() {
        let object = Chunk::parse(&format!(
            r#"<ds:Object xmlns:ds="{}" Id="obj"><data>1</data></ds:Object>"#,
            ns::DSIG
        ))
        .unwrap();
        let sig = Signature::new(
            Some("sig-1".into()),
            signed_info(),
            vec![1, 2, 3, 4],
            Some(KeyInfo::with_key_name("alice")),
            vec![object],
        )
        .unwrap();

        let mut w = XmlWriter::new();
        sig.to_xml(&mut w).unwrap();
        let xml = w.into_string().unwrap();
        let doc = kista_xml::parse(&xml).unwrap();
        assert_eq!(Signature::from_xml(doc.root_element()).unwrap(), sig);
    }

    #[test]
    fn test_signed_info_needs_a_reference() {
        let err = SignedInfo::new(
            None,
            CanonicalizationMethod::new(C14nMode::Inclusive, None),
            SignatureMethod::new(algorithm::RSA_SHA1).unwrap(),
            vec![],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingElement);
    }

    #[test]
    fn test_two_signature_values_rejected() {
        let mut w = XmlWriter::new();
        signed_info().to_xml(&mut w).unwrap();
        let si = w.into_string().unwrap();
        let xml = format!(
            r#"<ds:Signature xmlns:ds="{0}">{si}<ds:SignatureValue/><ds:SignatureValue/></ds:Signature>"#,
            ns::DSIG
        );
        let doc = kista_xml::parse(&xml).unwrap();
        let err = Signature::from_xml(doc.root_element()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyElements);
    }

    #[test]
    fn test_canonical_signed_info_inherits_namespace() {
        let xml = format!(
            r#"<doc xmlns:ds="{0}"><ds:Signature><ds:SignedInfo><!-- c --><ds:CanonicalizationMethod Algorithm="{1}"/></ds:SignedInfo></ds:Signature></doc>"#,
            ns::DSIG,
            algorithm::C14N
        );
        let doc = kista_xml::parse(&xml).unwrap();
        let si = doc
            .descendants()
            .find(|n| is_named(*n, ns::DSIG, ns::node::SIGNED_INFO))
            .unwrap();
        let method = CanonicalizationMethod::new(C14nMode::Inclusive, None);
        let bytes = canonicalize_signed_info(si, &method).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            format!(
                r#"<ds:SignedInfo xmlns:ds="{0}"><ds:CanonicalizationMethod Algorithm="{1}"></ds:CanonicalizationMethod></ds:SignedInfo>"#,
                ns::DSIG,
                algorithm::C14N
            )
        );
    }
}
