#![forbid(unsafe_code)]

//! `<ds:DigestMethod>`, `<ds:CanonicalizationMethod>` and
//! `<ds:SignatureMethod>`.

use kista_c14n::C14nMode;
use kista_core::{algorithm, ns, validate, Error};
use kista_transforms::transform::write_inclusive_namespaces;
use kista_xml::document::{
    child_elements, expect_element, is_named, optional_child, required_attribute,
};
use kista_xml::{Chunk, XmlWriter};
use roxmltree::Node;

/// A digest algorithm plus any extension children, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestMethod {
    algorithm: String,
    elements: Vec<Chunk>,
}

impl DigestMethod {
    /// Fails with a schema violation for a malformed URI and with an
    /// invalid argument for a URI outside the digest registry.
    pub fn new(algorithm: impl Into<String>, elements: Vec<Chunk>) -> Result<Self, Error> {
        let algorithm = algorithm.into();
        validate::valid_uri(&algorithm)?;
        if !algorithm::is_digest(&algorithm) {
            return Err(Error::InvalidArgument(format!(
                "invalid digest method: {algorithm}"
            )));
        }
        Ok(Self {
            algorithm,
            elements,
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn elements(&self) -> &[Chunk] {
        &self.elements
    }

    /// Digest `data` with this method.
    pub fn digest(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        kista_crypto::digest::digest(&self.algorithm, data)
    }

    /// Compare the digest of `data` with `expected` in constant time.
    pub fn verify(&self, data: &[u8], expected: &[u8]) -> Result<bool, Error> {
        kista_crypto::verify_digest(data, &self.algorithm, expected)
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::DSIG, ns::node::DIGEST_METHOD)?;
        let algorithm = required_attribute(node, ns::attr::ALGORITHM)?;
        let elements = child_elements(node)
            .map(Chunk::from_node)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(algorithm, elements)
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::DSIG, ns::prefix::DSIG, ns::node::DIGEST_METHOD)?;
        w.attribute(ns::attr::ALGORITHM, &self.algorithm)?;
        for elt in &self.elements {
            w.raw(elt.as_str())?;
        }
        w.end_element()
    }
}

/// The canonicalization applied to `<ds:SignedInfo>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalizationMethod {
    mode: C14nMode,
    prefixes: Option<Vec<String>>,
}

impl CanonicalizationMethod {
    pub fn new(mode: C14nMode, prefixes: Option<Vec<String>>) -> Self {
        Self { mode, prefixes }
    }

    pub fn mode(&self) -> C14nMode {
        self.mode
    }

    /// The InclusiveNamespaces PrefixList; empty when absent.
    pub fn prefixes(&self) -> &[String] {
        self.prefixes.as_deref().unwrap_or(&[])
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::DSIG, ns::node::CANONICALIZATION_METHOD)?;
        let uri = required_attribute(node, ns::attr::ALGORITHM)?;
        validate::valid_uri(uri)?;
        let mode = C14nMode::from_uri(uri)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {uri}")))?;

        let mut inclusive = child_elements(node)
            .filter(|n| is_named(*n, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES));
        let first = inclusive.next();
        if inclusive.next().is_some() {
            return Err(Error::TooManyElements(
                "at most one InclusiveNamespaces per CanonicalizationMethod".into(),
            ));
        }
        let prefixes = match first {
            Some(n) => Some(
                required_attribute(n, ns::attr::PREFIX_LIST)?
                    .split_whitespace()
                    .map(str::to_owned)
                    .collect(),
            ),
            None => None,
        };
        Ok(Self { mode, prefixes })
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::DSIG, ns::prefix::DSIG, ns::node::CANONICALIZATION_METHOD)?;
        w.attribute(ns::attr::ALGORITHM, self.mode.uri())?;
        if let Some(prefixes) = &self.prefixes {
            write_inclusive_namespaces(w, prefixes)?;
        }
        w.end_element()
    }
}

/// The signature algorithm declared in `<ds:SignedInfo>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMethod {
    algorithm: String,
}

impl SignatureMethod {
    pub fn new(algorithm: impl Into<String>) -> Result<Self, Error> {
        let algorithm = algorithm.into();
        validate::valid_uri(&algorithm)?;
        if !algorithm::is_signature(&algorithm) {
            return Err(Error::UnsupportedAlgorithm(format!(
                "signature method: {algorithm}"
            )));
        }
        Ok(Self { algorithm })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::DSIG, ns::node::SIGNATURE_METHOD)?;
        // HMACOutputLength is refused rather than honoured: truncated MACs
        // are not accepted.
        if optional_child(node, ns::DSIG, "HMACOutputLength")?.is_some() {
            return Err(Error::InvalidArgument(
                "HMACOutputLength is not supported".into(),
            ));
        }
        Self::new(required_attribute(node, ns::attr::ALGORITHM)?)
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::DSIG, ns::prefix::DSIG, ns::node::SIGNATURE_METHOD)?;
        w.attribute(ns::attr::ALGORITHM, &self.algorithm)?;
        w.end_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kista_core::ErrorKind;

    fn write<F: FnOnce(&mut XmlWriter) -> Result<(), Error>>(f: F) -> String {
        let mut w = XmlWriter::new();
        f(&mut w).unwrap();
        w.into_string().unwrap()
    }

    #[test]
    fn test_digest_method_rejects_bad_algorithms() {
        let err = DigestMethod::new("not a uri", vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        let err = DigestMethod::new("http://www.w3.org/2001/04/xmldsig-more#md5", vec![])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_digest_method_keeps_extension_children() {
        let xml = format!(
            r#"<ds:DigestMethod xmlns:ds="{}" Algorithm="{}"><ext:Param xmlns:ext="urn:ext">1</ext:Param><ds:Other/></ds:DigestMethod>"#,
            ns::DSIG,
            algorithm::SHA256
        );
        let doc = kista_xml::parse(&xml).unwrap();
        let method = DigestMethod::from_xml(doc.root_element()).unwrap();
        assert_eq!(method.algorithm(), algorithm::SHA256);
        assert_eq!(method.elements().len(), 2);
        assert_eq!(method.elements()[0].local_name(), "Param");

        let out = write(|w| method.to_xml(w));
        let doc = kista_xml::parse(&out).unwrap();
        assert_eq!(DigestMethod::from_xml(doc.root_element()).unwrap(), method);
    }

    #[test]
    fn test_digest_method_digests() {
        let method = DigestMethod::new(algorithm::SHA1, vec![]).unwrap();
        let d = method.digest(b"abc").unwrap();
        assert_eq!(hex(&d), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert!(method.verify(b"abc", &d).unwrap());
        assert!(!method.verify(b"abd", &d).unwrap());
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_canonicalization_method() {
        let xml = format!(
            r#"<ds:CanonicalizationMethod xmlns:ds="{}" Algorithm="{}"><ec:InclusiveNamespaces xmlns:ec="{}" PrefixList="a b"/></ds:CanonicalizationMethod>"#,
            ns::DSIG,
            algorithm::EXC_C14N,
            ns::EXC_C14N
        );
        let doc = kista_xml::parse(&xml).unwrap();
        let method = CanonicalizationMethod::from_xml(doc.root_element()).unwrap();
        assert_eq!(method.mode(), C14nMode::Exclusive);
        assert_eq!(method.prefixes(), ["a".to_owned(), "b".to_owned()]);

        let out = write(|w| method.to_xml(w));
        let doc = kista_xml::parse(&out).unwrap();
        assert_eq!(CanonicalizationMethod::from_xml(doc.root_element()).unwrap(), method);

        let xml = format!(
            r#"<ds:CanonicalizationMethod xmlns:ds="{}" Algorithm="{}"/>"#,
            ns::DSIG,
            algorithm::XSLT
        );
        let doc = kista_xml::parse(&xml).unwrap();
        let err = CanonicalizationMethod::from_xml(doc.root_element()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_signature_method() {
        assert!(SignatureMethod::new(algorithm::RSA_SHA256).is_ok());
        assert!(SignatureMethod::new(algorithm::SHA256).is_err());

        let xml = format!(
            r#"<ds:SignatureMethod xmlns:ds="{0}" Algorithm="{1}"><ds:HMACOutputLength>80</ds:HMACOutputLength></ds:SignatureMethod>"#,
            ns::DSIG,
            algorithm::HMAC_SHA1
        );
        let doc = kista_xml::parse(&xml).unwrap();
        let err = SignatureMethod::from_xml(doc.root_element()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
