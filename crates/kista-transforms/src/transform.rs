#![forbid(unsafe_code)]

//! `<ds:Transform>` descriptors.

use kista_core::{ns, validate, Error};
use kista_xml::document::{
    child_elements, expect_element, find_child_elements, in_scope_namespaces, is_named,
    required_attribute, text_content,
};
use kista_xml::xpath::Predicate;
use kista_xml::XmlWriter;
use roxmltree::Node;
use std::collections::{BTreeMap, HashMap};

/// The `<ds:XPath>` child of an XPath transform: a boolean expression plus
/// the prefix bindings in scope where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    expression: String,
    namespaces: BTreeMap<String, String>,
}

impl XPath {
    pub fn new(expression: impl Into<String>, namespaces: BTreeMap<String, String>) -> Self {
        Self {
            expression: expression.into(),
            namespaces,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }

    /// Compile the expression into a predicate.
    pub fn predicate(&self) -> Result<Predicate, Error> {
        let namespaces: HashMap<String, String> = self
            .namespaces
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Predicate::compile(self.expression.trim(), &namespaces)
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::DSIG, ns::node::XPATH)?;
        let namespaces = in_scope_namespaces(node)
            .into_iter()
            .filter(|(prefix, _)| !prefix.is_empty())
            .map(|(p, u)| (p.to_owned(), u.to_owned()))
            .collect();
        Ok(Self {
            expression: text_content(node),
            namespaces,
        })
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::DSIG, ns::prefix::DSIG, ns::node::XPATH)?;
        for (prefix, uri) in &self.namespaces {
            w.namespace(prefix, uri)?;
        }
        w.text(&self.expression)?;
        w.end_element()
    }
}

/// One transform descriptor. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transform {
    algorithm: String,
    xpath: Option<XPath>,
    inclusive_namespaces: Option<Vec<String>>,
}

impl Transform {
    /// Build a transform, checking the algorithm URI and prefix names.
    ///
    /// Whether the algorithm is *supported* is decided when a chain is
    /// resolved, so unknown transforms still round-trip.
    pub fn new(
        algorithm: impl Into<String>,
        xpath: Option<XPath>,
        inclusive_namespaces: Option<Vec<String>>,
    ) -> Result<Self, Error> {
        let algorithm = algorithm.into();
        validate::valid_uri(&algorithm)?;
        if let Some(prefixes) = &inclusive_namespaces {
            for prefix in prefixes.iter().filter(|p| *p != "#default") {
                validate::valid_ncname(prefix)?;
            }
        }
        Ok(Self {
            algorithm,
            xpath,
            inclusive_namespaces,
        })
    }

    /// A transform with only an algorithm.
    pub fn with_algorithm(algorithm: impl Into<String>) -> Result<Self, Error> {
        Self::new(algorithm, None, None)
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn xpath(&self) -> Option<&XPath> {
        self.xpath.as_ref()
    }

    /// The InclusiveNamespaces PrefixList, if one was given.
    pub fn inclusive_namespaces(&self) -> Option<&[String]> {
        self.inclusive_namespaces.as_deref()
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::DSIG, ns::node::TRANSFORM)?;
        let algorithm = required_attribute(node, ns::attr::ALGORITHM)?;

        let xpaths = find_child_elements(node, ns::DSIG, ns::node::XPATH);
        if xpaths.len() > 1 {
            return Err(Error::TooManyElements(
                "at most one XPath per Transform".into(),
            ));
        }
        let xpath = xpaths.first().map(|n| XPath::from_xml(*n)).transpose()?;

        let inclusive: Vec<Node<'_, '_>> = child_elements(node)
            .filter(|n| is_named(*n, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES))
            .collect();
        if inclusive.len() > 1 {
            return Err(Error::TooManyElements(
                "at most one InclusiveNamespaces per Transform".into(),
            ));
        }
        let inclusive_namespaces = match inclusive.first() {
            Some(n) => Some(
                required_attribute(*n, ns::attr::PREFIX_LIST)?
                    .split_whitespace()
                    .map(str::to_owned)
                    .collect(),
            ),
            None => None,
        };

        Self::new(algorithm, xpath, inclusive_namespaces)
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::DSIG, ns::prefix::DSIG, ns::node::TRANSFORM)?;
        w.attribute(ns::attr::ALGORITHM, &self.algorithm)?;
        if let Some(xpath) = &self.xpath {
            xpath.to_xml(w)?;
        }
        if let Some(prefixes) = &self.inclusive_namespaces {
            write_inclusive_namespaces(w, prefixes)?;
        }
        w.end_element()
    }
}

/// Write `<ec:InclusiveNamespaces PrefixList="..."/>`.
pub fn write_inclusive_namespaces(w: &mut XmlWriter, prefixes: &[String]) -> Result<(), Error> {
    w.start_element(ns::EXC_C14N, ns::prefix::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)?;
    w.attribute(ns::attr::PREFIX_LIST, &prefixes.join(" "))?;
    w.end_element()
}

/// The ordered `<ds:Transforms>` chain of a Reference. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transforms {
    transforms: Vec<Transform>,
}

impl Transforms {
    pub fn new(transforms: Vec<Transform>) -> Self {
        Self { transforms }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transform> {
        self.transforms.iter()
    }

    pub fn as_slice(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::DSIG, ns::node::TRANSFORMS)?;
        let transforms = child_elements(node)
            .map(Transform::from_xml)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { transforms })
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::DSIG, ns::prefix::DSIG, ns::node::TRANSFORMS)?;
        for t in &self.transforms {
            t.to_xml(w)?;
        }
        w.end_element()
    }
}

impl<'a> IntoIterator for &'a Transforms {
    type Item = &'a Transform;
    type IntoIter = std::slice::Iter<'a, Transform>;

    fn into_iter(self) -> Self::IntoIter {
        self.transforms.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kista_core::{algorithm, ErrorKind};

    fn round_trip(t: &Transforms) -> Transforms {
        let mut w = XmlWriter::new();
        t.to_xml(&mut w).unwrap();
        let xml = w.into_string().unwrap();
        let doc = kista_xml::parse(&xml).unwrap();
        Transforms::from_xml(doc.root_element()).unwrap()
    }

    #[test]
    fn test_parse_chain() {
        let xml = format!(
            r#"<ds:Transforms xmlns:ds="{}" xmlns:soap="urn:soap">
                 <ds:Transform Algorithm="{}"/>
                 <ds:Transform Algorithm="{}">
                   <ec:InclusiveNamespaces xmlns:ec="{}" PrefixList="soap #default"/>
                 </ds:Transform>
                 <ds:Transform Algorithm="{}"><ds:XPath>not(ancestor-or-self::soap:Header)</ds:XPath></ds:Transform>
               </ds:Transforms>"#,
            ns::DSIG,
            algorithm::ENVELOPED_SIGNATURE,
            algorithm::EXC_C14N,
            ns::EXC_C14N,
            algorithm::XPATH
        );
        let doc = kista_xml::parse(&xml).unwrap();
        let chain = Transforms::from_xml(doc.root_element()).unwrap();
        let list = chain.as_slice();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].algorithm(), algorithm::ENVELOPED_SIGNATURE);
        assert_eq!(
            list[1].inclusive_namespaces(),
            Some(&["soap".to_owned(), "#default".to_owned()][..])
        );
        let xpath = list[2].xpath().unwrap();
        assert_eq!(xpath.expression(), "not(ancestor-or-self::soap:Header)");
        assert_eq!(xpath.namespaces().get("soap").map(String::as_str), Some("urn:soap"));
        assert!(xpath.predicate().is_ok());

        assert_eq!(round_trip(&chain), chain);
    }

    #[test]
    fn test_empty_chain_round_trip() {
        let chain = Transforms::default();
        assert!(round_trip(&chain).is_empty());
    }

    #[test]
    fn test_invalid_values() {
        let err = Transform::with_algorithm("not a uri").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);

        let err = Transform::new(algorithm::EXC_C14N, None, Some(vec!["1bad".into()])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn test_missing_algorithm_and_duplicate_xpath() {
        let xml = format!(r#"<ds:Transform xmlns:ds="{}"/>"#, ns::DSIG);
        let doc = kista_xml::parse(&xml).unwrap();
        let err = Transform::from_xml(doc.root_element()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingElement);

        let xml = format!(
            r#"<ds:Transform xmlns:ds="{0}" Algorithm="{1}"><ds:XPath>true()</ds:XPath><ds:XPath>true()</ds:XPath></ds:Transform>"#,
            ns::DSIG,
            algorithm::XPATH
        );
        let doc = kista_xml::parse(&xml).unwrap();
        let err = Transform::from_xml(doc.root_element()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyElements);
    }
}
