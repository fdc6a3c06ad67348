#![forbid(unsafe_code)]

//! Read helpers over `roxmltree` nodes.

use kista_core::{ns, Error};
use roxmltree::{Attribute, Document, Node, NodeId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Whether `node` is an element with the given namespace and local name.
pub fn is_named(node: Node<'_, '_>, ns_uri: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == ns_uri
}

/// Fail with [`Error::InvalidElement`] unless `node` has the expected name.
pub fn expect_element(node: Node<'_, '_>, ns_uri: &str, local_name: &str) -> Result<(), Error> {
    if is_named(node, ns_uri, local_name) {
        return Ok(());
    }
    let found = if node.is_element() {
        format!(
            "{{{}}}{}",
            node.tag_name().namespace().unwrap_or(""),
            node.tag_name().name()
        )
    } else {
        format!("{:?} node", node.node_type())
    };
    Err(Error::InvalidElement(format!(
        "expected {{{ns_uri}}}{local_name}, found {found}"
    )))
}

/// Child elements of `parent`, in document order.
pub fn child_elements<'a, 'input: 'a>(
    parent: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    parent.children().filter(|n| n.is_element())
}

/// Find the first child element with the given local name and namespace.
pub fn find_child_element<'a, 'input: 'a>(
    parent: Node<'a, 'input>,
    ns_uri: &str,
    local_name: &str,
) -> Option<Node<'a, 'input>> {
    parent
        .children()
        .find(|n| is_named(*n, ns_uri, local_name))
}

/// Find all child elements with the given local name and namespace.
pub fn find_child_elements<'a, 'input: 'a>(
    parent: Node<'a, 'input>,
    ns_uri: &str,
    local_name: &str,
) -> Vec<Node<'a, 'input>> {
    parent
        .children()
        .filter(|n| is_named(*n, ns_uri, local_name))
        .collect()
}

/// The single child element `{ns_uri}local_name`: absent is
/// [`Error::MissingElement`], repeated is [`Error::TooManyElements`].
pub fn required_child<'a, 'input: 'a>(
    parent: Node<'a, 'input>,
    ns_uri: &str,
    local_name: &str,
) -> Result<Node<'a, 'input>, Error> {
    optional_child(parent, ns_uri, local_name)?.ok_or_else(|| {
        Error::MissingElement(format!("{local_name} in {}", parent.tag_name().name()))
    })
}

/// At most one child element `{ns_uri}local_name`.
pub fn optional_child<'a, 'input: 'a>(
    parent: Node<'a, 'input>,
    ns_uri: &str,
    local_name: &str,
) -> Result<Option<Node<'a, 'input>>, Error> {
    let mut found = parent.children().filter(|n| is_named(*n, ns_uri, local_name));
    let first = found.next();
    if found.next().is_some() {
        return Err(Error::TooManyElements(format!(
            "more than one {local_name} in {}",
            parent.tag_name().name()
        )));
    }
    Ok(first)
}

/// Find the first descendant element with the given local name and namespace.
pub fn find_element<'a, 'input: 'a>(
    doc: &'a Document<'input>,
    ns_uri: &str,
    local_name: &str,
) -> Option<Node<'a, 'input>> {
    doc.descendants().find(|n| is_named(*n, ns_uri, local_name))
}

/// Read a mandatory attribute.
pub fn required_attribute<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, Error> {
    node.attribute(name).ok_or_else(|| {
        Error::MissingAttribute(format!("{name} on {}", node.tag_name().name()))
    })
}

/// Concatenated text of all descendant text nodes.
pub fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// The prefix an element was written with, read back from the source text.
///
/// roxmltree resolves names to `{namespace}local` and drops the prefix, but
/// canonical output must reproduce it exactly.
pub fn element_prefix<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    if !node.is_element() {
        return None;
    }
    let text: &'a str = node.document().input_text();
    let tag = text.get(node.range().start..)?.strip_prefix('<')?;
    let end = tag.find(|c: char| c.is_whitespace() || c == '/' || c == '>')?;
    tag[..end].split_once(':').map(|(prefix, _)| prefix)
}

/// `prefix:local` or `local` for an element.
pub fn element_qname(node: Node<'_, '_>) -> String {
    match element_prefix(node) {
        Some(prefix) => format!("{prefix}:{}", node.tag_name().name()),
        None => node.tag_name().name().to_owned(),
    }
}

/// The prefix bound to a namespaced attribute.
///
/// Attributes never take the default namespace, so any in-scope non-empty
/// prefix bound to the attribute's URI is the one that was written.
pub fn attribute_prefix<'a>(node: Node<'a, '_>, attr: &Attribute<'a, '_>) -> Option<&'a str> {
    let uri = attr.namespace()?;
    if uri == ns::XML {
        return Some("xml");
    }
    node.namespaces()
        .find(|n| n.uri() == uri && n.name().is_some())
        .and_then(|n| n.name())
}

/// `prefix:local` or `local` for an attribute.
pub fn attribute_qname(node: Node<'_, '_>, attr: &Attribute<'_, '_>) -> String {
    match attribute_prefix(node, attr) {
        Some(prefix) => format!("{prefix}:{}", attr.name()),
        None => attr.name().to_owned(),
    }
}

/// In-scope namespace bindings of an element as `(prefix, uri)` pairs,
/// with `""` standing for the default namespace. The implicit `xml`
/// binding is left out.
pub fn in_scope_namespaces<'a>(node: Node<'a, '_>) -> Vec<(&'a str, &'a str)> {
    if !node.is_element() {
        return Vec::new();
    }
    node.namespaces()
        .map(|n| (n.name().unwrap_or(""), n.uri()))
        .filter(|(prefix, uri)| *prefix != "xml" && !(prefix.is_empty() && uri.is_empty()))
        .collect()
}

/// Build the ID → NodeId mapping for a parsed document.
///
/// `Id`, `ID` and `id` are always recognised; `extra_id_attrs` adds more.
/// When an ID value repeats, the first element in document order wins.
pub fn build_id_map(doc: &Document<'_>, extra_id_attrs: &[String]) -> HashMap<String, NodeId> {
    let (map, duplicates) = scan_ids(doc, extra_id_attrs);
    for id in &duplicates {
        tracing::warn!(id = id.as_str(), "duplicate ID, keeping the first element");
    }
    map
}

/// Like [`build_id_map`], but a repeated ID value is
/// [`Error::SchemaViolation`].
pub fn build_unique_id_map(
    doc: &Document<'_>,
    extra_id_attrs: &[String],
) -> Result<HashMap<String, NodeId>, Error> {
    let (map, duplicates) = scan_ids(doc, extra_id_attrs);
    match duplicates.first() {
        Some(id) => Err(Error::SchemaViolation(format!("duplicate ID \"{id}\""))),
        None => Ok(map),
    }
}

fn scan_ids(doc: &Document<'_>, extra_id_attrs: &[String]) -> (HashMap<String, NodeId>, Vec<String>) {
    let default_attrs = ["Id", "ID", "id"];
    let mut map = HashMap::new();
    let mut duplicates = Vec::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        for attr_name in default_attrs
            .iter()
            .copied()
            .chain(extra_id_attrs.iter().map(String::as_str))
        {
            let Some(val) = node.attribute(attr_name) else {
                continue;
            };
            match map.entry(val.to_owned()) {
                Entry::Vacant(slot) => {
                    slot.insert(node.id());
                }
                Entry::Occupied(first) if *first.get() != node.id() => {
                    duplicates.push(val.to_owned());
                }
                Entry::Occupied(_) => {}
            }
        }
    }
    (map, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_from_source() {
        let xml = r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns="http://www.w3.org/2000/09/xmldsig#"><SignedInfo/></ds:Signature>"#;
        let doc = crate::parse(xml).unwrap();
        let root = doc.root_element();
        assert_eq!(element_prefix(root), Some("ds"));
        assert_eq!(element_qname(root), "ds:Signature");
        let child = root.first_child().unwrap();
        assert_eq!(element_prefix(child), None);
        assert!(is_named(child, ns::DSIG, "SignedInfo"));
    }

    #[test]
    fn test_attribute_prefix() {
        let xml = r#"<a xmlns:p="urn:p" p:x="1" xml:lang="en" y="2"/>"#;
        let doc = crate::parse(xml).unwrap();
        let root = doc.root_element();
        let names: Vec<String> = root
            .attributes()
            .map(|a| attribute_qname(root, &a))
            .collect();
        assert_eq!(names, vec!["p:x", "xml:lang", "y"]);
    }

    #[test]
    fn test_id_map_and_expect() {
        let xml = r#"<root><a Id="one"/><b wsu:Id="two" xmlns:wsu="urn:wsu"/><c ref="three"/></root>"#;
        let doc = crate::parse(xml).unwrap();
        let map = build_id_map(&doc, &["ref".to_owned()]);
        assert!(map.contains_key("one"));
        assert!(map.contains_key("three"));
        assert!(!map.contains_key("two"));

        let err = expect_element(doc.root_element(), ns::ENC, "EncryptedKey").unwrap_err();
        assert!(matches!(err, Error::InvalidElement(_)));
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let doc = crate::parse(r#"<root><a Id="x"/><b Id="x"/></root>"#).unwrap();
        let map = build_id_map(&doc, &[]);
        let node = doc.get_node(map["x"]).unwrap();
        assert_eq!(node.tag_name().name(), "a");

        let err = build_unique_id_map(&doc, &[]).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation(ref m) if m.contains("\"x\"")));
        let single = crate::parse(r#"<root><a Id="x" id="x"/><b Id="y"/></root>"#).unwrap();
        assert_eq!(build_unique_id_map(&single, &[]).unwrap().len(), 2);
    }

    #[test]
    fn test_child_cardinality() {
        let doc = crate::parse("<p><a/><b/><b/></p>").unwrap();
        let p = doc.root_element();
        assert!(required_child(p, "", "a").is_ok());
        assert!(optional_child(p, "", "c").unwrap().is_none());
        assert!(matches!(required_child(p, "", "c"), Err(Error::MissingElement(_))));
        assert!(matches!(optional_child(p, "", "b"), Err(Error::TooManyElements(_))));
    }

    #[test]
    fn test_text_content() {
        let doc = crate::parse("<v>QUJD\n<!-- c -->REVG</v>").unwrap();
        assert_eq!(text_content(doc.root_element()), "QUJD\nREVG");
    }
}
