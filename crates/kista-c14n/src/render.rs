#![forbid(unsafe_code)]

//! Shared rendering for C14N output.

use kista_core::ns;
use kista_xml::document::attribute_qname;
use kista_xml::escape;
use roxmltree::{Node, NodeType};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    /// The namespace URI.
    pub uri: String,
}

impl NsDecl {
    pub fn render(&self, out: &mut Vec<u8>) {
        if self.prefix.is_empty() {
            out.extend_from_slice(b" xmlns=\"");
        } else {
            out.extend_from_slice(b" xmlns:");
            out.extend_from_slice(self.prefix.as_bytes());
            out.extend_from_slice(b"=\"");
        }
        out.extend_from_slice(escape::escape_attr(&self.uri).as_bytes());
        out.push(b'"');
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> Ordering {
        // The default namespace sorts first, then by prefix.
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// The namespace URI of the attribute ("" for no namespace).
    pub ns_uri: String,
    pub local_name: String,
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    pub fn render(&self, out: &mut Vec<u8>) {
        out.push(b' ');
        out.extend_from_slice(self.qualified_name.as_bytes());
        out.extend_from_slice(b"=\"");
        out.extend_from_slice(escape::escape_attr(&self.value).as_bytes());
        out.push(b'"');
    }
}

impl Ord for Attr {
    fn cmp(&self, other: &Self) -> Ordering {
        // Unqualified attributes first by local name, then the rest by
        // (namespace URI, local name).
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then_with(|| self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The attribute axis of an element.
pub fn attributes(node: Node<'_, '_>) -> Vec<Attr> {
    node.attributes()
        .map(|a| Attr {
            ns_uri: a.namespace().unwrap_or("").to_owned(),
            local_name: a.name().to_owned(),
            qualified_name: attribute_qname(node, &a),
            value: a.value().to_owned(),
        })
        .collect()
}

/// `xml:*` attributes in scope from the ancestors of `node` that `node`
/// does not set itself. Nearest ancestor wins.
pub fn inherited_xml_attrs(node: Node<'_, '_>, own: &[Attr]) -> Vec<Attr> {
    let mut inherited: BTreeMap<&str, &str> = BTreeMap::new();
    for ancestor in node.ancestors().skip(1).filter(|n| n.is_element()) {
        for attr in ancestor.attributes() {
            if attr.namespace() == Some(ns::XML) {
                inherited.entry(attr.name()).or_insert(attr.value());
            }
        }
    }
    inherited
        .into_iter()
        .filter(|(name, _)| !own.iter().any(|a| a.ns_uri == ns::XML && a.local_name == *name))
        .map(|(name, value)| Attr {
            ns_uri: ns::XML.to_owned(),
            local_name: name.to_owned(),
            qualified_name: format!("xml:{name}"),
            value: value.to_owned(),
        })
        .collect()
}

/// Write the element's closing tag.
pub fn end_tag(qname: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(b"</");
    out.extend_from_slice(qname.as_bytes());
    out.push(b'>');
}

/// Render a text, comment or PI node. Elements and the root are the
/// caller's business.
///
/// Comments and PIs that are children of the document node are separated
/// from the document element by a line feed.
pub fn leaf(node: Node<'_, '_>, with_comments: bool, out: &mut Vec<u8>) {
    let at_top = node.parent().is_some_and(|p| p.node_type() == NodeType::Root);
    let before_root = at_top && !preceded_by_element(node);
    let after_root = at_top && !before_root;

    match node.node_type() {
        NodeType::Text => {
            out.extend_from_slice(escape::escape_text(node.text().unwrap_or("")).as_bytes());
        }
        NodeType::Comment if with_comments => {
            if after_root {
                out.push(b'\n');
            }
            out.extend_from_slice(b"<!--");
            out.extend_from_slice(node.text().unwrap_or("").as_bytes());
            out.extend_from_slice(b"-->");
            if before_root {
                out.push(b'\n');
            }
        }
        NodeType::PI => {
            let Some(pi) = node.pi() else { return };
            if after_root {
                out.push(b'\n');
            }
            out.extend_from_slice(b"<?");
            out.extend_from_slice(pi.target.as_bytes());
            if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                out.push(b' ');
                out.extend_from_slice(escape::escape_pi(value).as_bytes());
            }
            out.extend_from_slice(b"?>");
            if before_root {
                out.push(b'\n');
            }
        }
        _ => {}
    }
}

fn preceded_by_element(node: Node<'_, '_>) -> bool {
    let mut current = node.prev_sibling();
    while let Some(n) = current {
        if n.is_element() {
            return true;
        }
        current = n.prev_sibling();
    }
    false
}
