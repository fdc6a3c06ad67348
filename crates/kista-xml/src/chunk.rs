#![forbid(unsafe_code)]

//! Opaque element capsules.
//!
//! A [`Chunk`] carries an element the object model does not interpret,
//! serialized verbatim so it can be re-emitted unchanged. The serialization
//! is self-contained: every prefix the subtree uses is declared inside it,
//! on the outermost element that needs it.

use crate::document::{attribute_prefix, element_prefix};
use crate::escape;
use kista_core::{ns, Error};
use roxmltree::Node;

/// An unparsed element preserved for round-trip fidelity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    namespace: Option<String>,
    local_name: String,
    xml: String,
}

impl Chunk {
    /// Capture `node` and its subtree.
    pub fn from_node(node: Node<'_, '_>) -> Result<Self, Error> {
        if !node.is_element() {
            return Err(Error::InvalidArgument(format!(
                "only elements can be preserved, got {:?}",
                node.node_type()
            )));
        }
        let mut xml = String::new();
        serialize(node, &mut Vec::new(), &mut xml);
        Ok(Self {
            namespace: node.tag_name().namespace().map(str::to_owned),
            local_name: node.tag_name().name().to_owned(),
            xml,
        })
    }

    /// Capture the root element of a standalone fragment.
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let doc = crate::parse(xml)?;
        Self::from_node(doc.root_element())
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// The serialized element.
    pub fn as_str(&self) -> &str {
        &self.xml
    }
}

fn serialize(node: Node<'_, '_>, declared: &mut Vec<(String, String)>, out: &mut String) {
    match node.node_type() {
        roxmltree::NodeType::Element => {
            let mark = declared.len();
            let prefix = element_prefix(node).unwrap_or("");
            let local = node.tag_name().name();

            out.push('<');
            if !prefix.is_empty() {
                out.push_str(prefix);
                out.push(':');
            }
            out.push_str(local);

            let mut used: Vec<(&str, &str)> = vec![(prefix, node.tag_name().namespace().unwrap_or(""))];
            for attr in node.attributes() {
                if let (Some(p), Some(uri)) = (attribute_prefix(node, &attr), attr.namespace()) {
                    if uri != ns::XML {
                        used.push((p, uri));
                    }
                }
            }
            used.sort();
            used.dedup();
            for (p, uri) in used {
                let current = declared
                    .iter()
                    .rev()
                    .find(|(dp, _)| dp == p)
                    .map(|(_, u)| u.as_str())
                    .unwrap_or("");
                if current != uri {
                    if p.is_empty() {
                        out.push_str(" xmlns=\"");
                    } else {
                        out.push_str(" xmlns:");
                        out.push_str(p);
                        out.push_str("=\"");
                    }
                    out.push_str(&escape::escape_attr(uri));
                    out.push('"');
                    declared.push((p.to_owned(), uri.to_owned()));
                }
            }

            for attr in node.attributes() {
                out.push(' ');
                if let Some(p) = attribute_prefix(node, &attr) {
                    out.push_str(p);
                    out.push(':');
                }
                out.push_str(attr.name());
                out.push_str("=\"");
                out.push_str(&escape::escape_attr(attr.value()));
                out.push('"');
            }

            if node.has_children() {
                out.push('>');
                for child in node.children() {
                    serialize(child, declared, out);
                }
                out.push_str("</");
                if !prefix.is_empty() {
                    out.push_str(prefix);
                    out.push(':');
                }
                out.push_str(local);
                out.push('>');
            } else {
                out.push_str("/>");
            }
            declared.truncate(mark);
        }
        roxmltree::NodeType::Text => {
            out.push_str(&escape::escape_text(node.text().unwrap_or("")));
        }
        roxmltree::NodeType::Comment => {
            out.push_str("<!--");
            out.push_str(node.text().unwrap_or(""));
            out.push_str("-->");
        }
        roxmltree::NodeType::PI => {
            if let Some(pi) = node.pi() {
                out.push_str("<?");
                out.push_str(pi.target);
                if let Some(value) = pi.value {
                    out.push(' ');
                    out.push_str(value);
                }
                out.push_str("?>");
            }
        }
        roxmltree::NodeType::Root => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declares_only_used_namespaces() {
        let xml = r#"<outer xmlns:a="urn:a" xmlns:b="urn:b" xmlns:unused="urn:u"><a:ext b:flag="1"><a:inner>x &amp; y</a:inner><plain/></a:ext></outer>"#;
        let doc = crate::parse(xml).unwrap();
        let ext = doc.root_element().first_child().unwrap();
        let chunk = Chunk::from_node(ext).unwrap();
        assert_eq!(chunk.local_name(), "ext");
        assert_eq!(chunk.namespace_uri(), Some("urn:a"));
        assert_eq!(
            chunk.as_str(),
            r#"<a:ext xmlns:a="urn:a" xmlns:b="urn:b" b:flag="1"><a:inner>x &amp; y</a:inner><plain/></a:ext>"#
        );
    }

    #[test]
    fn test_reparse_is_stable() {
        let xml = r#"<x:root xmlns:x="urn:x"><x:KeySize>128</x:KeySize><!--note--></x:root>"#;
        let first = Chunk::parse(xml).unwrap();
        let second = Chunk::parse(first.as_str()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_default_namespace_undeclared_inside() {
        let xml = r#"<e xmlns="urn:d"><inner xmlns=""/></e>"#;
        let chunk = Chunk::parse(xml).unwrap();
        assert_eq!(chunk.as_str(), r#"<e xmlns="urn:d"><inner xmlns=""/></e>"#);
    }
}
