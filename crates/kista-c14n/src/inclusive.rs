#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 (C14N 1.0).
//!
//! Algorithm URI: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315`
//! With comments: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments`
//!
//! Every namespace in scope at an output element is rendered unless the
//! nearest output ancestor already rendered the same binding.

use crate::render::{self, NsDecl};
use kista_core::Error;
use kista_xml::document::{element_qname, in_scope_namespaces};
use kista_xml::NodeSet;
use roxmltree::{Document, Node, NodeType};
use std::collections::BTreeMap;

/// Canonicalize a document, or the subset of it selected by `node_set`.
pub fn canonicalize(
    doc: &Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    let ctx = C14nContext {
        with_comments,
        node_set,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

struct C14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
}

impl C14nContext<'_> {
    fn is_visible(&self, node: &Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    fn process_node(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        inherited_ns: &BTreeMap<String, String>,
    ) {
        match node.node_type() {
            NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, inherited_ns);
                }
            }
            NodeType::Element => self.process_element(node, output, inherited_ns),
            _ => {
                if self.is_visible(&node) {
                    render::leaf(node, self.with_comments, output);
                }
            }
        }
    }

    fn process_element(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        inherited_ns: &BTreeMap<String, String>,
    ) {
        if !self.is_visible(&node) {
            // Descendants still compare against the nearest output ancestor.
            for child in node.children() {
                self.process_node(child, output, inherited_ns);
            }
            return;
        }

        let current_ns: BTreeMap<String, String> = in_scope_namespaces(node)
            .into_iter()
            .map(|(p, u)| (p.to_owned(), u.to_owned()))
            .collect();

        let mut ns_decls: Vec<NsDecl> = current_ns
            .iter()
            .filter(|(prefix, uri)| inherited_ns.get(*prefix) != Some(*uri))
            .map(|(prefix, uri)| NsDecl {
                prefix: prefix.clone(),
                uri: uri.clone(),
            })
            .collect();

        // Undeclare a default namespace the output ancestor rendered but
        // this element does not have.
        if inherited_ns.get("").is_some_and(|d| !d.is_empty()) && !current_ns.contains_key("") {
            ns_decls.push(NsDecl {
                prefix: String::new(),
                uri: String::new(),
            });
        }
        ns_decls.sort();

        let mut attrs = render::attributes(node);
        // xml:* attributes are inherited into a subset when the parent
        // element is not part of the output.
        if self.node_set.is_some() {
            let parent_hidden = node
                .parent()
                .map_or(true, |p| !p.is_element() || !self.is_visible(&p));
            if parent_hidden {
                let extra = render::inherited_xml_attrs(node, &attrs);
                attrs.extend(extra);
            }
        }
        attrs.sort();

        let elem_name = element_qname(node);
        output.push(b'<');
        output.extend_from_slice(elem_name.as_bytes());
        for ns_decl in &ns_decls {
            ns_decl.render(output);
        }
        for attr in &attrs {
            attr.render(output);
        }
        output.push(b'>');

        for child in node.children() {
            self.process_node(child, output, &current_ns);
        }

        render::end_tag(&elem_name, output);
    }
}
