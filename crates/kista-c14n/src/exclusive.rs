#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! Only "visibly utilized" namespace declarations are output. A prefix is
//! visibly utilized by an element if the element name or one of its
//! attribute names uses it, or if it appears in the InclusiveNamespaces
//! PrefixList (`#default` naming the default namespace).

use crate::render::{self, NsDecl};
use kista_core::{ns, Error};
use kista_xml::document::{attribute_prefix, element_prefix, element_qname, in_scope_namespaces};
use kista_xml::NodeSet;
use roxmltree::{Document, Node, NodeType};
use std::collections::{BTreeMap, BTreeSet};

/// Canonicalize using Exclusive C14N 1.0.
pub fn canonicalize(
    doc: &Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let inclusive_prefixes = inclusive_prefixes
        .iter()
        .map(|p| if p == "#default" { String::new() } else { p.clone() })
        .collect();
    let mut output = Vec::new();
    let ctx = ExcC14nContext {
        with_comments,
        node_set,
        inclusive_prefixes,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

struct ExcC14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    inclusive_prefixes: BTreeSet<String>,
}

impl ExcC14nContext<'_> {
    fn is_visible(&self, node: &Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    fn process_node(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) {
        match node.node_type() {
            NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, rendered_ns);
                }
            }
            NodeType::Element => self.process_element(node, output, rendered_ns),
            _ => {
                if self.is_visible(&node) {
                    render::leaf(node, self.with_comments, output);
                }
            }
        }
    }

    fn utilized_prefixes(&self, node: Node<'_, '_>) -> BTreeSet<String> {
        let mut utilized = BTreeSet::new();
        utilized.insert(element_prefix(node).unwrap_or("").to_owned());
        for attr in node.attributes() {
            if attr.namespace() == Some(ns::XML) {
                continue;
            }
            if let Some(prefix) = attribute_prefix(node, &attr) {
                utilized.insert(prefix.to_owned());
            }
        }
        utilized.extend(self.inclusive_prefixes.iter().cloned());
        utilized
    }

    fn process_element(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) {
        if !self.is_visible(&node) {
            for child in node.children() {
                self.process_node(child, output, rendered_ns);
            }
            return;
        }

        let in_scope: BTreeMap<&str, &str> = in_scope_namespaces(node).into_iter().collect();
        let mut ns_decls = Vec::new();
        for prefix in self.utilized_prefixes(node) {
            let uri = in_scope.get(prefix.as_str()).copied().unwrap_or("");
            let already = rendered_ns.get(&prefix).map(String::as_str);
            let needed = if uri.is_empty() {
                // Only the default namespace can be undeclared, and only
                // when an output ancestor declared it.
                prefix.is_empty() && already.is_some_and(|u| !u.is_empty())
            } else {
                already != Some(uri)
            };
            if needed {
                ns_decls.push(NsDecl {
                    prefix,
                    uri: uri.to_owned(),
                });
            }
        }
        ns_decls.sort();

        let mut attrs = render::attributes(node);
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

        let child_rendered = if ns_decls.is_empty() {
            None
        } else {
            let mut map = rendered_ns.clone();
            for decl in ns_decls {
                map.insert(decl.prefix, decl.uri);
            }
            Some(map)
        };
        let child_rendered = child_rendered.as_ref().unwrap_or(rendered_ns);
        for child in node.children() {
            self.process_node(child, output, child_rendered);
        }

        render::end_tag(&elem_name, output);
    }
}
