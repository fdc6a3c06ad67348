#![forbid(unsafe_code)]

//! Document subsets for canonicalization.
//!
//! A `NodeSet` holds tree nodes (elements, text, comments, PIs and the
//! document root) of one parsed document. Attribute and namespace nodes are
//! not tracked separately: they belong to the set exactly when their owner
//! element does.

use roxmltree::{Document, Node, NodeId};
use std::collections::HashSet;

/// A set of XML document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
}

impl NodeSet {
    /// Every node of the document, optionally without comments.
    ///
    /// `URI=""` selects the document without comments.
    pub fn document(doc: &Document<'_>, with_comments: bool) -> Self {
        Self::tree(doc.root(), with_comments)
    }

    /// `node` and all its descendants, optionally without comments.
    pub fn tree(node: Node<'_, '_>, with_comments: bool) -> Self {
        let nodes = node
            .descendants()
            .filter(|n| with_comments || !n.is_comment())
            .map(|n| n.id())
            .collect();
        Self { nodes }
    }

    /// Nodes of the subtree at `node` for which `keep` holds.
    pub fn filtered<F>(node: Node<'_, '_>, mut keep: F) -> Self
    where
        F: FnMut(Node<'_, '_>) -> bool,
    {
        let nodes = node
            .descendants()
            .filter(|n| keep(*n))
            .map(|n| n.id())
            .collect();
        Self { nodes }
    }

    /// Check if a node is in this set.
    pub fn contains(&self, node: &Node<'_, '_>) -> bool {
        self.nodes.contains(&node.id())
    }

    /// Nodes of `self` that are not in `other`.
    pub fn subtract(&self, other: &NodeSet) -> NodeSet {
        NodeSet {
            nodes: self.nodes.difference(&other.nodes).copied().collect(),
        }
    }

    /// Check if this set is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in the set.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = "<a><!--c--><b>t</b><c/></a>";

    #[test]
    fn test_tree_without_comments() {
        let doc = crate::parse(XML).unwrap();
        let with = NodeSet::document(&doc, true);
        let without = NodeSet::document(&doc, false);
        // root, a, comment, b, text, c
        assert_eq!(with.len(), 6);
        assert_eq!(without.len(), 5);
        let comment = doc.descendants().find(|n| n.is_comment()).unwrap();
        assert!(with.contains(&comment));
        assert!(!without.contains(&comment));
    }

    #[test]
    fn test_subtract() {
        let doc = crate::parse(XML).unwrap();
        let all = NodeSet::document(&doc, true);
        let b = doc.descendants().find(|n| n.has_tag_name("b")).unwrap();
        let b_tree = NodeSet::tree(b, true);
        let rest = all.subtract(&b_tree);
        assert_eq!(rest.len(), 4);
        assert!(!rest.contains(&b));
        assert!(rest.contains(&doc.root_element()));
        assert!(all.subtract(&all).is_empty());
        assert_eq!(b_tree.subtract(&rest), b_tree);
    }

    #[test]
    fn test_filtered() {
        let doc = crate::parse(XML).unwrap();
        let elements = NodeSet::filtered(doc.root(), |n| n.is_element());
        assert_eq!(elements.len(), 3);
    }
}
