#![forbid(unsafe_code)]

//! XML Canonicalization (C14N) for the kista XML Security library.
//!
//! Implements the four W3C variants used by XML-DSig:
//! - Canonical XML 1.0 (with and without comments)
//! - Exclusive Canonical XML 1.0 (with and without comments)
//!
//! [`canonicalize`] also decides *where* canonicalization starts: a
//! document element with nothing significant in front of it is promoted to
//! the whole document, see [`boundary_root`].

pub mod exclusive;
pub mod inclusive;
pub mod render;

use kista_core::{algorithm, Error};
use kista_xml::xpath::Predicate;
use kista_xml::NodeSet;
use roxmltree::{Document, Node, NodeType};

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum C14nMode {
    /// Canonical XML 1.0
    Inclusive,
    /// Canonical XML 1.0 with comments
    InclusiveWithComments,
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    pub const ALL: [C14nMode; 4] = [
        Self::Inclusive,
        Self::InclusiveWithComments,
        Self::Exclusive,
        Self::ExclusiveWithComments,
    ];

    /// Get the algorithm URI for this mode.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Inclusive => algorithm::C14N,
            Self::InclusiveWithComments => algorithm::C14N_WITH_COMMENTS,
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Parse a C14N mode from an algorithm URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::C14N => Some(Self::Inclusive),
            algorithm::C14N_WITH_COMMENTS => Some(Self::InclusiveWithComments),
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    pub fn with_comments(&self) -> bool {
        matches!(self, Self::InclusiveWithComments | Self::ExclusiveWithComments)
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }

    /// The same family with comments stripped.
    pub fn without_comments(&self) -> Self {
        if self.is_exclusive() {
            Self::Exclusive
        } else {
            Self::Inclusive
        }
    }
}

impl Default for C14nMode {
    fn default() -> Self {
        Self::Exclusive
    }
}

/// Where unfiltered canonicalization of `node` starts.
///
/// For the document element, walk back through its preceding siblings. A
/// processing instruction, or a comment when `mode` keeps comments, means
/// the element itself is the starting point. Otherwise the owning document
/// node is, so document-level siblings are treated the way whole-document
/// canonicalization treats them. Any other node is returned unchanged.
pub fn boundary_root<'a, 'input>(node: Node<'a, 'input>, mode: C14nMode) -> Node<'a, 'input> {
    let is_document_element = node.is_element()
        && node
            .parent()
            .is_some_and(|p| p.node_type() == NodeType::Root);
    if !is_document_element {
        return node;
    }

    let mut sibling = node.prev_sibling();
    while let Some(s) = sibling {
        let qualifies = match s.node_type() {
            NodeType::PI => true,
            NodeType::Comment => mode.with_comments(),
            _ => false,
        };
        if qualifies {
            tracing::debug!("leading {:?} before document element, not promoting", s.node_type());
            return node;
        }
        sibling = s.prev_sibling();
    }

    tracing::debug!("promoting document element to document node");
    node.document().root()
}

/// Canonicalize `node`.
///
/// With an `xpath` filter, the output is the document subset
/// `(.//. | .//@* | .//namespace::*)[xpath]` evaluated at `node`. Without
/// one, the document-boundary rule of [`boundary_root`] applies.
/// `inclusive_prefixes` is only consulted by the exclusive modes.
pub fn canonicalize(
    node: Node<'_, '_>,
    mode: C14nMode,
    xpath: Option<&Predicate>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let doc = node.document();
    if let Some(predicate) = xpath {
        let mut subset = predicate.select(node);
        if !mode.with_comments() {
            subset = subset.subtract(&NodeSet::filtered(node, |n| n.is_comment()));
        }
        return canonicalize_subset(doc, mode, &subset, inclusive_prefixes);
    }

    let start = boundary_root(node, mode);
    if start.node_type() == NodeType::Root {
        dispatch(doc, mode, None, inclusive_prefixes)
    } else {
        let subset = NodeSet::tree(start, mode.with_comments());
        dispatch(doc, mode, Some(&subset), inclusive_prefixes)
    }
}

/// Canonicalize the part of `doc` selected by `node_set`.
pub fn canonicalize_subset(
    doc: &Document<'_>,
    mode: C14nMode,
    node_set: &NodeSet,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    dispatch(doc, mode, Some(node_set), inclusive_prefixes)
}

/// Parse `xml` and canonicalize its document element.
pub fn canonicalize_str(
    xml: &str,
    mode: C14nMode,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let doc = kista_xml::parse(xml)?;
    canonicalize(doc.root_element(), mode, None, inclusive_prefixes)
}

fn dispatch(
    doc: &Document<'_>,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    if mode.is_exclusive() {
        exclusive::canonicalize(doc, mode.with_comments(), node_set, inclusive_prefixes)
    } else {
        inclusive::canonicalize(doc, mode.with_comments(), node_set)
    }
}
