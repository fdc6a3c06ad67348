#![forbid(unsafe_code)]

//! Reduction of a transform chain to one canonicalization configuration.

use crate::transform::{Transform, XPath};
use kista_c14n::{boundary_root, C14nMode};
use kista_core::{algorithm, Error};
use kista_xml::NodeSet;
use roxmltree::Node;

/// The node-set filter selected by a chain's data-shaping transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeFilter {
    /// Keep the nodes for which the XPath predicate holds.
    XPath(XPath),
    /// Drop the enclosing `<ds:Signature>` subtree.
    EnvelopedSignature,
}

/// The resolved canonicalization configuration of a Reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct C14nConfig {
    pub mode: C14nMode,
    pub filter: Option<NodeFilter>,
    pub prefixes: Option<Vec<String>>,
}

/// Reduce `transforms` to a [`C14nConfig`].
///
/// - the mode starts as exclusive without comments, and each
///   canonicalization transform overwrites it
/// - a non-empty InclusiveNamespaces list is recorded and survives later
///   canonicalization transforms that carry none
/// - at most one XPath or enveloped-signature transform is allowed
/// - any other algorithm is rejected
pub fn resolve(transforms: &[Transform]) -> Result<C14nConfig, Error> {
    let mut config = C14nConfig::default();
    for transform in transforms {
        let uri = transform.algorithm();
        if let Some(mode) = C14nMode::from_uri(uri) {
            config.mode = mode;
            if let Some(prefixes) = transform.inclusive_namespaces() {
                if !prefixes.is_empty() {
                    config.prefixes = Some(prefixes.to_vec());
                }
            }
            continue;
        }

        let filter = match uri {
            algorithm::XPATH => {
                let xpath = transform.xpath().ok_or_else(|| {
                    Error::MissingElement("XPath transform without <ds:XPath>".into())
                })?;
                NodeFilter::XPath(xpath.clone())
            }
            algorithm::ENVELOPED_SIGNATURE => NodeFilter::EnvelopedSignature,
            other => {
                tracing::warn!(algorithm = other, "rejecting unsupported transform");
                return Err(Error::UnsupportedAlgorithm(format!("transform {other}")));
            }
        };
        if config.filter.is_some() {
            tracing::warn!(algorithm = uri, "rejecting second data-shaping transform");
            return Err(Error::InvalidArgument(
                "only one XPath or enveloped-signature transform per Reference is supported"
                    .into(),
            ));
        }
        config.filter = Some(filter);
    }

    tracing::debug!(
        mode = config.mode.uri(),
        filter = ?config.filter.as_ref().map(filter_name),
        prefixes = ?config.prefixes,
        "resolved transform chain"
    );
    Ok(config)
}

fn filter_name(filter: &NodeFilter) -> &'static str {
    match filter {
        NodeFilter::XPath(_) => "xpath",
        NodeFilter::EnvelopedSignature => "enveloped-signature",
    }
}

impl C14nConfig {
    /// A configuration with `mode` and nothing else.
    pub fn with_mode(mode: C14nMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn prefixes(&self) -> &[String] {
        self.prefixes.as_deref().unwrap_or(&[])
    }

    /// Canonicalize `target` under this configuration.
    ///
    /// `signature` is the `<ds:Signature>` element removed by the
    /// enveloped-signature filter; it is required only for that filter.
    pub fn canonicalize(
        &self,
        target: Node<'_, '_>,
        signature: Option<Node<'_, '_>>,
    ) -> Result<Vec<u8>, Error> {
        match &self.filter {
            None => kista_c14n::canonicalize(target, self.mode, None, self.prefixes()),
            Some(NodeFilter::XPath(xpath)) => {
                let predicate = xpath.predicate()?;
                kista_c14n::canonicalize(target, self.mode, Some(&predicate), self.prefixes())
            }
            Some(NodeFilter::EnvelopedSignature) => {
                let signature = signature.ok_or_else(|| {
                    Error::InvalidArgument(
                        "enveloped-signature transform outside a Signature".into(),
                    )
                })?;
                let start = boundary_root(target, self.mode);
                let subset = NodeSet::tree(start, self.mode.with_comments())
                    .subtract(&NodeSet::tree(signature, true));
                kista_c14n::canonicalize_subset(
                    target.document(),
                    self.mode,
                    &subset,
                    self.prefixes(),
                )
            }
        }
    }
}
