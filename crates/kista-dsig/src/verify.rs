#![forbid(unsafe_code)]

//! XML-DSig signature verification.
//!
//! Processing order:
//! 1. Parse `<ds:Signature>` and register ID attributes
//! 2. For each `<ds:Reference>`: dereference, canonicalize, compare digest
//! 3. Canonicalize `<ds:SignedInfo>`
//! 4. Verify `<ds:SignatureValue>` with the context key
//!
//! A digest or signature mismatch is a [`VerifyResult::Invalid`]; malformed
//! structure, unsupported algorithms and key mismatches are errors.

use crate::context::DsigContext;
use crate::signature::{canonicalize_signed_info, Signature};
use kista_core::{ns, Error};
use kista_xml::document::{find_element, required_child};
use roxmltree::Node;

/// Result of signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// Signature is valid.
    Valid,
    /// Signature is invalid.
    Invalid { reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid)
    }
}

/// Verify the first `<ds:Signature>` in `xml`.
pub fn verify_signature(ctx: &DsigContext, xml: &str) -> Result<VerifyResult, Error> {
    let doc = kista_xml::parse(xml)?;
    let sig_node = find_element(&doc, ns::DSIG, ns::node::SIGNATURE)
        .ok_or_else(|| Error::MissingElement("Signature".into()))?;
    verify_node(ctx, sig_node)
}

/// Verify a `<ds:Signature>` element inside an already parsed document.
pub fn verify_node(ctx: &DsigContext, sig_node: Node<'_, '_>) -> Result<VerifyResult, Error> {
    let signature = Signature::from_xml(sig_node)?;
    let signed_info = signature.signed_info();
    let sig_method = signed_info.signature_method().algorithm();
    ctx.check_algorithm(sig_method)?;

    // Bind the key before touching any data.
    let engine = kista_crypto::AlgorithmRegistry::signature(sig_method, &ctx.key)?;

    let doc = sig_node.document();
    let id_map = ctx.id_map(doc)?;
    for (index, reference) in signed_info.references().iter().enumerate() {
        ctx.check_algorithm(reference.digest_method().algorithm())?;
        if !reference.verify(doc, Some(sig_node), &id_map)? {
            let uri = reference.uri().unwrap_or("");
            tracing::debug!(index, uri, "reference digest mismatch");
            return Ok(VerifyResult::Invalid {
                reason: format!("Reference {index} (URI=\"{uri}\"): digest mismatch"),
            });
        }
    }

    let signed_info_node = required_child(sig_node, ns::DSIG, ns::node::SIGNED_INFO)?;
    let canonical = canonicalize_signed_info(signed_info_node, signed_info.canonicalization_method())?;

    if engine.verify(&canonical, signature.signature_value())? {
        tracing::debug!(algorithm = sig_method, "signature valid");
        Ok(VerifyResult::Valid)
    } else {
        tracing::debug!(algorithm = sig_method, "signature value mismatch");
        Ok(VerifyResult::Invalid {
            reason: "signature value verification failed".into(),
        })
    }
}
