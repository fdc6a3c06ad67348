#![forbid(unsafe_code)]

//! XML-DSig signature creation from a template.
//!
//! The template carries a complete `<ds:Signature>` whose `<ds:DigestValue>`
//! and `<ds:SignatureValue>` elements are empty. Each empty value is filled
//! in place, so the rest of the document keeps its exact source text.

use crate::context::DsigContext;
use crate::signature::{canonicalize_signed_info, Signature};
use base64::Engine;
use kista_core::{ns, Error};
use kista_keys::Key;
use kista_xml::document::{
    element_qname, find_child_elements, find_element, required_child, text_content,
};
use roxmltree::Node;
use std::ops::Range;

/// Sign `template_xml` with `key`.
pub fn sign_template(template_xml: &str, key: &Key) -> Result<String, Error> {
    sign_template_with_context(&DsigContext::new(key.clone()), template_xml)
}

/// Sign `template_xml` with the key and ID attributes of `ctx`.
///
/// Returns the signed document.
pub fn sign_template_with_context(ctx: &DsigContext, template_xml: &str) -> Result<String, Error> {
    // Pass 1: digests.
    let doc = kista_xml::parse(template_xml)?;
    let sig_node = find_signature(&doc)?;
    let signature = Signature::from_xml(sig_node)?;
    let sig_method = signature.signed_info().signature_method().algorithm();
    ctx.check_algorithm(sig_method)?;
    let engine = kista_crypto::AlgorithmRegistry::signature(sig_method, &ctx.key)?;

    let id_map = ctx.id_map(&doc)?;
    let signed_info_node = required_child(sig_node, ns::DSIG, ns::node::SIGNED_INFO)?;
    let reference_nodes = find_child_elements(signed_info_node, ns::DSIG, ns::node::REFERENCE);

    let mut edits = Vec::new();
    for (reference, node) in signature.signed_info().references().iter().zip(reference_nodes) {
        ctx.check_algorithm(reference.digest_method().algorithm())?;
        let value_node = required_child(node, ns::DSIG, ns::node::DIGEST_VALUE)?;
        if !is_empty(value_node) {
            continue;
        }
        let digest = reference.compute_digest(&doc, Some(sig_node), &id_map)?;
        tracing::debug!(uri = reference.uri().unwrap_or(""), "computed reference digest");
        edits.push(fill(value_node, &digest)?);
    }
    let digested = apply(template_xml, edits);

    // Pass 2: the signature over the completed SignedInfo.
    let doc = kista_xml::parse(&digested)?;
    let sig_node = find_signature(&doc)?;
    let signed_info_node = required_child(sig_node, ns::DSIG, ns::node::SIGNED_INFO)?;
    let canonical =
        canonicalize_signed_info(signed_info_node, signature.signed_info().canonicalization_method())?;
    let value_node = required_child(sig_node, ns::DSIG, ns::node::SIGNATURE_VALUE)?;
    if !is_empty(value_node) {
        return Err(Error::InvalidArgument(
            "template SignatureValue is not empty".into(),
        ));
    }
    let signature_value = engine.sign(&canonical)?;
    tracing::debug!(algorithm = sig_method, "signed SignedInfo");
    Ok(apply(&digested, vec![fill(value_node, &signature_value)?]))
}

fn find_signature<'a, 'input>(doc: &'a roxmltree::Document<'input>) -> Result<Node<'a, 'input>, Error> {
    find_element(doc, ns::DSIG, ns::node::SIGNATURE)
        .ok_or_else(|| Error::MissingElement("Signature".into()))
}

fn is_empty(node: Node<'_, '_>) -> bool {
    text_content(node).trim().is_empty()
}

/// Edit that writes the base64 `value` as the content of an empty value
/// element. The start tag is kept as written, attributes and namespace
/// declarations included.
fn fill(node: Node<'_, '_>, value: &[u8]) -> Result<(Range<usize>, String), Error> {
    let b64 = base64::engine::general_purpose::STANDARD.encode(value);
    let range = node.range();
    let element = node
        .document()
        .input_text()
        .get(range.clone())
        .ok_or_else(|| Error::Runtime("element range outside the source text".into()))?;
    let tag_end = start_tag_end(element).ok_or_else(|| {
        Error::XmlParse(format!("unterminated start tag of {}", node.tag_name().name()))
    })?;
    if element[..tag_end].ends_with('/') {
        let qname = element_qname(node);
        let start = range.start + tag_end - 1;
        return Ok((start..range.end, format!(">{b64}</{qname}>")));
    }
    let close = element
        .rfind("</")
        .ok_or_else(|| Error::XmlParse(format!("no end tag for {}", node.tag_name().name())))?;
    Ok((range.start + tag_end + 1..range.start + close, b64))
}

/// Offset of the `>` closing the start tag, skipping quoted attribute values.
fn start_tag_end(element: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in element.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

fn apply(source: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));
    let mut out = source.to_owned();
    for (range, text) in edits {
        out.replace_range(range, &text);
    }
    out
}
