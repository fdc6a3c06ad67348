#![forbid(unsafe_code)]

//! DSig context: the key and configuration for signature operations.

use kista_core::{algorithm, Error};
use kista_keys::Key;
use kista_xml::document::{build_id_map, build_unique_id_map};
use roxmltree::{Document, NodeId};
use std::collections::HashMap;

/// Context for XML-DSig operations.
#[derive(Debug, Clone)]
pub struct DsigContext {
    /// Key used to sign, or to verify the SignatureValue.
    pub key: Key,
    /// Additional ID attribute names for `#id` references.
    pub id_attrs: Vec<String>,
    /// Refuse SHA-1 based digests and signatures.
    pub reject_sha1: bool,
    /// Fail on a repeated ID value instead of resolving to the first
    /// element that carries it.
    pub reject_duplicate_ids: bool,
}

impl DsigContext {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            id_attrs: Vec::new(),
            reject_sha1: false,
            reject_duplicate_ids: false,
        }
    }

    /// Add an ID attribute name to register during processing.
    pub fn add_id_attr(&mut self, name: &str) {
        self.id_attrs.push(name.to_owned());
    }

    /// The ID map `#id` references resolve against.
    pub fn id_map(&self, doc: &Document<'_>) -> Result<HashMap<String, NodeId>, Error> {
        if self.reject_duplicate_ids {
            build_unique_id_map(doc, &self.id_attrs)
        } else {
            Ok(build_id_map(doc, &self.id_attrs))
        }
    }

    /// Fail if `uri` is an algorithm this context refuses.
    pub fn check_algorithm(&self, uri: &str) -> Result<(), Error> {
        if self.reject_sha1 && algorithm::is_sha1_based(uri) {
            tracing::warn!(algorithm = uri, "refusing SHA-1 based algorithm");
            return Err(Error::InvalidArgument(format!(
                "SHA-1 based algorithm refused: {uri}"
            )));
        }
        Ok(())
    }
}
