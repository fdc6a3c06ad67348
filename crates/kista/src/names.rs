#![forbid(unsafe_code)]

//! Short algorithm names for the command line.
//!
//! A name is either a full algorithm URI or the fragment after its `#`,
//! so `sha256`, `aes128-gcm` and `rsa-oaep-mgf1p` all resolve.

use kista_c14n::C14nMode;
use kista_core::{algorithm, Error};

fn lookup(table: &[&'static str], name: &str, role: &str) -> Result<&'static str, Error> {
    table
        .iter()
        .copied()
        .find(|uri| *uri == name || uri.rsplit_once('#').is_some_and(|(_, frag)| frag == name))
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("{role}: {name}")))
}

pub fn digest(name: &str) -> Result<&'static str, Error> {
    lookup(algorithm::DIGEST_ALGORITHMS, name, "digest")
}

pub fn block_cipher(name: &str) -> Result<&'static str, Error> {
    lookup(algorithm::BLOCK_CIPHER_ALGORITHMS, name, "block cipher")
}

pub fn key_transport(name: &str) -> Result<&'static str, Error> {
    lookup(algorithm::KEY_TRANSPORT_ALGORITHMS, name, "key transport")
}

/// `c14n`, `c14n-comments`, `exc-c14n` or `exc-c14n-comments`, or a URI.
pub fn c14n_mode(name: &str) -> Result<C14nMode, Error> {
    let mode = match name {
        "c14n" => Some(C14nMode::Inclusive),
        "c14n-comments" => Some(C14nMode::InclusiveWithComments),
        "exc-c14n" => Some(C14nMode::Exclusive),
        "exc-c14n-comments" => Some(C14nMode::ExclusiveWithComments),
        uri => C14nMode::from_uri(uri),
    };
    mode.ok_or_else(|| Error::UnsupportedAlgorithm(format!("canonicalization: {name}")))
}
