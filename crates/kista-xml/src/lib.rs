#![forbid(unsafe_code)]

//! XML plumbing for the kista XML Security library.
//!
//! Reading goes through `roxmltree`; this crate adds the pieces it lacks:
//! source-accurate qualified names, node sets, a restricted XPath predicate
//! evaluator, an escaping writer, and [`Chunk`], the verbatim capsule used
//! to carry elements the object model does not interpret.

pub mod chunk;
pub mod document;
pub mod escape;
pub mod nodeset;
pub mod writer;
pub mod xpath;

pub use chunk::Chunk;
pub use nodeset::NodeSet;
pub use writer::XmlWriter;

use kista_core::Error;

/// Return roxmltree parsing options that allow DTD.
///
/// roxmltree never fetches external entities, so an internal subset is
/// harmless and common in interop vectors.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse `text` into a read-only tree.
pub fn parse(text: &str) -> Result<roxmltree::Document<'_>, Error> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e| Error::XmlParse(e.to_string()))
}
