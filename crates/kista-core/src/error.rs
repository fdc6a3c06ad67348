#![forbid(unsafe_code)]

/// Coarse classification of an [`Error`], for programmatic dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value fails a syntactic constraint (URI, name token, base64, integer).
    SchemaViolation,
    /// A semantically invalid combination of otherwise well-formed inputs.
    InvalidArgument,
    /// A required child element or attribute is absent.
    MissingElement,
    /// A child element occurs more often than allowed.
    TooManyElements,
    /// The environment cannot satisfy the request (e.g. no secure RNG).
    Runtime,
    /// The input is not well-formed XML.
    Parse,
    /// A cryptographic primitive rejected its input.
    Crypto,
    /// Reading key material or documents failed.
    Io,
}

/// Errors produced by the kista XML security library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("unexpected element: {0}")]
    InvalidElement(String),

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("too many elements: {0}")]
    TooManyElements(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("runtime failure: {0}")]
    Runtime(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::XmlParse(_) => ErrorKind::Parse,
            Error::InvalidElement(_) | Error::SchemaViolation(_) => ErrorKind::SchemaViolation,
            Error::InvalidArgument(_) | Error::UnsupportedAlgorithm(_) | Error::Key(_) => {
                ErrorKind::InvalidArgument
            }
            Error::MissingElement(_) | Error::MissingAttribute(_) => ErrorKind::MissingElement,
            Error::TooManyElements(_) => ErrorKind::TooManyElements,
            Error::Crypto(_) => ErrorKind::Crypto,
            Error::Runtime(_) => ErrorKind::Runtime,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::UnsupportedAlgorithm("x".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(Error::Key("x".into()).kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            Error::MissingAttribute("Algorithm".into()).kind(),
            ErrorKind::MissingElement
        );
        assert_eq!(
            Error::TooManyElements("KeySize".into()).kind(),
            ErrorKind::TooManyElements
        );
        assert_eq!(Error::Runtime("rng".into()).kind(), ErrorKind::Runtime);
    }

    #[test]
    fn test_display_carries_message() {
        let err = Error::MissingElement("CipherData".into());
        assert_eq!(err.to_string(), "missing required element: CipherData");
    }
}
