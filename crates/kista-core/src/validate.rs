#![forbid(unsafe_code)]

//! Syntactic checks for attribute and text values.
//!
//! Every function is pure and reports failure as [`Error::SchemaViolation`].

use crate::{Error, Result};
use base64::Engine;

/// Check that `value` is a well-formed URI reference.
///
/// The empty string is a valid same-document reference.
pub fn valid_uri(value: &str) -> Result<()> {
    let bad = |why: &str| Err(Error::SchemaViolation(format!("\"{value}\" is not a valid URI: {why}")));

    if let Some(c) = value
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || "<>\"{}|\\^`".contains(*c))
    {
        return bad(&format!("illegal character {c:?}"));
    }

    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let ok = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !ok {
                return bad("truncated percent escape");
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    // A scheme is everything before the first ':' when no '/', '?' or '#'
    // comes earlier.
    if let Some(colon) = value.find(':') {
        let head = &value[..colon];
        if !head.contains(&['/', '?', '#'][..]) {
            let mut chars = head.chars();
            let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
            if !starts_alpha
                || !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            {
                return bad("malformed scheme");
            }
        }
    }
    Ok(())
}

/// Check that `value` is an XML `NCName` (a name without a colon).
pub fn valid_ncname(value: &str) -> Result<()> {
    let mut chars = value.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c == '_' || c.is_alphabetic());
    let rest_ok = chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}'));
    if first_ok && rest_ok {
        Ok(())
    } else {
        Err(Error::SchemaViolation(format!("\"{value}\" is not a valid NCName")))
    }
}

/// Check that `value` is a media type: `type/subtype` made of RFC 2045
/// tokens, optionally followed by `;`-separated parameters.
pub fn valid_mime_type(value: &str) -> Result<()> {
    let is_token = |s: &str| {
        !s.is_empty()
            && s.chars().all(|c| {
                c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(c)
            })
    };
    let (media, params) = value.split_once(';').unwrap_or((value, ""));
    let media_ok = media
        .trim()
        .split_once('/')
        .is_some_and(|(t, sub)| is_token(t) && is_token(sub));
    let params_ok = params.is_empty()
        || params.split(';').all(|p| {
            p.trim()
                .split_once('=')
                .is_some_and(|(name, v)| is_token(name.trim()) && !v.trim().is_empty())
        });
    if media_ok && params_ok {
        Ok(())
    } else {
        Err(Error::SchemaViolation(format!("\"{value}\" is not a valid media type")))
    }
}

/// Check that `value` is base64, ignoring embedded whitespace.
pub fn valid_base64(value: &str) -> Result<()> {
    decode_base64(value).map(|_| ())
}

/// Decode base64 text as found in element content (whitespace allowed).
pub fn decode_base64(value: &str) -> Result<Vec<u8>> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::SchemaViolation(format!("invalid base64: {e}")))
}

/// Parse a non-negative decimal integer such as `KeySize` content.
pub fn valid_non_negative_int(value: &str) -> Result<u64> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::SchemaViolation(format!(
            "\"{value}\" is not a non-negative integer"
        )));
    }
    trimmed
        .parse::<u64>()
        .map_err(|e| Error::SchemaViolation(format!("\"{value}\" is out of range: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_uri_accepts_common_forms() {
        for uri in [
            "",
            "#id-1",
            "http://www.w3.org/2001/04/xmlenc#Element",
            "urn:oasis:names:tc:SAML:2.0:assertion",
            "relative/path?x=1",
            "file%20name.xml",
        ] {
            assert!(valid_uri(uri).is_ok(), "{uri}");
        }
    }

    #[test]
    fn test_uri_rejects_garbage() {
        for uri in ["has space", "1http://x", "a%2", "<tag>", "ht tp:x"] {
            let err = valid_uri(uri).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SchemaViolation, "{uri}");
        }
    }

    #[test]
    fn test_ncname() {
        assert!(valid_ncname("_abc-1.2").is_ok());
        assert!(valid_ncname("EncKey").is_ok());
        assert!(valid_ncname("").is_err());
        assert!(valid_ncname("1abc").is_err());
        assert!(valid_ncname("a:b").is_err());
    }

    #[test]
    fn test_mime_type() {
        for ok in ["text/xml", "application/octet-stream", "text/plain; charset=utf-8", "image/svg+xml"] {
            assert!(valid_mime_type(ok).is_ok(), "{ok}");
        }
        for bad in ["", "text", "text/", "/xml", "text/x ml", "text/xml; charset", "a/b/c"] {
            let err = valid_mime_type(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SchemaViolation, "{bad}");
        }
    }

    #[test]
    fn test_base64_with_whitespace() {
        assert_eq!(decode_base64("aGVs\n bG8=").unwrap(), b"hello");
        assert!(valid_base64("not base64!").is_err());
    }

    #[test]
    fn test_non_negative_int() {
        assert_eq!(valid_non_negative_int(" 256 ").unwrap(), 256);
        assert_eq!(valid_non_negative_int("0").unwrap(), 0);
        assert!(valid_non_negative_int("-1").is_err());
        assert!(valid_non_negative_int("12a").is_err());
    }
}
