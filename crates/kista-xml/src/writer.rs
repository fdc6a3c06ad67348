#![forbid(unsafe_code)]

//! A small streaming XML writer for emitting signature and encryption
//! structures.
//!
//! Namespace declarations are added automatically: starting an element in a
//! namespace whose prefix is not yet bound to it declares the binding on
//! that element.

use crate::escape;
use kista_core::Error;

struct Frame {
    qname: String,
    bindings: Vec<(String, String)>,
    empty: bool,
}

/// A streaming XML writer.
pub struct XmlWriter {
    out: String,
    stack: Vec<Frame>,
    tag_open: bool,
}

impl XmlWriter {
    /// Create a new XML writer.
    pub fn new() -> Self {
        Self {
            out: String::new(),
            stack: Vec::new(),
            tag_open: false,
        }
    }

    fn bound(&self, prefix: &str) -> Option<&str> {
        self.stack
            .iter()
            .rev()
            .flat_map(|f| f.bindings.iter())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn close_start_tag(&mut self) {
        if self.tag_open {
            self.out.push('>');
            self.tag_open = false;
        }
        if let Some(top) = self.stack.last_mut() {
            top.empty = false;
        }
    }

    /// Start an element `prefix:local` in namespace `ns_uri`.
    ///
    /// An empty `prefix` uses the default namespace.
    pub fn start_element(&mut self, ns_uri: &str, prefix: &str, local: &str) -> Result<(), Error> {
        self.close_start_tag();
        let qname = if prefix.is_empty() {
            local.to_owned()
        } else {
            format!("{prefix}:{local}")
        };
        self.out.push('<');
        self.out.push_str(&qname);

        let mut bindings = Vec::new();
        if self.bound(prefix).unwrap_or("") != ns_uri {
            if prefix.is_empty() {
                self.out.push_str(" xmlns");
            } else {
                self.out.push_str(" xmlns:");
                self.out.push_str(prefix);
            }
            self.out.push_str("=\"");
            self.out.push_str(&escape::escape_attr(ns_uri));
            self.out.push('"');
            bindings.push((prefix.to_owned(), ns_uri.to_owned()));
        }

        self.stack.push(Frame {
            qname,
            bindings,
            empty: true,
        });
        self.tag_open = true;
        Ok(())
    }

    /// Add an unqualified attribute to the element just started.
    pub fn attribute(&mut self, name: &str, value: &str) -> Result<(), Error> {
        if !self.tag_open {
            return Err(Error::InvalidArgument(format!(
                "attribute {name} written outside a start tag"
            )));
        }
        self.out.push(' ');
        self.out.push_str(name);
        self.out.push_str("=\"");
        self.out.push_str(&escape::escape_attr(value));
        self.out.push('"');
        Ok(())
    }

    /// Declare `prefix` on the element just started, unless that binding is
    /// already in scope.
    pub fn namespace(&mut self, prefix: &str, ns_uri: &str) -> Result<(), Error> {
        if !self.tag_open {
            return Err(Error::InvalidArgument(format!(
                "namespace {prefix} declared outside a start tag"
            )));
        }
        if self.bound(prefix) == Some(ns_uri) {
            return Ok(());
        }
        if prefix.is_empty() {
            self.out.push_str(" xmlns=\"");
        } else {
            self.out.push_str(" xmlns:");
            self.out.push_str(prefix);
            self.out.push_str("=\"");
        }
        self.out.push_str(&escape::escape_attr(ns_uri));
        self.out.push('"');
        if let Some(top) = self.stack.last_mut() {
            top.bindings.push((prefix.to_owned(), ns_uri.to_owned()));
        }
        Ok(())
    }

    /// Add an attribute only when `value` is present.
    pub fn optional_attribute(&mut self, name: &str, value: Option<&str>) -> Result<(), Error> {
        match value {
            Some(v) => self.attribute(name, v),
            None => Ok(()),
        }
    }

    /// Write text content.
    pub fn text(&mut self, text: &str) -> Result<(), Error> {
        self.close_start_tag();
        self.out.push_str(&escape::escape_text(text));
        Ok(())
    }

    /// Insert a pre-serialized, self-contained fragment verbatim.
    pub fn raw(&mut self, fragment: &str) -> Result<(), Error> {
        self.close_start_tag();
        self.out.push_str(fragment);
        Ok(())
    }

    /// End the current element.
    pub fn end_element(&mut self) -> Result<(), Error> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::InvalidArgument("end_element without open element".into()))?;
        if frame.empty && self.tag_open {
            self.out.push_str("/>");
            self.tag_open = false;
        } else {
            self.close_start_tag();
            self.out.push_str("</");
            self.out.push_str(&frame.qname);
            self.out.push('>');
        }
        Ok(())
    }

    /// Write `<prefix:local>text</prefix:local>`.
    pub fn text_element(
        &mut self,
        ns_uri: &str,
        prefix: &str,
        local: &str,
        text: &str,
    ) -> Result<(), Error> {
        self.start_element(ns_uri, prefix, local)?;
        self.text(text)?;
        self.end_element()
    }

    /// Finish writing and return the XML as a string.
    pub fn into_string(self) -> Result<String, Error> {
        if let Some(frame) = self.stack.last() {
            return Err(Error::InvalidArgument(format!(
                "element {} left open",
                frame.qname
            )));
        }
        Ok(self.out)
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENC: &str = "http://www.w3.org/2001/04/xmlenc#";
    const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

    #[test]
    fn test_declares_namespaces_once() {
        let mut w = XmlWriter::new();
        w.start_element(ENC, "xenc", "EncryptedKey").unwrap();
        w.attribute("Id", "k&1").unwrap();
        w.start_element(DSIG, "ds", "KeyInfo").unwrap();
        w.text_element(DSIG, "ds", "KeyName", "a<b").unwrap();
        w.end_element().unwrap();
        w.start_element(ENC, "xenc", "CipherData").unwrap();
        w.end_element().unwrap();
        w.end_element().unwrap();
        assert_eq!(
            w.into_string().unwrap(),
            format!(
                r#"<xenc:EncryptedKey xmlns:xenc="{ENC}" Id="k&amp;1"><ds:KeyInfo xmlns:ds="{DSIG}"><ds:KeyName>a&lt;b</ds:KeyName></ds:KeyInfo><xenc:CipherData/></xenc:EncryptedKey>"#
            )
        );
    }

    #[test]
    fn test_misuse_is_an_error() {
        let mut w = XmlWriter::new();
        assert!(w.end_element().is_err());
        w.start_element(ENC, "xenc", "A").unwrap();
        w.text("x").unwrap();
        assert!(w.attribute("late", "1").is_err());
        assert!(w.into_string().is_err());
    }

    #[test]
    fn test_extra_namespace_declaration() {
        let mut w = XmlWriter::new();
        w.start_element(DSIG, "ds", "XPath").unwrap();
        w.namespace("ds", DSIG).unwrap();
        w.namespace("soap", "urn:soap").unwrap();
        w.text("not(ancestor-or-self::soap:Body)").unwrap();
        w.end_element().unwrap();
        assert_eq!(
            w.into_string().unwrap(),
            format!(r#"<ds:XPath xmlns:ds="{DSIG}" xmlns:soap="urn:soap">not(ancestor-or-self::soap:Body)</ds:XPath>"#)
        );
    }
}
