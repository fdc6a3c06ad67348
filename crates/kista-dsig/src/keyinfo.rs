#![forbid(unsafe_code)]

//! `<ds:KeyInfo>`: an opaque key locator container.
//!
//! Only `<ds:KeyName>` is interpreted; every other child is carried as a
//! [`Chunk`] and re-emitted unchanged.

use kista_core::{ns, validate, Error};
use kista_xml::document::{child_elements, expect_element, is_named, text_content};
use kista_xml::{Chunk, XmlWriter};
use roxmltree::Node;

/// One child of `<ds:KeyInfo>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInfoItem {
    KeyName(String),
    Other(Chunk),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfo {
    id: Option<String>,
    items: Vec<KeyInfoItem>,
}

impl KeyInfo {
    pub fn new(id: Option<String>, items: Vec<KeyInfoItem>) -> Result<Self, Error> {
        if let Some(id) = &id {
            validate::valid_ncname(id)?;
        }
        Ok(Self { id, items })
    }

    /// A KeyInfo holding a single KeyName.
    pub fn with_key_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            items: vec![KeyInfoItem::KeyName(name.into())],
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn items(&self) -> &[KeyInfoItem] {
        &self.items
    }

    /// The first KeyName, if any.
    pub fn key_name(&self) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            KeyInfoItem::KeyName(name) => Some(name.as_str()),
            KeyInfoItem::Other(_) => None,
        })
    }

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self, Error> {
        expect_element(node, ns::DSIG, ns::node::KEY_INFO)?;
        let items = child_elements(node)
            .map(|child| {
                if is_named(child, ns::DSIG, ns::node::KEY_NAME) {
                    Ok(KeyInfoItem::KeyName(text_content(child).trim().to_owned()))
                } else {
                    Chunk::from_node(child).map(KeyInfoItem::Other)
                }
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Self::new(node.attribute(ns::attr::ID).map(str::to_owned), items)
    }

    pub fn to_xml(&self, w: &mut XmlWriter) -> Result<(), Error> {
        w.start_element(ns::DSIG, ns::prefix::DSIG, ns::node::KEY_INFO)?;
        w.optional_attribute(ns::attr::ID, self.id.as_deref())?;
        for item in &self.items {
            match item {
                KeyInfoItem::KeyName(name) => {
                    w.text_element(ns::DSIG, ns::prefix::DSIG, ns::node::KEY_NAME, name)?
                }
                KeyInfoItem::Other(chunk) => w.raw(chunk.as_str())?,
            }
        }
        w.end_element()
    }
}
