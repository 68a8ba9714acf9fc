//! Serializing trees and native values back to XML.
//!
//! Output is deterministic. Attributes come first in sorted order, then text,
//! then CDATA, then child elements in sorted order. Repeated children are
//! expanded into sibling elements.
//!
//! Rendering never fails. Entries a parser cannot produce are skipped: an
//! `@` key whose value is not a literal, and `#` keys other than `#text` and
//! `#cdata`. Use [`from_native_value`](crate::from_native_value) to reject
//! such input instead.

use crate::tree::{ATTRIBUTE_PREFIX, CDATA_KEY, Node, TEXT_KEY};
use crate::value::Value;
use crate::writer::Writer;

/// Controls how documents are written.
#[derive(Clone, Debug)]
pub struct RenderSettings<'a> {
    /// Tag of the root element when the value being written does not name
    /// its own. Defaults to `root`.
    pub root_tag: &'a str,
    /// Written at the start of every line when indenting.
    pub prefix: &'a str,
    /// One level of indentation. `None` writes everything on one line.
    pub indent: Option<&'a str>,
}

impl Default for RenderSettings<'_> {
    #[inline]
    fn default() -> Self {
        Self {
            root_tag: "root",
            prefix: "",
            indent: None,
        }
    }
}

impl<'a> RenderSettings<'a> {
    #[must_use]
    pub fn indented(prefix: &'a str, indent: &'a str) -> Self {
        Self {
            prefix,
            indent: Some(indent),
            ..Self::default()
        }
    }

    pub(crate) fn writer(&self) -> Writer {
        match self.indent {
            Some(indent) => Writer::indented(self.prefix, indent),
            None => Writer::new(),
        }
    }
}

/// Element content as seen by the renderer.
pub(crate) trait Renderable {
    fn as_text(&self) -> Option<&str>;
    fn as_list(&self) -> Option<&[Self]>
    where
        Self: Sized;
    /// Entries of an element, sorted by key. Empty for text and lists.
    fn entries(&self) -> Vec<(&str, &Self)>;
}

impl Renderable for Node {
    fn as_text(&self) -> Option<&str> {
        self.as_str()
    }

    fn as_list(&self) -> Option<&[Self]> {
        self.as_array()
    }

    fn entries(&self) -> Vec<(&str, &Self)> {
        let Some(object) = self.as_object() else {
            return Vec::new();
        };
        let mut entries: Vec<_> = object
            .properties
            .iter()
            .map(|(key, node)| (key.as_str(), node))
            .collect();
        entries.sort_unstable_by_key(|&(key, _)| key);
        entries
    }
}

impl Renderable for Value {
    fn as_text(&self) -> Option<&str> {
        self.as_str()
    }

    fn as_list(&self) -> Option<&[Self]> {
        Value::as_list(self)
    }

    fn entries(&self) -> Vec<(&str, &Self)> {
        let Some(map) = self.as_map() else {
            return Vec::new();
        };
        let mut entries: Vec<_> = map.iter().map(|(key, value)| (key.as_str(), value)).collect();
        entries.sort_unstable_by_key(|&(key, _)| key);
        entries
    }
}

/// Writes `content` as one element named `name`, or as one sibling per item
/// if it is a list.
pub(crate) fn write_element<R: Renderable>(w: &mut Writer, name: &str, content: &R) {
    if let Some(items) = content.as_list() {
        for item in items {
            write_element(w, name, item);
        }
        return;
    }

    w.start(name);
    if let Some(text) = content.as_text() {
        w.text(text);
        w.end(name);
        return;
    }

    let entries = content.entries();
    for &(key, value) in &entries {
        if let (Some(attribute), Some(text)) = (key.strip_prefix(ATTRIBUTE_PREFIX), value.as_text()) {
            w.attribute(attribute, text);
        }
    }
    if let Some(text) = lookup(&entries, TEXT_KEY) {
        w.text(text);
    }
    if let Some(cdata) = lookup(&entries, CDATA_KEY) {
        w.cdata(cdata);
    }
    for &(key, value) in &entries {
        if !key.starts_with(ATTRIBUTE_PREFIX) && !key.starts_with('#') {
            write_element(w, key, value);
        }
    }
    w.end(name);
}

fn lookup<'a, R: Renderable>(entries: &[(&str, &'a R)], key: &str) -> Option<&'a str> {
    let index = entries.binary_search_by_key(&key, |&(k, _)| k).ok()?;
    entries[index].1.as_text()
}

impl RenderSettings<'_> {
    pub(crate) fn render<R: Renderable>(&self, root: &R) -> Vec<u8> {
        let mut w = self.writer();
        write_element(&mut w, self.root_tag, root);
        w.finish()
    }
}

/// Renders a tree compactly, naming the root element `root`.
///
/// Attributes holding objects or arrays, and unknown `#` keys, are skipped.
#[must_use]
pub fn render(tree: &Node) -> Vec<u8> {
    RenderSettings::default().render(tree)
}

/// Renders a tree with every element on its own line.
#[must_use]
pub fn render_indented(tree: &Node, prefix: &str, indent: &str) -> Vec<u8> {
    RenderSettings::indented(prefix, indent).render(tree)
}

#[must_use]
pub fn render_with_settings(tree: &Node, settings: &RenderSettings<'_>) -> Vec<u8> {
    settings.render(tree)
}

/// Renders a native value the same way as a tree.
#[must_use]
pub fn render_value(value: &Value, settings: &RenderSettings<'_>) -> Vec<u8> {
    settings.render(value)
}
