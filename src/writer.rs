//! Byte-level XML output shared by the renderer and the encoder.

use crate::escape;
use crate::pool;

/// Appends XML to a pooled buffer.
///
/// The start tag of an element is left open until something is written into
/// it, so an element that receives no content is closed as `<name/>`.
pub struct Writer {
    buf: Vec<u8>,
    /// One entry per open element: whether it has child elements.
    stack: Vec<bool>,
    start_open: bool,
    written_element: bool,
    pretty: Option<(String, String)>,
}

impl Writer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: pool::take_buffer(),
            stack: Vec::new(),
            start_open: false,
            written_element: false,
            pretty: None,
        }
    }

    /// A writer that starts every element on its own line, preceded by
    /// `prefix` and one `indent` per level of nesting.
    #[must_use]
    pub fn indented(prefix: &str, indent: &str) -> Self {
        let mut writer = Self::new();
        writer.pretty = Some((prefix.to_owned(), indent.to_owned()));
        writer
    }

    pub fn start(&mut self, name: &str) {
        self.begin_child();
        self.buf.push(b'<');
        self.buf.extend_from_slice(name.as_bytes());
        self.stack.push(false);
        self.start_open = true;
    }

    /// Adds an attribute to the element that was just started.
    pub fn attribute(&mut self, name: &str, value: &str) {
        debug_assert!(self.start_open, "attribute written after element content");
        self.buf.push(b' ');
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.extend_from_slice(b"=\"");
        escape::write_attribute_value(&mut self.buf, value);
        self.buf.push(b'"');
    }

    /// Writes escaped character data. Empty text writes nothing.
    pub fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.close_start();
        escape::write_text(&mut self.buf, text);
    }

    /// Writes a CDATA section. A `]]>` inside `cdata` is split across two
    /// sections so the content reads back unchanged.
    pub fn cdata(&mut self, cdata: &str) {
        self.close_start();
        self.buf.extend_from_slice(b"<![CDATA[");
        let mut rest = cdata;
        while let Some(at) = rest.find("]]>") {
            self.buf.extend_from_slice(rest[..at + 2].as_bytes());
            self.buf.extend_from_slice(b"]]><![CDATA[");
            rest = &rest[at + 2..];
        }
        self.buf.extend_from_slice(rest.as_bytes());
        self.buf.extend_from_slice(b"]]>");
    }

    /// Writes a complete element produced elsewhere, as a child of the
    /// current element.
    pub fn raw(&mut self, element: &[u8]) {
        self.begin_child();
        self.buf.extend_from_slice(element);
    }

    /// Closes the innermost element, which must be named `name`.
    pub fn end(&mut self, name: &str) {
        let has_children = self.stack.pop().unwrap_or(false);
        if self.start_open {
            self.start_open = false;
            self.buf.extend_from_slice(b"/>");
            return;
        }
        if has_children {
            self.newline();
        }
        self.buf.extend_from_slice(b"</");
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.push(b'>');
    }

    /// Shorthand for an element holding only text.
    pub fn text_element(&mut self, name: &str, text: &str) {
        self.start(name);
        self.text(text);
        self.end(name);
    }

    /// Copies out everything written so far.
    #[must_use]
    pub fn finish(&mut self) -> Vec<u8> {
        self.close_start();
        self.buf.clone()
    }

    fn close_start(&mut self) {
        if self.start_open {
            self.start_open = false;
            self.buf.push(b'>');
        }
    }

    fn begin_child(&mut self) {
        self.close_start();
        if let Some(parent) = self.stack.last_mut() {
            *parent = true;
        }
        if self.written_element {
            self.newline();
        } else if let Some((prefix, _)) = &self.pretty {
            self.buf.extend_from_slice(prefix.as_bytes());
        }
        self.written_element = true;
    }

    fn newline(&mut self) {
        let Some((prefix, indent)) = &self.pretty else {
            return;
        };
        self.buf.push(b'\n');
        self.buf.extend_from_slice(prefix.as_bytes());
        for _ in 0..self.stack.len() {
            self.buf.extend_from_slice(indent.as_bytes());
        }
    }
}

impl Default for Writer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        pool::give_buffer(std::mem::take(&mut self.buf));
    }
}
