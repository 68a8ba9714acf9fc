//! Entity and backslash escaping for text content and attribute values.
//!
//! Output always uses the five named entities (`&amp; &lt; &gt; &quot;
//! &apos;`). Input accepts those plus numeric character references; an
//! unknown or malformed reference is kept verbatim.

use std::borrow::Cow;

/// Whitespace trimmed from the edges of element text.
pub const WHITESPACE: [char; 4] = [' ', '\t', '\n', '\r'];

#[inline]
#[must_use]
pub fn escape(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

/// References longer than this are not looked up.
const MAX_REFERENCE: usize = 32;

/// Resolves the predefined entities and numeric character references in
/// `text`. Each reference is resolved on its own: an unknown or malformed one
/// (including a bare `&`) is kept verbatim without affecting its neighbours.
#[must_use]
pub fn unescape(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let Some(mut at) = memchr::memchr(b'&', bytes) else {
        return Cow::Borrowed(text);
    };
    let mut decoded = String::with_capacity(text.len());
    let mut copied = 0;
    loop {
        let window = &bytes[at..bytes.len().min(at + MAX_REFERENCE)];
        if let Some(semicolon) = memchr::memchr(b';', window) {
            let reference = &text[at..=at + semicolon];
            match quick_xml::escape::unescape(reference) {
                Ok(resolved) => {
                    decoded.push_str(&text[copied..at]);
                    decoded.push_str(&resolved);
                    copied = at + semicolon + 1;
                }
                Err(err) => log::trace!("keeping {reference:?} verbatim: {err}"),
            }
        }
        let from = copied.max(at + 1);
        match memchr::memchr(b'&', &bytes[from..]) {
            Some(next) => at = from + next,
            None => break,
        }
    }
    if copied == 0 {
        return Cow::Borrowed(text);
    }
    decoded.push_str(&text[copied..]);
    Cow::Owned(decoded)
}

/// Appends escaped character data. Leading and trailing whitespace is written
/// as character references, since parsers trim it from literal text.
pub fn write_text(out: &mut Vec<u8>, text: &str) {
    let rest = text.trim_start_matches(WHITESPACE);
    let body = rest.trim_end_matches(WHITESPACE);
    write_references(out, &text[..text.len() - rest.len()]);
    out.extend_from_slice(escape(body).as_bytes());
    write_references(out, &rest[body.len()..]);
}

fn write_references(out: &mut Vec<u8>, whitespace: &str) {
    for c in whitespace.chars() {
        out.extend_from_slice(format!("&#{};", u32::from(c)).as_bytes());
    }
}

/// Decodes the inside of a quoted attribute value: backslash escapes first,
/// then entity references.
#[must_use]
pub fn decode_attribute(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return unescape(raw);
    }
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped @ ('\\' | '"' | '\'')) => decoded.push(escaped),
            Some('n') => decoded.push('\n'),
            Some('t') => decoded.push('\t'),
            Some('r') => decoded.push('\r'),
            Some(other) => {
                decoded.push('\\');
                decoded.push(other);
            }
            None => decoded.push('\\'),
        }
    }
    Cow::Owned(unescape(&decoded).into_owned())
}

/// Strips the surrounding quotes from a quoted-string lexeme.
#[inline]
#[must_use]
pub fn unquote(lexeme: &str) -> &str {
    lexeme
        .get(1..lexeme.len().saturating_sub(1))
        .unwrap_or_default()
}

/// Appends an attribute value, escaped so that [`decode_attribute`] restores
/// it exactly.
pub fn write_attribute_value(out: &mut Vec<u8>, value: &str) {
    if !value.contains('\\') {
        out.extend_from_slice(escape(value).as_bytes());
        return;
    }
    let mut protected = String::with_capacity(value.len() + 4);
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        protected.push(c);
        if c == '\\'
            && chars
                .peek()
                .is_none_or(|next| matches!(next, '\\' | '"' | '\'' | 'n' | 't' | 'r'))
        {
            protected.push('\\');
        }
    }
    out.extend_from_slice(escape(&protected).as_bytes());
}
