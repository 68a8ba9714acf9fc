//! Byte source shared by the tokenizer and the fast parser.
//!
//! A [`Stream`] either borrows a complete input buffer, or pulls chunks from a
//! [`Read`] implementation on demand. In the streaming case bytes before the
//! current mark are discarded as the buffer is refilled, so memory use is
//! bounded by the largest single token rather than by the document size.

use std::borrow::Cow;
use std::io::{self, Read};

use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::token::Position;

/// Number of bytes requested from a reader per refill.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

pub struct Stream<'a> {
    buf: Cow<'a, [u8]>,
    reader: Option<Box<dyn Read + 'a>>,
    chunk_size: usize,
    /// Cursor, as an index into `buf`.
    pos: usize,
    /// Absolute offset of `buf[0]`.
    base: usize,
    /// Absolute offset of the earliest byte that must be retained.
    mark: usize,
    row: usize,
    column: usize,
    error: Option<io::Error>,
}

impl<'a> Stream<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self::from_slice(text.as_bytes())
    }

    #[must_use]
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self {
            buf: Cow::Borrowed(bytes),
            reader: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pos: 0,
            base: 0,
            mark: 0,
            row: 1,
            column: 1,
            error: None,
        }
    }

    pub fn from_reader<R: Read + 'a>(reader: R) -> Self {
        Self::from_reader_with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn from_reader_with_chunk_size<R: Read + 'a>(reader: R, chunk_size: usize) -> Self {
        Self {
            buf: Cow::Owned(Vec::new()),
            reader: Some(Box::new(reader)),
            chunk_size: chunk_size.max(1),
            ..Self::from_slice(&[])
        }
    }

    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Position {
        Position {
            offset: self.offset(),
            row: self.row,
            column: self.column,
        }
    }

    /// Marks the current offset as the start of a lexeme. Bytes before the
    /// most recent mark may be discarded on refill.
    #[inline]
    pub fn mark(&mut self) -> usize {
        self.mark = self.offset();
        self.mark
    }

    /// Takes the I/O error that ended the input early, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    /// Ensures that at least `n` bytes are available after the cursor.
    /// Returns `false` if the input ends first.
    #[inline]
    pub fn fill(&mut self, n: usize) -> bool {
        while self.buf.len() - self.pos < n {
            if !self.read_more() {
                return false;
            }
        }
        true
    }

    fn read_more(&mut self) -> bool {
        let Some(reader) = self.reader.as_mut() else {
            return false;
        };
        let buf = self.buf.to_mut();

        let keep_from = self.mark.saturating_sub(self.base).min(self.pos);
        if keep_from > 0 && keep_from * 2 >= buf.len() {
            buf.drain(..keep_from);
            self.base += keep_from;
            self.pos -= keep_from;
        }

        let old_len = buf.len();
        buf.resize(old_len + self.chunk_size, 0);
        loop {
            match reader.read(&mut buf[old_len..]) {
                Ok(0) => {
                    buf.truncate(old_len);
                    self.reader = None;
                    return false;
                }
                Ok(n) => {
                    buf.truncate(old_len + n);
                    return true;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    buf.truncate(old_len);
                    self.error = Some(err);
                    self.reader = None;
                    return false;
                }
            }
        }
    }

    #[inline]
    pub fn is_eof(&mut self) -> bool {
        !self.fill(1)
    }

    #[inline]
    pub fn peek(&mut self) -> Option<u8> {
        self.peek_at(0)
    }

    #[inline]
    pub fn peek_at(&mut self, index: usize) -> Option<u8> {
        if self.fill(index + 1) {
            Some(self.buf[self.pos + index])
        } else {
            None
        }
    }

    #[inline]
    pub fn starts_with(&mut self, literal: &[u8]) -> bool {
        self.fill(literal.len()) && self.buf[self.pos..].starts_with(literal)
    }

    /// Moves the cursor forward by `n` bytes, keeping row and column current.
    pub fn advance(&mut self, n: usize) {
        let end = (self.pos + n).min(self.buf.len());
        let span = &self.buf[self.pos..end];
        match memchr::memrchr(b'\n', span) {
            Some(last) => {
                self.row += memchr::memchr_iter(b'\n', span).count();
                self.column = 1 + count_chars(&span[last + 1..]);
            }
            None => self.column += count_chars(span),
        }
        self.pos = end;
    }

    /// Consumes `literal` if the input continues with it.
    #[inline]
    pub fn eat(&mut self, literal: &[u8]) -> bool {
        if self.starts_with(literal) {
            self.advance(literal.len());
            true
        } else {
            false
        }
    }

    pub fn skip_whitespace(&mut self) {
        let mut n = 0;
        while self.peek_at(n).is_some_and(is_space) {
            n += 1;
        }
        if n > 0 {
            self.advance(n);
        }
    }

    /// Distance from the cursor to the next occurrence of `needle`.
    pub fn find(&mut self, needle: &[u8]) -> Option<usize> {
        let finder = memchr::memmem::Finder::new(needle);
        let mut from = 0;
        loop {
            if let Some(found) = finder.find(&self.buf[self.pos + from..]) {
                return Some(from + found);
            }
            let available = self.buf.len() - self.pos;
            from = available.saturating_sub(needle.len().saturating_sub(1));
            if !self.read_more() {
                return None;
            }
        }
    }

    /// Distance from the cursor to the next occurrence of `byte`.
    pub fn find_byte(&mut self, byte: u8) -> Option<usize> {
        let mut from = 0;
        loop {
            if let Some(found) = memchr::memchr(byte, &self.buf[self.pos + from..]) {
                return Some(from + found);
            }
            from = self.buf.len() - self.pos;
            if !self.read_more() {
                return None;
            }
        }
    }

    /// Length of the text run at the cursor, which ends at the next `<` or at
    /// the end of input.
    pub fn text_len(&mut self) -> usize {
        match self.find_byte(b'<') {
            Some(len) => len,
            None => self.buf.len() - self.pos,
        }
    }

    /// Length of the XML name at the cursor, or 0 if there is none.
    ///
    /// ASCII bytes are classified directly; anything else is decoded and
    /// accepted if it is an alphabetic character.
    pub fn name_len(&mut self) -> usize {
        let mut len = 0;
        while self.fill(len + 1) {
            let byte = self.buf[self.pos + len];
            if byte.is_ascii() {
                let valid = if len == 0 {
                    is_name_start(byte)
                } else {
                    is_name_char(byte)
                };
                if !valid {
                    break;
                }
                len += 1;
                continue;
            }

            let width = utf8_width(byte);
            if width == 0 || !self.fill(len + width) {
                break;
            }
            let start = self.pos + len;
            let Ok(encoded) = std::str::from_utf8(&self.buf[start..start + width]) else {
                break;
            };
            if !encoded.chars().next().is_some_and(char::is_alphabetic) {
                break;
            }
            len += width;
        }
        len
    }

    /// Length of the quoted string at the cursor including both quotes, or
    /// `None` if the closing quote is missing. A backslash escapes the byte
    /// after it.
    pub fn quoted_len(&mut self) -> Option<usize> {
        let quote = self.peek()?;
        let mut len = 1;
        loop {
            if !self.fill(len + 1) {
                return None;
            }
            let rest = &self.buf[self.pos + len..];
            match memchr::memchr2(quote, b'\\', rest) {
                Some(found) if rest[found] == quote => return Some(len + found + 1),
                Some(found) => len += found + 2,
                None => len += rest.len(),
            }
        }
    }

    /// Width of the character at the cursor, at least 1 if not at the end.
    pub fn char_len(&mut self) -> usize {
        match self.peek() {
            None => 0,
            Some(byte) => {
                let width = utf8_width(byte).max(1);
                if self.fill(width) { width } else { 1 }
            }
        }
    }

    /// The input between the absolute offset `start` and the cursor.
    ///
    /// `start` must not precede the most recent [`Stream::mark`].
    pub fn text_from(&self, start: usize) -> Result<Cow<'a, str>, SyntaxError> {
        let from = start - self.base;
        let text = match &self.buf {
            Cow::Borrowed(bytes) => {
                let bytes: &'a [u8] = *bytes;
                std::str::from_utf8(&bytes[from..self.pos]).map(Cow::Borrowed)
            }
            Cow::Owned(bytes) => {
                std::str::from_utf8(&bytes[from..self.pos]).map(|s| Cow::Owned(s.to_owned()))
            }
        };
        text.map_err(|_| SyntaxErrorKind::InvalidUtf8.at(self.position()))
    }

    /// Checks that the input between `start` and the cursor is valid UTF-8
    /// without copying it.
    pub fn check_text_from(&self, start: usize) -> Result<(), SyntaxError> {
        let from = start - self.base;
        match std::str::from_utf8(&self.buf[from..self.pos]) {
            Ok(_) => Ok(()),
            Err(_) => Err(SyntaxErrorKind::InvalidUtf8.at(self.position())),
        }
    }
}

#[inline]
#[must_use]
pub fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

#[inline]
fn is_name_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte == b':'
}

#[inline]
fn is_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b':' | b'.' | b'-')
}

#[inline]
fn utf8_width(lead: u8) -> usize {
    match lead {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

#[inline]
fn count_chars(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b & 0xC0 != 0x80).count()
}

/// Returns true if `name` is a complete XML name.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && Stream::new(name).name_len() == name.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Reads one byte per call, to exercise refilling and compaction.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((&first, rest)) if !buf.is_empty() => {
                    buf[0] = first;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    fn char_name_len(text: &str) -> usize {
        let mut len = 0;
        for (i, c) in text.char_indices() {
            let valid = if i == 0 {
                c.is_ascii_alphabetic() || c == '_' || c == ':' || (!c.is_ascii() && c.is_alphabetic())
            } else {
                c.is_ascii_alphanumeric()
                    || matches!(c, '_' | ':' | '.' | '-')
                    || (!c.is_ascii() && c.is_alphabetic())
            };
            if !valid {
                break;
            }
            len = i + c.len_utf8();
        }
        len
    }

    #[test]
    fn names() {
        assert_eq!(Stream::new("abc def").name_len(), 3);
        assert_eq!(Stream::new("ns:tag-1.x>").name_len(), 10);
        assert_eq!(Stream::new("1abc").name_len(), 0);
        assert_eq!(Stream::new("élément/>").name_len(), "élément".len());
        assert_eq!(Stream::new("a€b").name_len(), 1);
        assert!(is_valid_name("_x"));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn quoted_strings() {
        assert_eq!(Stream::new(r#""abc" x"#).quoted_len(), Some(5));
        assert_eq!(Stream::new(r#""a\"b""#).quoted_len(), Some(6));
        assert_eq!(Stream::new("'it''").quoted_len(), Some(4));
        assert_eq!(Stream::new(r#""abc"#).quoted_len(), None);
        assert_eq!(Stream::new(r#""abc\"#).quoted_len(), None);
    }

    #[test]
    fn positions() {
        let mut stream = Stream::new("ab\ncdé\nf");
        stream.advance(7);
        assert_eq!(
            stream.position(),
            Position {
                offset: 7,
                row: 2,
                column: 4
            }
        );
        stream.advance(3);
        assert_eq!(stream.position().row, 3);
        assert_eq!(stream.position().column, 2);
    }

    #[test]
    fn reader_refills_across_tokens() {
        let input = b"<root attr=\"value\">some text</root>";
        let mut stream = Stream::from_reader_with_chunk_size(Trickle(input), 1);
        assert!(stream.eat(b"<"));
        let start = stream.mark();
        let len = stream.name_len();
        stream.advance(len);
        assert_eq!(stream.text_from(start).unwrap(), "root");
        stream.skip_whitespace();
        assert_eq!(stream.find(b"</"), Some(22));
        assert_eq!(stream.offset(), 6);
        assert_eq!(stream.text_len(), 22);
    }

    #[test]
    fn find_across_chunk_boundary() {
        let input = b"xxxxxxxx-->";
        let mut stream = Stream::from_reader_with_chunk_size(&input[..], 3);
        assert_eq!(stream.find(b"-->"), Some(8));
    }

    #[test]
    fn invalid_utf8() {
        let mut stream = Stream::from_slice(b"a\xffb");
        let start = stream.mark();
        stream.advance(3);
        assert_eq!(
            stream.text_from(start).unwrap_err().kind,
            SyntaxErrorKind::InvalidUtf8
        );
    }

    proptest! {
        #[test]
        fn byte_and_char_name_scans_agree(text in "[a-z_:é€0-9.\\- ]{0,12}") {
            prop_assert_eq!(Stream::new(&text).name_len(), char_name_len(&text));
        }

        #[test]
        fn streaming_matches_slice(text in "[a-z<>\"' ]{0,40}") {
            let mut whole = Stream::new(&text);
            let mut streamed = Stream::from_reader_with_chunk_size(Trickle(text.as_bytes()), 2);
            prop_assert_eq!(whole.find_byte(b'<'), streamed.find_byte(b'<'));
            prop_assert_eq!(whole.text_len(), streamed.text_len());
        }
    }
}
