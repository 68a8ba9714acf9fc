//! Tree-less parser working directly on the byte stream.
//!
//! [`FastParser`] accepts exactly the grammar of the token-based
//! [`Parser`](crate::parser::Parser). Its output is chosen by a [`Sink`]:
//! [`Validate`] discards everything, [`Decode`] builds native [`Value`]s.

use std::borrow::Cow;
use std::marker::PhantomData;

use crate::error::{Error, Result, SyntaxErrorKind};
use crate::escape::{self, WHITESPACE};
use crate::parser::MAX_DEPTH;
use crate::stream::Stream;
use crate::token::Position;
use crate::tree::{ATTRIBUTE_PREFIX, CDATA_KEY, TEXT_KEY};
use crate::value::{self, Map, Value};

pub(crate) trait Sink {
    type Element;
    /// Whether decoded strings are wanted at all.
    const KEEP: bool;

    fn element() -> Self::Element;
    fn attribute(element: &mut Self::Element, name: &str, value: Cow<'_, str>);
    fn text(element: &mut Self::Element, text: String);
    fn cdata(element: &mut Self::Element, cdata: String);
    fn child(element: &mut Self::Element, name: String, child: Self::Element);
}

pub(crate) struct Validate;

impl Sink for Validate {
    type Element = ();
    const KEEP: bool = false;

    fn element() {}
    fn attribute(_: &mut (), _: &str, _: Cow<'_, str>) {}
    fn text(_: &mut (), _: String) {}
    fn cdata(_: &mut (), _: String) {}
    fn child(_: &mut (), _: String, _: ()) {}
}

pub(crate) struct Decode;

impl Sink for Decode {
    type Element = Map;
    const KEEP: bool = true;

    fn element() -> Map {
        Map::new()
    }

    fn attribute(element: &mut Map, name: &str, value: Cow<'_, str>) {
        element.insert(
            format!("{ATTRIBUTE_PREFIX}{name}"),
            Value::String(value.into_owned()),
        );
    }

    fn text(element: &mut Map, text: String) {
        element.insert(TEXT_KEY.to_owned(), Value::String(text));
    }

    fn cdata(element: &mut Map, cdata: String) {
        element.insert(CDATA_KEY.to_owned(), Value::String(cdata));
    }

    fn child(element: &mut Map, name: String, child: Map) {
        value::insert_child(element, name, Value::Map(child));
    }
}

pub(crate) struct FastParser<'a, S> {
    stream: Stream<'a>,
    depth: usize,
    sink: PhantomData<S>,
}

impl<'a, S: Sink> FastParser<'a, S> {
    pub fn new(stream: Stream<'a>) -> Self {
        Self {
            stream,
            depth: 0,
            sink: PhantomData,
        }
    }

    pub fn parse_document(mut self) -> Result<S::Element> {
        self.stream.skip_whitespace();
        if self.stream.starts_with(b"<?xml") {
            self.skip_section(5, b"?>", SyntaxErrorKind::UnterminatedDeclaration)?;
        }
        self.skip_misc()?;
        let (_, root) = self.parse_element()?;
        self.skip_misc()?;
        if !self.stream.is_eof() {
            return Err(self.fail(SyntaxErrorKind::TrailingContent));
        }
        if let Some(err) = self.stream.take_error() {
            return Err(Error::Io(err));
        }
        Ok(root)
    }

    /// Builds an error at the cursor, unless the input ended because of an
    /// I/O error, which is reported instead.
    fn fail(&mut self, kind: SyntaxErrorKind) -> Error {
        let position = self.stream.position();
        self.fail_at(kind, position)
    }

    fn fail_at(&mut self, kind: SyntaxErrorKind, position: Position) -> Error {
        match self.stream.take_error() {
            Some(err) => Error::Io(err),
            None => kind.at(position).into(),
        }
    }

    fn found(&mut self) -> String {
        match self.stream.peek() {
            None => "end of input".to_owned(),
            Some(byte) if byte.is_ascii() => format!("{:?}", byte as char),
            Some(byte) => format!("byte 0x{byte:02x}"),
        }
    }

    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.stream.skip_whitespace();
            if !self.stream.starts_with(b"<!--") {
                return Ok(());
            }
            self.skip_section(4, b"-->", SyntaxErrorKind::UnterminatedComment)?;
        }
    }

    /// Skips a delimited section whose opening delimiter of length `open` is
    /// at the cursor. The body must still be valid UTF-8.
    fn skip_section(&mut self, open: usize, terminator: &[u8], kind: SyntaxErrorKind) -> Result<()> {
        self.section(open, terminator, kind).map(drop)
    }

    /// Reads a delimited section, returning its body when the sink keeps text.
    fn section(
        &mut self,
        open: usize,
        terminator: &[u8],
        kind: SyntaxErrorKind,
    ) -> Result<Option<Cow<'a, str>>> {
        let position = self.stream.position();
        self.stream.advance(open);
        let start = self.stream.mark();
        let Some(len) = self.stream.find(terminator) else {
            return Err(self.fail_at(kind, position));
        };
        self.stream.advance(len);
        let body = self.lexeme(start)?;
        self.stream.advance(terminator.len());
        Ok(body)
    }

    /// The input from `start` to the cursor, validated as UTF-8 and only
    /// materialized when the sink keeps text.
    fn lexeme(&self, start: usize) -> Result<Option<Cow<'a, str>>> {
        if S::KEEP {
            Ok(Some(self.stream.text_from(start)?))
        } else {
            self.stream.check_text_from(start)?;
            Ok(None)
        }
    }

    fn read_name(&mut self, missing: SyntaxErrorKind) -> Result<Cow<'a, str>> {
        let start = self.stream.mark();
        let len = self.stream.name_len();
        if len == 0 {
            return Err(self.fail(missing));
        }
        self.stream.advance(len);
        Ok(self.stream.text_from(start)?)
    }

    fn parse_element(&mut self) -> Result<(Cow<'a, str>, S::Element)> {
        let position = self.stream.position();
        if !self.stream.eat(b"<") {
            let found = self.found();
            return Err(self.fail(SyntaxErrorKind::UnexpectedToken {
                expected: "'<'",
                found,
            }));
        }
        if self.depth >= MAX_DEPTH {
            return Err(SyntaxErrorKind::NestingTooDeep(MAX_DEPTH).at(position).into());
        }
        let name = self.read_name(SyntaxErrorKind::ExpectedElementName)?;
        let mut element = S::element();

        loop {
            self.stream.skip_whitespace();
            if self.stream.eat(b"/>") {
                return Ok((name, element));
            }
            if self.stream.eat(b">") {
                break;
            }
            if self.stream.is_eof() {
                return Err(self.fail(SyntaxErrorKind::UnexpectedEof));
            }
            self.parse_attribute(&mut element)?;
        }

        self.depth += 1;
        self.parse_content(&name, &mut element)?;
        self.depth -= 1;

        self.stream.advance(2);
        let close_position = self.stream.position();
        let close = self.read_name(SyntaxErrorKind::ExpectedClosingName)?;
        if close != name {
            return Err(SyntaxErrorKind::MismatchedTags {
                open: name.into_owned(),
                close: close.into_owned(),
            }
            .at(close_position)
            .into());
        }
        self.stream.skip_whitespace();
        if !self.stream.eat(b">") {
            let found = self.found();
            return Err(self.fail(SyntaxErrorKind::UnexpectedToken {
                expected: "'>'",
                found,
            }));
        }
        Ok((name, element))
    }

    fn parse_attribute(&mut self, element: &mut S::Element) -> Result<()> {
        let name = self.read_name(SyntaxErrorKind::ExpectedAttributeName)?;
        self.stream.skip_whitespace();
        if !self.stream.eat(b"=") {
            return Err(self.fail(SyntaxErrorKind::ExpectedEquals(name.into_owned())));
        }
        self.stream.skip_whitespace();

        let start = self.stream.mark();
        let quoted = match self.stream.peek() {
            Some(b'"' | b'\'') => self.stream.quoted_len(),
            _ => return Err(self.fail(SyntaxErrorKind::ExpectedAttributeValue(name.into_owned()))),
        };
        let Some(len) = quoted else {
            return Err(self.fail(SyntaxErrorKind::UnterminatedString));
        };
        self.stream.advance(len);
        if let Some(raw) = self.lexeme(start)? {
            S::attribute(element, &name, escape::decode_attribute(escape::unquote(&raw)));
        }
        Ok(())
    }

    fn parse_content(&mut self, name: &str, element: &mut S::Element) -> Result<()> {
        let mut text = String::new();
        let mut cdata: Option<String> = None;

        loop {
            if self.stream.is_eof() {
                return Err(self.fail(SyntaxErrorKind::UnclosedElement(name.to_owned())));
            }
            if self.stream.starts_with(b"</") {
                break;
            }
            if self.stream.starts_with(b"<!--") {
                self.skip_section(4, b"-->", SyntaxErrorKind::UnterminatedComment)?;
            } else if self.stream.starts_with(b"<![CDATA[") {
                let body = self.section(9, b"]]>", SyntaxErrorKind::UnterminatedCData)?;
                let content = cdata.get_or_insert_with(String::new);
                if let Some(body) = body {
                    content.push_str(&body);
                }
            } else if self.stream.starts_with(b"<?") {
                return Err(self.fail(SyntaxErrorKind::UnexpectedContent("processing instruction")));
            } else if self.stream.starts_with(b"<") {
                let (child_name, child) = self.parse_element()?;
                S::child(element, child_name.into_owned(), child);
            } else {
                let start = self.stream.mark();
                let len = self.stream.text_len();
                self.stream.advance(len);
                if let Some(run) = self.lexeme(start)? {
                    text.push_str(&run);
                }
            }
        }

        let trimmed = text.trim_matches(WHITESPACE);
        if !trimmed.is_empty() {
            S::text(element, escape::unescape(trimmed).into_owned());
        }
        if let Some(cdata) = cdata {
            S::cdata(element, cdata);
        }
        Ok(())
    }
}

/// Checks that `stream` holds a well-formed document without building
/// anything.
pub(crate) fn validate(stream: Stream<'_>) -> Result<()> {
    FastParser::<Validate>::new(stream).parse_document()
}

/// Decodes `stream` into the native value of its root element.
pub(crate) fn decode(stream: Stream<'_>) -> Result<Value> {
    FastParser::<Decode>::new(stream)
        .parse_document()
        .map(Value::Map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_str(text: &str) -> Result<Value> {
        decode(Stream::new(text))
    }

    fn validate_str(text: &str) -> Result<()> {
        validate(Stream::new(text))
    }

    #[test]
    fn decodes_structure() {
        let value = decode_str(
            r#"<?xml version="1.0"?>
            <!-- people -->
            <people count="2">
                <person id="1">Alice</person>
                <person id="2"><![CDATA[<Bob>]]></person>
            </people>"#,
        )
        .unwrap();
        assert_eq!(value.get("@count").and_then(Value::as_str), Some("2"));
        let people = value.get("person").and_then(Value::as_list).unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].text(), "Alice");
        assert_eq!(people[1].get("#cdata").and_then(Value::as_str), Some("<Bob>"));
        assert_eq!(people[1].get("@id").and_then(Value::as_str), Some("2"));
    }

    #[test]
    fn attribute_escapes() {
        let value = decode_str(r#"<a v="x\"y &amp; \n" w='it\'s'/>"#).unwrap();
        assert_eq!(value.get("@v").and_then(Value::as_str), Some("x\"y & \n"));
        assert_eq!(value.get("@w").and_then(Value::as_str), Some("it's"));
    }

    #[test]
    fn self_closing_and_empty_are_equal() {
        assert_eq!(decode_str("<r/>").unwrap(), decode_str("<r></r>").unwrap());
        assert_eq!(decode_str("<r/>").unwrap(), Value::Map(Map::new()));
    }

    #[test]
    fn errors() {
        let kind = |text: &str| match validate_str(text) {
            Err(Error::Syntax(err)) => err.kind,
            other => panic!("expected syntax error for {text:?}, got {other:?}"),
        };
        assert_eq!(
            kind("<a><b></a></b>"),
            SyntaxErrorKind::MismatchedTags {
                open: "b".into(),
                close: "a".into()
            }
        );
        assert_eq!(kind("<a/> x"), SyntaxErrorKind::TrailingContent);
        assert_eq!(kind("<a v='x/>"), SyntaxErrorKind::UnterminatedString);
        assert_eq!(kind("<a><![CDATA[x</a>"), SyntaxErrorKind::UnterminatedCData);
        assert_eq!(kind("<?xml version='1.0'"), SyntaxErrorKind::UnterminatedDeclaration);
        assert_eq!(kind("<a/><!--"), SyntaxErrorKind::UnterminatedComment);
        assert_eq!(kind("<a v=1/>"), SyntaxErrorKind::ExpectedAttributeValue("v".into()));
        assert_eq!(kind("<a>text"), SyntaxErrorKind::UnclosedElement("a".into()));
    }

    #[test]
    fn mismatch_position_is_a_byte_offset() {
        let Err(Error::Syntax(err)) = validate_str("<a>é</b>") else {
            panic!("should fail");
        };
        assert_eq!(err.position.offset, 7);
    }

    #[test]
    fn validate_and_decode_agree_on_invalid_utf8() {
        let input = b"<a><!-- \xff --></a>";
        assert!(validate(Stream::from_slice(input)).is_err());
        assert!(decode(Stream::from_slice(input)).is_err());
    }
}
