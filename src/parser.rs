//! Recursive-descent parser building a [`Node`] tree from tokens.

use std::io::Read;

use crate::error::{Error, Result, SyntaxErrorKind};
use crate::escape::{self, WHITESPACE};
use crate::token::{Position, Token, TokenKind};
use crate::tokenizer::Tokenizer;
use crate::tree::{ATTRIBUTE_PREFIX, CDATA_KEY, Literal, Node, Object, TEXT_KEY};

/// Elements nested deeper than this are rejected by both parsers.
pub const MAX_DEPTH: usize = 128;

pub struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    current: Token<'a>,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// # Errors
    ///
    /// Fails if the first token cannot be read.
    pub fn new(text: &'a str) -> Result<Self> {
        Self::from_tokenizer(Tokenizer::new(text))
    }

    /// # Errors
    ///
    /// Fails if the first token cannot be read.
    pub fn from_reader<R: Read + 'a>(reader: R) -> Result<Self> {
        Self::from_tokenizer(Tokenizer::from_reader(reader))
    }

    /// # Errors
    ///
    /// Fails if the first token cannot be read.
    pub fn from_tokenizer(mut tokenizer: Tokenizer<'a>) -> Result<Self> {
        let current = tokenizer.next_token()?;
        Ok(Self {
            tokenizer,
            current,
            depth: 0,
        })
    }

    /// Parses a complete document: an optional XML declaration, comments,
    /// exactly one root element, and trailing comments.
    ///
    /// # Errors
    ///
    /// Returns the first syntax error encountered; there is no recovery.
    pub fn parse_document(mut self) -> Result<Node> {
        self.skip_blank_text()?;
        if self.current.kind == TokenKind::XmlDeclStart {
            self.skip_section(TokenKind::PIEnd)?;
        }
        self.skip_misc()?;
        let (_, root) = self.parse_element()?;
        self.skip_misc()?;
        if self.current.kind != TokenKind::Eof {
            return Err(self.error(SyntaxErrorKind::TrailingContent));
        }
        Ok(root)
    }

    fn advance(&mut self) -> Result<Token<'a>> {
        let next = self.tokenizer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn error(&self, kind: SyntaxErrorKind) -> Error {
        kind.at(self.current.position).into()
    }

    fn unexpected(&self, expected: &'static str) -> Error {
        self.error(SyntaxErrorKind::UnexpectedToken {
            expected,
            found: self.current.found(),
        })
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'a>> {
        if self.current.kind == kind {
            self.advance()
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    fn is_blank_text(&self) -> bool {
        self.current.kind == TokenKind::Text && self.current.lexeme.trim_matches(WHITESPACE).is_empty()
    }

    fn skip_blank_text(&mut self) -> Result<()> {
        while self.is_blank_text() {
            self.advance()?;
        }
        Ok(())
    }

    /// Skips whitespace and comments outside the root element.
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            if self.is_blank_text() {
                self.advance()?;
            } else if self.current.kind == TokenKind::CommentStart {
                self.skip_section(TokenKind::CommentEnd)?;
            } else {
                return Ok(());
            }
        }
    }

    /// Skips a section from its start token through `end`.
    fn skip_section(&mut self, end: TokenKind) -> Result<()> {
        self.advance()?;
        while self.current.kind != end {
            if self.current.kind == TokenKind::Eof {
                return Err(self.error(SyntaxErrorKind::UnexpectedEof));
            }
            self.advance()?;
        }
        self.advance()?;
        Ok(())
    }

    /// Parses one element, returning its tag name alongside the node so the
    /// caller can key it under its parent.
    fn parse_element(&mut self) -> Result<(String, Node)> {
        let position = self.current.position;
        self.expect(TokenKind::TagOpen)?;
        if self.depth >= MAX_DEPTH {
            return Err(SyntaxErrorKind::NestingTooDeep(MAX_DEPTH)
                .at(position)
                .into());
        }
        if self.current.kind != TokenKind::Name {
            return Err(self.error(SyntaxErrorKind::ExpectedElementName));
        }
        let name = self.advance()?.lexeme.into_owned();
        let mut object = Object::new(position);

        loop {
            match self.current.kind {
                TokenKind::Name => self.parse_attribute(&mut object)?,
                TokenKind::SelfClose => {
                    self.advance()?;
                    return Ok((name, object.into()));
                }
                TokenKind::TagClose => {
                    self.advance()?;
                    break;
                }
                _ => return Err(self.unexpected("attribute, '>' or '/>'")),
            }
        }

        self.depth += 1;
        self.parse_content(&name, &mut object)?;
        self.depth -= 1;

        self.expect(TokenKind::EndTagOpen)?;
        if self.current.kind != TokenKind::Name {
            return Err(self.error(SyntaxErrorKind::ExpectedClosingName));
        }
        let close = self.advance()?;
        if close.lexeme != name {
            return Err(SyntaxErrorKind::MismatchedTags {
                open: name,
                close: close.lexeme.into_owned(),
            }
            .at(close.position)
            .into());
        }
        self.expect(TokenKind::TagClose)?;
        Ok((name, object.into()))
    }

    fn parse_attribute(&mut self, object: &mut Object) -> Result<()> {
        let name = self.advance()?.lexeme;
        if self.current.kind != TokenKind::Equals {
            return Err(self.error(SyntaxErrorKind::ExpectedEquals(name.into_owned())));
        }
        self.advance()?;
        if self.current.kind == TokenKind::Text && matches!(&*self.current.lexeme, "\"" | "'") {
            // The tokenizer yields a lone quote when no closing quote follows.
            return Err(self.error(SyntaxErrorKind::UnterminatedString));
        }
        if self.current.kind != TokenKind::String {
            return Err(self.error(SyntaxErrorKind::ExpectedAttributeValue(
                name.into_owned(),
            )));
        }
        let value = self.advance()?;
        let decoded = escape::decode_attribute(escape::unquote(&value.lexeme)).into_owned();
        object.properties.insert(
            format!("{ATTRIBUTE_PREFIX}{name}"),
            Literal::new(decoded, value.position).into(),
        );
        Ok(())
    }

    /// Parses element content up to (not including) the closing tag.
    fn parse_content(&mut self, name: &str, object: &mut Object) -> Result<()> {
        let mut text = String::new();
        let mut text_position = None;
        let mut cdata: Option<(String, Position)> = None;

        loop {
            match self.current.kind {
                TokenKind::EndTagOpen => break,
                // Words in content may come through as names.
                TokenKind::Text | TokenKind::Name => {
                    let token = self.advance()?;
                    text_position.get_or_insert(token.position);
                    text.push_str(&token.lexeme);
                }
                TokenKind::CDataStart => {
                    let position = self.current.position;
                    self.advance()?;
                    let (content, _) = cdata.get_or_insert_with(|| (String::new(), position));
                    while self.current.kind == TokenKind::CDataContent {
                        content.push_str(&self.advance()?.lexeme);
                    }
                    self.expect(TokenKind::CDataEnd)?;
                }
                TokenKind::CommentStart => self.skip_section(TokenKind::CommentEnd)?,
                TokenKind::TagOpen => {
                    let (child_name, child) = self.parse_element()?;
                    object.insert_child(child_name, child);
                }
                TokenKind::Eof => {
                    return Err(self.error(SyntaxErrorKind::UnclosedElement(name.to_owned())));
                }
                kind => return Err(self.error(SyntaxErrorKind::UnexpectedContent(kind.describe()))),
            }
        }

        let trimmed = text.trim_matches(WHITESPACE);
        if !trimmed.is_empty() {
            let position = text_position.unwrap_or(object.position);
            object.properties.insert(
                TEXT_KEY.to_owned(),
                Literal::new(escape::unescape(trimmed), position).into(),
            );
        }
        if let Some((content, position)) = cdata {
            object
                .properties
                .insert(CDATA_KEY.to_owned(), Literal::new(content, position).into());
        }
        Ok(())
    }
}
