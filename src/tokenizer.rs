//! Lexical analysis of XML text.
//!
//! The tokenizer produces one [`Token`] per call without lookahead. It keeps a
//! small amount of context so that text runs are only recognized between
//! tags, and so that comment, CDATA and declaration bodies are emitted as a
//! single content token between their start and end delimiters.

use std::borrow::Cow;
use std::io::Read;

use crate::error::{Error, SyntaxErrorKind};
use crate::stream::Stream;
use crate::token::{Position, Token, TokenKind};

#[derive(Clone, Copy, Debug)]
enum State {
    /// Between tags.
    Content,
    /// Directly after `<` or `</`.
    TagStart,
    /// Inside a tag, where whitespace separates tokens.
    Tag,
    /// Inside a comment, CDATA section or processing instruction.
    Section(Section),
    Done,
}

#[derive(Clone, Copy, Debug)]
struct Section {
    terminator: &'static str,
    content: TokenKind,
    end: TokenKind,
}

const COMMENT: Section = Section {
    terminator: "-->",
    content: TokenKind::CommentContent,
    end: TokenKind::CommentEnd,
};

const CDATA: Section = Section {
    terminator: "]]>",
    content: TokenKind::CDataContent,
    end: TokenKind::CDataEnd,
};

const INSTRUCTION: Section = Section {
    terminator: "?>",
    content: TokenKind::Text,
    end: TokenKind::PIEnd,
};

pub struct Tokenizer<'a> {
    stream: Stream<'a>,
    state: State,
}

impl<'a> Tokenizer<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self::from_stream(Stream::new(text))
    }

    #[must_use]
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self::from_stream(Stream::from_slice(bytes))
    }

    pub fn from_reader<R: Read + 'a>(reader: R) -> Self {
        Self::from_stream(Stream::from_reader(reader))
    }

    #[must_use]
    pub fn from_stream(stream: Stream<'a>) -> Self {
        Self {
            stream,
            state: State::Content,
        }
    }

    /// Produces the next token. After the input is exhausted every call
    /// returns a [`TokenKind::Eof`] token.
    ///
    /// # Errors
    ///
    /// Fails if a comment, CDATA section or processing instruction has no
    /// terminator, if the input is not valid UTF-8, or if reading from the
    /// underlying reader fails.
    pub fn next_token(&mut self) -> Result<Token<'a>, Error> {
        match self.state {
            State::Section(section) => self.section(section),
            State::TagStart => {
                self.state = State::Tag;
                let position = self.stream.position();
                let start = self.stream.mark();
                let len = self.stream.name_len();
                if len > 0 {
                    self.stream.advance(len);
                    let lexeme = self.stream.text_from(start)?;
                    return Ok(Token {
                        kind: TokenKind::Name,
                        lexeme,
                        position,
                    });
                }
                self.tag()
            }
            State::Tag => {
                self.stream.skip_whitespace();
                self.tag()
            }
            State::Content => self.content(),
            State::Done => self.eof(),
        }
    }

    fn content(&mut self) -> Result<Token<'a>, Error> {
        let position = self.stream.position();
        self.stream.mark();
        if self.stream.is_eof() {
            return self.eof();
        }

        if self.stream.starts_with(b"<!--") {
            return self.open_section(
                "<!--",
                TokenKind::CommentStart,
                COMMENT,
                SyntaxErrorKind::UnterminatedComment,
            );
        }
        if self.stream.starts_with(b"<![CDATA[") {
            return self.open_section(
                "<![CDATA[",
                TokenKind::CDataStart,
                CDATA,
                SyntaxErrorKind::UnterminatedCData,
            );
        }
        if self.stream.starts_with(b"<?xml") {
            return self.open_section(
                "<?xml",
                TokenKind::XmlDeclStart,
                INSTRUCTION,
                SyntaxErrorKind::UnterminatedDeclaration,
            );
        }
        if self.stream.starts_with(b"<?") {
            return self.open_section(
                "<?",
                TokenKind::PIStart,
                INSTRUCTION,
                SyntaxErrorKind::UnterminatedProcessingInstruction,
            );
        }
        if self.stream.eat(b"</") {
            self.state = State::TagStart;
            return Ok(fixed(TokenKind::EndTagOpen, "</", position));
        }
        if self.stream.eat(b"<") {
            self.state = State::TagStart;
            return Ok(fixed(TokenKind::TagOpen, "<", position));
        }

        let start = self.stream.mark();
        let len = self.stream.text_len();
        self.stream.advance(len);
        Ok(Token {
            kind: TokenKind::Text,
            lexeme: self.stream.text_from(start)?,
            position,
        })
    }

    /// Matches structural tokens inside a tag, in fixed priority order.
    fn tag(&mut self) -> Result<Token<'a>, Error> {
        let position = self.stream.position();
        let start = self.stream.mark();
        let Some(byte) = self.stream.peek() else {
            return self.eof();
        };

        const FIXED: [(&str, TokenKind, State); 6] = [
            ("?>", TokenKind::PIEnd, State::Content),
            ("</", TokenKind::EndTagOpen, State::TagStart),
            ("/>", TokenKind::SelfClose, State::Content),
            ("<", TokenKind::TagOpen, State::TagStart),
            (">", TokenKind::TagClose, State::Content),
            ("=", TokenKind::Equals, State::Tag),
        ];
        for (literal, kind, next) in FIXED {
            if self.stream.eat(literal.as_bytes()) {
                self.state = next;
                return Ok(fixed(kind, literal, position));
            }
        }

        if matches!(byte, b'"' | b'\'') {
            if let Some(len) = self.stream.quoted_len() {
                self.stream.advance(len);
                return Ok(Token {
                    kind: TokenKind::String,
                    lexeme: self.stream.text_from(start)?,
                    position,
                });
            }
        } else {
            let len = self.stream.name_len();
            if len > 0 {
                self.stream.advance(len);
                return Ok(Token {
                    kind: TokenKind::Name,
                    lexeme: self.stream.text_from(start)?,
                    position,
                });
            }
        }

        // Anything else is passed through one character at a time, leaving
        // the parser to report it.
        let len = self.stream.char_len();
        self.stream.advance(len);
        Ok(Token {
            kind: TokenKind::Text,
            lexeme: self.stream.text_from(start)?,
            position,
        })
    }

    fn open_section(
        &mut self,
        open: &'static str,
        kind: TokenKind,
        section: Section,
        unterminated: SyntaxErrorKind,
    ) -> Result<Token<'a>, Error> {
        let position = self.stream.position();
        self.stream.advance(open.len());
        if self.stream.find(section.terminator.as_bytes()).is_none() {
            if let Some(err) = self.stream.take_error() {
                return Err(Error::Io(err));
            }
            return Err(unterminated.at(position).into());
        }
        self.state = State::Section(section);
        Ok(fixed(kind, open, position))
    }

    fn section(&mut self, section: Section) -> Result<Token<'a>, Error> {
        let position = self.stream.position();
        let start = self.stream.mark();
        let terminator = section.terminator;
        if self.stream.eat(terminator.as_bytes()) {
            self.state = State::Content;
            return Ok(fixed(section.end, terminator, position));
        }
        // The terminator was located when the section was opened.
        let len = self
            .stream
            .find(terminator.as_bytes())
            .ok_or(SyntaxErrorKind::UnexpectedEof.at(position))?;
        self.stream.advance(len);
        Ok(Token {
            kind: section.content,
            lexeme: self.stream.text_from(start)?,
            position,
        })
    }

    fn eof(&mut self) -> Result<Token<'a>, Error> {
        if let Some(err) = self.stream.take_error() {
            return Err(Error::Io(err));
        }
        self.state = State::Done;
        Ok(fixed(TokenKind::Eof, "", self.stream.position()))
    }
}

#[inline]
fn fixed<'a>(kind: TokenKind, lexeme: &'static str, position: Position) -> Token<'a> {
    Token {
        kind,
        lexeme: Cow::Borrowed(lexeme),
        position,
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, Error>;

    /// Yields tokens up to and including the first [`TokenKind::Eof`], or the
    /// first error.
    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, State::Done) {
            return None;
        }
        let token = self.next_token();
        if token.is_err() {
            self.state = State::Done;
        }
        Some(token)
    }
}
