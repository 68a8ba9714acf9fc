use std::borrow::Cow;

use crate::token::Position;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("I/O error while reading XML input: {0}")]
    Io(#[from] std::io::Error),
    #[error("xml: unsupported type {0}")]
    UnsupportedType(&'static str),
    #[error("xml: unsupported map key type {0}, map keys must be strings")]
    NonStringMapKey(&'static str),
    #[error("xml: {0} cannot be written as text")]
    NotText(&'static str),
    #[error("xml: cannot decode {found} into value of type {expected}")]
    Mismatch {
        found: &'static str,
        expected: &'static str,
    },
    #[error("xml: invalid value {value:?} for type {expected}")]
    InvalidScalar {
        value: String,
        expected: &'static str,
    },
    #[error("invalid native value: {0}")]
    InvalidNative(Cow<'static, str>),
    #[error("xml: invalid element name {0:?}")]
    InvalidName(String),
    #[error("xml: encoder for {0} was invoked before it finished compiling")]
    Unresolved(&'static str),
    #[error("field {field}: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: Box<Error>,
    },
    #[error("key {key:?}: {source}")]
    Key {
        key: String,
        #[source]
        source: Box<Error>,
    },
    #[error("index {index}: {source}")]
    Index {
        index: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("{0}")]
    Custom(String),
}

impl Error {
    #[must_use]
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Custom(error.to_string())
    }

    pub fn msg<T: std::fmt::Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }

    /// The source position of a syntax error, if this is one.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Syntax(err) => Some(err.position),
            _ => None,
        }
    }

    pub(crate) fn in_field(self, field: &'static str) -> Self {
        Self::Field {
            field,
            source: Box::new(self),
        }
    }

    pub(crate) fn in_key(self, key: &str) -> Self {
        Self::Key {
            key: key.to_owned(),
            source: Box::new(self),
        }
    }

    pub(crate) fn at_index(self, index: usize) -> Self {
        Self::Index {
            index,
            source: Box::new(self),
        }
    }
}

/// Structural violation found while parsing XML text.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {position}")]
pub struct SyntaxError {
    /// Where in the input the error was detected.
    pub position: Position,
    /// Kind of error that occurred.
    pub kind: SyntaxErrorKind,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SyntaxErrorKind {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },
    #[error("expected element name")]
    ExpectedElementName,
    #[error("expected element name in closing tag")]
    ExpectedClosingName,
    #[error("expected attribute name")]
    ExpectedAttributeName,
    #[error("expected '=' after attribute {0:?}")]
    ExpectedEquals(String),
    #[error("expected quoted value for attribute {0:?}")]
    ExpectedAttributeValue(String),
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unterminated CDATA section")]
    UnterminatedCData,
    #[error("unterminated XML declaration")]
    UnterminatedDeclaration,
    #[error("unterminated processing instruction")]
    UnterminatedProcessingInstruction,
    #[error("mismatched tags: opening {open:?}, closing {close:?}")]
    MismatchedTags { open: String, close: String },
    #[error("unexpected end of input, element {0:?} is not closed")]
    UnclosedElement(String),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected {0} in element content")]
    UnexpectedContent(&'static str),
    #[error("unexpected content after root element")]
    TrailingContent,
    #[error("elements are nested deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("input is not valid UTF-8")]
    InvalidUtf8,
}

impl SyntaxErrorKind {
    #[inline]
    #[must_use]
    pub(crate) fn at(self, position: Position) -> SyntaxError {
        SyntaxError {
            position,
            kind: self,
        }
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
