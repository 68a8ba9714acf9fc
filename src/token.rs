use std::borrow::Cow;
use std::fmt;

/// Location in the input, attached to tokens, tree nodes and syntax errors.
///
/// Rows and columns are 1-based; columns count characters, not bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    /// Byte offset from the start of the input.
    pub offset: usize,
    pub row: usize,
    pub column: usize,
}

impl Default for Position {
    #[inline]
    fn default() -> Self {
        Self {
            offset: 0,
            row: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "offset {}, line {}, column {}",
            self.offset, self.row, self.column
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `<`
    TagOpen,
    /// `>`
    TagClose,
    /// `/>`
    SelfClose,
    /// `</`
    EndTagOpen,
    /// `=`
    Equals,
    Name,
    /// A quoted attribute value; the lexeme keeps its quotes and escapes.
    String,
    Text,
    /// `<![CDATA[`
    CDataStart,
    CDataContent,
    /// `]]>`
    CDataEnd,
    /// `<!--`
    CommentStart,
    CommentContent,
    /// `-->`
    CommentEnd,
    /// `<?`
    PIStart,
    /// `?>`
    PIEnd,
    /// `<?xml`
    XmlDeclStart,
    Eof,
}

impl TokenKind {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::TagOpen => "'<'",
            TokenKind::TagClose => "'>'",
            TokenKind::SelfClose => "'/>'",
            TokenKind::EndTagOpen => "'</'",
            TokenKind::Equals => "'='",
            TokenKind::Name => "name",
            TokenKind::String => "quoted string",
            TokenKind::Text => "text",
            TokenKind::CDataStart => "CDATA section",
            TokenKind::CDataContent => "CDATA content",
            TokenKind::CDataEnd => "']]>'",
            TokenKind::CommentStart => "comment",
            TokenKind::CommentContent => "comment content",
            TokenKind::CommentEnd => "'-->'",
            TokenKind::PIStart => "processing instruction",
            TokenKind::PIEnd => "'?>'",
            TokenKind::XmlDeclStart => "XML declaration",
            TokenKind::Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A single lexical token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: Cow<'a, str>,
    pub position: Position,
}

impl Token<'_> {
    /// Describes the token for error messages, e.g. `name "foo"`.
    pub(crate) fn found(&self) -> String {
        match self.kind {
            TokenKind::Name | TokenKind::Text | TokenKind::String => {
                format!("{} {:?}", self.kind, self.lexeme)
            }
            kind => kind.describe().to_owned(),
        }
    }
}
