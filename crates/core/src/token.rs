//! Lexical unit and syntax-variant types shared by the lexer and parsers.

use serde::Serialize;

/// Concrete syntax variant of a Cassia source file.
///
/// The caller selects the variant explicitly (typically from the file
/// extension: `.cass` is brace-delimited, `.casi` indentation-delimited);
/// the front end never infers it from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Syntax {
    /// CSS-like syntax using `{ }` and `;`.
    Brace,
    /// Whitespace-sensitive syntax using line indentation.
    Indented,
}

/// Closed set of token classifications.
///
/// Whitespace, newline and comment tokens are filtered out for the brace
/// variant but retained (they are significant) for the indented variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Whitespace,
    Newline,
    Comment,
    Ident,
    Variable,
    CustomProperty,
    Number,
    Str,
    HexColor,
    Url,
    AtKeyword,
    FunctionName,
    Operator,
    LogicalOp,
    Colon,
    Semicolon,
    BraceOpen,
    BraceClose,
    ParenOpen,
    ParenClose,
    Asterisk,
    AttributeSelector,
    Selector,
    InterpolationOpen,
    DoubleHashInterpolation,
    Important,
    Spread,
}

/// A single lexical unit. Immutable once produced.
///
/// `text` is the raw matched lexeme, so concatenating the texts of all
/// retained tokens reconstructs the source byte-for-byte (indented variant).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32, column: u32) -> Self {
        Token {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    /// True for tokens that carry no grammatical content.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment
        )
    }
}
