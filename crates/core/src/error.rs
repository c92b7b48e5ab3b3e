use serde::Serialize;
use thiserror::Error;

/// A front-end error. Every variant carries the exact source position
/// (1-based line and column) that produced it.
#[derive(Debug, Clone, Serialize, PartialEq, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    /// No lexer pattern matches the remaining input. Always fatal.
    #[error("lexical error at {line}:{column}: {message}")]
    Lexical {
        message: String,
        line: u32,
        column: u32,
    },

    /// A parser expected one token kind or shape and found another.
    /// Always fatal; a stylesheet with a structural error has no
    /// well-defined partial AST.
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        message: String,
        line: u32,
        column: u32,
    },

    /// A hex-color literal with the wrong digit count or non-hex characters.
    #[error("invalid hex color '{literal}' at {line}:{column}")]
    InvalidColor {
        literal: String,
        line: u32,
        column: u32,
    },

    /// Input nesting exceeded the configured recursion limit.
    #[error("nesting deeper than {limit} levels at {line}:{column}")]
    RecursionLimit { limit: usize, line: u32, column: u32 },
}

impl ParseError {
    pub fn lexical(message: impl Into<String>, line: u32, column: u32) -> Self {
        ParseError::Lexical {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn syntax(message: impl Into<String>, line: u32, column: u32) -> Self {
        ParseError::Syntax {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn invalid_color(literal: impl Into<String>, line: u32, column: u32) -> Self {
        ParseError::InvalidColor {
            literal: literal.into(),
            line,
            column,
        }
    }

    pub fn line(&self) -> u32 {
        match self {
            ParseError::Lexical { line, .. }
            | ParseError::Syntax { line, .. }
            | ParseError::InvalidColor { line, .. }
            | ParseError::RecursionLimit { line, .. } => *line,
        }
    }

    pub fn column(&self) -> u32 {
        match self {
            ParseError::Lexical { column, .. }
            | ParseError::Syntax { column, .. }
            | ParseError::InvalidColor { column, .. }
            | ParseError::RecursionLimit { column, .. } => *column,
        }
    }
}
