//! Cursor over the token vector.
//!
//! All higher-level parsers are built from these primitives alone; no parser
//! inspects the raw source text. The cursor is monotonically non-decreasing
//! except across an explicit `position`/`set_position` pair used for
//! speculative parsing.

use crate::error::ParseError;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        TokenStream { tokens, pos: 0 }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// The token under the cursor, or `None` at end of input.
    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Random access relative to the cursor; `peek(0)` equals `current()`.
    pub fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    pub fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    pub fn advance_by(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.tokens.len());
    }

    /// Consume a token of the given kind, or fail citing the unexpected
    /// token's position.
    pub fn consume(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        match self.current() {
            Some(tok) if tok.kind == kind => {
                let tok = tok.clone();
                self.advance();
                Ok(tok)
            }
            Some(tok) => Err(ParseError::syntax(
                format!("expected {:?}, got {:?} '{}'", kind, tok.kind, tok.text),
                tok.line,
                tok.column,
            )),
            None => Err(self.end_of_input(format!("expected {:?}", kind))),
        }
    }

    /// Consume a token of the given kind if it is next.
    pub fn consume_if(&mut self, kind: TokenKind) -> Option<Token> {
        if self.matches(kind) {
            let tok = self.tokens[self.pos].clone();
            self.advance();
            Some(tok)
        } else {
            None
        }
    }

    /// Consume a token whose kind is one of `kinds`, or fail.
    pub fn expect_any(&mut self, kinds: &[TokenKind]) -> Result<Token, ParseError> {
        match self.current() {
            Some(tok) if kinds.contains(&tok.kind) => {
                let tok = tok.clone();
                self.advance();
                Ok(tok)
            }
            Some(tok) => Err(ParseError::syntax(
                format!("expected one of {:?}, got {:?} '{}'", kinds, tok.kind, tok.text),
                tok.line,
                tok.column,
            )),
            None => Err(self.end_of_input(format!("expected one of {:?}", kinds))),
        }
    }

    pub fn matches(&self, kind: TokenKind) -> bool {
        matches!(self.current(), Some(tok) if tok.kind == kind)
    }

    pub fn matches_any(&self, kinds: &[TokenKind]) -> bool {
        matches!(self.current(), Some(tok) if kinds.contains(&tok.kind))
    }

    /// Backtracking primitive: an O(1) integer checkpoint.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    /// Skip over whitespace tokens (a no-op for the brace variant, whose
    /// lexer filters them).
    pub fn skip_whitespace(&mut self) {
        while self.matches(TokenKind::Whitespace) {
            self.advance();
        }
    }

    /// Source position of the cursor, for diagnostics: the current token's
    /// position, or the last token's at end of input.
    pub fn here(&self) -> (u32, u32) {
        if let Some(tok) = self.current() {
            (tok.line, tok.column)
        } else if let Some(tok) = self.tokens.last() {
            (tok.line, tok.column)
        } else {
            (1, 1)
        }
    }

    fn end_of_input(&self, message: String) -> ParseError {
        let (line, column) = self.here();
        ParseError::syntax(format!("{message}, got end of input"), line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind, text: &str) -> Token {
        Token::new(kind, text, 1, 1)
    }

    #[test]
    fn consume_mismatch_cites_position() {
        let mut stream = TokenStream::new(vec![Token::new(TokenKind::Ident, "red", 3, 7)]);
        let err = stream.consume(TokenKind::Colon).unwrap_err();
        assert_eq!(err.line(), 3);
        assert_eq!(err.column(), 7);
    }

    #[test]
    fn save_restore_is_exact() {
        let mut stream = TokenStream::new(vec![
            tok(TokenKind::Ident, "a"),
            tok(TokenKind::Colon, ":"),
            tok(TokenKind::Ident, "b"),
        ]);
        stream.advance();
        let saved = stream.position();
        stream.advance();
        stream.advance();
        stream.set_position(saved);
        assert_eq!(stream.position(), saved);
        assert_eq!(stream.current().unwrap().text, ":");
    }

    #[test]
    fn consume_if_only_advances_on_match() {
        let mut stream = TokenStream::new(vec![tok(TokenKind::Semicolon, ";")]);
        assert!(stream.consume_if(TokenKind::Colon).is_none());
        assert_eq!(stream.position(), 0);
        assert!(stream.consume_if(TokenKind::Semicolon).is_some());
        assert!(stream.is_at_end());
    }
}
