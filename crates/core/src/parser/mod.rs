//! Recursive-descent parsers over the token stream.
//!
//! A single cursor-owning [`Parser`] context is shared by the block,
//! expression, selector and at-rule grammars (the submodules extend it with
//! further `impl` blocks), so the grammars recurse into one another as plain
//! method calls. Speculative decisions are made with an exact cursor
//! checkpoint and restore; no speculative branch leaves any side effect
//! other than the restored cursor position.

use crate::ast::{Block, Declaration, Node};
use crate::error::ParseError;
use crate::lexer;
use crate::stream::TokenStream;
use crate::token::{Syntax, Token, TokenKind};

mod at_rule;
mod expressions;
mod indented;
mod selector;

/// Default bound on grammar recursion depth. Input nested deeper than this
/// fails with [`ParseError::RecursionLimit`] instead of exhausting the call
/// stack.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// One entry of a block body as classified by the block parser.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Declaration(Declaration),
    Node(Node),
}

pub(crate) struct Parser {
    stream: TokenStream,
    syntax: Syntax,
    depth: usize,
    max_depth: usize,
}

/// Parse a full stylesheet from source text.
pub fn parse(source: &str, syntax: Syntax) -> Result<Vec<Node>, ParseError> {
    parse_with_max_depth(source, syntax, DEFAULT_MAX_DEPTH)
}

/// Like [`parse`], with a caller-chosen recursion bound.
pub fn parse_with_max_depth(
    source: &str,
    syntax: Syntax,
    max_depth: usize,
) -> Result<Vec<Node>, ParseError> {
    let stream = lexer::tokenize(source, syntax)?;
    let mut p = Parser::new(stream, syntax, max_depth);
    p.parse_stylesheet()
}

impl Parser {
    fn new(stream: TokenStream, syntax: Syntax, max_depth: usize) -> Self {
        Parser {
            stream,
            syntax,
            depth: 0,
            max_depth,
        }
    }

    // -- Cursor helpers ----------------------------------------

    pub(crate) fn at_operator(&self, text: &str) -> bool {
        matches!(
            self.stream.current(),
            Some(tok) if tok.kind == TokenKind::Operator && tok.text == text
        )
    }

    pub(crate) fn at_word(&self, word: &str) -> bool {
        matches!(
            self.stream.current(),
            Some(tok) if tok.kind == TokenKind::Ident && tok.text == word
        )
    }

    /// Consume an identifier with the exact given text.
    pub(crate) fn expect_word(&mut self, word: &str) -> Result<Token, ParseError> {
        let tok = self.stream.consume(TokenKind::Ident)?;
        if tok.text != word {
            return Err(ParseError::syntax(
                format!("expected '{}', got '{}'", word, tok.text),
                tok.line,
                tok.column,
            ));
        }
        Ok(tok)
    }

    /// Skip whitespace and newline tokens. Used inside parenthesized
    /// contexts, where line breaks carry no structure in either variant.
    pub(crate) fn skip_space(&mut self) {
        while self
            .stream
            .matches_any(&[TokenKind::Whitespace, TokenKind::Newline])
        {
            self.stream.advance();
        }
    }

    pub(crate) fn err_here(&self, message: impl Into<String>) -> ParseError {
        let (line, column) = self.stream.here();
        ParseError::syntax(message, line, column)
    }

    // -- Recursion depth guard ---------------------------------

    pub(crate) fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            let (line, column) = self.stream.here();
            return Err(ParseError::RecursionLimit {
                limit: self.max_depth,
                line,
                column,
            });
        }
        Ok(())
    }

    pub(crate) fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Checkpoint for speculative parsing: cursor position plus recursion
    /// depth, restored together on rollback.
    pub(crate) fn checkpoint(&self) -> (usize, usize) {
        (self.stream.position(), self.depth)
    }

    pub(crate) fn rollback(&mut self, checkpoint: (usize, usize)) {
        self.stream.set_position(checkpoint.0);
        self.depth = checkpoint.1;
    }

    pub(crate) fn stream(&mut self) -> &mut TokenStream {
        &mut self.stream
    }

    pub(crate) fn stream_ref(&self) -> &TokenStream {
        &self.stream
    }

    pub(crate) fn syntax(&self) -> Syntax {
        self.syntax
    }

    // -- Stylesheet --------------------------------------------

    pub(crate) fn parse_stylesheet(&mut self) -> Result<Vec<Node>, ParseError> {
        let items = match self.syntax {
            Syntax::Brace => {
                let mut items = Vec::new();
                loop {
                    while self.stream.consume_if(TokenKind::Semicolon).is_some() {}
                    if self.stream.is_at_end() {
                        break;
                    }
                    items.push(self.parse_item()?);
                }
                items
            }
            Syntax::Indented => self.parse_indented_items(-1)?,
        };

        let mut nodes = Vec::new();
        for item in items {
            match item {
                Item::Node(node) => nodes.push(node),
                Item::Declaration(decl) => {
                    return Err(ParseError::syntax(
                        format!("declaration '{}' outside a rule body", decl.name),
                        decl.line,
                        decl.column,
                    ))
                }
            }
        }
        Ok(nodes)
    }

    // -- Statement classification ------------------------------

    /// Parse one block-body item, classifying by the leading token.
    pub(crate) fn parse_item(&mut self) -> Result<Item, ParseError> {
        let tok = self
            .stream
            .current()
            .cloned()
            .ok_or_else(|| self.err_here("unexpected end of input"))?;

        match tok.kind {
            TokenKind::Selector | TokenKind::Asterisk | TokenKind::AttributeSelector => {
                Ok(Item::Node(self.parse_rule()?))
            }
            // An id selector lexes as a hex-color candidate (`#header`).
            TokenKind::HexColor => Ok(Item::Node(self.parse_rule()?)),
            // `:root`, `::before`, `:not(...)`: a leading colon always heads
            // a selector; declarations never start with one.
            TokenKind::Colon => Ok(Item::Node(self.parse_rule()?)),
            TokenKind::Operator
                if matches!(tok.text.as_str(), "&" | "." | "#" | ">" | "+" | "~") =>
            {
                Ok(Item::Node(self.parse_rule()?))
            }
            // A leading number can only head a keyframes selector (`0%`).
            TokenKind::Number => Ok(Item::Node(self.parse_rule()?)),
            TokenKind::AtKeyword => match tok.text.as_str() {
                "@return" => Ok(Item::Node(self.parse_return()?)),
                "@include" => Ok(Item::Node(self.parse_include()?)),
                _ => Ok(Item::Node(self.parse_at_rule()?)),
            },
            TokenKind::Variable => Ok(Item::Node(self.parse_variable_declaration()?)),
            TokenKind::Comment => {
                self.stream.advance();
                Ok(Item::Node(Node::Comment {
                    text: tok.text.clone(),
                    line: tok.line,
                    column: tok.column,
                }))
            }
            TokenKind::FunctionName | TokenKind::Ident => {
                if self.classify_ambiguous_head()? {
                    Ok(Item::Node(self.parse_rule()?))
                } else {
                    Ok(Item::Declaration(self.parse_declaration()?))
                }
            }
            _ => Ok(Item::Declaration(self.parse_declaration()?)),
        }
    }

    /// Two-level speculative probe for a leading identifier or function
    /// name: true when the statement is a nested rule, false when it is a
    /// declaration. Always restores the cursor exactly.
    fn classify_ambiguous_head(&mut self) -> Result<bool, ParseError> {
        let saved = self.stream.position();
        self.stream.advance();
        self.stream.skip_whitespace();

        let is_rule = if self.stream.matches(TokenKind::Colon) {
            self.stream.advance();
            self.stream.skip_whitespace();
            self.probe_nested_rule_start()
        } else {
            // No colon: a bare selector fragment (`div { ... }`).
            true
        };

        self.stream.set_position(saved);
        Ok(is_rule)
    }

    /// Second probe level: does the post-colon input look like the start of
    /// a nested rule header (`a: hover { ... }`, `x: is(...) { ... }`)?
    /// Only the brace variant can open a rule here; the indented variant
    /// has no `{` and spells such selectors without the space.
    fn probe_nested_rule_start(&mut self) -> bool {
        if self.syntax == Syntax::Indented {
            return false;
        }
        match self.stream.current().map(|t| t.kind) {
            Some(TokenKind::FunctionName) => {
                if self.stream.peek(1).map(|t| t.kind) != Some(TokenKind::ParenOpen) {
                    return false;
                }
                let mut offset = 2;
                let mut depth = 1usize;
                while depth > 0 {
                    match self.stream.peek(offset).map(|t| t.kind) {
                        Some(TokenKind::ParenOpen) => depth += 1,
                        Some(TokenKind::ParenClose) => depth -= 1,
                        Some(_) => {}
                        None => return false,
                    }
                    offset += 1;
                }
                while matches!(
                    self.stream.peek(offset).map(|t| t.kind),
                    Some(TokenKind::Whitespace)
                ) {
                    offset += 1;
                }
                self.stream.peek(offset).map(|t| t.kind) == Some(TokenKind::BraceOpen)
            }
            Some(TokenKind::Ident) => {
                // Bare identifier directly followed by `{`.
                self.stream.peek(1).map(|t| t.kind) == Some(TokenKind::BraceOpen)
            }
            _ => false,
        }
    }

    // -- Rules and blocks --------------------------------------

    pub(crate) fn parse_rule(&mut self) -> Result<Node, ParseError> {
        self.descend()?;
        let (line, column) = self.stream.here();
        let selector = self.parse_selector()?;
        let block = self.parse_block_body()?;
        self.ascend();
        Ok(Node::Rule {
            selector,
            block,
            line,
            column,
        })
    }

    /// Parse a nested block body: `{ ... }` for the brace variant, a run of
    /// deeper-indented lines for the indented variant.
    pub(crate) fn parse_block_body(&mut self) -> Result<Block, ParseError> {
        match self.syntax {
            Syntax::Brace => self.parse_brace_block(),
            Syntax::Indented => self.parse_indented_block(),
        }
    }

    fn parse_brace_block(&mut self) -> Result<Block, ParseError> {
        self.descend()?;
        self.stream.skip_whitespace();
        self.stream.consume(TokenKind::BraceOpen)?;
        let mut block = Block::new();
        loop {
            while self.stream.consume_if(TokenKind::Semicolon).is_some() {}
            if self.stream.consume_if(TokenKind::BraceClose).is_some() {
                break;
            }
            if self.stream.is_at_end() {
                return Err(self.err_here("unclosed block: expected '}'"));
            }
            match self.parse_item()? {
                Item::Declaration(decl) => block.push_declaration(decl),
                Item::Node(node) => block.push_node(node),
            }
        }
        self.ascend();
        Ok(block)
    }

    // -- Declarations ------------------------------------------

    pub(crate) fn parse_declaration(&mut self) -> Result<Declaration, ParseError> {
        let (line, column) = self.stream.here();
        let name = self.parse_declaration_name()?;
        self.stream.skip_whitespace();
        self.stream.consume(TokenKind::Colon)?;
        self.stream.skip_whitespace();
        let value = self.parse_expression()?;

        let mut important = false;
        self.stream.skip_whitespace();
        loop {
            if self.stream.consume_if(TokenKind::Important).is_some() {
                important = true;
                self.stream.skip_whitespace();
                continue;
            }
            if self.at_operator("!") {
                self.stream.advance();
                self.stream.skip_whitespace();
                let word = self.stream.consume(TokenKind::Ident)?;
                if word.text != "important" {
                    return Err(ParseError::syntax(
                        format!("expected 'important' after '!', got '{}'", word.text),
                        word.line,
                        word.column,
                    ));
                }
                important = true;
                self.stream.skip_whitespace();
                continue;
            }
            break;
        }

        if self.syntax == Syntax::Brace {
            self.stream.consume_if(TokenKind::Semicolon);
        }
        Ok(Declaration {
            name,
            value,
            important,
            line,
            column,
        })
    }

    /// Property names are plain words, custom properties, or text with
    /// spliced interpolations (`#{$side}-margin`).
    fn parse_declaration_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        loop {
            let Some(tok) = self.stream.current().cloned() else {
                break;
            };
            match tok.kind {
                TokenKind::Ident | TokenKind::CustomProperty | TokenKind::Number => {
                    name.push_str(&tok.text);
                    self.stream.advance();
                }
                TokenKind::InterpolationOpen | TokenKind::DoubleHashInterpolation => {
                    self.stream.advance();
                    self.skip_space();
                    let expr = self.parse_expression()?;
                    self.skip_space();
                    self.stream.consume(TokenKind::BraceClose)?;
                    name.push_str(&selector::flatten_to_text(&expr));
                }
                _ => break,
            }
        }
        if name.is_empty() {
            return Err(self.err_here("expected property name"));
        }
        Ok(name)
    }

    pub(crate) fn parse_variable_declaration(&mut self) -> Result<Node, ParseError> {
        let var = self.stream.consume(TokenKind::Variable)?;
        self.stream.skip_whitespace();
        self.stream.consume(TokenKind::Colon)?;
        self.stream.skip_whitespace();
        let value = self.parse_expression()?;

        let mut global = false;
        let mut default = false;
        self.stream.skip_whitespace();
        while self.at_operator("!") {
            self.stream.advance();
            self.stream.skip_whitespace();
            let word = self.stream.consume(TokenKind::Ident)?;
            match word.text.as_str() {
                "global" => global = true,
                "default" => default = true,
                other => {
                    return Err(ParseError::syntax(
                        format!("unknown variable flag '!{}'", other),
                        word.line,
                        word.column,
                    ))
                }
            }
            self.stream.skip_whitespace();
        }
        if self.syntax == Syntax::Brace {
            self.stream.consume_if(TokenKind::Semicolon);
        }

        Ok(Node::VariableDeclaration {
            name: var.text.trim_start_matches('$').to_string(),
            value: Box::new(value),
            global,
            default,
            line: var.line,
            column: var.column,
        })
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
