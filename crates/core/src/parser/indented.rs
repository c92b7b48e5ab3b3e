//! Indentation-structured blocks.
//!
//! The indented variant keeps every trivia token in the stream, and block
//! structure comes from line indents (two spaces per level) instead of
//! braces. Statements end at line breaks; a block extends over every line
//! indented deeper than the line that opened it.

use super::{Item, Parser};
use crate::ast::Block;
use crate::error::ParseError;
use crate::token::{Syntax, TokenKind};

/// Running indent bookkeeping for one block: the current level plus the
/// stack of enclosing levels, so a dedent that lands between levels is
/// caught instead of silently re-parented.
struct IndentTracker {
    current: i32,
    stack: Vec<i32>,
}

impl IndentTracker {
    fn new(opening: i32) -> Self {
        IndentTracker {
            current: opening,
            stack: Vec::new(),
        }
    }

    fn observe(&mut self, candidate: i32) -> Result<(), String> {
        if candidate > self.current {
            self.stack.push(self.current);
            self.current = candidate;
            return Ok(());
        }
        while candidate < self.current {
            match self.stack.pop() {
                Some(previous) => self.current = previous,
                None => break,
            }
        }
        if candidate != self.current {
            return Err("inconsistent indentation".to_string());
        }
        Ok(())
    }
}

impl Parser {
    /// Indent level of the line the cursor is on. Always zero for the
    /// brace variant, whose trivia never reaches the stream.
    pub(crate) fn current_line_indent(&self) -> i32 {
        if self.syntax() == Syntax::Brace {
            return 0;
        }
        let stream = self.stream_ref();
        let tokens = stream.tokens();
        let mut start = stream.position().min(tokens.len());
        while start > 0 && tokens[start - 1].kind != TokenKind::Newline {
            start -= 1;
        }
        match tokens.get(start) {
            Some(tok) if tok.kind == TokenKind::Whitespace => {
                (tok.text.chars().count() / 2) as i32
            }
            _ => 0,
        }
    }

    /// Does a line indented deeper than `stmt_indent` follow the current
    /// statement? Pure lookahead; the cursor does not move.
    pub(crate) fn has_indented_body(&self, stmt_indent: i32) -> bool {
        let stream = self.stream_ref();
        let tokens = stream.tokens();
        let mut index = stream.position();
        let mut saw_newline = false;
        while index < tokens.len()
            && matches!(
                tokens[index].kind,
                TokenKind::Whitespace | TokenKind::Newline
            )
        {
            if tokens[index].kind == TokenKind::Newline {
                saw_newline = true;
            }
            index += 1;
        }
        if !saw_newline || index >= tokens.len() {
            return false;
        }
        let indent = match index.checked_sub(1).and_then(|i| tokens.get(i)) {
            Some(tok) if tok.kind == TokenKind::Whitespace => {
                (tok.text.chars().count() / 2) as i32
            }
            _ => 0,
        };
        indent > stmt_indent
    }

    /// Parse the block opened by the line the cursor sits at the end of:
    /// every following line indented deeper than that line.
    pub(crate) fn parse_indented_block(&mut self) -> Result<Block, ParseError> {
        self.descend()?;
        let opening = self.current_line_indent();
        self.stream().skip_whitespace();

        let mut block = Block::new();
        if !self.stream().is_at_end() {
            if !self.stream().matches(TokenKind::Newline) {
                return Err(self.err_here("expected line break before indented block"));
            }
            for item in self.parse_indented_items(opening)? {
                match item {
                    Item::Declaration(decl) => block.push_declaration(decl),
                    Item::Node(node) => block.push_node(node),
                }
            }
        }
        self.ascend();
        Ok(block)
    }

    /// Parse items until a line at or shallower than `opening` indent.
    /// The boundary line is left unconsumed for the enclosing block.
    pub(crate) fn parse_indented_items(
        &mut self,
        opening: i32,
    ) -> Result<Vec<Item>, ParseError> {
        let mut items = Vec::new();
        let mut tracker = IndentTracker::new(opening);

        loop {
            // Step over line breaks and blank-line whitespace.
            loop {
                if self.stream().matches(TokenKind::Newline) {
                    self.stream().advance();
                    continue;
                }
                if self.stream().matches(TokenKind::Whitespace) {
                    let next = self.stream_ref().peek(1).map(|t| t.kind);
                    if matches!(next, Some(TokenKind::Newline) | None) {
                        self.stream().advance();
                        continue;
                    }
                }
                break;
            }
            if self.stream().is_at_end() {
                break;
            }

            let candidate = match self.stream_ref().current() {
                Some(tok) if tok.kind == TokenKind::Whitespace => {
                    (tok.text.chars().count() / 2) as i32
                }
                _ => 0,
            };
            if candidate <= opening {
                break;
            }
            tracker
                .observe(candidate)
                .map_err(|msg| self.err_here(msg))?;
            if self.stream().matches(TokenKind::Whitespace) {
                self.stream().advance();
            }
            // A nested block leaves its boundary line's indent whitespace
            // unconsumed; the loop head must see it to re-measure, so no
            // trailing skip here.
            items.push(self.parse_item()?);
        }
        Ok(items)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
