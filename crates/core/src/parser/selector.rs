//! Selector and raw at-rule-header reconstruction.
//!
//! Selectors are not given a structural grammar; their text is rebuilt from
//! the token run up to the block opener. Spacing is recovered from token
//! positions, so `.a .b` and `.a.b` stay distinct even though the brace
//! variant filters whitespace tokens before parsing.

use std::sync::OnceLock;

use regex::Regex;

use super::Parser;
use crate::ast::{Node, Selector, Separator};
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

fn attribute_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^\[\s*([a-zA-Z][a-zA-Z0-9-]*)\s*([~|^$*]?=)\s*(?:"([^"]*)"|'([^']*)')\s*\]$"#,
        )
        .expect("attribute shape pattern must compile")
    })
}

/// Accumulates selector text, inserting a single space wherever the source
/// had a gap between consecutive tokens.
struct TextBuilder {
    text: String,
    prev_end: Option<(u32, u32)>,
}

impl TextBuilder {
    fn new() -> Self {
        TextBuilder {
            text: String::new(),
            prev_end: None,
        }
    }

    fn push_token(&mut self, tok: &Token) {
        self.push_at(&tok.text, tok);
    }

    /// Append `text` positioned at `tok`, spacing off the previous token.
    fn push_at(&mut self, text: &str, tok: &Token) {
        if let Some((line, column)) = self.prev_end {
            if tok.line != line || tok.column > column {
                if !self.text.is_empty() {
                    self.text.push(' ');
                }
            }
        }
        self.text.push_str(text);
        self.prev_end = Some((tok.line, tok.column + tok.text.chars().count() as u32));
    }

    fn finish(self) -> String {
        self.text.trim().to_string()
    }
}

impl Parser {
    /// Reconstruct a selector as text, up to the block opener or statement
    /// end. An empty selector is an error; at-rule headers, which may
    /// legally be empty, go through [`Parser::parse_header_text`].
    pub(crate) fn parse_selector(&mut self) -> Result<Selector, ParseError> {
        let (text, line) = self.parse_header_text()?;
        if text.is_empty() {
            return Err(self.err_here("expected selector"));
        }
        Ok(Selector { text, line })
    }

    /// Raw header scanner shared by selectors and prelude-carrying at-rules
    /// (`@media`, `@supports`, `@keyframes`, ...).
    pub(crate) fn parse_header_text(&mut self) -> Result<(String, u32), ParseError> {
        let (line, _) = self.stream().here();
        let mut builder = TextBuilder::new();

        loop {
            let Some(tok) = self.stream().current().cloned() else {
                break;
            };
            match tok.kind {
                TokenKind::BraceOpen
                | TokenKind::BraceClose
                | TokenKind::Semicolon
                | TokenKind::Newline => break,
                TokenKind::Whitespace | TokenKind::Comment => {
                    self.stream().advance();
                }
                // Functional pseudo-classes: copy the name and parenthesized
                // content verbatim, tracking paren depth; the content is
                // never fed through the expression grammar.
                TokenKind::FunctionName => {
                    builder.push_token(&tok);
                    self.stream().advance();
                    self.copy_balanced_parens(&mut builder)?;
                }
                TokenKind::InterpolationOpen | TokenKind::DoubleHashInterpolation => {
                    self.stream().advance();
                    self.skip_space();
                    let expr = self.parse_expression()?;
                    self.skip_space();
                    let close = self.stream().consume(TokenKind::BraceClose)?;
                    builder.push_at(&flatten_to_text(&expr), &tok);
                    builder.prev_end =
                        Some((close.line, close.column + close.text.chars().count() as u32));
                }
                TokenKind::AttributeSelector => {
                    builder.push_at(&canonicalize_attribute(&tok.text), &tok);
                    self.stream().advance();
                }
                _ => {
                    builder.push_token(&tok);
                    self.stream().advance();
                }
            }
        }

        Ok((builder.finish(), line))
    }

    fn copy_balanced_parens(&mut self, builder: &mut TextBuilder) -> Result<(), ParseError> {
        let open = self.stream().consume(TokenKind::ParenOpen)?;
        builder.push_token(&open);
        let mut depth = 1usize;
        while depth > 0 {
            let Some(tok) = self.stream().current().cloned() else {
                return Err(self.err_here("unbalanced parentheses in selector"));
            };
            match tok.kind {
                TokenKind::ParenOpen => depth += 1,
                TokenKind::ParenClose => depth -= 1,
                TokenKind::Whitespace | TokenKind::Newline => {
                    self.stream().advance();
                    continue;
                }
                _ => {}
            }
            builder.push_token(&tok);
            self.stream().advance();
        }
        Ok(())
    }
}

/// Flatten an interpolation payload back into selector text. Nested
/// interpolations are re-wrapped so the splice stays visible downstream.
pub(crate) fn flatten_to_text(node: &Node) -> String {
    match node {
        Node::Identifier { name, .. } => name.clone(),
        Node::Str { value, .. } => value.clone(),
        Node::Number { value, unit, .. } => {
            let mut out = if value.fract() == 0.0 {
                format!("{}", *value as i64)
            } else {
                format!("{}", value)
            };
            if let Some(unit) = unit {
                out.push_str(unit);
            }
            out
        }
        Node::HexColor { value, .. } => value.clone(),
        Node::Interpolation { expr, .. } => format!("#{{{}}}", flatten_to_text(expr)),
        Node::List {
            items, separator, ..
        } => {
            let sep = match separator {
                Separator::Comma => ", ",
                Separator::Space => " ",
                Separator::Slash => " / ",
            };
            items
                .iter()
                .map(flatten_to_text)
                .collect::<Vec<_>>()
                .join(sep)
        }
        Node::Operation {
            left, op, right, ..
        } => format!(
            "{} {} {}",
            flatten_to_text(left),
            op,
            flatten_to_text(right)
        ),
        Node::Unary { op, operand, .. } => format!("{}{}", op, flatten_to_text(operand)),
        Node::FunctionCall { name, args, .. } => {
            let inner = args
                .iter()
                .map(flatten_to_text)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({})", name, inner)
        }
        Node::PropertyAccess {
            target, property, ..
        } => format!("{}.{}", flatten_to_text(target), property),
        Node::CustomProperty { name, .. } => name.clone(),
        _ => String::new(),
    }
}

/// Normalize `[attr="value"]` to `[attr=value]` when the quoted value is a
/// safe bare token; anything else passes through untouched.
pub(crate) fn canonicalize_attribute(text: &str) -> String {
    let Some(caps) = attribute_shape().captures(text) else {
        return text.to_string();
    };
    let value = caps
        .get(3)
        .or_else(|| caps.get(4))
        .map(|m| m.as_str())
        .unwrap_or("");
    let safe = !value.is_empty()
        && value
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '-' || c == '_')
            .unwrap_or(false)
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if safe {
        format!("[{}{}{}]", &caps[1], &caps[2], value)
    } else {
        text.to_string()
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
