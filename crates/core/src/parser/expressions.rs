//! Expression grammar: precedence-climbing binary parser, primaries,
//! argument lists, and the speculative map-literal branch.

use std::sync::OnceLock;

use regex::Regex;

use super::Parser;
use crate::ast::{Node, Separator};
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

/// Color-space constructors whose call arguments fold into a Color node.
const COLOR_SPACES: &[&str] = &["hsl", "hwb", "lab", "lch", "oklch"];

/// Binding power per operator. Higher binds tighter; the climb loop
/// consumes an operator only when its power exceeds the current minimum.
fn unary_binding_power() -> u8 {
    5
}

fn number_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9]+(?:\.[0-9]+)?|\.[0-9]+)([a-zA-Z%]*)$")
            .expect("number shape pattern must compile")
    })
}

impl Parser {
    // -- Entry points ------------------------------------------

    /// Full expression: a comma-separated sequence of space lists. A single
    /// element collapses to itself rather than a one-item list.
    pub(crate) fn parse_expression(&mut self) -> Result<Node, ParseError> {
        self.descend()?;
        let (line, column) = self.stream().here();
        let first = self.parse_space_list()?;
        self.stream().skip_whitespace();

        let result = if self.at_operator(",") {
            let mut items = vec![first];
            while self.at_operator(",") {
                self.stream().advance();
                self.stream().skip_whitespace();
                if self.at_expression_end() {
                    break;
                }
                items.push(self.parse_space_list()?);
                self.stream().skip_whitespace();
            }
            Node::List {
                items,
                separator: Separator::Comma,
                bracketed: false,
                line,
                column,
            }
        } else {
            first
        };
        self.ascend();
        Ok(result)
    }

    /// One comma-free value: adjacent operands collapse into a
    /// space-separated list (`1px solid red`).
    pub(crate) fn parse_space_list(&mut self) -> Result<Node, ParseError> {
        let (line, column) = self.stream().here();
        let first = self.parse_binary(0)?;
        self.stream().skip_whitespace();
        if !self.at_value_start() {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.at_value_start() {
            items.push(self.parse_binary(0)?);
            self.stream().skip_whitespace();
        }
        Ok(Node::List {
            items,
            separator: Separator::Space,
            bracketed: false,
            line,
            column,
        })
    }

    fn at_expression_end(&self) -> bool {
        match self.stream_ref().current() {
            None => true,
            Some(tok) => matches!(
                tok.kind,
                TokenKind::Semicolon
                    | TokenKind::Newline
                    | TokenKind::BraceOpen
                    | TokenKind::BraceClose
                    | TokenKind::ParenClose
                    | TokenKind::Important
            ),
        }
    }

    /// Can the current token begin a value operand? Controls space-list
    /// continuation; operators and terminators stop the list.
    fn at_value_start(&self) -> bool {
        match self.stream_ref().current() {
            None => false,
            Some(tok) => matches!(
                tok.kind,
                TokenKind::Number
                    | TokenKind::Str
                    | TokenKind::Ident
                    | TokenKind::FunctionName
                    | TokenKind::Variable
                    | TokenKind::CustomProperty
                    | TokenKind::HexColor
                    | TokenKind::Url
                    | TokenKind::ParenOpen
                    | TokenKind::InterpolationOpen
                    | TokenKind::DoubleHashInterpolation
                    | TokenKind::AttributeSelector
            ),
        }
    }

    // -- Precedence climbing -----------------------------------

    /// Parse one operand and greedily consume binary operators whose
    /// binding power exceeds `min_power`. Left associativity comes from
    /// recursing with the consumed operator's own power.
    pub(crate) fn parse_binary(&mut self, min_power: u8) -> Result<Node, ParseError> {
        self.descend()?;
        self.stream().skip_whitespace();

        let mut left = if let Some(op) = self.unary_prefix() {
            let (line, column) = self.stream().here();
            self.stream().advance();
            self.stream().skip_whitespace();
            let operand = self.parse_binary(unary_binding_power())?;
            Node::Unary {
                op,
                operand: Box::new(operand),
                line,
                column,
            }
        } else {
            self.parse_primary()?
        };

        left = self.parse_postfix(left)?;

        loop {
            self.stream().skip_whitespace();
            let Some((op, width, power)) = self.peek_binary_op() else {
                break;
            };
            if power <= min_power {
                break;
            }
            let (line, column) = self.stream().here();
            self.stream().advance_by(width);
            self.stream().skip_whitespace();
            let right = self.parse_binary(power)?;
            left = Node::Operation {
                left: Box::new(left),
                op,
                right: Box::new(right),
                line,
                column,
            };
        }

        self.ascend();
        Ok(left)
    }

    fn unary_prefix(&self) -> Option<String> {
        let tok = self.stream_ref().current()?;
        match tok.kind {
            TokenKind::Operator if tok.text == "-" || tok.text == "+" => Some(tok.text.clone()),
            TokenKind::LogicalOp if tok.text == "not" => Some(tok.text.clone()),
            _ => None,
        }
    }

    /// Identify a binary operator at the cursor without consuming it:
    /// (spelling, token width, binding power). Two-character comparisons
    /// are fused here from adjacent single-character tokens.
    fn peek_binary_op(&self) -> Option<(String, usize, u8)> {
        let tok = self.stream_ref().current()?;
        let next_is_eq = matches!(
            self.stream_ref().peek(1),
            Some(t) if t.kind == TokenKind::Operator && t.text == "="
        );
        match tok.kind {
            TokenKind::LogicalOp => match tok.text.as_str() {
                "or" => Some(("or".into(), 1, 1)),
                "and" => Some(("and".into(), 1, 2)),
                _ => None,
            },
            TokenKind::Asterisk => Some(("*".into(), 1, 4)),
            TokenKind::Operator => match tok.text.as_str() {
                "+" => Some(("+".into(), 1, 3)),
                "-" => Some(("-".into(), 1, 3)),
                "/" => Some(("/".into(), 1, 4)),
                "%" => Some(("%".into(), 1, 4)),
                "=" if next_is_eq => Some(("==".into(), 2, 5)),
                "!" if next_is_eq => Some(("!=".into(), 2, 5)),
                "<" if next_is_eq => Some(("<=".into(), 2, 6)),
                "<" => Some(("<".into(), 1, 6)),
                ">" if next_is_eq => Some((">=".into(), 2, 6)),
                ">" => Some((">".into(), 1, 6)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Postfix `.property` access, including method-style calls where the
    /// accessed member is itself a call (`$map.get(key)` becomes a call of
    /// `get` with the target as leading argument).
    fn parse_postfix(&mut self, mut left: Node) -> Result<Node, ParseError> {
        loop {
            if !self.at_operator(".") {
                return Ok(left);
            }
            let next = self.stream_ref().peek(1).map(|t| t.kind);
            if !matches!(next, Some(TokenKind::Ident) | Some(TokenKind::FunctionName)) {
                return Ok(left);
            }
            let (line, column) = self.stream().here();
            self.stream().advance();
            let member = match self.stream().current().cloned() {
                Some(tok) => tok,
                None => return Err(self.err_here("expected member name after '.'")),
            };
            self.stream().advance();
            if member.kind == TokenKind::FunctionName {
                self.stream().consume(TokenKind::ParenOpen)?;
                let (mut args, named_args, spread) = self.parse_arguments()?;
                args.insert(0, left);
                left = Node::FunctionCall {
                    name: member.text,
                    args,
                    named_args,
                    spread,
                    line,
                    column,
                };
            } else {
                left = Node::PropertyAccess {
                    target: Box::new(left),
                    property: member.text,
                    line,
                    column,
                };
            }
        }
    }

    // -- Primaries ---------------------------------------------

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let tok = self
            .stream()
            .current()
            .cloned()
            .ok_or_else(|| self.err_here("expected expression"))?;

        match tok.kind {
            TokenKind::Number => {
                self.stream().advance();
                self.number_node(&tok)
            }
            TokenKind::Str => {
                self.stream().advance();
                let inner = tok.text[1..tok.text.len() - 1].to_string();
                Ok(Node::Str {
                    value: inner,
                    quoted: true,
                    line: tok.line,
                    column: tok.column,
                })
            }
            TokenKind::Ident => {
                self.stream().advance();
                Ok(Node::Identifier {
                    name: tok.text,
                    line: tok.line,
                    column: tok.column,
                })
            }
            TokenKind::Variable => {
                self.stream().advance();
                Ok(Node::Identifier {
                    name: tok.text,
                    line: tok.line,
                    column: tok.column,
                })
            }
            TokenKind::CustomProperty => {
                self.stream().advance();
                Ok(Node::CustomProperty {
                    name: tok.text,
                    line: tok.line,
                    column: tok.column,
                })
            }
            // `url(...)` is opaque: the lexer captured the full text and the
            // value passes through unparsed.
            TokenKind::Url => {
                self.stream().advance();
                Ok(Node::Str {
                    value: tok.text,
                    quoted: false,
                    line: tok.line,
                    column: tok.column,
                })
            }
            TokenKind::HexColor => {
                self.stream().advance();
                self.hex_color_node(&tok)
            }
            TokenKind::FunctionName => self.parse_function_call(),
            TokenKind::ParenOpen => {
                if let Some(map) = self.try_parse_map()? {
                    return Ok(map);
                }
                self.stream().advance();
                self.skip_space();
                if self.stream().consume_if(TokenKind::ParenClose).is_some() {
                    // `()` is an empty list, never a map.
                    return Ok(Node::List {
                        items: Vec::new(),
                        separator: Separator::Space,
                        bracketed: false,
                        line: tok.line,
                        column: tok.column,
                    });
                }
                let inner = self.parse_expression()?;
                self.skip_space();
                self.stream().consume(TokenKind::ParenClose)?;
                Ok(inner)
            }
            TokenKind::InterpolationOpen | TokenKind::DoubleHashInterpolation => {
                self.stream().advance();
                self.skip_space();
                let expr = self.parse_expression()?;
                self.skip_space();
                self.stream().consume(TokenKind::BraceClose)?;
                Ok(Node::Interpolation {
                    expr: Box::new(expr),
                    line: tok.line,
                    column: tok.column,
                })
            }
            TokenKind::AttributeSelector => {
                self.stream().advance();
                Ok(self.bracketed_list(&tok))
            }
            _ => Err(ParseError::syntax(
                format!("expected expression, got '{}'", tok.text),
                tok.line,
                tok.column,
            )),
        }
    }

    fn number_node(&self, tok: &Token) -> Result<Node, ParseError> {
        let caps = number_shape().captures(&tok.text).ok_or_else(|| {
            ParseError::syntax(
                format!("malformed number literal '{}'", tok.text),
                tok.line,
                tok.column,
            )
        })?;
        let digits = &caps[1];
        let value: f64 = digits.parse().map_err(|_| {
            ParseError::syntax(
                format!("malformed number literal '{}'", tok.text),
                tok.line,
                tok.column,
            )
        })?;
        let unit = match &caps[2] {
            "" => None,
            u => Some(u.to_string()),
        };
        Ok(Node::Number {
            value,
            unit,
            line: tok.line,
            column: tok.column,
        })
    }

    /// Hex literals are validated here, not in the lexer: 3, 4, 6 or 8 hex
    /// digits after the `#`.
    fn hex_color_node(&self, tok: &Token) -> Result<Node, ParseError> {
        let digits = &tok.text[1..];
        let valid = matches!(digits.len(), 3 | 4 | 6 | 8)
            && digits.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(ParseError::invalid_color(&tok.text, tok.line, tok.column));
        }
        Ok(Node::HexColor {
            value: tok.text.clone(),
            line: tok.line,
            column: tok.column,
        })
    }

    /// A `[...]` token in value position is a bracketed list of scalars
    /// (grid line names, bracketed size lists).
    fn bracketed_list(&self, tok: &Token) -> Node {
        let interior = &tok.text[1..tok.text.len() - 1];
        let separator = if interior.contains(',') {
            Separator::Comma
        } else {
            Separator::Space
        };
        let items = interior
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|piece| !piece.is_empty())
            .map(|piece| scalar_from_text(piece, tok.line, tok.column))
            .collect();
        Node::List {
            items,
            separator,
            bracketed: true,
            line: tok.line,
            column: tok.column,
        }
    }

    // -- Calls -------------------------------------------------

    pub(crate) fn parse_function_call(&mut self) -> Result<Node, ParseError> {
        let name_tok = self.stream().consume(TokenKind::FunctionName)?;
        self.stream().consume(TokenKind::ParenOpen)?;
        let (args, named_args, spread) = self.parse_arguments()?;

        if COLOR_SPACES.contains(&name_tok.text.as_str()) && named_args.is_empty() && !spread {
            return Ok(fold_color(name_tok, args));
        }
        Ok(Node::FunctionCall {
            name: name_tok.text,
            args,
            named_args,
            spread,
            line: name_tok.line,
            column: name_tok.column,
        })
    }

    /// Parse a call argument list up to and including the closing paren.
    /// Returns positional arguments, named arguments, and whether the final
    /// positional argument carried a `...` spread marker.
    pub(crate) fn parse_arguments(
        &mut self,
    ) -> Result<(Vec<Node>, Vec<(String, Node)>, bool), ParseError> {
        let mut args = Vec::new();
        let mut named_args = Vec::new();
        let mut spread = false;

        loop {
            self.skip_space();
            if self.stream().consume_if(TokenKind::ParenClose).is_some() {
                break;
            }
            if self.stream().is_at_end() {
                return Err(self.err_here("unterminated argument list: expected ')'"));
            }
            if self.at_operator(",") {
                self.stream().advance();
                continue;
            }

            // `$name: value` is a named argument; a bare `$name` anywhere
            // else is positional, so probe and roll back.
            if self.stream().matches(TokenKind::Variable) {
                let saved = self.stream().position();
                let var = self.stream().consume(TokenKind::Variable)?;
                if self.stream().consume_if(TokenKind::Colon).is_some() {
                    self.skip_space();
                    let value = self.parse_space_list()?;
                    named_args.push((var.text.trim_start_matches('$').to_string(), value));
                    continue;
                }
                self.stream().set_position(saved);
            }

            let value = self.parse_space_list()?;
            args.push(value);
            self.stream().skip_whitespace();
            if self.stream().matches(TokenKind::Spread) {
                let marker = self.stream().consume(TokenKind::Spread)?;
                self.skip_space();
                if !self.stream().matches(TokenKind::ParenClose) {
                    return Err(ParseError::syntax(
                        "spread marker is only allowed on the final argument",
                        marker.line,
                        marker.column,
                    ));
                }
                spread = true;
            }
        }
        Ok((args, named_args, spread))
    }

    // -- Map literals ------------------------------------------

    /// Speculatively parse a parenthesized map literal. On any failure the
    /// cursor and recursion depth are restored exactly and `None` is
    /// returned, so the caller's grouping/list re-parse reproduces genuine
    /// errors at their true positions.
    pub(crate) fn try_parse_map(&mut self) -> Result<Option<Node>, ParseError> {
        let checkpoint = self.checkpoint();
        match self.parse_map_literal() {
            Ok(map) => Ok(Some(map)),
            Err(_) => {
                self.rollback(checkpoint);
                Ok(None)
            }
        }
    }

    fn parse_map_literal(&mut self) -> Result<Node, ParseError> {
        let open = self.stream().consume(TokenKind::ParenOpen)?;
        let mut pairs = Vec::new();

        loop {
            self.skip_space();
            if self.stream().matches(TokenKind::ParenClose) {
                if pairs.is_empty() {
                    return Err(self.err_here("empty parens are a list, not a map"));
                }
                self.stream().advance();
                break;
            }

            let key_tok = self
                .stream()
                .current()
                .cloned()
                .ok_or_else(|| self.err_here("unterminated map literal"))?;
            let key = match key_tok.kind {
                TokenKind::Ident | TokenKind::Variable => Node::Identifier {
                    name: key_tok.text.clone(),
                    line: key_tok.line,
                    column: key_tok.column,
                },
                TokenKind::Str => Node::Str {
                    value: key_tok.text[1..key_tok.text.len() - 1].to_string(),
                    quoted: true,
                    line: key_tok.line,
                    column: key_tok.column,
                },
                _ => {
                    return Err(ParseError::syntax(
                        "map keys must be identifiers, variables or strings",
                        key_tok.line,
                        key_tok.column,
                    ))
                }
            };
            self.stream().advance();
            self.skip_space();
            self.stream().consume(TokenKind::Colon)?;
            self.skip_space();

            // Locate the end of this pair up front; the value must consume
            // exactly up to that boundary or the branch is not a map.
            let boundary = self.scan_pair_boundary()?;
            let value = self.parse_space_list()?;
            self.skip_space();
            if self.stream().position() != boundary {
                return Err(self.err_here("map value did not reach the pair boundary"));
            }
            pairs.push((key, value));

            if self.at_operator(",") {
                self.stream().advance();
                continue;
            }
            if self.stream().consume_if(TokenKind::ParenClose).is_some() {
                break;
            }
            return Err(self.err_here("expected ',' or ')' in map literal"));
        }

        Ok(Node::Map {
            pairs,
            line: open.line,
            column: open.column,
        })
    }

    /// Index of the token that terminates the current map pair: the first
    /// comma or closing paren at nested-parenthesis depth zero.
    fn scan_pair_boundary(&self) -> Result<usize, ParseError> {
        let stream = self.stream_ref();
        let tokens = stream.tokens();
        let mut index = stream.position();
        let mut depth = 0usize;
        while index < tokens.len() {
            let tok = &tokens[index];
            match tok.kind {
                TokenKind::ParenOpen => depth += 1,
                TokenKind::ParenClose => {
                    if depth == 0 {
                        return Ok(index);
                    }
                    depth -= 1;
                }
                TokenKind::Operator if tok.text == "," && depth == 0 => return Ok(index),
                _ => {}
            }
            index += 1;
        }
        Err(self.err_here("unterminated map literal"))
    }
}

/// Flatten color-constructor arguments into channels plus an optional
/// alpha split off a trailing `/` component.
fn fold_color(name_tok: Token, args: Vec<Node>) -> Node {
    let mut channels = Vec::new();
    for arg in args {
        match arg {
            Node::List { items, .. } => channels.extend(items),
            other => channels.push(other),
        }
    }

    let mut alpha = None;
    match channels.pop() {
        Some(Node::Operation {
            left, op, right, ..
        }) if op == "/" => {
            channels.push(*left);
            alpha = Some(right);
        }
        Some(Node::Str {
            value,
            line,
            column,
            ..
        }) if value.contains('/') => {
            let (channel, rest) = value.split_once('/').unwrap_or((value.as_str(), ""));
            channels.push(scalar_from_text(channel.trim(), line, column));
            alpha = Some(Box::new(scalar_from_text(rest.trim(), line, column)));
        }
        Some(last) => channels.push(last),
        None => {}
    }

    Node::Color {
        space: name_tok.text,
        channels,
        alpha,
        line: name_tok.line,
        column: name_tok.column,
    }
}

/// Interpret a text fragment as a number with optional unit, falling back
/// to an identifier.
fn scalar_from_text(text: &str, line: u32, column: u32) -> Node {
    if let Some(caps) = number_shape().captures(text) {
        if let Ok(value) = caps[1].parse::<f64>() {
            let unit = match &caps[2] {
                "" => None,
                u => Some(u.to_string()),
            };
            return Node::Number {
                value,
                unit,
                line,
                column,
            };
        }
    }
    Node::Identifier {
        name: text.to_string(),
        line,
        column,
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
