//! At-rule dispatch and the specialized at-rule grammars.
//!
//! Control flow (`@if`, `@for`, `@each`, `@while`), callables (`@function`,
//! `@mixin`), module links (`@use`, `@forward`) and diagnostics get
//! dedicated parsers; everything else (`@media`, `@supports`, `@keyframes`,
//! `@at-root`, unknown names) falls through to a generic form of raw header
//! text plus optional block, which keeps unknown at-rules parseable.

use super::Parser;
use crate::ast::{ElseBranch, Node, Param, Selector, Separator};
use crate::error::ParseError;
use crate::token::{Syntax, Token, TokenKind};

impl Parser {
    pub(crate) fn parse_at_rule(&mut self) -> Result<Node, ParseError> {
        let stmt_indent = self.current_line_indent();
        let tok = self.stream().consume(TokenKind::AtKeyword)?;
        let name = tok.text.trim_start_matches('@').to_string();
        self.stream().skip_whitespace();

        match name.as_str() {
            "if" => self.parse_if(&tok, stmt_indent),
            // A well-placed `@else` is consumed by the `@if` chain; one
            // reaching the dispatcher is orphaned.
            "else" => Err(ParseError::syntax(
                "'@else' without a preceding '@if'",
                tok.line,
                tok.column,
            )),
            "for" => self.parse_for(&tok),
            "each" => self.parse_each(&tok),
            "while" => self.parse_while(&tok),
            "function" => self.parse_callable(&tok, true),
            "mixin" => self.parse_callable(&tok, false),
            "use" | "forward" => self.parse_module_link(name, &tok),
            "debug" | "warn" | "error" => self.parse_diagnostic(name, &tok),
            _ => self.parse_generic(name, &tok, stmt_indent),
        }
    }

    // -- Control flow ------------------------------------------

    fn parse_if(&mut self, tok: &Token, stmt_indent: i32) -> Result<Node, ParseError> {
        let condition = self.parse_expression()?;
        let then_block = self.parse_block_body()?;
        let else_branch = self.parse_else_chain(stmt_indent)?;
        Ok(Node::If {
            condition: Box::new(condition),
            then_block,
            else_branch,
            line: tok.line,
            column: tok.column,
        })
    }

    /// An `@else` belongs to the preceding `@if` only when it sits at the
    /// same indent in the indented variant; otherwise the cursor is left
    /// untouched for the enclosing block.
    fn parse_else_chain(&mut self, stmt_indent: i32) -> Result<Option<ElseBranch>, ParseError> {
        let checkpoint = self.checkpoint();
        if self.syntax() == Syntax::Indented {
            self.skip_space();
        }
        if !matches!(
            self.stream_ref().current(),
            Some(t) if t.kind == TokenKind::AtKeyword && t.text == "@else"
        ) {
            self.rollback(checkpoint);
            return Ok(None);
        }
        if self.syntax() == Syntax::Indented && self.current_line_indent() != stmt_indent {
            self.rollback(checkpoint);
            return Ok(None);
        }

        let else_tok = self.stream().consume(TokenKind::AtKeyword)?;
        self.stream().skip_whitespace();

        if self.at_word("if") {
            self.stream().advance();
            self.stream().skip_whitespace();
            let condition = self.parse_expression()?;
            let then_block = self.parse_block_body()?;
            let else_branch = self.parse_else_chain(stmt_indent)?;
            return Ok(Some(ElseBranch::If(Box::new(Node::If {
                condition: Box::new(condition),
                then_block,
                else_branch,
                line: else_tok.line,
                column: else_tok.column,
            }))));
        }
        let block = self.parse_block_body()?;
        Ok(Some(ElseBranch::Else(block)))
    }

    fn parse_for(&mut self, tok: &Token) -> Result<Node, ParseError> {
        let var = self.stream().consume(TokenKind::Variable)?;
        self.stream().skip_whitespace();
        self.expect_word("from")?;
        // Single values, not lists: `through`/`to` must stay visible as the
        // range keyword rather than be swallowed into a space list.
        let from = self.parse_binary(0)?;
        self.stream().skip_whitespace();
        let keyword = self.stream().consume(TokenKind::Ident)?;
        let inclusive = match keyword.text.as_str() {
            "through" => true,
            "to" => false,
            other => {
                return Err(ParseError::syntax(
                    format!("expected 'through' or 'to', got '{}'", other),
                    keyword.line,
                    keyword.column,
                ))
            }
        };
        let to = self.parse_binary(0)?;
        let body = self.parse_block_body()?;
        Ok(Node::For {
            variable: var.text.trim_start_matches('$').to_string(),
            from: Box::new(from),
            to: Box::new(to),
            inclusive,
            body,
            line: tok.line,
            column: tok.column,
        })
    }

    fn parse_each(&mut self, tok: &Token) -> Result<Node, ParseError> {
        let mut variables = Vec::new();
        loop {
            let var = self.stream().consume(TokenKind::Variable)?;
            variables.push(var.text.trim_start_matches('$').to_string());
            self.stream().skip_whitespace();
            if self.at_operator(",") {
                self.stream().advance();
                self.stream().skip_whitespace();
                continue;
            }
            break;
        }
        self.expect_word("in")?;
        self.stream().skip_whitespace();
        let list = self.parse_expression()?;
        let body = self.parse_block_body()?;
        Ok(Node::Each {
            variables,
            list: Box::new(list),
            body,
            line: tok.line,
            column: tok.column,
        })
    }

    fn parse_while(&mut self, tok: &Token) -> Result<Node, ParseError> {
        let condition = self.parse_expression()?;
        let body = self.parse_block_body()?;
        Ok(Node::While {
            condition: Box::new(condition),
            body,
            line: tok.line,
            column: tok.column,
        })
    }

    // -- Callables ---------------------------------------------

    fn parse_callable(&mut self, tok: &Token, is_function: bool) -> Result<Node, ParseError> {
        let name_tok = self
            .stream()
            .expect_any(&[TokenKind::FunctionName, TokenKind::Ident])?;
        let params = if name_tok.kind == TokenKind::FunctionName {
            self.stream().consume(TokenKind::ParenOpen)?;
            self.parse_params()?
        } else {
            Vec::new()
        };
        let body = self.parse_block_body()?;
        let name = name_tok.text;
        if is_function {
            Ok(Node::Function {
                name,
                params,
                body,
                line: tok.line,
                column: tok.column,
            })
        } else {
            Ok(Node::Mixin {
                name,
                params,
                body,
                line: tok.line,
                column: tok.column,
            })
        }
    }

    /// Parameter list up to and including the closing paren: `$name`,
    /// `$name: default`, and a final `$rest...`.
    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        loop {
            self.skip_space();
            if self.stream().consume_if(TokenKind::ParenClose).is_some() {
                break;
            }
            if self.at_operator(",") {
                self.stream().advance();
                continue;
            }
            let var = self.stream().consume(TokenKind::Variable)?;
            let mut default = None;
            let mut spread = false;
            if self.stream().consume_if(TokenKind::Colon).is_some() {
                self.skip_space();
                default = Some(self.parse_space_list()?);
            }
            self.stream().skip_whitespace();
            if self.stream().matches(TokenKind::Spread) {
                let marker = self.stream().consume(TokenKind::Spread)?;
                self.skip_space();
                if !self.stream().matches(TokenKind::ParenClose) {
                    return Err(ParseError::syntax(
                        "spread marker is only allowed on the final parameter",
                        marker.line,
                        marker.column,
                    ));
                }
                spread = true;
            }
            params.push(Param {
                name: var.text.trim_start_matches('$').to_string(),
                default,
                spread,
            });
        }
        Ok(params)
    }

    pub(crate) fn parse_include(&mut self) -> Result<Node, ParseError> {
        let stmt_indent = self.current_line_indent();
        let tok = self.stream().consume(TokenKind::AtKeyword)?;
        self.stream().skip_whitespace();
        let name_tok = self
            .stream()
            .expect_any(&[TokenKind::FunctionName, TokenKind::Ident])?;
        let (args, named_args, spread) = if name_tok.kind == TokenKind::FunctionName {
            self.stream().consume(TokenKind::ParenOpen)?;
            self.parse_arguments()?
        } else {
            (Vec::new(), Vec::new(), false)
        };

        let body = match self.syntax() {
            Syntax::Brace => {
                self.stream().skip_whitespace();
                if self.stream().matches(TokenKind::BraceOpen) {
                    Some(self.parse_block_body()?)
                } else {
                    self.stream().consume_if(TokenKind::Semicolon);
                    None
                }
            }
            Syntax::Indented => {
                if self.has_indented_body(stmt_indent) {
                    Some(self.parse_block_body()?)
                } else {
                    None
                }
            }
        };

        Ok(Node::Include {
            name: name_tok.text,
            args,
            named_args,
            spread,
            body,
            line: tok.line,
            column: tok.column,
        })
    }

    pub(crate) fn parse_return(&mut self) -> Result<Node, ParseError> {
        let tok = self.stream().consume(TokenKind::AtKeyword)?;
        self.stream().skip_whitespace();
        let value = self.parse_expression()?;
        if self.syntax() == Syntax::Brace {
            self.stream().consume_if(TokenKind::Semicolon);
        }
        Ok(Node::Return {
            value: Box::new(value),
            line: tok.line,
            column: tok.column,
        })
    }

    // -- Modules and diagnostics -------------------------------

    /// `@use "path" as ns with (key: value)` / `@forward "path" ...`.
    /// The header parts are kept as a value list: path string, optional
    /// namespace identifier (`*` for a wildcard), optional config map.
    fn parse_module_link(&mut self, name: String, tok: &Token) -> Result<Node, ParseError> {
        let path_tok = self.stream().consume(TokenKind::Str)?;
        let mut parts = vec![Node::Str {
            value: path_tok.text[1..path_tok.text.len() - 1].to_string(),
            quoted: true,
            line: path_tok.line,
            column: path_tok.column,
        }];
        self.stream().skip_whitespace();

        if self.at_word("as") {
            self.stream().advance();
            self.stream().skip_whitespace();
            let ns = self
                .stream()
                .expect_any(&[TokenKind::Ident, TokenKind::Asterisk])?;
            parts.push(Node::Identifier {
                name: ns.text,
                line: ns.line,
                column: ns.column,
            });
            self.stream().skip_whitespace();
        }
        if self.at_word("with") {
            self.stream().advance();
            self.stream().skip_whitespace();
            let map = self
                .try_parse_map()?
                .ok_or_else(|| self.err_here("expected configuration map after 'with'"))?;
            parts.push(map);
            self.stream().skip_whitespace();
        }
        if self.syntax() == Syntax::Brace {
            self.stream().consume_if(TokenKind::Semicolon);
        }

        let value = if parts.len() == 1 {
            parts.remove(0)
        } else {
            Node::List {
                items: parts,
                separator: Separator::Space,
                bracketed: false,
                line: path_tok.line,
                column: path_tok.column,
            }
        };
        Ok(Node::AtRule {
            name,
            value: Some(Box::new(value)),
            block: None,
            line: tok.line,
            column: tok.column,
        })
    }

    fn parse_diagnostic(&mut self, name: String, tok: &Token) -> Result<Node, ParseError> {
        let value = self.parse_expression()?;
        if self.syntax() == Syntax::Brace {
            self.stream().consume_if(TokenKind::Semicolon);
        }
        Ok(Node::AtRule {
            name,
            value: Some(Box::new(value)),
            block: None,
            line: tok.line,
            column: tok.column,
        })
    }

    /// Generic fallback: raw header text plus optional block. Covers
    /// `@media`, `@container`, `@supports`, `@keyframes`, `@at-root`,
    /// `@charset`, and any at-rule this parser has no dedicated grammar for.
    fn parse_generic(
        &mut self,
        name: String,
        tok: &Token,
        stmt_indent: i32,
    ) -> Result<Node, ParseError> {
        let (text, line) = self.parse_header_text()?;
        let value = if text.is_empty() {
            None
        } else {
            Some(Box::new(Node::Selector {
                selector: Selector { text, line },
                line: tok.line,
                column: tok.column,
            }))
        };

        let block = match self.syntax() {
            Syntax::Brace => {
                if self.stream().matches(TokenKind::BraceOpen) {
                    Some(self.parse_block_body()?)
                } else {
                    self.stream().consume_if(TokenKind::Semicolon);
                    None
                }
            }
            Syntax::Indented => {
                if self.has_indented_body(stmt_indent) {
                    Some(self.parse_block_body()?)
                } else {
                    None
                }
            }
        };

        Ok(Node::AtRule {
            name,
            value,
            block,
            line: tok.line,
            column: tok.column,
        })
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::super::parse;
    use crate::ast::{ElseBranch, Node};
    use crate::token::Syntax;

    fn parse_brace(src: &str) -> Vec<Node> {
        parse(src, Syntax::Brace).expect("parse should succeed")
    }

    #[test]
    fn if_else_if_else_chain() {
        let nodes = parse_brace(
            "@if $a == 1 { x: 1; } @else if $a == 2 { x: 2; } @else { x: 3; }",
        );
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            Node::If { else_branch, .. } => {
                let Some(ElseBranch::If(elseif)) = else_branch else {
                    panic!("expected else-if branch, got {:?}", else_branch);
                };
                match elseif.as_ref() {
                    Node::If { else_branch, .. } => {
                        assert!(matches!(else_branch, Some(ElseBranch::Else(_))));
                    }
                    other => panic!("expected if, got {:?}", other),
                }
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn for_through_and_to() {
        let nodes = parse_brace("@for $i from 1 through 3 { x: $i; }");
        match &nodes[0] {
            Node::For {
                variable,
                inclusive,
                ..
            } => {
                assert_eq!(variable, "i");
                assert!(inclusive);
            }
            other => panic!("expected for, got {:?}", other),
        }
        let nodes = parse_brace("@for $i from 1 to $n + 1 { x: $i; }");
        match &nodes[0] {
            Node::For { inclusive, to, .. } => {
                assert!(!inclusive);
                assert!(matches!(to.as_ref(), Node::Operation { op, .. } if op == "+"));
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn each_with_multiple_variables() {
        let nodes = parse_brace("@each $key, $val in (a: 1, b: 2) { x: $val; }");
        match &nodes[0] {
            Node::Each {
                variables, list, ..
            } => {
                assert_eq!(variables, &["key", "val"]);
                assert!(matches!(list.as_ref(), Node::Map { .. }));
            }
            other => panic!("expected each, got {:?}", other),
        }
    }

    #[test]
    fn while_loop() {
        let nodes = parse_brace("@while $i < 6 { x: $i; }");
        match &nodes[0] {
            Node::While { condition, .. } => {
                assert!(matches!(condition.as_ref(), Node::Operation { op, .. } if op == "<"));
            }
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn function_with_defaults_and_spread() {
        let nodes = parse_brace("@function pad($base, $scale: 1.5, $rest...) { @return $base; }");
        match &nodes[0] {
            Node::Function {
                name, params, body, ..
            } => {
                assert_eq!(name, "pad");
                assert_eq!(params.len(), 3);
                assert!(params[0].default.is_none());
                assert!(params[1].default.is_some());
                assert!(params[2].spread);
                assert!(matches!(body.nested().next(), Some(Node::Return { .. })));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn spread_parameter_must_be_last() {
        let err = parse("@mixin m($rest..., $x) { a: 1; }", Syntax::Brace).unwrap_err();
        assert!(matches!(err, crate::error::ParseError::Syntax { .. }));
    }

    #[test]
    fn include_with_args_and_content_block() {
        let nodes = parse_brace("p { @include theme($dark, $mode: dim) { color: red; } }");
        let block = match &nodes[0] {
            Node::Rule { block, .. } => block,
            other => panic!("expected rule, got {:?}", other),
        };
        let item = block.nested().next().expect("include item");
        match item {
            Node::Include {
                name,
                args,
                named_args,
                body,
                ..
            } => {
                assert_eq!(name, "theme");
                assert_eq!(args.len(), 1);
                assert_eq!(named_args[0].0, "mode");
                assert!(body.is_some());
            }
            other => panic!("expected include, got {:?}", other),
        }
    }

    #[test]
    fn bare_include_has_no_body() {
        let nodes = parse_brace("p { @include reset; }");
        let block = match &nodes[0] {
            Node::Rule { block, .. } => block,
            other => panic!("expected rule, got {:?}", other),
        };
        let item = block.nested().next().expect("include item");
        match item {
            Node::Include { name, body, .. } => {
                assert_eq!(name, "reset");
                assert!(body.is_none());
            }
            other => panic!("expected include, got {:?}", other),
        }
    }

    #[test]
    fn media_query_keeps_raw_header() {
        let nodes = parse_brace("@media screen and (min-width: 600px) { p { x: 1; } }");
        match &nodes[0] {
            Node::AtRule {
                name, value, block, ..
            } => {
                assert_eq!(name, "media");
                match value.as_deref() {
                    Some(Node::Selector { selector, .. }) => {
                        assert_eq!(selector.text, "screen and (min-width: 600px)");
                    }
                    other => panic!("expected selector value, got {:?}", other),
                }
                assert!(block.is_some());
            }
            other => panic!("expected at-rule, got {:?}", other),
        }
    }

    #[test]
    fn keyframes_with_percentage_selectors() {
        let nodes = parse_brace("@keyframes spin { 0% { o: 0; } 100% { o: 1; } }");
        match &nodes[0] {
            Node::AtRule { name, block, .. } => {
                assert_eq!(name, "keyframes");
                let block = block.as_ref().expect("keyframes body");
                let frames: Vec<_> = block.nested().collect();
                assert_eq!(frames.len(), 2);
                assert!(
                    matches!(frames[0], Node::Rule { selector, .. } if selector.text == "0%")
                );
            }
            other => panic!("expected at-rule, got {:?}", other),
        }
    }

    #[test]
    fn use_with_namespace_and_config() {
        let nodes = parse_brace(r#"@use "theme/dark" as dark with ($accent: blue);"#);
        match &nodes[0] {
            Node::AtRule { name, value, .. } => {
                assert_eq!(name, "use");
                match value.as_deref() {
                    Some(Node::List { items, .. }) => {
                        assert_eq!(items.len(), 3);
                        assert!(
                            matches!(&items[0], Node::Str { value, .. } if value == "theme/dark")
                        );
                        assert!(matches!(&items[2], Node::Map { .. }));
                    }
                    other => panic!("expected list value, got {:?}", other),
                }
            }
            other => panic!("expected at-rule, got {:?}", other),
        }
    }

    #[test]
    fn forward_wildcard_namespace() {
        let nodes = parse_brace(r#"@forward "mixins" as *;"#);
        match &nodes[0] {
            Node::AtRule { name, value, .. } => {
                assert_eq!(name, "forward");
                match value.as_deref() {
                    Some(Node::List { items, .. }) => {
                        assert!(matches!(&items[1], Node::Identifier { name, .. } if name == "*"));
                    }
                    other => panic!("expected list value, got {:?}", other),
                }
            }
            other => panic!("expected at-rule, got {:?}", other),
        }
    }

    #[test]
    fn debug_takes_an_expression() {
        let nodes = parse_brace("@debug $x + 1;");
        match &nodes[0] {
            Node::AtRule { name, value, .. } => {
                assert_eq!(name, "debug");
                assert!(matches!(
                    value.as_deref(),
                    Some(Node::Operation { op, .. }) if op == "+"
                ));
            }
            other => panic!("expected at-rule, got {:?}", other),
        }
    }

    #[test]
    fn charset_has_no_block() {
        let nodes = parse_brace(r#"@charset "utf-8";"#);
        match &nodes[0] {
            Node::AtRule { name, block, .. } => {
                assert_eq!(name, "charset");
                assert!(block.is_none());
            }
            other => panic!("expected at-rule, got {:?}", other),
        }
    }

    #[test]
    fn at_root_with_selector() {
        let nodes = parse_brace("p { @at-root .top { x: 1; } }");
        let outer = match &nodes[0] {
            Node::Rule { block, .. } => block,
            other => panic!("expected rule, got {:?}", other),
        };
        let item = outer.nested().next().expect("at-root item");
        match item {
            Node::AtRule {
                name, value, block, ..
            } => {
                assert_eq!(name, "at-root");
                assert!(matches!(
                    value.as_deref(),
                    Some(Node::Selector { selector, .. }) if selector.text == ".top"
                ));
                assert!(block.is_some());
            }
            other => panic!("expected at-rule, got {:?}", other),
        }
    }
}
