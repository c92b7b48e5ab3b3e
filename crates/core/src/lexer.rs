//! Pattern-driven lexer.
//!
//! The pattern table below is compiled once per syntax variant into a single
//! anchored alternation and cached for the life of the process. Declaration
//! order is the tie-break priority: the regex engine's leftmost-first
//! semantics try the alternatives in order, so more specific patterns
//! (URL functions, hex colors, `!important`) are declared before the generic
//! identifier and operator patterns they would otherwise shadow.
//!
//! Two pieces of running state resolve what the patterns alone cannot:
//! the current line/column, and whether the cursor sits inside a block body.
//! Inside a block a bare word is always a property name, so a match that
//! the table classified as a selector is demoted to a plain identifier
//! unless its text carries selector-only punctuation.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseError;
use crate::stream::TokenStream;
use crate::token::{Syntax, Token, TokenKind};

/// Pattern table, most-specific-first. Shared by both syntax variants; the
/// variants differ only in which trivia tokens survive into the stream.
const PATTERNS: &[(TokenKind, &str)] = &[
    (TokenKind::Comment, r"/\*[\s\S]*?\*/|//[^\n]*"),
    (TokenKind::Newline, r"\r?\n"),
    (TokenKind::Whitespace, r"[ \t]+"),
    (TokenKind::Spread, r"\.\.\."),
    (TokenKind::Url, r"url\([^)\n]*\)"),
    (TokenKind::Important, r"!important\b"),
    (TokenKind::AtKeyword, r"@[a-zA-Z][a-zA-Z-]*"),
    (TokenKind::Variable, r"\$[a-zA-Z_][a-zA-Z0-9_-]*"),
    (TokenKind::CustomProperty, r"--[a-zA-Z_][a-zA-Z0-9_-]*"),
    (TokenKind::DoubleHashInterpolation, r"##\{"),
    (TokenKind::InterpolationOpen, r"#\{"),
    (TokenKind::HexColor, r"#[0-9a-zA-Z]+"),
    (TokenKind::AttributeSelector, r"\[[^\]\n]*\]"),
    (TokenKind::Number, r"[0-9]+(?:\.[0-9]+)?[a-zA-Z%]*|\.[0-9]+[a-zA-Z%]*"),
    (TokenKind::Str, r#""[^"\n]*"|'[^'\n]*'"#),
    (TokenKind::LogicalOp, r"(?:and|or|not)\b"),
    (
        TokenKind::Selector,
        r"&[^ \t\r\n{};,()]*|-?[a-zA-Z_][a-zA-Z0-9_-]*(?:::?-?[a-zA-Z_][a-zA-Z0-9_-]*)+",
    ),
    (TokenKind::Ident, r"-?[a-zA-Z_][a-zA-Z0-9_-]*"),
    (TokenKind::Colon, r":"),
    (TokenKind::Semicolon, r";"),
    (TokenKind::BraceOpen, r"\{"),
    (TokenKind::BraceClose, r"\}"),
    (TokenKind::ParenOpen, r"\("),
    (TokenKind::ParenClose, r"\)"),
    (TokenKind::Asterisk, r"\*"),
    (TokenKind::Operator, r"[-+/%=<>.,~!&#?]"),
];

/// Punctuation that marks a lexeme as selector-only even inside a block
/// body (`.box`, `a:hover`, `&.active` must stay selectors there).
fn carries_selector_punctuation(text: &str) -> bool {
    text.starts_with('.')
        || text.starts_with('#')
        || text.contains([':', '[', '&', '>', '+', '~'])
}

fn compiled_alternation() -> &'static Regex {
    static ALTERNATION: OnceLock<Regex> = OnceLock::new();
    ALTERNATION.get_or_init(|| {
        let alternates: Vec<String> = PATTERNS
            .iter()
            .enumerate()
            .map(|(i, (_, pattern))| format!("(?P<p{i}>{pattern})"))
            .collect();
        let source = format!(r"\A(?:{})", alternates.join("|"));
        Regex::new(&source).expect("lexer pattern table must compile")
    })
}

/// Entry in a brace-tracking stack: `true` for a block `{`, `false` for an
/// interpolation `#{`, so a `}` closing an interpolation never flips the
/// inside-a-block flag.
struct LexState {
    braces: Vec<bool>,
    at_line_start: bool,
    line_indent: usize,
}

impl LexState {
    fn in_block(&self, syntax: Syntax) -> bool {
        match syntax {
            Syntax::Brace => self.braces.iter().any(|&is_block| is_block),
            Syntax::Indented => self.line_indent > 0,
        }
    }
}

/// Tokenize `source` under the given syntax variant.
///
/// Fails with [`ParseError::Lexical`] when no pattern matches at the
/// current offset.
pub fn tokenize(source: &str, syntax: Syntax) -> Result<TokenStream, ParseError> {
    let re = compiled_alternation();
    let mut tokens = Vec::new();
    let mut offset = 0usize;
    let mut line: u32 = 1;
    let mut column: u32 = 1;
    let mut state = LexState {
        braces: Vec::new(),
        at_line_start: true,
        line_indent: 0,
    };

    while offset < source.len() {
        let rest = &source[offset..];
        let caps = re.captures(rest).ok_or_else(|| {
            let next = rest.chars().next().unwrap_or('\0');
            ParseError::lexical(format!("unexpected character '{next}'"), line, column)
        })?;

        let (index, text) = PATTERNS
            .iter()
            .enumerate()
            .find_map(|(i, _)| {
                caps.name(&format!("p{i}"))
                    .map(|m| (i, m.as_str().to_owned()))
            })
            .ok_or_else(|| ParseError::lexical("unmatchable input", line, column))?;

        let mut kind = PATTERNS[index].0;

        // Running re-classification: bare words inside a block body are
        // property names, not selector fragments.
        if state.in_block(syntax)
            && matches!(kind, TokenKind::Ident | TokenKind::Selector)
            && !carries_selector_punctuation(&text)
        {
            kind = TokenKind::Ident;
        }

        // Function-name lookahead: an identifier directly followed by `(`
        // is the name of a call (or a pseudo-class function in selectors).
        // `not` gets the same treatment so `:not(...)` works; the word-form
        // operators always take a space before their operand.
        if matches!(kind, TokenKind::Ident | TokenKind::LogicalOp)
            && source[offset + text.len()..].starts_with('(')
        {
            kind = TokenKind::FunctionName;
        }

        match kind {
            TokenKind::BraceOpen => state.braces.push(true),
            TokenKind::InterpolationOpen | TokenKind::DoubleHashInterpolation => {
                state.braces.push(false)
            }
            TokenKind::BraceClose => {
                state.braces.pop();
            }
            _ => {}
        }

        // Indent bookkeeping for the indented variant's in-block flag.
        match kind {
            TokenKind::Newline => {
                state.at_line_start = true;
                state.line_indent = 0;
            }
            TokenKind::Whitespace if state.at_line_start => {
                state.line_indent = text.chars().count();
                state.at_line_start = false;
            }
            _ => state.at_line_start = false,
        }

        let retained = match syntax {
            Syntax::Brace => !matches!(
                kind,
                TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment
            ),
            Syntax::Indented => true,
        };
        if retained {
            tokens.push(Token::new(kind, text.clone(), line, column));
        }

        // Position update: count newlines inside the matched span; the
        // column restarts after the last one.
        let len = text.chars().count() as u32;
        let newlines = text.matches('\n').count() as u32;
        if newlines > 0 {
            line += newlines;
            let after_last = text
                .rfind('\n')
                .map(|i| text[i + 1..].chars().count() as u32)
                .unwrap_or(0);
            column = after_last + 1;
        } else {
            column += len;
        }
        offset += text.len();
    }

    Ok(TokenStream::new(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str, syntax: Syntax) -> Vec<TokenKind> {
        tokenize(source, syntax)
            .unwrap()
            .tokens()
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn rule_with_declaration_classifies_idempotently() {
        // A bare `color` inside a block is never a selector.
        assert_eq!(
            kinds(".box { color: red; }", Syntax::Brace),
            vec![
                TokenKind::Operator,
                TokenKind::Ident,
                TokenKind::BraceOpen,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::BraceClose,
            ]
        );
    }

    #[test]
    fn pseudo_class_stays_selector_inside_block() {
        let toks = tokenize("div { a:hover { color: red; } }", Syntax::Brace).unwrap();
        let hover = toks
            .tokens()
            .iter()
            .find(|t| t.text == "a:hover")
            .expect("compound selector token");
        assert_eq!(hover.kind, TokenKind::Selector);
    }

    #[test]
    fn function_name_lookahead_beats_identifier() {
        let toks = tokenize("a: rgb(1, 2, 3);", Syntax::Brace).unwrap();
        assert_eq!(toks.tokens()[2].kind, TokenKind::FunctionName);
        assert_eq!(toks.tokens()[2].text, "rgb");
        assert_eq!(toks.tokens()[3].kind, TokenKind::ParenOpen);
    }

    #[test]
    fn url_function_is_opaque() {
        let toks = tokenize("url(images/a.png?v=1)", Syntax::Brace).unwrap();
        assert_eq!(toks.tokens().len(), 1);
        assert_eq!(toks.tokens()[0].kind, TokenKind::Url);
    }

    #[test]
    fn specific_patterns_win_over_operators() {
        assert_eq!(
            kinds("!important ... @media $x --y #abc #{ ##{", Syntax::Brace),
            vec![
                TokenKind::Important,
                TokenKind::Spread,
                TokenKind::AtKeyword,
                TokenKind::Variable,
                TokenKind::CustomProperty,
                TokenKind::HexColor,
                TokenKind::InterpolationOpen,
                TokenKind::DoubleHashInterpolation,
            ]
        );
    }

    #[test]
    fn comparison_operators_stay_single_character() {
        // The expression parser fuses `==`, `!=`, `<=`, `>=` itself.
        assert_eq!(
            kinds("< = > = !", Syntax::Brace),
            vec![
                TokenKind::Operator,
                TokenKind::Operator,
                TokenKind::Operator,
                TokenKind::Operator,
                TokenKind::Operator,
            ]
        );
    }

    #[test]
    fn interpolation_brace_does_not_corrupt_block_depth() {
        // The `}` closing `#{...}` must not flip the in-block flag: `color`
        // after it is still inside the rule body.
        let toks = tokenize("p { a: #{$x}; color: red; }", Syntax::Brace).unwrap();
        let color = toks
            .tokens()
            .iter()
            .find(|t| t.text == "color")
            .expect("color token");
        assert_eq!(color.kind, TokenKind::Ident);
    }

    #[test]
    fn indented_variant_retains_trivia_and_round_trips() {
        let source = "nav\n  color: red\n  // aside\n  a:hover\n    margin: 0\n";
        let toks = tokenize(source, Syntax::Indented).unwrap();
        let rebuilt: String = toks.tokens().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn position_update_counts_newlines_in_multiline_matches() {
        let source = "/* one\ntwo */  margin";
        let toks = tokenize(source, Syntax::Indented).unwrap();
        let margin = toks.tokens().last().unwrap();
        assert_eq!(margin.line, 2);
        // "two */" is 6 chars, then two spaces.
        assert_eq!(margin.column, 9);
    }

    #[test]
    fn unmatchable_input_is_a_lexical_error() {
        let err = tokenize("a { b: ^ }", Syntax::Brace).unwrap_err();
        match err {
            ParseError::Lexical { line, column, .. } => {
                assert_eq!(line, 1);
                assert_eq!(column, 8);
            }
            other => panic!("expected lexical error, got {other:?}"),
        }
    }

    #[test]
    fn brace_variant_round_trips_with_trivia_replayed() {
        // Filtered trivia advances position without emitting tokens, so
        // token positions match a newline-counting replay of the source.
        let source = "a {\n  b: c;\n}\n";
        let toks = tokenize(source, Syntax::Brace).unwrap();
        let b = toks.tokens().iter().find(|t| t.text == "b").unwrap();
        assert_eq!((b.line, b.column), (2, 3));
        let close = toks.tokens().last().unwrap();
        assert_eq!((close.line, close.column), (3, 1));
    }
}
