//! cassia-core: front end for the Cassia stylesheet language.
//!
//! Cassia is a CSS superset with variables, nesting, control flow and
//! callables, in two surface variants: brace-delimited (`.cass`) and
//! indentation-structured (`.casi`). This crate lexes source text into a
//! position-carrying token stream and parses it into an ordered AST.
//!
//! # Public API
//!
//! - [`parse()`] -- lex and parse a stylesheet into [`Node`]s
//! - [`tokenize()`] -- lex only, yielding a [`TokenStream`]
//! - [`Syntax`] -- the surface variant selector
//! - [`ParseError`] -- lexical, syntactic and color diagnostics
//!
//! ```
//! use cassia_core::{parse, Syntax};
//!
//! let nodes = parse(".box { color: #fff; }", Syntax::Brace).unwrap();
//! assert_eq!(nodes.len(), 1);
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod stream;
pub mod token;

pub use ast::{Block, BlockItem, Declaration, ElseBranch, Node, Param, Selector, Separator};
pub use error::ParseError;
pub use lexer::tokenize;
pub use parser::{parse, parse_with_max_depth, DEFAULT_MAX_DEPTH};
pub use stream::TokenStream;
pub use token::{Syntax, Token, TokenKind};
