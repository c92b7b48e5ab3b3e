//! Subcommand implementations.
//!
//! Each command reads the file, runs the front end, and prints either a
//! human-oriented text rendering or pretty JSON. Diagnostics go to stderr
//! as `file:line:column: message` (or a JSON object with the same fields)
//! and the process exits nonzero.

use std::fs;
use std::path::Path;

use cassia_core::{parse, tokenize, Node, ParseError, Syntax};
use serde::Serialize;

use crate::{resolve_syntax, OutputFormat, SyntaxArg};

#[derive(Serialize)]
struct Diagnostic<'a> {
    error: String,
    file: &'a str,
    line: u32,
    column: u32,
}

pub(crate) fn cmd_parse(file: &Path, syntax: Option<SyntaxArg>, output: OutputFormat) -> i32 {
    let Some(source) = read_source(file) else {
        return 2;
    };
    let syntax = resolve_syntax(file, syntax);
    match parse(&source, syntax) {
        Ok(nodes) => {
            match output {
                OutputFormat::Json => print_json(&nodes),
                OutputFormat::Text => {
                    for node in &nodes {
                        println!("{}", describe(node));
                    }
                }
            }
            0
        }
        Err(e) => {
            report(file, &e, output);
            1
        }
    }
}

pub(crate) fn cmd_tokens(file: &Path, syntax: Option<SyntaxArg>, output: OutputFormat) -> i32 {
    let Some(source) = read_source(file) else {
        return 2;
    };
    let syntax = resolve_syntax(file, syntax);
    match tokenize(&source, syntax) {
        Ok(stream) => {
            match output {
                OutputFormat::Json => print_json(&stream.tokens()),
                OutputFormat::Text => {
                    for tok in stream.tokens() {
                        println!("{}:{}\t{:?}\t{:?}", tok.line, tok.column, tok.kind, tok.text);
                    }
                }
            }
            0
        }
        Err(e) => {
            report(file, &e, output);
            1
        }
    }
}

fn read_source(file: &Path) -> Option<String> {
    match fs::read_to_string(file) {
        Ok(source) => Some(source),
        Err(e) => {
            eprintln!("{}: {}", file.display(), e);
            None
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    let pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}

fn report(file: &Path, error: &ParseError, output: OutputFormat) {
    match output {
        OutputFormat::Text => {
            eprintln!(
                "{}:{}:{}: {}",
                file.display(),
                error.line(),
                error.column(),
                error
            );
        }
        OutputFormat::Json => {
            let file = file.display().to_string();
            let diag = Diagnostic {
                error: error.to_string(),
                file: &file,
                line: error.line(),
                column: error.column(),
            };
            let pretty = serde_json::to_string_pretty(&diag)
                .unwrap_or_else(|_| format!("{:?}", error));
            eprintln!("{}", pretty);
        }
    }
}

/// One-line summary of a top-level node for the text rendering.
fn describe(node: &Node) -> String {
    match node {
        Node::Rule {
            selector,
            block,
            line,
            ..
        } => format!(
            "{:>4}  rule {:?} ({} items)",
            line,
            selector.text,
            block.items.len()
        ),
        Node::VariableDeclaration { name, line, .. } => {
            format!("{:>4}  variable ${}", line, name)
        }
        Node::Function {
            name, params, line, ..
        } => format!("{:>4}  function {}({} params)", line, name, params.len()),
        Node::Mixin {
            name, params, line, ..
        } => format!("{:>4}  mixin {}({} params)", line, name, params.len()),
        Node::Include { name, line, .. } => format!("{:>4}  include {}", line, name),
        Node::If { line, .. } => format!("{:>4}  @if", line),
        Node::For { variable, line, .. } => format!("{:>4}  @for ${}", line, variable),
        Node::Each {
            variables, line, ..
        } => format!("{:>4}  @each ${}", line, variables.join(", $")),
        Node::While { line, .. } => format!("{:>4}  @while", line),
        Node::Comment { line, .. } => format!("{:>4}  comment", line),
        Node::AtRule { name, line, .. } => format!("{:>4}  @{}", line, name),
        other => format!("{:>4}  {:?}", other.line(), other),
    }
}
