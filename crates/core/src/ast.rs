//! AST types produced by the parsers.
//!
//! The tree is built top-down during parsing and never mutated in place
//! afterwards; every node is owned by exactly one parent collection until
//! it is handed to the evaluator. All nodes carry the 1-based line/column
//! of the token that opened them.

use serde::Serialize;

// ──────────────────────────────────────────────
// Supporting types
// ──────────────────────────────────────────────

/// Separator tag for list nodes.
///
/// The parsers emit `Space` and `Comma` only: a `/` between values is read
/// as division, and a trailing `/ alpha` inside a color constructor is
/// split into the `Color` node's alpha. `Slash` is the tag for consumers
/// that rebuild slash shorthands when rendering such lists back to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Separator {
    Space,
    Comma,
    Slash,
}

/// A selector, reconstructed as text. Downstream nesting and extend logic
/// operates on selector strings, not structured selectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selector {
    pub text: String,
    pub line: u32,
}

/// A `property: value` entry inside a rule body. Not a node itself; it is
/// carried in its owning block's item list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub name: String,
    pub value: Node,
    pub important: bool,
    pub line: u32,
    pub column: u32,
}

/// One parameter of a `@function` or `@mixin` header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: String,
    pub default: Option<Node>,
    /// A trailing `$rest...` parameter. At most one, and only in last position.
    pub spread: bool,
}

/// One entry of a block body, in source order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockItem {
    Declaration(Declaration),
    Node(Node),
}

/// An ordered block body. Insertion order is semantically significant:
/// CSS cascade and evaluation order both depend on it.
///
/// `items` is the single owning store; `declarations()` and `nested()` are
/// filtered views over the same ordered content.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Block {
    pub items: Vec<BlockItem>,
}

impl Block {
    pub fn new() -> Self {
        Block { items: Vec::new() }
    }

    pub fn push_declaration(&mut self, decl: Declaration) {
        self.items.push(BlockItem::Declaration(decl));
    }

    pub fn push_node(&mut self, node: Node) {
        self.items.push(BlockItem::Node(node));
    }

    /// The `property: value` entries of this block, in source order.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.items.iter().filter_map(|item| match item {
            BlockItem::Declaration(d) => Some(d),
            BlockItem::Node(_) => None,
        })
    }

    /// The nested rules, at-rules and other non-declaration items.
    pub fn nested(&self) -> impl Iterator<Item = &Node> {
        self.items.iter().filter_map(|item| match item {
            BlockItem::Node(n) => Some(n),
            BlockItem::Declaration(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The `@else` continuation of an `@if` node: either another conditional
/// (`@else if`) or a plain else block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElseBranch {
    If(Box<Node>),
    Else(Block),
}

// ──────────────────────────────────────────────
// Nodes
// ──────────────────────────────────────────────

/// Closed set of AST node kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// A style rule: selector plus ordered body.
    Rule {
        selector: Selector,
        block: Block,
        line: u32,
        column: u32,
    },

    /// `$name: value`, with optional trailing `!default` / `!global`.
    VariableDeclaration {
        name: String,
        value: Box<Node>,
        global: bool,
        default: bool,
        line: u32,
        column: u32,
    },

    /// `@function name($a, $b: 1, $rest...) { ... }`
    Function {
        name: String,
        params: Vec<Param>,
        body: Block,
        line: u32,
        column: u32,
    },

    /// `@mixin name($a, $b: 1) { ... }`
    Mixin {
        name: String,
        params: Vec<Param>,
        body: Block,
        line: u32,
        column: u32,
    },

    /// `@include name(args...)`, with an optional trailing content block.
    /// `spread` marks a trailing `...` on the final positional argument.
    Include {
        name: String,
        args: Vec<Node>,
        named_args: Vec<(String, Node)>,
        spread: bool,
        body: Option<Block>,
        line: u32,
        column: u32,
    },

    /// `@return expr`
    Return {
        value: Box<Node>,
        line: u32,
        column: u32,
    },

    /// `@if cond { ... } @else if ... @else { ... }` chain.
    If {
        condition: Box<Node>,
        then_block: Block,
        else_branch: Option<ElseBranch>,
        line: u32,
        column: u32,
    },

    /// `@for $i from a through b` (`inclusive`) or `from a to b`.
    For {
        variable: String,
        from: Box<Node>,
        to: Box<Node>,
        inclusive: bool,
        body: Block,
        line: u32,
        column: u32,
    },

    /// `@each $a, $b in expr { ... }`
    Each {
        variables: Vec<String>,
        list: Box<Node>,
        body: Block,
        line: u32,
        column: u32,
    },

    /// `@while cond { ... }`
    While {
        condition: Box<Node>,
        body: Block,
        line: u32,
        column: u32,
    },

    /// Ordered sequence with a separator tag; `bracketed` for `[..]` literals.
    List {
        items: Vec<Node>,
        separator: Separator,
        bracketed: bool,
        line: u32,
        column: u32,
    },

    /// Ordered key/value pairs from a `(key: value, ...)` literal.
    Map {
        pairs: Vec<(Node, Node)>,
        line: u32,
        column: u32,
    },

    /// Numeric literal with an optional unit suffix (`12px`, `1.5`, `50%`).
    Number {
        value: f64,
        unit: Option<String>,
        line: u32,
        column: u32,
    },

    /// A validated `#rgb` / `#rgba` / `#rrggbb` / `#rrggbbaa` literal.
    HexColor {
        value: String,
        line: u32,
        column: u32,
    },

    /// A folded color-space constructor (`hsl`, `hwb`, `lab`, `lch`, `oklch`).
    Color {
        space: String,
        channels: Vec<Node>,
        alpha: Option<Box<Node>>,
        line: u32,
        column: u32,
    },

    /// Binary operation.
    Operation {
        left: Box<Node>,
        op: String,
        right: Box<Node>,
        line: u32,
        column: u32,
    },

    /// Unary prefix operation (`-`, `+`, `not`).
    Unary {
        op: String,
        operand: Box<Node>,
        line: u32,
        column: u32,
    },

    /// `target.property` access chain link.
    PropertyAccess {
        target: Box<Node>,
        property: String,
        line: u32,
        column: u32,
    },

    /// A call with ordered positional and named arguments. `spread` marks a
    /// trailing `...` on the final positional argument.
    FunctionCall {
        name: String,
        args: Vec<Node>,
        named_args: Vec<(String, Node)>,
        spread: bool,
        line: u32,
        column: u32,
    },

    /// Bare word or `$variable` reference (the `$` is kept in the name).
    Identifier {
        name: String,
        line: u32,
        column: u32,
    },

    /// String literal; `quoted` distinguishes `"a"` from bare/opaque text
    /// such as passed-through `url(...)` content.
    Str {
        value: String,
        quoted: bool,
        line: u32,
        column: u32,
    },

    /// `--custom-property` reference.
    CustomProperty {
        name: String,
        line: u32,
        column: u32,
    },

    /// `#{ expr }` wrapper.
    Interpolation {
        expr: Box<Node>,
        line: u32,
        column: u32,
    },

    /// A retained comment (indented variant only; the brace lexer filters
    /// comments before parsing).
    Comment {
        text: String,
        line: u32,
        column: u32,
    },

    /// A selector or raw at-rule header kept as reconstructed text.
    Selector {
        selector: Selector,
        line: u32,
        column: u32,
    },

    /// Generic at-rule: name, optional header value, optional nested block.
    AtRule {
        name: String,
        value: Option<Box<Node>>,
        block: Option<Block>,
        line: u32,
        column: u32,
    },
}

impl Node {
    pub fn line(&self) -> u32 {
        match self {
            Node::Rule { line, .. }
            | Node::VariableDeclaration { line, .. }
            | Node::Function { line, .. }
            | Node::Mixin { line, .. }
            | Node::Include { line, .. }
            | Node::Return { line, .. }
            | Node::If { line, .. }
            | Node::For { line, .. }
            | Node::Each { line, .. }
            | Node::While { line, .. }
            | Node::List { line, .. }
            | Node::Map { line, .. }
            | Node::Number { line, .. }
            | Node::HexColor { line, .. }
            | Node::Color { line, .. }
            | Node::Operation { line, .. }
            | Node::Unary { line, .. }
            | Node::PropertyAccess { line, .. }
            | Node::FunctionCall { line, .. }
            | Node::Identifier { line, .. }
            | Node::Str { line, .. }
            | Node::CustomProperty { line, .. }
            | Node::Interpolation { line, .. }
            | Node::Comment { line, .. }
            | Node::Selector { line, .. }
            | Node::AtRule { line, .. } => *line,
        }
    }

    pub fn column(&self) -> u32 {
        match self {
            Node::Rule { column, .. }
            | Node::VariableDeclaration { column, .. }
            | Node::Function { column, .. }
            | Node::Mixin { column, .. }
            | Node::Include { column, .. }
            | Node::Return { column, .. }
            | Node::If { column, .. }
            | Node::For { column, .. }
            | Node::Each { column, .. }
            | Node::While { column, .. }
            | Node::List { column, .. }
            | Node::Map { column, .. }
            | Node::Number { column, .. }
            | Node::HexColor { column, .. }
            | Node::Color { column, .. }
            | Node::Operation { column, .. }
            | Node::Unary { column, .. }
            | Node::PropertyAccess { column, .. }
            | Node::FunctionCall { column, .. }
            | Node::Identifier { column, .. }
            | Node::Str { column, .. }
            | Node::CustomProperty { column, .. }
            | Node::Interpolation { column, .. }
            | Node::Comment { column, .. }
            | Node::Selector { column, .. }
            | Node::AtRule { column, .. } => *column,
        }
    }
}
