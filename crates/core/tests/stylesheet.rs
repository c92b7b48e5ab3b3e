//! End-to-end parses of realistic stylesheets in both syntax variants.

use cassia_core::{parse, Block, BlockItem, ElseBranch, Node, ParseError, Syntax};

const BUTTONS_CASS: &str = r#"
@use "theme/colors" as colors;

$radius: 4px !default;
$spacing: (small: 4px, medium: 8px, large: 16px);

@function scale($base, $factor: 1.5) {
  @return $base * $factor;
}

@mixin focus-ring($color, $width: 2px) {
  outline: $width solid $color;
  outline-offset: 2px;
}

.btn {
  padding: 8px 16px;
  border-radius: $radius;
  background: hsl(210 80% 45%);
  color: #fff;

  &:hover {
    background: hsl(210 80% 38% / 0.9);
  }

  &.disabled {
    opacity: 0.4 !important;
  }

  .icon + .label {
    margin-left: 4px;
  }
}

@media screen and (min-width: 600px) {
  .btn {
    padding: scale(8px) scale(16px);
  }
}

@each $name, $size in $spacing {
  .pad-#{$name} {
    padding: $size;
  }
}

@if $radius > 2px {
  .rounded { border-radius: $radius; }
} @else {
  .rounded { border-radius: 0; }
}
"#;

const NAV_CASI: &str = "\
$height: 48px

@mixin row
  display: flex
  align-items: center

nav
  @include row
  height: $height

  ul
    margin: 0
    padding: 0

    li
      list-style: none

  a:hover
    text-decoration: underline

@keyframes fade
  0%
    opacity: 0
  100%
    opacity: 1
";

fn block_of(node: &Node) -> &Block {
    match node {
        Node::Rule { block, .. } => block,
        other => panic!("expected rule, got {:?}", other),
    }
}

#[test]
fn realistic_brace_stylesheet_parses_completely() {
    let nodes = parse(BUTTONS_CASS, Syntax::Brace).expect("stylesheet should parse");
    assert_eq!(nodes.len(), 9);

    assert!(matches!(&nodes[0], Node::AtRule { name, .. } if name == "use"));
    match &nodes[1] {
        Node::VariableDeclaration { name, default, .. } => {
            assert_eq!(name, "radius");
            assert!(default);
        }
        other => panic!("expected variable, got {:?}", other),
    }
    match &nodes[2] {
        Node::VariableDeclaration { value, .. } => {
            assert!(matches!(value.as_ref(), Node::Map { pairs, .. } if pairs.len() == 3));
        }
        other => panic!("expected variable, got {:?}", other),
    }
    assert!(matches!(&nodes[3], Node::Function { params, .. } if params.len() == 2));
    assert!(matches!(&nodes[4], Node::Mixin { params, .. } if params.len() == 2));

    let btn = block_of(&nodes[5]);
    assert_eq!(btn.declarations().count(), 4);
    let nested: Vec<_> = btn.nested().collect();
    assert_eq!(nested.len(), 3);
    match nested[0] {
        Node::Rule {
            selector, block, ..
        } => {
            assert_eq!(selector.text, "&:hover");
            let decl = block.declarations().next().unwrap();
            match decl.value {
                Node::Color { ref alpha, .. } => assert!(alpha.is_some()),
                ref other => panic!("expected color, got {:?}", other),
            }
        }
        other => panic!("expected rule, got {:?}", other),
    }
    match nested[1] {
        Node::Rule { block, .. } => {
            assert!(block.declarations().next().unwrap().important);
        }
        other => panic!("expected rule, got {:?}", other),
    }
    assert!(
        matches!(nested[2], Node::Rule { selector, .. } if selector.text == ".icon + .label")
    );

    match &nodes[6] {
        Node::AtRule { name, block, .. } => {
            assert_eq!(name, "media");
            let inner = block.as_ref().expect("media body");
            let btn = inner.nested().next().expect("nested .btn rule");
            let padding = &block_of(btn).declarations().next().unwrap().value;
            match padding {
                Node::List { items, .. } => {
                    assert!(matches!(items[0], Node::FunctionCall { ref name, .. } if name == "scale"));
                }
                other => panic!("expected list, got {:?}", other),
            }
        }
        other => panic!("expected at-rule, got {:?}", other),
    }

    match &nodes[7] {
        Node::Each {
            variables, body, ..
        } => {
            assert_eq!(variables, &["name", "size"]);
            let item = body.nested().next().expect("templated rule");
            match item {
                Node::Rule { selector, .. } => assert_eq!(selector.text, ".pad-$name"),
                other => panic!("expected rule, got {:?}", other),
            }
        }
        other => panic!("expected each, got {:?}", other),
    }

    match &nodes[8] {
        Node::If {
            condition,
            else_branch,
            ..
        } => {
            assert!(matches!(condition.as_ref(), Node::Operation { op, .. } if op == ">"));
            assert!(matches!(else_branch, Some(ElseBranch::Else(_))));
        }
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn realistic_indented_stylesheet_parses_completely() {
    let nodes = parse(NAV_CASI, Syntax::Indented).expect("stylesheet should parse");
    assert_eq!(nodes.len(), 4);

    assert!(matches!(&nodes[0], Node::VariableDeclaration { name, .. } if name == "height"));
    assert!(matches!(&nodes[1], Node::Mixin { name, .. } if name == "row"));

    let nav = block_of(&nodes[2]);
    assert!(matches!(
        nav.nested().next(),
        Some(Node::Include { name, .. }) if name == "row"
    ));
    assert_eq!(nav.declarations().count(), 1);
    let rules: Vec<_> = nav
        .nested()
        .filter(|n| matches!(n, Node::Rule { .. }))
        .collect();
    assert_eq!(rules.len(), 2);
    let ul = block_of(rules[0]);
    assert_eq!(ul.declarations().count(), 2);
    assert!(matches!(
        ul.nested().next(),
        Some(Node::Rule { selector, .. }) if selector.text == "li"
    ));
    assert!(
        matches!(rules[1], Node::Rule { selector, .. } if selector.text == "a:hover")
    );

    match &nodes[3] {
        Node::AtRule { name, block, .. } => {
            assert_eq!(name, "keyframes");
            let frames: Vec<_> = block.as_ref().expect("body").nested().collect();
            assert_eq!(frames.len(), 2);
            assert!(
                matches!(frames[1], Node::Rule { selector, .. } if selector.text == "100%")
            );
        }
        other => panic!("expected at-rule, got {:?}", other),
    }
}

#[test]
fn same_document_shape_across_variants() {
    let brace = parse(".a { x: 1px; .b { y: 2px; } }", Syntax::Brace).unwrap();
    let indented = parse(".a\n  x: 1px\n  .b\n    y: 2px\n", Syntax::Indented).unwrap();

    let outer_brace = block_of(&brace[0]);
    let outer_indented = block_of(&indented[0]);
    assert_eq!(outer_brace.items.len(), outer_indented.items.len());
    assert!(matches!(outer_brace.items[0], BlockItem::Declaration(_)));
    assert!(matches!(outer_indented.items[0], BlockItem::Declaration(_)));
}

#[test]
fn token_text_concatenation_reproduces_indented_source() {
    let stream = cassia_core::tokenize(NAV_CASI, Syntax::Indented).unwrap();
    let rebuilt: String = stream.tokens().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(rebuilt, NAV_CASI);
}

#[test]
fn structural_errors_are_fatal_with_positions() {
    let err = parse(".a { x: ; }", Syntax::Brace).unwrap_err();
    match err {
        ParseError::Syntax { line, .. } => assert_eq!(line, 1),
        other => panic!("expected syntax error, got {:?}", other),
    }
}
