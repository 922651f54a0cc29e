// tests/pipeline_tests.rs

mod common;

use cafebabe::config::Config;
use cafebabe::matcher::Matcher;
use cafebabe::symbols::SymbolKind;
use cafebabe::{Compiler, SourceContext};
use common::{grammar, shape};

fn source(content: &str) -> SourceContext {
    SourceContext::from_file("test.cb", content)
}

fn cafebabe() -> Compiler {
    Compiler::cafebabe(Config::default()).unwrap()
}

// ---
// Arithmetic
// ---

#[test]
fn test_sum_of_products() {
    // Anonymous literals such as ('+' / '-') yield no node; operators need a named rule.
    let g = grammar("Sum <- Product (('+' / '-') Product)*\nProduct <- < [0-9]+ >");
    let tree = Matcher::new(&g).parse("1+2-3").unwrap();
    assert_eq!(shape(&tree), ["Sum", "Product(1)", "Product(2)", "Product(3)"]);

    let g = grammar("Sum <- Product (SumOps Product)*\nSumOps <- < '+' / '-' >\nProduct <- < [0-9]+ >");
    let tree = Matcher::new(&g).parse("1+2-3").unwrap();
    assert_eq!(
        shape(&tree),
        ["Sum", "Product(1)", "SumOps(+)", "Product(2)", "SumOps(-)", "Product(3)"]
    );
}

// ---
// CafeBabe sources
// ---

#[test]
fn test_type_declaration_binds_globally() {
    let unit = cafebabe().compile_unit(&source("type Foo = api { }")).unwrap();

    let global = unit.binding.table.global();
    let foo = unit.binding.table.lookup(global, "Foo").unwrap();
    assert_eq!(foo.kind, SymbolKind::Type);
    assert_eq!((foo.line, foo.column), (1, 6));
    assert!(unit.binding.duplicates.is_empty());

    assert_eq!(
        cafebabe::ast::render(unit.ast.root()),
        "+ Program\n  - Uses\n  + Type\n    - Name/TypeName (Foo)\n    - CommonApiBody/ApiDecl\n"
    );
}

#[test]
fn test_type_declaration_inside_unsafe_block() {
    let unit = cafebabe()
        .compile_unit(&source("unsafe {\n    type Foo = api { }\n}"))
        .unwrap();

    let table = &unit.binding.table;
    assert_eq!(table.depth(), 1);
    let foo = table.lookup(table.global(), "Foo").unwrap();
    assert_eq!((foo.line, foo.column), (2, 10));
}

#[test]
fn test_duplicate_types_are_reported() {
    let unit = cafebabe()
        .compile_unit(&source("type Foo = api { }\ntype Foo = api { }"))
        .unwrap();
    assert_eq!(unit.binding.duplicates.len(), 1);
    assert_eq!(unit.binding.duplicates[0].line, 2);
}

#[test]
fn test_missing_brace_is_a_parse_error() {
    let text = "type Foo = api {";
    let err = cafebabe().compile_unit(&source(text)).unwrap_err();
    let diag = err.primary().unwrap();
    assert_eq!(diag.offset, text.len());
    assert_eq!((diag.line, diag.column), (1, 17));
    assert!(
        diag.message
            .starts_with("syntax error, unexpected end of input, expecting"),
        "{}",
        diag.message
    );
    assert!(diag.message.contains("'}'"), "{}", diag.message);
}

#[test]
fn test_separators_filtered_under_unsafe_parents() {
    let unit = cafebabe()
        .compile_unit(&source("type Pair = First, Second;"))
        .unwrap();
    let names: Vec<String> = unit
        .ast
        .iter()
        .map(|node| node.original_name().to_string())
        .collect();
    assert!(!names.iter().any(|name| name == "Comma"), "{names:?}");
    assert!(!names.iter().any(|name| name == "Semicolon"), "{names:?}");
    assert!(names.iter().any(|name| name == "AndType"), "{names:?}");
}

#[test]
fn test_comments_and_uses() {
    let text = "// leading comment\nuse core.io;\ntype Foo = api { } // trailing\n";
    let unit = cafebabe().compile_unit(&source(text)).unwrap();
    let foo = unit
        .binding
        .table
        .lookup(unit.binding.table.global(), "Foo")
        .unwrap();
    assert_eq!((foo.line, foo.column), (3, 6));
}

// ---
// Configuration
// ---

#[test]
fn test_config_overrides_start_rule_and_root_context() {
    let config = Config {
        start_rule: Some("List".to_string()),
        root_unsafe: false,
        ..Config::default()
    };
    let compiler = Compiler::new(
        "Unused <- 'u'\nList <- Name (Comma Name)*\nName <- < [a-z] >\nComma <- ','",
        config,
    )
    .unwrap();
    let unit = compiler.compile_unit(&source("a,b")).unwrap();
    assert_eq!(shape(&unit.ast), ["List", "Name(a)", "Comma(,)", "Name(b)"]);
}

#[test]
fn test_unknown_start_rule_is_rejected() {
    let config = Config {
        start_rule: Some("Nope".to_string()),
        ..Config::default()
    };
    assert!(Compiler::cafebabe(config).is_err());
}
