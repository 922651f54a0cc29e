// Regression tests for the `cafebabe` driver: exit codes and printed output.
// Requires: assert_cmd, predicates, tempfile crates in [dev-dependencies]

mod common;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

use common::file;
use tempfile::tempdir;

const VALID: &str = "type Foo = api { }\n";
const MISSING_BRACE: &str = "type Foo = api {";

fn cafebabe() -> Command {
    Command::cargo_bin("cafebabe").unwrap()
}

// ---
// Successful runs
// ---

#[test]
fn test_valid_file_exits_zero() {
    let dir = tempdir().unwrap();
    let source = file(&dir, "ok.cb", VALID);
    cafebabe().arg(&source).assert().code(0);
}

#[test]
fn test_verbose_prints_tree() {
    let dir = tempdir().unwrap();
    let source = file(&dir, "ok.cb", VALID);
    cafebabe()
        .arg("-v")
        .arg(&source)
        .assert()
        .code(0)
        .stdout(contains("+ Program"))
        .stdout(contains("- Name/TypeName (Foo)"))
        .stdout(contains(format!("--- {} ---", source.display())));
}

#[test]
fn test_symbols_flag_dumps_global_scope() {
    let dir = tempdir().unwrap();
    let source = file(&dir, "ok.cb", VALID);
    cafebabe()
        .arg("--symbols")
        .arg(&source)
        .assert()
        .code(0)
        .stdout(contains("symbols ---"))
        .stdout(contains("[Foo] Type (defined at 1:6)"));
}

#[test]
fn test_bench_prints_phase_timings() {
    let dir = tempdir().unwrap();
    let source = file(&dir, "ok.cb", VALID);
    cafebabe()
        .arg("-b")
        .arg(&source)
        .assert()
        .code(0)
        .stdout(contains("Loading grammar "))
        .stdout(contains(" parsing "))
        .stdout(contains(" AST optimization "))
        .stdout(contains(" symbol binding "))
        .stdout(contains("us\n"));
}

#[test]
fn test_json_output_is_valid_json() {
    let dir = tempdir().unwrap();
    let source = file(&dir, "ok.cb", VALID);
    let output = cafebabe().arg("--json").arg(&source).output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["name"], "Program");
    assert_eq!(value["children"][1]["name"], "Type");
}

#[test]
fn test_directories_are_walked_for_sources() {
    let dir = tempdir().unwrap();
    file(&dir, "a.cb", VALID);
    file(&dir, "nested/b.cb", "type Bar = api { }\n");
    file(&dir, "notes.txt", "not a source file {");
    cafebabe()
        .arg("-s")
        .arg(dir.path())
        .assert()
        .code(0)
        .stdout(contains("[Foo] Type"))
        .stdout(contains("[Bar] Type"));
}

// ---
// Failures
// ---

#[test]
fn test_parse_failure_exits_255() {
    let dir = tempdir().unwrap();
    let source = file(&dir, "bad.cb", MISSING_BRACE);
    cafebabe()
        .arg(&source)
        .assert()
        .code(255)
        .stdout(contains("error at 1:17::syntax error, unexpected end of input"));
}

#[test]
fn test_failing_file_does_not_stop_the_batch() {
    let dir = tempdir().unwrap();
    let bad = file(&dir, "a_bad.cb", MISSING_BRACE);
    let good = file(&dir, "b_good.cb", VALID);
    cafebabe()
        .arg("-s")
        .arg(&bad)
        .arg(&good)
        .assert()
        .code(255)
        .stdout(contains("[Foo] Type"));
}

#[test]
fn test_missing_file_exits_254() {
    let dir = tempdir().unwrap();
    cafebabe()
        .arg(dir.path().join("absent.cb"))
        .assert()
        .code(254);
}

#[test]
fn test_unknown_flag_exits_254() {
    cafebabe().arg("--frobnicate").arg("x.cb").assert().code(254);
}

#[test]
fn test_no_arguments_prints_usage() {
    cafebabe()
        .assert()
        .code(156)
        .stdout(contains("Usage").or(contains("usage")));
}

#[test]
fn test_bad_grammar_aborts() {
    let dir = tempdir().unwrap();
    let grammar = file(&dir, "bad.peg", "A <- 'a' Missing\n");
    let source = file(&dir, "ok.cb", VALID);
    cafebabe()
        .arg("--grammar")
        .arg(&grammar)
        .arg(&source)
        .assert()
        .code(56)
        .stdout(contains("Unable to proceed, exiting"));
}

#[test]
fn test_config_file_selects_start_rule() {
    let dir = tempdir().unwrap();
    let grammar = file(&dir, "list.peg", "Unused <- 'u'\nList <- Name (',' Name)*\nName <- < [a-z]+ >\n");
    let config = file(&dir, "cafebabe.yaml", "start_rule: List\n");
    let source = file(&dir, "list.cb", "a,b");
    cafebabe()
        .arg("--grammar")
        .arg(&grammar)
        .arg("--config")
        .arg(&config)
        .arg("-v")
        .arg(&source)
        .assert()
        .code(0)
        .stdout(contains("+ List"))
        .stdout(contains("  - Name (b)"));
}
