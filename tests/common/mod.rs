//! Shared helpers for the CafeBabe integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use cafebabe::ast::SyntaxTree;
use cafebabe::grammar::{compile, Grammar};
use tempfile::TempDir;

/// Compiles a grammar that the test expects to be valid.
pub fn grammar(text: &str) -> Grammar {
    match compile(text) {
        Ok(grammar) => grammar,
        Err(err) => panic!("grammar failed to compile: {err}"),
    }
}

/// Pre-order `name` or `name(token)` list of a tree.
pub fn shape(tree: &SyntaxTree) -> Vec<String> {
    tree.iter()
        .map(|node| match node.token() {
            Some(token) => format!("{}({token})", node.name()),
            None => node.name().to_string(),
        })
        .collect()
}

/// Writes `content` to `name` under `dir`, creating parent directories as needed.
pub fn file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}
