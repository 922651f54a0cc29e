//! Compiler configuration.
//!
//! Loaded from YAML; every key is optional and falls back to the CafeBabe defaults.
//!
//! ```yaml
//! start_rule: Program
//! root_unsafe: true
//! packrat: true
//! max_depth: 1000
//! policy:
//!   filter_always: [Semicolon, BlockStart, BlockEnd]
//! scope_rules: [Unsafe, ClassBlock]
//! type_rules: [Type]
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::FilterPolicy;
use crate::errors::CafeError;
use crate::language::{cafebabe_binding_rules, cafebabe_policy};
use crate::matcher::{MatchOptions, DEFAULT_MAX_DEPTH};
use crate::symbols::BindingRules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rule to start matching from; the grammar's first rule when absent.
    pub start_rule: Option<String>,
    /// Context handed to the children of the root when filtering.
    pub root_unsafe: bool,
    pub packrat: bool,
    /// Bound on nested rule applications; deeper input is a parse error. 0 disables it.
    pub max_depth: usize,
    pub policy: FilterPolicy,
    /// Rules whose nodes open a symbol scope.
    pub scope_rules: BTreeSet<String>,
    /// Rules whose nodes declare a type.
    pub type_rules: BTreeSet<String>,
}

impl Default for Config {
    fn default() -> Self {
        let binding = cafebabe_binding_rules();
        Self {
            start_rule: None,
            root_unsafe: true,
            packrat: true,
            max_depth: DEFAULT_MAX_DEPTH,
            policy: cafebabe_policy(),
            scope_rules: binding.scope_rules,
            type_rules: binding.type_rules,
        }
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, CafeError> {
        let text = fs::read_to_string(path).map_err(|source| CafeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| CafeError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn binding_rules(&self) -> BindingRules {
        BindingRules {
            scope_rules: self.scope_rules.clone(),
            type_rules: self.type_rules.clone(),
        }
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            packrat: self.packrat,
            max_depth: self.max_depth,
        }
    }
}
