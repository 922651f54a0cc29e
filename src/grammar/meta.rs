//! pest parser for PEG notation itself.

use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grammar/peg.pest"]
pub(crate) struct PegParser;
