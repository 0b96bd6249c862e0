//! Restricted arithmetic expressions over catalog columns and constants.
//!
//! Pipeline: `lexer` -> `parser` (explicit grammar + function allow-list) ->
//! `ast` tree -> `eval` (row-wise, broadcasting) and `diff` (symbolic partials).
//! Nothing here ever hands user text to a general-purpose interpreter.

pub mod ast;
pub mod diff;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use ast::{BinOp, Expr, Function, FunctionSet};
pub use diff::differentiate;
pub use eval::*;
pub use parser::parse;
