//! SDL text to syntax tree.

pub mod ast;
pub mod lexer;
mod parser;

pub use parser::parse;
