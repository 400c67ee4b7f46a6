//! Lexer, AST, and parser for the ink scripting language.

pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod token;

pub use parser::parse_file;
