//! Frontend: tokenization and the scope-resolving parser.

pub mod lexer;
pub mod parser;
pub mod symbol_table;
