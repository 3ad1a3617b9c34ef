//! Text to nodes: statements, expressions and templates.

pub mod parser;

pub use parser::{load, parse_expression, parse_template, scalar};
