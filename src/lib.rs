//! Arid - a lazy, inheriting configuration and templating language.
//!
//! This library provides the core functionality for arid, including:
//! - Parsing statement and template text into nodes
//! - The scope tree with ancestor fallback and wildcard templates
//! - The line processor applying statements to a scope
//! - Built-in functions, file includes and serializers
//!
//! # Example
//!
//! ```no_run
//! use arid::Scope;
//!
//! let scope = Scope::new();
//! scope.execute("greeting = hello\nserver name = $(greeting) world\n").unwrap();
//! let name = scope.resolved(&["server", "name"]).unwrap();
//! assert_eq!(name.as_text().unwrap(), "hello world");
//! ```

pub mod error;
pub mod functions;
pub mod grammar;
pub mod model;
pub mod repl;
pub mod scope;
pub mod serialize;
pub mod source;

pub use error::{AridError, Result};
pub use model::{Node, Value};
pub use repl::Repl;
pub use scope::{Eval, Scope};
