//! The line processor: feeds statement text into a scope one line at a time.
//!
//! Lines that do not yet parse are buffered until a later line completes
//! them. Each complete entry is comment-stripped, placed by its indentation
//! and dispatched to exactly one directive.

pub mod directives;

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{AridError, Result};
use crate::grammar;
use crate::model::{Entry, Node};
use crate::scope::{Eval, Scope};

use directives::Outcome;

pub use directives::Directive;

static QUOTABLE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s+[$\r\n]*|[$\r\n]*\s+$|[$\r\n]+").expect("valid quotable pattern")
});

/// Escape `text` so that it parses back as the same text inside a phrase.
pub fn quote(text: &str) -> String {
	QUOTABLE
		.replace_all(text, |caps: &Captures| format!("$'({})", &caps[0]))
		.into_owned()
}

#[derive(Debug, Clone)]
struct Level {
	indent: String,
	prefix: Vec<String>,
}

/// A bare path waiting for indented children.
#[derive(Debug)]
struct Headless {
	path: Vec<String>,
	text: String,
}

/// Where an entry lands: how many levels survive and which, if any, opens.
struct Placement {
	keep: usize,
	push: Option<Level>,
	/// A bare entry that never got children; reported once this entry is applied.
	stale: Option<Headless>,
}

pub(crate) struct Processor {
	scope: Scope,
	buffer: Vec<String>,
	levels: Vec<Level>,
	pending: Option<Headless>,
}

fn is_comment(node: &&Node) -> bool {
	matches!(node, Node::Text(t) if t.is_plain() && t.value == ":")
}

impl Processor {
	pub(crate) fn new(scope: &Scope) -> Self {
		Self {
			scope: scope.clone(),
			buffer: Vec::new(),
			levels: Vec::new(),
			pending: None,
		}
	}

	pub(crate) fn feed(&mut self, eval: &mut Eval, line: &str) -> Result<()> {
		let text = format!("{}{line}", self.buffer.concat());
		let entries = match grammar::load(&text) {
			Ok(entries) => entries,
			Err(AridError::Parse { .. }) => {
				self.buffer.push(line.to_string());
				return Ok(());
			}
			Err(e) => return Err(e),
		};
		self.buffer.clear();
		for entry in entries {
			self.process(eval, entry)?;
		}
		Ok(())
	}

	fn process(&mut self, eval: &mut Eval, entry: Entry) -> Result<()> {
		let comment = entry.words().iter().position(is_comment);
		let entry = match comment {
			Some(i) => entry.truncated(i),
			None => entry,
		};
		if entry.size() == 0 {
			return Ok(());
		}
		let placement = self.place(&entry)?;
		let prefix = match &placement.push {
			Some(level) => {
				self.scope.materialize(&level.prefix);
				level.prefix.clone()
			}
			None => self.levels[..placement.keep]
				.last()
				.map(|level| level.prefix.clone())
				.unwrap_or_default(),
		};
		let outcome = directives::execute(eval, &self.scope, &prefix, &entry)?;
		self.levels.truncate(placement.keep);
		if let Some(level) = placement.push {
			self.levels.push(level);
		}
		self.pending = match outcome {
			Outcome::Done => None,
			Outcome::Headless(path) => Some(Headless {
				path: prefix.into_iter().chain(path).collect(),
				text: entry.unparse().trim().to_string(),
			}),
		};
		match placement.stale {
			Some(headless) => Err(AridError::UnsupportedEntry { entry: headless.text }),
			None => Ok(()),
		}
	}

	/// Decide the entry's level from its indentation without touching the level stack.
	/// A pending bare entry the new one cannot nest under is handed back as stale.
	fn place(&mut self, entry: &Entry) -> Result<Placement> {
		let indent = entry.indent();
		let current = self.levels.last().map_or("", |level| level.indent.as_str());
		let depth = self.levels.len();
		if indent == current {
			return Ok(Placement {
				keep: depth,
				push: None,
				stale: self.pending.take(),
			});
		}
		if indent.starts_with(current) {
			return match &self.pending {
				Some(headless) => Ok(Placement {
					keep: depth,
					push: Some(Level {
						indent: indent.to_string(),
						prefix: headless.path.clone(),
					}),
					stale: None,
				}),
				None => Err(AridError::NoSuchIndent {
					entry: entry.unparse().trim().to_string(),
				}),
			};
		}
		if current.starts_with(indent) {
			let stale = self.pending.take();
			if indent.is_empty() {
				return Ok(Placement {
					keep: 0,
					push: None,
					stale,
				});
			}
			return match self.levels.iter().rposition(|level| level.indent == indent) {
				Some(i) => Ok(Placement {
					keep: i + 1,
					push: None,
					stale,
				}),
				None => Err(AridError::NoSuchIndent {
					entry: entry.unparse().trim().to_string(),
				}),
			};
		}
		Err(AridError::MalformedEntry {
			entry: entry.unparse().trim().to_string(),
		})
	}

	pub(crate) fn close(self) -> Result<()> {
		if !self.buffer.is_empty() {
			return Err(AridError::DanglingStack { lines: self.buffer });
		}
		match self.pending {
			Some(headless) => Err(AridError::UnsupportedEntry { entry: headless.text }),
			None => Ok(()),
		}
	}
}

/// Interactive front end over a scope, owning its evaluation context.
pub struct Repl {
	processor: Processor,
	eval: Eval,
}

impl Repl {
	pub fn new(scope: &Scope) -> Self {
		Self {
			processor: Processor::new(scope),
			eval: Eval::new(),
		}
	}

	pub fn scope(&self) -> &Scope {
		&self.processor.scope
	}

	/// Feed one line; a missing line terminator is added.
	pub fn feed(&mut self, line: &str) -> Result<()> {
		if line.ends_with('\n') {
			self.processor.feed(&mut self.eval, line)
		} else {
			self.processor.feed(&mut self.eval, &format!("{line}\n"))
		}
	}

	pub fn execute_text(&mut self, text: &str) -> Result<()> {
		for line in text.split_inclusive('\n') {
			self.feed(line)?;
		}
		Ok(())
	}

	/// Feed `template` with each `%s` replaced by the next argument, quoted.
	pub fn printf(&mut self, template: &str, args: &[&str]) -> Result<()> {
		let pieces: Vec<&str> = template.split("%s").collect();
		if pieces.len() != args.len() + 1 {
			return Err(AridError::bad_arguments(
				"printf",
				format!("expected {} arguments, got {}", pieces.len() - 1, args.len()),
			));
		}
		let mut line = pieces[0].to_string();
		for (arg, piece) in args.iter().zip(&pieces[1..]) {
			line.push_str(&quote(arg));
			line.push_str(piece);
		}
		self.feed(&line)
	}

	/// Finish the stream, failing on an unterminated statement or an unused headless entry.
	pub fn close(self) -> Result<()> {
		self.processor.close()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn nested() -> &'static str {
		"a\n  b = 1\n  c\n    d = 2\ne = 3\n"
	}

	#[test]
	fn test_indentation_builds_prefixes() {
		let scope = Scope::new();
		scope.execute(nested()).unwrap();
		assert_eq!(scope.resolved(&["a", "b"]).unwrap(), Node::int(1));
		assert_eq!(scope.resolved(&["a", "c", "d"]).unwrap(), Node::int(2));
		assert_eq!(scope.resolved(&["e"]).unwrap(), Node::int(3));
	}

	#[test]
	fn test_unexpected_indent() {
		let scope = Scope::new();
		match scope.execute("  x = 1\n").unwrap_err() {
			AridError::NoSuchIndent { entry } => assert_eq!(entry, "x = 1"),
			_ => panic!("Expected NoSuchIndent error"),
		}
	}

	#[test]
	fn test_inconsistent_indent() {
		let scope = Scope::new();
		let mut repl = Repl::new(&scope);
		repl.feed("a").unwrap();
		repl.feed("  b = 1").unwrap();
		assert!(matches!(
			repl.feed("\tc = 2").unwrap_err(),
			AridError::MalformedEntry { .. }
		));
		repl.feed("  c = 2").unwrap();
		repl.close().unwrap();
		assert_eq!(scope.resolved(&["a", "c"]).unwrap(), Node::int(2));
	}

	#[test]
	fn test_shallower_to_unknown_level() {
		let scope = Scope::new();
		let mut repl = Repl::new(&scope);
		repl.execute_text("a\n    b\n        c = 1\n").unwrap();
		assert!(matches!(
			repl.feed("  d = 2").unwrap_err(),
			AridError::NoSuchIndent { .. }
		));
	}

	#[test]
	fn test_headless_without_children() {
		let scope = Scope::new();
		match scope.execute("a b\nc = 1\n").unwrap_err() {
			AridError::UnsupportedEntry { entry } => assert_eq!(entry, "a b"),
			_ => panic!("Expected UnsupportedEntry error"),
		}
		assert_eq!(scope.resolved(&["c"]).unwrap(), Node::int(1));
		match scope.execute("a b\n").unwrap_err() {
			AridError::UnsupportedEntry { entry } => assert_eq!(entry, "a b"),
			_ => panic!("Expected UnsupportedEntry error"),
		}
	}

	#[test]
	fn test_multiline_statement_is_buffered() {
		let scope = Scope::new();
		let mut repl = Repl::new(&scope);
		repl.feed("x = $list(a").unwrap();
		repl.feed("b)").unwrap();
		repl.close().unwrap();
		assert_eq!(
			scope.unravelled(&["x"]).unwrap(),
			crate::model::Value::List(vec![
				crate::model::Value::text("a"),
				crate::model::Value::text("b"),
			])
		);
	}

	#[test]
	fn test_dangling_statement() {
		let scope = Scope::new();
		let mut repl = Repl::new(&scope);
		repl.feed("x = $list(a").unwrap();
		match repl.close().unwrap_err() {
			AridError::DanglingStack { lines } => assert_eq!(lines, vec!["x = $list(a\n".to_string()]),
			_ => panic!("Expected DanglingStack error"),
		}
	}

	#[test]
	fn test_comments() {
		let scope = Scope::new();
		scope.execute(": whole line\nx = 1 : trailing\n  : indented comment\n").unwrap();
		assert_eq!(scope.resolved(&["x"]).unwrap(), Node::int(1));
		assert_eq!(scope.items().len(), 1);
	}

	#[test]
	fn test_quote_round_trips() {
		let text = " a$b\n";
		assert_eq!(quote(text), "$'( )a$'($)b$'(\n)");
		let scope = Scope::new();
		let mut repl = Repl::new(&scope);
		repl.printf("x = %s", &[text]).unwrap();
		repl.close().unwrap();
		assert_eq!(scope.resolved(&["x"]).unwrap().cat().unwrap(), text);
	}

	#[test]
	fn test_printf_argument_count() {
		let mut repl = Repl::new(&Scope::new());
		assert!(matches!(
			repl.printf("%s = %s", &["a"]).unwrap_err(),
			AridError::BadArguments { .. }
		));
	}
}
