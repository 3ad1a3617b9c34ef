//! Writing resolved scopes out as statements, JSON, TOML or shell assignments.

use crate::error::{AridError, Result};
use crate::functions::quote;
use crate::model::{Node, Value};
use crate::repl::{Directive, quote as quote_phrase};
use crate::scope::{Eval, Scope};

fn serialize_error(message: impl ToString) -> AridError {
	AridError::Serialize {
		message: message.to_string(),
	}
}

fn unravel(scope: &Scope) -> Result<Value> {
	scope.unravel(&mut Eval::new())
}

/// Wrap `text` as a literal, picking a bracket kind it does not unbalance.
fn literal(text: &str) -> String {
	if text.contains(')') && !text.contains(']') {
		format!("$'[{text}]")
	} else {
		format!("$'({text})")
	}
}

/// A path segment as a single statement word.
fn path_word(key: &str) -> String {
	let plain = !key.is_empty()
		&& key != ":"
		&& Directive::from_token(key).is_none()
		&& !key
			.chars()
			.any(|c| c.is_whitespace() || matches!(c, '$' | '(' | ')' | '[' | ']'));
	if plain { key.to_string() } else { literal(key) }
}

/// A value as a phrase that resolves back to the same text.
fn phrase(text: &str) -> String {
	let quoted = quote_phrase(text);
	if quoted.split_whitespace().any(|w| w == ":") {
		literal(text)
	} else {
		quoted
	}
}

fn emit(path: &mut Vec<String>, value: &Value, out: &mut Vec<String>) -> Result<()> {
	match value {
		Value::Map(map) => {
			for (key, child) in map {
				path.push(path_word(key));
				emit(path, child, out)?;
				path.pop();
			}
		}
		Value::List(items) => {
			for item in items {
				let Some(text) = item.scalar_text() else {
					return Err(serialize_error(format!(
						"container inside list at {}",
						path.join(" ")
					)));
				};
				out.push(format!("{} += {}", path.join(" "), phrase(&text)));
			}
		}
		Value::Opaque(_) => {}
		scalar => {
			let text = scalar.scalar_text().unwrap_or_default();
			out.push(format!("{} = {}", path.join(" "), phrase(&text)));
		}
	}
	Ok(())
}

/// Statements that rebuild the scope's resolved contents when executed.
pub fn to_source(scope: &Scope) -> Result<String> {
	let mut out = Vec::new();
	emit(&mut Vec::new(), &unravel(scope)?, &mut out)?;
	Ok(out.into_iter().map(|line| line + "\n").collect())
}

/// Any resolved value as pretty JSON; scalars become JSON scalars.
pub fn to_json(node: &Node) -> Result<String> {
	let value = node.unravel(&mut Eval::new())?;
	serde_json::to_string_pretty(&value).map_err(serialize_error)
}

pub fn to_toml(scope: &Scope) -> Result<String> {
	let value = unravel(scope)?;
	if !matches!(value, Value::Map(_)) {
		return Err(serialize_error("only a scope can be written as a TOML table"));
	}
	toml::to_string(&value).map_err(serialize_error)
}

fn shell_name(path: &[String]) -> String {
	path.join("_")
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
		.collect()
}

fn flatten(path: &mut Vec<String>, value: &Value, out: &mut Vec<String>) {
	match value {
		Value::Map(map) => {
			for (key, child) in map {
				path.push(key.clone());
				flatten(path, child, out);
				path.pop();
			}
		}
		Value::List(items) => {
			for (i, item) in items.iter().enumerate() {
				path.push(i.to_string());
				flatten(path, item, out);
				path.pop();
			}
		}
		Value::Opaque(_) => {}
		scalar => {
			let text = scalar.scalar_text().unwrap_or_default();
			out.push(format!("{}={}", shell_name(path), quote::shell(&text)));
		}
	}
}

/// `NAME=value` lines, one per scalar, names joined from the path with `_`.
pub fn to_shell(scope: &Scope) -> Result<String> {
	let mut out = Vec::new();
	flatten(&mut Vec::new(), &unravel(scope)?, &mut out);
	Ok(out.into_iter().map(|line| line + "\n").collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Scope {
		let scope = Scope::new();
		scope
			.execute("name = demo\nserver port = 8080\nserver host = $(name).local\ntags += a\ntags += b c\n")
			.unwrap();
		scope
	}

	#[test]
	fn test_source_reloads_to_same_values() {
		let scope = sample();
		let text = to_source(&scope).unwrap();
		assert_eq!(
			text,
			"name = demo\nserver port = 8080\nserver host = demo.local\ntags += a\ntags += b c\n"
		);
		let reloaded = Scope::new();
		reloaded.execute(&text).unwrap();
		assert_eq!(unravel(&reloaded).unwrap(), unravel(&scope).unwrap());
	}

	#[test]
	fn test_source_escapes_awkward_text() {
		let scope = Scope::new();
		scope.set(&["odd key"], Node::text(" x : y$")).unwrap();
		let text = to_source(&scope).unwrap();
		assert_eq!(text, "$'(odd key) = $'( x : y$)\n");
		let reloaded = Scope::new();
		reloaded.execute(&text).unwrap();
		assert_eq!(reloaded.resolved(&["odd key"]).unwrap(), Node::text(" x : y$"));
	}

	#[test]
	fn test_json() {
		let json = to_json(&Node::Scope(sample())).unwrap();
		let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed["server"]["port"], 8080);
		assert_eq!(parsed["tags"][1], "b c");
		assert_eq!(to_json(&Node::int(8080)).unwrap(), "8080");
		assert_eq!(to_json(&Node::Boolean(true)).unwrap(), "true");
	}

	#[test]
	fn test_toml() {
		let text = to_toml(&sample()).unwrap();
		assert!(text.contains("name = \"demo\""));
		assert!(text.contains("[server]"));
		assert!(text.contains("port = 8080"));
	}

	#[test]
	fn test_shell() {
		let text = to_shell(&sample()).unwrap();
		assert_eq!(
			text,
			"name=demo\nserver_port=8080\nserver_host=demo.local\ntags_0=a\ntags_1='b c'\n"
		);
	}
}
