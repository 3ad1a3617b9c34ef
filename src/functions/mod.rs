//! The builtin table consulted after every scope chain.

pub mod builtins;
pub mod quote;

use crate::error::Result;
use crate::model::{ContextVar, Function, NativeFn, Node};

pub enum Builtin {
	Function(NativeFn),
	Value(fn() -> Result<Node>),
	Context(ContextVar),
}

static BUILTINS: &[(&str, Builtin)] = &[
	("", Builtin::Function(builtins::get)),
	("get", Builtin::Function(builtins::get)),
	("try", Builtin::Function(builtins::try_)),
	("map", Builtin::Function(builtins::map)),
	("join", Builtin::Function(builtins::join)),
	("list", Builtin::Function(builtins::list)),
	("fork", Builtin::Function(builtins::fork)),
	("label", Builtin::Function(builtins::label)),
	("str", Builtin::Function(builtins::str_)),
	("lower", Builtin::Function(builtins::lower)),
	("mul", Builtin::Function(builtins::mul)),
	("div", Builtin::Function(builtins::div)),
	("/", Builtin::Function(builtins::slash)),
	("./", Builtin::Function(builtins::here_slash)),
	("readfile", Builtin::Function(builtins::readfile)),
	("processtemplate", Builtin::Function(builtins::processtemplate)),
	("shstr", Builtin::Function(builtins::shstr)),
	("pystr", Builtin::Function(builtins::pystr)),
	("jsonquote", Builtin::Function(builtins::jsonquote)),
	("xmlattr", Builtin::Function(builtins::xmlattr)),
	("xmltext", Builtin::Function(builtins::xmltext)),
	("tomlquote", Builtin::Function(builtins::tomlquote)),
	("urlquote", Builtin::Function(builtins::urlquote)),
	("screenstr", Builtin::Function(builtins::screenstr)),
	("scstr", Builtin::Function(builtins::scstr)),
	("hclstr", Builtin::Function(builtins::hclstr)),
	("groovystr", Builtin::Function(builtins::groovystr)),
	("~", Builtin::Value(builtins::home)),
	("LF", Builtin::Value(builtins::line_feed)),
	("EOL", Builtin::Value(builtins::end_of_line)),
	("cwd", Builtin::Value(builtins::cwd)),
	("stdout", Builtin::Value(builtins::stdout)),
	("here", Builtin::Context(ContextVar::Here)),
	("indent", Builtin::Context(ContextVar::Indent)),
];

/// The builtin bound to `name`, if any.
pub fn builtin(name: &str) -> Result<Option<Node>> {
	let Some((_, entry)) = BUILTINS.iter().find(|(n, _)| *n == name) else {
		return Ok(None);
	};
	Ok(Some(match entry {
		Builtin::Function(f) => {
			let f = *f;
			Node::Function(Function::new(name, f))
		}
		Builtin::Value(make) => make()?,
		Builtin::Context(var) => Node::Contextual(*var),
	}))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builtin_lookup() {
		assert!(matches!(builtin("get").unwrap(), Some(Node::Function(_))));
		assert!(matches!(builtin("here").unwrap(), Some(Node::Contextual(ContextVar::Here))));
		assert_eq!(builtin("LF").unwrap(), Some(Node::text("\n")));
		assert!(builtin("nope").unwrap().is_none());
	}

	#[test]
	fn test_names_are_unique() {
		let mut all: Vec<&str> = BUILTINS.iter().map(|(name, _)| *name).collect();
		let count = all.len();
		all.sort_unstable();
		all.dedup();
		assert_eq!(all.len(), count);
	}
}
