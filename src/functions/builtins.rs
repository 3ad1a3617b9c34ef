use std::path::PathBuf;

use tracing::trace;

use crate::error::{AridError, Result};
use crate::functions::quote;
use crate::grammar;
use crate::model::{Node, Number, NumberValue, Stream};
use crate::scope::{Eval, Key, Scope, resolve_path};
use crate::source;

fn text_arg(eval: &mut Eval, scope: &Scope, node: &Node) -> Result<String> {
	node.resolve(eval, scope)?.cat()
}

fn single<'a>(function: &str, args: &'a [Node]) -> Result<&'a Node> {
	match args {
		[arg] => Ok(arg),
		_ => Err(AridError::bad_arguments(
			function,
			format!("expected 1 argument, got {}", args.len()),
		)),
	}
}

fn scope_arg(eval: &mut Eval, scope: &Scope, node: &Node, function: &str) -> Result<Scope> {
	match node.resolve(eval, scope)? {
		Node::Scope(s) => Ok(s),
		other => Err(AridError::bad_arguments(
			function,
			format!("expected a scope or list, got {}", other.kind()),
		)),
	}
}

fn number_arg(eval: &mut Eval, scope: &Scope, node: &Node) -> Result<Number> {
	match node.resolve(eval, scope)? {
		Node::Number(n) => Ok(n),
		Node::Text(t) => match grammar::scalar(&t.value) {
			Node::Number(n) => Ok(n),
			_ => Err(AridError::NotANumber { text: t.value }),
		},
		other => Err(AridError::NotANumber {
			text: other.cat().unwrap_or_else(|_| other.kind().to_string()),
		}),
	}
}

fn number_node(value: NumberValue) -> Node {
	Node::Number(match value {
		NumberValue::Int(i) => Number::from_int(i),
		NumberValue::Float(f) => Number::from_float(f),
	})
}

/// Path lookup over the string forms of the arguments.
pub fn get(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	let path = args
		.iter()
		.map(|a| text_arg(eval, scope, a))
		.collect::<Result<Vec<_>>>()?;
	resolve_path(eval, scope, &path)
}

/// First alternative that does not fail with a missing path.
pub fn try_(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	let Some((last, init)) = args.split_last() else {
		return Err(AridError::bad_arguments("try", "expected at least 1 argument"));
	};
	for alternative in init {
		match alternative.resolve(eval, scope) {
			Err(e @ AridError::NoSuchPath { .. }) => trace!(error = %e, "try alternative failed"),
			other => return other,
		}
	}
	last.resolve(eval, scope)
}

/// Evaluate an expression per item, keeping the source keys.
pub fn map(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	let Some((objs, rest)) = args.split_first() else {
		return Err(AridError::bad_arguments("map", "expected 2 to 4 arguments"));
	};
	let objs = scope_arg(eval, scope, objs, "map")?;
	let names = match rest {
		[expr] => (None, None, expr),
		[v, expr] => (None, Some(text_arg(eval, scope, v)?), expr),
		[k, v, expr] => (
			Some(text_arg(eval, scope, k)?),
			Some(text_arg(eval, scope, v)?),
			expr,
		),
		_ => return Err(AridError::bad_arguments("map", "expected 2 to 4 arguments")),
	};
	let (key_name, value_name, expr) = names;
	let result = scope.create_list();
	for (key, value) in objs.resolved_items(eval)? {
		let child = scope.create_child();
		match &value_name {
			Some(name) => child.bind(Key::Name(name.clone()), value),
			None => {
				let Node::Scope(item) = value else {
					return Err(AridError::bad_arguments(
						"map",
						format!("item {key} is not a scope"),
					));
				};
				child.set_label(key.to_string());
				for (k, v) in item.items() {
					child.bind(k, v);
				}
			}
		}
		if let Some(name) = &key_name {
			child.bind(Key::Name(name.clone()), Node::text(key.to_string()));
		}
		let mapped = expr.resolve(eval, &child)?;
		result.bind(key, mapped);
	}
	Ok(Node::Scope(result))
}

/// Concatenate the items' string forms with an optional separator.
pub fn join(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	let (objs, separator) = match args {
		[objs] => (objs, String::new()),
		[objs, separator] => (objs, text_arg(eval, scope, separator)?),
		_ => return Err(AridError::bad_arguments("join", "expected 1 or 2 arguments")),
	};
	let objs = scope_arg(eval, scope, objs, "join")?;
	let texts = objs
		.resolved_items(eval)?
		.into_iter()
		.map(|(_, node)| node.cat())
		.collect::<Result<Vec<_>>>()?;
	Ok(Node::text(texts.join(&separator)))
}

/// A list of the unresolved arguments.
pub fn list(_eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	let list = scope.create_list();
	for arg in args {
		list.push(arg.clone());
	}
	Ok(Node::Scope(list))
}

pub fn fork(_eval: &mut Eval, scope: &Scope, _args: &[Node]) -> Result<Node> {
	Ok(Node::Scope(scope.create_child()))
}

pub fn label(_eval: &mut Eval, scope: &Scope, _args: &[Node]) -> Result<Node> {
	scope
		.label()
		.map(Node::text)
		.ok_or_else(|| AridError::no_such_path(&["label".to_string()]))
}

pub fn str_(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	Ok(Node::text(text_arg(eval, scope, single("str", args)?)?))
}

pub fn lower(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	Ok(Node::text(text_arg(eval, scope, single("lower", args)?)?.to_lowercase()))
}

pub fn mul(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	let mut product = NumberValue::Int(1);
	for arg in args {
		let n = number_arg(eval, scope, arg)?;
		product = match (product, n.value()) {
			(NumberValue::Int(a), NumberValue::Int(b)) => match a.checked_mul(b) {
				Some(p) => NumberValue::Int(p),
				None => NumberValue::Float(a as f64 * b as f64),
			},
			(NumberValue::Int(a), NumberValue::Float(b)) => NumberValue::Float(a as f64 * b),
			(NumberValue::Float(a), _) => NumberValue::Float(a * n.as_f64()),
		};
	}
	Ok(number_node(product))
}

/// True division of the first argument by the rest.
pub fn div(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	let Some((first, rest)) = args.split_first() else {
		return Err(AridError::bad_arguments("div", "expected at least 1 argument"));
	};
	let mut quotient = number_arg(eval, scope, first)?.as_f64();
	for arg in rest {
		quotient /= number_arg(eval, scope, arg)?.as_f64();
	}
	Ok(number_node(NumberValue::Float(quotient)))
}

fn join_paths(eval: &mut Eval, scope: &Scope, base: PathBuf, args: &[Node]) -> Result<Node> {
	let mut path = base;
	for arg in args {
		path.push(text_arg(eval, scope, arg)?);
	}
	Ok(Node::text(path.display().to_string()))
}

pub fn slash(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	join_paths(eval, scope, PathBuf::new(), args)
}

/// Path join under the directory of the current include.
pub fn here_slash(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	let here = eval
		.here()
		.map(PathBuf::from)
		.ok_or_else(|| AridError::no_such_path(&["here".to_string()]))?;
	join_paths(eval, scope, here, args)
}

pub fn readfile(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	let name = text_arg(eval, scope, single("readfile", args)?)?;
	let path = source::resolve_file(eval, scope, &name)?;
	Ok(Node::text(source::read_text(&path)?))
}

pub fn processtemplate(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	let name = text_arg(eval, scope, single("processtemplate", args)?)?;
	let path = source::resolve_file(eval, scope, &name)?;
	Ok(Node::text(source::process_template_file(eval, scope, &path)?))
}

fn quoted(
	eval: &mut Eval,
	scope: &Scope,
	args: &[Node],
	function: &str,
	escape: fn(&str) -> String,
) -> Result<Node> {
	Ok(Node::text(escape(&text_arg(eval, scope, single(function, args)?)?)))
}

pub fn shstr(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	quoted(eval, scope, args, "shstr", quote::shell)
}

pub fn pystr(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	quoted(eval, scope, args, "pystr", quote::python)
}

/// JSON literal of the unravelled value; also valid YAML.
pub fn jsonquote(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	let value = single("jsonquote", args)?
		.resolve(eval, scope)?
		.unravel(eval)?;
	serde_json::to_string(&value)
		.map(Node::text)
		.map_err(|e| AridError::Serialize {
			message: e.to_string(),
		})
}

pub fn xmlattr(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	quoted(eval, scope, args, "xmlattr", quote::xml_attr)
}

pub fn xmltext(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	quoted(eval, scope, args, "xmltext", quote::xml_text)
}

pub fn tomlquote(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	quoted(eval, scope, args, "tomlquote", quote::toml)
}

pub fn urlquote(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	quoted(eval, scope, args, "urlquote", quote::url)
}

pub fn screenstr(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	quoted(eval, scope, args, "screenstr", quote::double_quoted)
}

/// SuperCollider string literal.
pub fn scstr(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	quoted(eval, scope, args, "scstr", quote::double_quoted)
}

pub fn hclstr(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	quoted(eval, scope, args, "hclstr", quote::double_quoted)
}

pub fn groovystr(eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
	quoted(eval, scope, args, "groovystr", quote::groovy)
}

pub fn home() -> Result<Node> {
	dirs::home_dir()
		.map(|p| Node::text(p.display().to_string()))
		.ok_or_else(|| AridError::no_such_path(&["~".to_string()]))
}

pub fn line_feed() -> Result<Node> {
	Ok(Node::text("\n"))
}

pub fn end_of_line() -> Result<Node> {
	Ok(Node::text(if cfg!(windows) { "\r\n" } else { "\n" }))
}

pub fn cwd() -> Result<Node> {
	std::env::current_dir()
		.map(|p| Node::text(p.display().to_string()))
		.map_err(|source| AridError::Io {
			path: PathBuf::from("."),
			source,
		})
}

pub fn stdout() -> Result<Node> {
	Ok(Node::Stream(Stream::stdout()))
}
