use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::error::{AridError, Result};
use crate::model::number::Number;
use crate::model::value::Value;
use crate::scope::{Eval, Scope, resolve_function};

/// The two interchangeable bracket styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brackets {
	Round,
	Square,
}

impl Brackets {
	pub fn from_open(c: char) -> Option<Self> {
		match c {
			'(' => Some(Brackets::Round),
			'[' => Some(Brackets::Square),
			_ => None,
		}
	}

	pub fn open(self) -> char {
		match self {
			Brackets::Round => '(',
			Brackets::Square => '[',
		}
	}

	pub fn close(self) -> char {
		match self {
			Brackets::Round => ')',
			Brackets::Square => ']',
		}
	}
}

/// How a literal or pass-through form was spelled: `$'(..)` / `$.(..)` or
/// `$lit(..)` / `$pass(..)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escape {
	pub brackets: Brackets,
	pub spelled: bool,
}

impl Escape {
	pub fn new(brackets: Brackets) -> Self {
		Self {
			brackets,
			spelled: false,
		}
	}

	fn wrap(self, short: &str, long: &str, body: &str) -> String {
		format!(
			"${}{}{}{}",
			if self.spelled { long } else { short },
			self.brackets.open(),
			body,
			self.brackets.close()
		)
	}
}

#[derive(Debug, Clone)]
pub struct Text {
	pub value: String,
	pub literal: Option<Escape>,
}

impl Text {
	pub fn new(value: impl Into<String>) -> Self {
		Self {
			value: value.into(),
			literal: None,
		}
	}

	pub fn literal(value: impl Into<String>, escape: Escape) -> Self {
		Self {
			value: value.into(),
			literal: Some(escape),
		}
	}

	/// Plain text as written, eligible to be a directive token.
	pub fn is_plain(&self) -> bool {
		self.literal.is_none()
	}
}

impl PartialEq for Text {
	fn eq(&self, other: &Self) -> bool {
		self.value == other.value
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Concat {
	pub parts: Vec<Node>,
	pub pass: Option<Escape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
	/// Function name; `f$g` applies `g` then `f`.
	pub name: String,
	pub args: Vec<Node>,
	/// `None` for a chained tail such as `$f$'(x)`.
	pub brackets: Option<Brackets>,
}

type Callable = dyn Fn(&mut Eval, &Scope, &[Node]) -> Result<Node>;

/// Signature of the static builtin functions.
pub type NativeFn = fn(&mut Eval, &Scope, &[Node]) -> Result<Node>;

/// A callable value. Receives the calling scope and its unresolved arguments.
#[derive(Clone)]
pub struct Function {
	name: String,
	body: Rc<Callable>,
}

impl Function {
	pub fn new(
		name: impl Into<String>,
		body: impl Fn(&mut Eval, &Scope, &[Node]) -> Result<Node> + 'static,
	) -> Self {
		Self {
			name: name.into(),
			body: Rc::new(body),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn call(&self, eval: &mut Eval, scope: &Scope, args: &[Node]) -> Result<Node> {
		(self.body)(eval, scope, args)
	}
}

impl fmt::Debug for Function {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Function({:?})", self.name)
	}
}

impl PartialEq for Function {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

/// A shared output sink bound in scope, written by `!write` and `!cat`.
#[derive(Clone)]
pub struct Stream {
	label: String,
	sink: Rc<RefCell<Box<dyn Write>>>,
}

impl Stream {
	pub fn new(label: impl Into<String>, sink: impl Write + 'static) -> Self {
		Self {
			label: label.into(),
			sink: Rc::new(RefCell::new(Box::new(sink))),
		}
	}

	pub fn stdout() -> Self {
		Self::new("stdout", std::io::stdout())
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn write_text(&self, text: &str) -> std::io::Result<()> {
		let mut sink = self.sink.borrow_mut();
		sink.write_all(text.as_bytes())?;
		sink.flush()
	}
}

impl fmt::Debug for Stream {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Stream({:?})", self.label)
	}
}

impl PartialEq for Stream {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.sink, &other.sink)
	}
}

/// In-memory sink whose contents stay readable after being handed to a [`Stream`].
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
	pub fn contents(&self) -> String {
		String::from_utf8_lossy(&self.0.borrow()).into_owned()
	}
}

impl Write for SharedBuffer {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		self.0.borrow_mut().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

/// Values that depend on the evaluation stacks rather than on scope contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextVar {
	Here,
	Indent,
}

impl ContextVar {
	pub fn name(self) -> &'static str {
		match self {
			ContextVar::Here => "here",
			ContextVar::Indent => "indent",
		}
	}
}

#[derive(Debug, Clone)]
pub enum Node {
	Text(Text),
	Number(Number),
	Boolean(bool),
	Blank(String),
	Boundary(String),
	Concat(Concat),
	Call(Call),
	Scope(Scope),
	Function(Function),
	Stream(Stream),
	Contextual(ContextVar),
}

impl Node {
	pub fn text(value: impl Into<String>) -> Self {
		Node::Text(Text::new(value))
	}

	pub fn int(i: i64) -> Self {
		Node::Number(Number::from_int(i))
	}

	pub fn function(
		name: impl Into<String>,
		body: impl Fn(&mut Eval, &Scope, &[Node]) -> Result<Node> + 'static,
	) -> Self {
		Node::Function(Function::new(name, body))
	}

	/// Blank and Boundary carry layout only.
	pub fn is_ignorable(&self) -> bool {
		matches!(self, Node::Blank(_) | Node::Boundary(_))
	}

	pub fn kind(&self) -> &'static str {
		match self {
			Node::Text(_) => "text",
			Node::Number(_) => "number",
			Node::Boolean(_) => "boolean",
			Node::Blank(_) => "blank",
			Node::Boundary(_) => "boundary",
			Node::Concat(_) => "concat",
			Node::Call(_) => "call",
			Node::Scope(s) if s.is_list() => "list",
			Node::Scope(_) => "scope",
			Node::Function(_) => "function",
			Node::Stream(_) => "stream",
			Node::Contextual(_) => "contextual",
		}
	}

	/// Evaluate against `scope`. Already-resolved values return themselves.
	pub fn resolve(&self, eval: &mut Eval, scope: &Scope) -> Result<Node> {
		match self {
			Node::Concat(concat) => {
				let mut out = String::new();
				for part in &concat.parts {
					out.push_str(&part.resolve(eval, scope)?.cat()?);
				}
				Ok(Node::text(out))
			}
			Node::Call(call) => call.invoke(eval, scope),
			Node::Contextual(var) => {
				let value = match var {
					ContextVar::Here => eval.here().map(|p| p.display().to_string()),
					ContextVar::Indent => eval.indent(),
				};
				value
					.map(Node::text)
					.ok_or_else(|| AridError::no_such_path(&[var.name().to_string()]))
			}
			other => Ok(other.clone()),
		}
	}

	/// String form of a resolved value.
	pub fn cat(&self) -> Result<String> {
		match self {
			Node::Text(t) => Ok(t.value.clone()),
			Node::Number(n) => Ok(n.lexeme().to_string()),
			Node::Boolean(b) => Ok(b.to_string()),
			Node::Blank(s) | Node::Boundary(s) => Ok(s.clone()),
			Node::Call(_) | Node::Concat(_) => Ok(self.unparse()),
			other => Err(AridError::NotText { kind: other.kind() }),
		}
	}

	pub fn unparse(&self) -> String {
		match self {
			Node::Text(t) => match t.literal {
				Some(escape) => escape.wrap("'", "lit", &t.value),
				None => t.value.clone(),
			},
			Node::Number(n) => n.lexeme().to_string(),
			Node::Boolean(b) => b.to_string(),
			Node::Blank(s) | Node::Boundary(s) => s.clone(),
			Node::Concat(c) => {
				let body: String = c.parts.iter().map(Node::unparse).collect();
				match c.pass {
					Some(escape) => escape.wrap(".", "pass", &body),
					None => body,
				}
			}
			Node::Call(c) => {
				let body: String = c.args.iter().map(Node::unparse).collect();
				match c.brackets {
					Some(b) => format!("${}{}{}{}", c.name, b.open(), body, b.close()),
					None => format!("${}{}", c.name, body),
				}
			}
			Node::Scope(_) => "$fork()".to_string(),
			Node::Function(f) => format!("$({})", f.name()),
			Node::Stream(s) => format!("$({})", s.label()),
			Node::Contextual(var) => format!("$({})", var.name()),
		}
	}

	pub fn as_text(&self) -> Result<String> {
		self.cat()
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Node::Boolean(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_number(&self) -> Option<&Number> {
		match self {
			Node::Number(n) => Some(n),
			_ => None,
		}
	}

	pub fn as_scope(&self) -> Option<&Scope> {
		match self {
			Node::Scope(s) => Some(s),
			_ => None,
		}
	}

	/// Convert a resolved value to plain data, resolving scope contents lazily.
	pub fn unravel(&self, eval: &mut Eval) -> Result<Value> {
		match self {
			Node::Text(t) => Ok(Value::Text(t.value.clone())),
			Node::Number(n) => Ok(match n.value() {
				crate::model::NumberValue::Int(i) => Value::Int(i),
				crate::model::NumberValue::Float(f) => Value::Float(f),
			}),
			Node::Boolean(b) => Ok(Value::Boolean(*b)),
			Node::Scope(s) => s.unravel(eval),
			Node::Function(f) => Ok(Value::Opaque(format!("<function {}>", f.name()))),
			Node::Stream(s) => Ok(Value::Opaque(format!("<stream {}>", s.label()))),
			other => Ok(Value::Text(other.cat()?)),
		}
	}
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Node::Text(a), Node::Text(b)) => a == b,
			(Node::Number(a), Node::Number(b)) => a == b,
			(Node::Boolean(a), Node::Boolean(b)) => a == b,
			(Node::Blank(a), Node::Blank(b)) => a == b,
			(Node::Boundary(a), Node::Boundary(b)) => a == b,
			(Node::Concat(a), Node::Concat(b)) => a == b,
			(Node::Call(a), Node::Call(b)) => a == b,
			(Node::Scope(a), Node::Scope(b)) => a.ptr_eq(b),
			(Node::Function(a), Node::Function(b)) => a == b,
			(Node::Stream(a), Node::Stream(b)) => a == b,
			(Node::Contextual(a), Node::Contextual(b)) => a == b,
			_ => false,
		}
	}
}

impl Call {
	fn invoke(&self, eval: &mut Eval, scope: &Scope) -> Result<Node> {
		let args: Vec<Node> = self
			.args
			.iter()
			.filter(|a| !a.is_ignorable())
			.cloned()
			.collect();
		let mut names = self.name.rsplit('$');
		let innermost = names.next().unwrap_or_default();
		let mut result = lookup_function(eval, scope, innermost)?.call(eval, scope, &args)?;
		for name in names {
			result = lookup_function(eval, scope, name)?.call(eval, scope, &[result])?;
		}
		Ok(result)
	}
}

fn lookup_function(eval: &mut Eval, scope: &Scope, name: &str) -> Result<Function> {
	match resolve_function(eval, scope, name)? {
		Node::Function(f) => Ok(f),
		_ => Err(AridError::NotAFunction {
			name: name.to_string(),
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_text_equality_ignores_literal_form() {
		let plain = Text::new("=");
		let literal = Text::literal("=", Escape::new(Brackets::Round));
		assert_eq!(plain, literal);
		assert!(!literal.is_plain());
	}

	#[test]
	fn test_unparse_literal_forms() {
		let short = Node::Text(Text::literal("a b", Escape::new(Brackets::Square)));
		assert_eq!(short.unparse(), "$'[a b]");
		let long = Node::Text(Text::literal(
			"x",
			Escape {
				brackets: Brackets::Round,
				spelled: true,
			},
		));
		assert_eq!(long.unparse(), "$lit(x)");
	}

	#[test]
	fn test_unparse_chained_call() {
		let call = Node::Call(Call {
			name: "f".to_string(),
			args: vec![Node::Text(Text::literal("x", Escape::new(Brackets::Round)))],
			brackets: None,
		});
		assert_eq!(call.unparse(), "$f$'(x)");
	}

	#[test]
	fn test_cat_rejects_scope() {
		let node = Node::Scope(Scope::new());
		match node.cat().unwrap_err() {
			AridError::NotText { kind } => assert_eq!(kind, "scope"),
			_ => panic!("Expected NotText error"),
		}
	}

	#[test]
	fn test_concat_joins_blanks() {
		let scope = Scope::new();
		let mut eval = Eval::new();
		let node = Node::Concat(Concat {
			parts: vec![Node::text("a"), Node::Blank("  ".to_string()), Node::int(1)],
			pass: None,
		});
		assert_eq!(node.resolve(&mut eval, &scope).unwrap(), Node::text("a  1"));
	}

	#[test]
	fn test_contextual_outside_include_is_missing() {
		let scope = Scope::new();
		let mut eval = Eval::new();
		let err = Node::Contextual(ContextVar::Here)
			.resolve(&mut eval, &scope)
			.unwrap_err();
		assert!(matches!(err, AridError::NoSuchPath { .. }));
	}

	#[test]
	fn test_shared_buffer_stream() {
		let buffer = SharedBuffer::default();
		let stream = Stream::new("buf", buffer.clone());
		stream.write_text("hello").unwrap();
		assert_eq!(buffer.contents(), "hello");
	}
}
