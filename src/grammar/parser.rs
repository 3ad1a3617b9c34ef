use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AridError, Result};
use crate::model::{Brackets, Call, Concat, Entry, Escape, Node, Number, Text};

static NUMBER_PATTERN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^-?(?:[0-9]+|[0-9]*\.[0-9]+)$").expect("valid number pattern"));

const BOUNDARY_CHARS: &[char] = &['\r', '\n'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
	Statement,
	Template,
}

/// Where a sequence ends and how its pieces are typed.
#[derive(Clone, Copy)]
struct Level {
	brackets: Option<Brackets>,
	coerce: bool,
	pass: bool,
}

struct Parser<'a> {
	text: &'a str,
	pos: usize,
	mode: Mode,
}

/// Parse a template: text and calls, no statement boundaries, no scalar coercion.
pub fn parse_template(text: &str) -> Result<Vec<Node>> {
	if text.is_empty() {
		return Ok(vec![Node::text("")]);
	}
	Parser::new(text, Mode::Template).parse_all()
}

/// Parse statement text into a flat node sequence, boundaries retained.
pub fn parse_expression(text: &str) -> Result<Vec<Node>> {
	Parser::new(text, Mode::Statement).parse_all()
}

/// Parse statement text into entries, each ending after its boundary.
pub fn load(text: &str) -> Result<Vec<Entry>> {
	let mut entries = Vec::new();
	let mut current = Vec::new();
	for node in parse_expression(text)? {
		let boundary = matches!(node, Node::Boundary(_));
		current.push(node);
		if boundary {
			entries.push(Entry::new(std::mem::take(&mut current)));
		}
	}
	if !current.is_empty() {
		entries.push(Entry::new(current));
	}
	Ok(entries)
}

/// Classify a lone scalar run as boolean, number or text.
pub fn scalar(run: &str) -> Node {
	match run {
		"true" => Node::Boolean(true),
		"false" => Node::Boolean(false),
		_ if NUMBER_PATTERN.is_match(run) => match Number::parse(run) {
			Some(n) => Node::Number(n),
			None => Node::text(run),
		},
		_ => Node::text(run),
	}
}

fn is_ident_char(c: char) -> bool {
	!(c.is_whitespace() || matches!(c, '$' | '(' | '[' | ')' | ']'))
}

impl<'a> Parser<'a> {
	fn new(text: &'a str, mode: Mode) -> Self {
		Self { text, pos: 0, mode }
	}

	fn peek(&self) -> Option<char> {
		self.text[self.pos..].chars().next()
	}

	fn bump(&mut self) -> Option<char> {
		let c = self.peek()?;
		self.pos += c.len_utf8();
		Some(c)
	}

	fn error(&self, position: usize, message: impl Into<String>) -> AridError {
		AridError::Parse {
			position,
			message: message.into(),
		}
	}

	fn parse_all(&mut self) -> Result<Vec<Node>> {
		let level = Level {
			brackets: None,
			coerce: self.mode == Mode::Statement,
			pass: false,
		};
		self.parse_sequence(level)
	}

	fn is_boundary(&self, level: Level, c: char) -> bool {
		level.brackets.is_none() && self.mode == Mode::Statement && BOUNDARY_CHARS.contains(&c)
	}

	fn take_while(&mut self, mut keep: impl FnMut(char) -> bool) -> &'a str {
		let text = self.text;
		let start = self.pos;
		while let Some(c) = self.peek() {
			if !keep(c) {
				break;
			}
			self.pos += c.len_utf8();
		}
		&text[start..self.pos]
	}

	/// Parse until end of input or the level's unbalanced closing bracket, which is left unconsumed.
	fn parse_sequence(&mut self, level: Level) -> Result<Vec<Node>> {
		let mut nodes = Vec::new();
		let mut depth = 0usize;
		loop {
			let Some(c) = self.peek() else {
				if let Some(b) = level.brackets {
					return Err(self.error(self.pos, format!("expected '{}'", b.close())));
				}
				break;
			};
			if level.brackets.is_some_and(|b| b.close() == c) && depth == 0 {
				break;
			}
			if self.is_boundary(level, c) {
				let run = self.take_while(|c| BOUNDARY_CHARS.contains(&c));
				nodes.push(Node::Boundary(run.to_string()));
			} else if c.is_whitespace() {
				let statement = self.mode == Mode::Statement && level.brackets.is_none();
				let run = self
					.take_while(|c| c.is_whitespace() && !(statement && BOUNDARY_CHARS.contains(&c)));
				nodes.push(if level.pass {
					Node::text(run)
				} else {
					Node::Blank(run.to_string())
				});
			} else {
				let parts = self.parse_word(level, &mut depth)?;
				if level.pass {
					nodes.extend(parts);
				} else {
					nodes.push(Self::word_node(parts, level.coerce));
				}
			}
		}
		Ok(nodes)
	}

	fn word_node(mut parts: Vec<Node>, coerce: bool) -> Node {
		if parts.len() == 1 {
			match parts.pop() {
				Some(Node::Text(t)) if coerce && t.is_plain() => scalar(&t.value),
				Some(node) => node,
				None => Node::text(""),
			}
		} else {
			Node::Concat(Concat { parts, pass: None })
		}
	}

	/// Adjacent text runs and actions with no whitespace between them.
	fn parse_word(&mut self, level: Level, depth: &mut usize) -> Result<Vec<Node>> {
		let mut parts = Vec::new();
		while let Some(c) = self.peek() {
			if c == '$' {
				parts.push(self.parse_action()?);
				continue;
			}
			if c.is_whitespace() || self.is_boundary(level, c) {
				break;
			}
			if level.brackets.is_some_and(|b| b.close() == c) && *depth == 0 {
				break;
			}
			let run = self.take_while(|c| {
				if c == '$' || c.is_whitespace() {
					return false;
				}
				match level.brackets {
					Some(b) if c == b.open() => *depth += 1,
					Some(b) if c == b.close() => {
						if *depth == 0 {
							return false;
						}
						*depth -= 1;
					}
					_ => {}
				}
				true
			});
			parts.push(Node::text(run));
		}
		Ok(parts)
	}

	fn parse_action(&mut self) -> Result<Node> {
		let start = self.pos;
		self.bump();
		let ident = self.take_while(is_ident_char);
		match self.peek() {
			Some('$') => {
				let inner = self.parse_action()?;
				Ok(Node::Call(match inner {
					Node::Call(call) if call.brackets.is_some() => Call {
						name: format!("{ident}${}", call.name),
						args: call.args,
						brackets: call.brackets,
					},
					other => Call {
						name: ident.to_string(),
						args: vec![other],
						brackets: None,
					},
				}))
			}
			Some(c) => {
				let Some(brackets) = Brackets::from_open(c) else {
					return Err(self.error(start, format!("expected bracket after ${ident}")));
				};
				self.bump();
				match ident {
					"'" | "lit" => self.parse_literal(brackets, ident == "lit"),
					"." | "pass" => self.parse_pass(brackets, ident == "pass"),
					_ => self.parse_call(ident, brackets),
				}
			}
			None => Err(self.error(start, format!("unexpected end after ${ident}"))),
		}
	}

	fn parse_literal(&mut self, brackets: Brackets, spelled: bool) -> Result<Node> {
		let text = self.text;
		let rest = &text[self.pos..];
		let mut depth = 0usize;
		let mut end = None;
		for (i, c) in rest.char_indices() {
			if c == brackets.open() {
				depth += 1;
			} else if c == brackets.close() {
				if depth == 0 {
					end = Some(i);
					break;
				}
				depth -= 1;
			}
		}
		let end = match end.or_else(|| rest.find(brackets.close())) {
			Some(end) => end,
			None => {
				return Err(self.error(
					self.pos,
					format!("unterminated literal, expected '{}'", brackets.close()),
				));
			}
		};
		let value = &rest[..end];
		self.pos += end + brackets.close().len_utf8();
		Ok(Node::Text(Text::literal(value, Escape { brackets, spelled })))
	}

	fn parse_pass(&mut self, brackets: Brackets, spelled: bool) -> Result<Node> {
		let parts = self.parse_sequence(Level {
			brackets: Some(brackets),
			coerce: false,
			pass: true,
		})?;
		self.bump();
		Ok(Node::Concat(Concat {
			parts,
			pass: Some(Escape { brackets, spelled }),
		}))
	}

	fn parse_call(&mut self, name: &str, brackets: Brackets) -> Result<Node> {
		let args = self.parse_sequence(Level {
			brackets: Some(brackets),
			coerce: true,
			pass: false,
		})?;
		self.bump();
		Ok(Node::Call(Call {
			name: name.to_string(),
			args,
			brackets: Some(brackets),
		}))
	}
}
