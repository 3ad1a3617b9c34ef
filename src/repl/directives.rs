use std::fs::File;
use std::path::Path;

use tracing::debug;

use crate::error::{AridError, Result};
use crate::model::{Entry, Node, Stream};
use crate::scope::{Eval, Scope, WILDCARD};
use crate::source;

/// The statement kinds, selected by the first plain directive token in an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
	Assign,
	Bake,
	Append,
	Wildcard,
	Include,
	Cd,
	Redirect,
	Write,
	Cat,
}

impl Directive {
	pub fn from_token(token: &str) -> Option<Self> {
		Some(match token {
			"=" => Directive::Assign,
			":=" => Directive::Bake,
			"+=" => Directive::Append,
			"*" => Directive::Wildcard,
			"." => Directive::Include,
			"!cd" => Directive::Cd,
			"!redirect" => Directive::Redirect,
			"!write" => Directive::Write,
			"!cat" => Directive::Cat,
			_ => return None,
		})
	}
}

#[derive(Debug, PartialEq)]
pub(crate) enum Outcome {
	Done,
	/// No directive: the path may only head an indented block.
	Headless(Vec<String>),
}

/// Literal words never count as tokens.
fn plain_text(node: &Node) -> Option<&str> {
	match node {
		Node::Text(t) if t.is_plain() => Some(&t.value),
		_ => None,
	}
}

fn find_directive(entry: &Entry) -> Option<(usize, Directive)> {
	entry
		.words()
		.into_iter()
		.enumerate()
		.find_map(|(i, word)| plain_text(word).and_then(Directive::from_token).map(|d| (i, d)))
}

fn resolve_words(eval: &mut Eval, scope: &Scope, entry: &Entry, from: usize, to: usize) -> Result<Vec<String>> {
	entry.words()[from..to]
		.iter()
		.map(|word| word.resolve(eval, scope)?.cat())
		.collect()
}

fn unsupported(entry: &Entry) -> AridError {
	AridError::UnsupportedEntry {
		entry: entry.unparse().trim().to_string(),
	}
}

fn stream_at(eval: &mut Eval, scope: &Scope) -> Result<Stream> {
	match scope.resolved_with(eval, &["stdout"])? {
		Node::Stream(stream) => Ok(stream),
		other => Err(AridError::bad_arguments(
			"stdout",
			format!("expected a stream, got {}", other.kind()),
		)),
	}
}

fn write_to(stream: &Stream, text: &str) -> Result<()> {
	stream.write_text(text).map_err(|source| AridError::Io {
		path: Path::new(stream.label()).to_path_buf(),
		source,
	})
}

/// Apply one comment-free entry to `scope` under `prefix`.
pub(crate) fn execute(eval: &mut Eval, scope: &Scope, prefix: &[String], entry: &Entry) -> Result<Outcome> {
	let target = scope.materialize(prefix);
	let size = entry.size();
	let Some((i, directive)) = find_directive(entry) else {
		return Ok(Outcome::Headless(resolve_words(eval, &target, entry, 0, size)?));
	};
	let path = resolve_words(eval, &target, entry, 0, i)?;
	debug!(?directive, path = %path.join(" "), "dispatching");
	let phrase = entry.subentry(i + 1, size).phrase();
	match directive {
		Directive::Assign => target.set(&path, phrase)?,
		Directive::Bake => {
			let Some((_, init)) = path.split_last() else {
				return Err(AridError::NotAPath);
			};
			let container = target.materialize(init);
			let value = phrase.resolve(eval, &container)?;
			target.set(&path, value)?;
		}
		Directive::Append => target.append(&path, phrase)?,
		Directive::Wildcard => {
			let words = entry.words();
			let Some(j) = (i + 1..size).find(|&j| plain_text(words[j]) == Some("=")) else {
				return Err(unsupported(entry));
			};
			let mut full = path;
			full.push(WILDCARD.to_string());
			full.extend(resolve_words(eval, &target, entry, i + 1, j)?);
			target.set(&full, entry.subentry(j + 1, size).phrase())?;
		}
		Directive::Include => {
			let into = target.materialize(&path);
			let name = phrase.resolve(eval, &into)?.cat()?;
			let file = source::resolve_file(eval, &into, &name)?;
			source::include(eval, &into, &file)?;
		}
		Directive::Cd => {
			let into = target.materialize(&path);
			let name = phrase.resolve(eval, &into)?.cat()?;
			let dir = source::resolve_file(eval, &into, &name)?;
			into.set(&["cwd"], Node::text(dir.display().to_string()))?;
		}
		Directive::Redirect => {
			let into = target.materialize(&path);
			let name = phrase.resolve(eval, &into)?.cat()?;
			let file = source::resolve_file(eval, &into, &name)?;
			let sink = File::create(&file).map_err(|source| AridError::Io {
				path: file.clone(),
				source,
			})?;
			into.set(&["stdout"], Node::Stream(Stream::new(file.display().to_string(), sink)))?;
		}
		Directive::Write => {
			let into = target.materialize(&path);
			let text = phrase.resolve(eval, &into)?.cat()?;
			write_to(&stream_at(eval, &into)?, &text)?;
		}
		Directive::Cat => {
			let into = target.materialize(&path);
			let name = phrase.resolve(eval, &into)?.cat()?;
			let file = source::resolve_file(eval, &into, &name)?;
			let text = source::process_template_file(eval, &into, &file)?;
			write_to(&stream_at(eval, &into)?, &text)?;
		}
	}
	Ok(Outcome::Done)
}
