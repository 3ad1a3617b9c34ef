//! Reading statement files into scopes and processing template files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AridError, Result};
use crate::grammar::parse_template;
use crate::repl::Processor;
use crate::scope::{Eval, Scope};

/// Resolve a file name against the current include directory, else the bound `cwd`.
pub fn resolve_file(eval: &mut Eval, scope: &Scope, name: &str) -> Result<PathBuf> {
	let path = PathBuf::from(name);
	if path.is_absolute() {
		return Ok(path);
	}
	if let Some(here) = eval.here() {
		return Ok(here.join(path));
	}
	let cwd = scope.resolved_with(eval, &["cwd"])?.cat()?;
	Ok(Path::new(&cwd).join(path))
}

pub fn read_text(path: &Path) -> Result<String> {
	fs::read_to_string(path).map_err(|source| AridError::Io {
		path: path.to_path_buf(),
		source,
	})
}

fn directory_of(path: &Path) -> Result<PathBuf> {
	let absolute = std::path::absolute(path).map_err(|source| AridError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	Ok(absolute
		.parent()
		.map(Path::to_path_buf)
		.unwrap_or_else(|| PathBuf::from("/")))
}

/// Execute the statements of `path` into `scope`, with `here` set to its directory.
pub(crate) fn include(eval: &mut Eval, scope: &Scope, path: &Path) -> Result<()> {
	debug!(path = %path.display(), "including");
	let text = read_text(path)?;
	let dir = directory_of(path)?;
	eval.with_here(dir, |eval| {
		let mut processor = Processor::new(scope);
		for line in text.split_inclusive('\n') {
			processor.feed(eval, line)?;
		}
		processor.close()
	})
}

/// Load a statement file into `scope`.
pub fn load_file(scope: &Scope, path: impl AsRef<Path>) -> Result<()> {
	include(&mut Eval::new(), scope, path.as_ref())
}

/// Process template text: every node is resolved in `scope` and concatenated.
pub fn process_template(eval: &mut Eval, scope: &Scope, text: &str) -> Result<String> {
	let nodes = parse_template(text)?;
	eval.with_indent_monitor(|eval| {
		let mut out = String::new();
		for node in &nodes {
			let text = node.resolve(eval, scope)?.cat()?;
			eval.observe(&text);
			out.push_str(&text);
		}
		Ok(out)
	})
}

pub fn process_template_file(eval: &mut Eval, scope: &Scope, path: &Path) -> Result<String> {
	debug!(path = %path.display(), "processing template");
	let text = read_text(path)?;
	let dir = directory_of(path)?;
	eval.with_here(dir, |eval| process_template(eval, scope, &text))
}

/// Process the template file at `path` against `scope`.
pub fn template_file(scope: &Scope, path: impl AsRef<Path>) -> Result<String> {
	process_template_file(&mut Eval::new(), scope, path.as_ref())
}
