use std::path::{Path, PathBuf};

/// Resolutions deeper than this fail with `RecursionLimit`.
pub const MAX_DEPTH: usize = 256;

/// Tracks text emitted on the current template line so `$(indent)` can report it.
#[derive(Debug, Default)]
pub(crate) struct IndentMonitor {
	parts: Vec<String>,
}

impl IndentMonitor {
	pub(crate) fn observe(&mut self, text: &str) {
		match text.rfind('\n') {
			Some(i) => self.parts = vec![text[i + 1..].to_string()],
			None => self.parts.push(text.to_string()),
		}
	}

	pub(crate) fn indent(&self) -> String {
		self.parts
			.concat()
			.chars()
			.take_while(|c| c.is_whitespace())
			.collect()
	}
}

/// Per-evaluation context: in-progress resolutions and the `here`/`indent` stacks.
#[derive(Debug, Default)]
pub struct Eval {
	pub(crate) active: Vec<(usize, Vec<String>)>,
	here: Vec<PathBuf>,
	indents: Vec<IndentMonitor>,
}

impl Eval {
	pub fn new() -> Self {
		Self::default()
	}

	/// Directory of the innermost include or template being processed.
	pub fn here(&self) -> Option<&Path> {
		self.here.last().map(PathBuf::as_path)
	}

	pub fn with_here<T>(&mut self, dir: PathBuf, f: impl FnOnce(&mut Eval) -> T) -> T {
		self.here.push(dir);
		let result = f(self);
		self.here.pop();
		result
	}

	pub(crate) fn with_indent_monitor<T>(&mut self, f: impl FnOnce(&mut Eval) -> T) -> T {
		self.indents.push(IndentMonitor::default());
		let result = f(self);
		self.indents.pop();
		result
	}

	pub(crate) fn observe(&mut self, text: &str) {
		if let Some(monitor) = self.indents.last_mut() {
			monitor.observe(text);
		}
	}

	/// Indentation of the current template line, if a template is being processed.
	pub fn indent(&self) -> Option<String> {
		self.indents.last().map(IndentMonitor::indent)
	}

	pub fn depth(&self) -> usize {
		self.active.len()
	}
}
