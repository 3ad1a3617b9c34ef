use std::path::PathBuf;

/// Library-level structured errors for arid.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum AridError {
	#[error("Parse error at offset {position}: {message}")]
	Parse { position: usize, message: String },

	#[error("{}", format_no_such_path(path, causes))]
	NoSuchPath {
		path: Vec<String>,
		causes: Vec<AridError>,
	},

	#[error("Cycle detected resolving: {}", path.join(" "))]
	Cycle { path: Vec<String> },

	#[error("Recursion limit exceeded resolving: {}", path.join(" "))]
	RecursionLimit { path: Vec<String> },

	#[error("Unsupported entry: {entry}")]
	UnsupportedEntry { entry: String },

	#[error("Malformed entry: {entry}")]
	MalformedEntry { entry: String },

	#[error("No such indent: {entry}")]
	NoSuchIndent { entry: String },

	#[error("Unterminated statement: {lines:?}")]
	DanglingStack { lines: Vec<String> },

	#[error("Not a path: empty key")]
	NotAPath,

	#[error("Not a resolvable: ignorable node cannot be bound")]
	NotAResolvable,

	#[error("Cannot use {kind} as text")]
	NotText { kind: &'static str },

	#[error("Not a function: {name}")]
	NotAFunction { name: String },

	#[error("Bad arguments to {function}: {message}")]
	BadArguments { function: String, message: String },

	#[error("Not a number: {text}")]
	NotANumber { text: String },

	#[error("I/O error: {path}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to serialize: {message}")]
	Serialize { message: String },
}

impl AridError {
	/// Errors an interactive consumer may report and continue past.
	pub fn is_recoverable(&self) -> bool {
		matches!(
			self,
			AridError::NoSuchPath { .. } | AridError::UnsupportedEntry { .. } | AridError::Io { .. }
		)
	}

	pub(crate) fn no_such_path(path: &[String]) -> Self {
		AridError::NoSuchPath {
			path: path.to_vec(),
			causes: Vec::new(),
		}
	}

	pub(crate) fn bad_arguments(function: &str, message: impl Into<String>) -> Self {
		AridError::BadArguments {
			function: function.to_string(),
			message: message.into(),
		}
	}
}

fn format_no_such_path(path: &[String], causes: &[AridError]) -> String {
	let mut lines = vec![path.join(" ")];
	let mut counted: Vec<(String, usize)> = Vec::new();
	for cause in causes {
		let text = cause.to_string();
		match counted.iter_mut().find(|(t, _)| *t == text) {
			Some((_, n)) => *n += 1,
			None => counted.push((text, 1)),
		}
	}
	for (text, n) in counted {
		let mut parts = text.lines();
		let first = parts.next().unwrap_or_default();
		lines.push(format!("{n}x {first}"));
		for rest in parts {
			lines.push(format!("    {rest}"));
		}
	}
	lines.join("\n")
}

/// Result type alias using AridError.
pub type Result<T> = std::result::Result<T, AridError>;
