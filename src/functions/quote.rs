//! Escaping of resolved text into other languages' literal syntaxes.

use std::sync::LazyLock;

use regex::Regex;

static SHELL_SAFE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[A-Za-z0-9@%+=:,./_-]+$").expect("valid shell pattern"));

/// POSIX shell word, single-quoted unless every character is safe.
pub fn shell(text: &str) -> String {
	if text.is_empty() {
		return "''".to_string();
	}
	if SHELL_SAFE.is_match(text) {
		return text.to_string();
	}
	format!("'{}'", text.replace('\'', r#"'"'"'"#))
}

/// Python string literal, preferring single quotes.
pub fn python(text: &str) -> String {
	let quote = if text.contains('\'') && !text.contains('"') {
		'"'
	} else {
		'\''
	};
	let mut out = String::with_capacity(text.len() + 2);
	out.push(quote);
	for c in text.chars() {
		match c {
			'\\' => out.push_str("\\\\"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\t' => out.push_str("\\t"),
			c if c == quote => {
				out.push('\\');
				out.push(c);
			}
			c if (c as u32) < 0x20 || c as u32 == 0x7f => out.push_str(&format!("\\x{:02x}", c as u32)),
			c => out.push(c),
		}
	}
	out.push(quote);
	out
}

fn xml_escape(text: &str, entities: &[(char, &str)]) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			c => match entities.iter().find(|(e, _)| *e == c) {
				Some((_, replacement)) => out.push_str(replacement),
				None => out.push(c),
			},
		}
	}
	out
}

/// XML attribute value including its quotes.
pub fn xml_attr(text: &str) -> String {
	let escaped = xml_escape(text, &[('\n', "&#10;"), ('\r', "&#13;"), ('\t', "&#9;")]);
	if escaped.contains('"') {
		if escaped.contains('\'') {
			format!("\"{}\"", escaped.replace('"', "&quot;"))
		} else {
			format!("'{escaped}'")
		}
	} else {
		format!("\"{escaped}\"")
	}
}

/// XML character data, escaping both quote kinds as well.
pub fn xml_text(text: &str) -> String {
	xml_escape(text, &[('"', "&quot;"), ('\'', "&apos;")])
}

/// TOML basic string, escaping specials as `\uXXXX`.
pub fn toml(text: &str) -> String {
	let mut out = String::with_capacity(text.len() + 2);
	out.push('"');
	for c in text.chars() {
		let code = c as u32;
		if c == '\\' || c == '"' || (code < 0x20 && c != '\t') || code == 0x7f {
			out.push_str(&format!("\\u{code:04X}"));
		} else {
			out.push(c);
		}
	}
	out.push('"');
	out
}

/// Percent-encode everything except unreserved characters.
pub fn url(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for byte in text.bytes() {
		match byte {
			b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-' | b'~' => out.push(byte as char),
			_ => out.push_str(&format!("%{byte:02X}")),
		}
	}
	out
}

/// Double-quoted C-like literal, as used by screen, SuperCollider and HCL.
pub fn double_quoted(text: &str) -> String {
	format!(
		"\"{}\"",
		text.replace('\\', "\\\\")
			.replace('\n', "\\n")
			.replace('"', "\\\"")
	)
}

/// Groovy single-quoted literal.
pub fn groovy(text: &str) -> String {
	format!(
		"'{}'",
		text.replace('\\', "\\\\")
			.replace('\n', "\\n")
			.replace('\'', "\\'")
	)
}
