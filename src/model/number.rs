use std::fmt;

/// Numeric payload of a [`Number`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
	Int(i64),
	Float(f64),
}

/// A number as written in source, remembering its lexeme for faithful unparse.
#[derive(Debug, Clone)]
pub struct Number {
	lexeme: String,
	value: NumberValue,
}

impl Number {
	/// Parse a lexeme already classified as numeric by the grammar.
	pub fn parse(lexeme: &str) -> Option<Self> {
		let value = if lexeme.contains('.') {
			NumberValue::Float(lexeme.parse().ok()?)
		} else {
			match lexeme.parse::<i64>() {
				Ok(i) => NumberValue::Int(i),
				Err(_) => NumberValue::Float(lexeme.parse().ok()?),
			}
		};
		Some(Self {
			lexeme: lexeme.to_string(),
			value,
		})
	}

	pub fn from_int(i: i64) -> Self {
		Self {
			lexeme: i.to_string(),
			value: NumberValue::Int(i),
		}
	}

	pub fn from_float(f: f64) -> Self {
		Self {
			lexeme: format!("{f:?}"),
			value: NumberValue::Float(f),
		}
	}

	pub fn lexeme(&self) -> &str {
		&self.lexeme
	}

	pub fn value(&self) -> NumberValue {
		self.value
	}

	pub fn as_f64(&self) -> f64 {
		match self.value {
			NumberValue::Int(i) => i as f64,
			NumberValue::Float(f) => f,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self.value {
			NumberValue::Int(i) => Some(i),
			NumberValue::Float(_) => None,
		}
	}
}

impl PartialEq for Number {
	fn eq(&self, other: &Self) -> bool {
		match (self.value, other.value) {
			(NumberValue::Int(a), NumberValue::Int(b)) => a == b,
			_ => self.as_f64() == other.as_f64(),
		}
	}
}

impl fmt::Display for Number {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.lexeme)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_integer_keeps_lexeme() {
		let n = Number::parse("007").unwrap();
		assert_eq!(n.value(), NumberValue::Int(7));
		assert_eq!(n.lexeme(), "007");
	}

	#[test]
	fn test_parse_decimal() {
		let n = Number::parse(".5").unwrap();
		assert_eq!(n.value(), NumberValue::Float(0.5));
		assert_eq!(n.to_string(), ".5");
	}

	#[test]
	fn test_parse_huge_integer_falls_back_to_float() {
		let n = Number::parse("123456789012345678901234567890").unwrap();
		assert!(matches!(n.value(), NumberValue::Float(_)));
	}

	#[test]
	fn test_equality_is_by_value() {
		assert_eq!(Number::parse("5").unwrap(), Number::from_int(5));
		assert_eq!(Number::parse("5.0").unwrap(), Number::from_int(5));
		assert_ne!(Number::from_int(5), Number::from_int(6));
	}

	#[test]
	fn test_computed_float_lexeme() {
		assert_eq!(Number::from_float(2.5).lexeme(), "2.5");
		assert_eq!(Number::from_float(2.0).lexeme(), "2.0");
	}
}
