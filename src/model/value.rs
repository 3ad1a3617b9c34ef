use indexmap::IndexMap;
use serde::Serialize;

/// Plain data unravelled from a resolved node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
	Boolean(bool),
	Int(i64),
	Float(f64),
	Text(String),
	List(Vec<Value>),
	Map(IndexMap<String, Value>),
	/// Functions and streams, described but not representable as data.
	Opaque(String),
}

impl Value {
	pub fn text(s: impl Into<String>) -> Self {
		Value::Text(s.into())
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Text(s) | Value::Opaque(s) => Some(s),
			_ => None,
		}
	}

	pub fn is_container(&self) -> bool {
		matches!(self, Value::List(_) | Value::Map(_))
	}

	/// Scalar string form, as `cat` would produce it.
	pub fn scalar_text(&self) -> Option<String> {
		match self {
			Value::Boolean(b) => Some(b.to_string()),
			Value::Int(i) => Some(i.to_string()),
			Value::Float(f) => Some(format!("{f:?}")),
			Value::Text(s) | Value::Opaque(s) => Some(s.clone()),
			Value::List(_) | Value::Map(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_serializes_untagged() {
		let mut map = IndexMap::new();
		map.insert("b".to_string(), Value::List(vec![Value::Int(1), Value::text("x")]));
		map.insert("a".to_string(), Value::Boolean(true));
		let json = serde_json::to_string(&Value::Map(map)).unwrap();
		assert_eq!(json, r#"{"b":[1,"x"],"a":true}"#);
	}

	#[test]
	fn test_scalar_text() {
		assert_eq!(Value::Float(1.5).scalar_text().as_deref(), Some("1.5"));
		assert_eq!(Value::List(vec![]).scalar_text(), None);
	}
}
