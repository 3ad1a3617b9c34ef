use crate::model::node::{Concat, Node};

/// One parsed statement: its nodes in source order, layout included.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
	nodes: Vec<Node>,
}

impl Entry {
	pub fn new(nodes: Vec<Node>) -> Self {
		Self { nodes }
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// Number of non-ignorable words.
	pub fn size(&self) -> usize {
		self.nodes.iter().filter(|n| !n.is_ignorable()).count()
	}

	pub fn word(&self, i: usize) -> Option<&Node> {
		self.words().into_iter().nth(i)
	}

	pub fn words(&self) -> Vec<&Node> {
		self.nodes.iter().filter(|n| !n.is_ignorable()).collect()
	}

	fn position(&self, word: usize) -> Option<usize> {
		self.nodes
			.iter()
			.enumerate()
			.filter(|(_, n)| !n.is_ignorable())
			.nth(word)
			.map(|(i, _)| i)
	}

	/// Words `i..j` with the layout between them, trimmed at both ends.
	pub fn subentry(&self, i: usize, j: usize) -> Entry {
		if i >= j {
			return Entry::new(Vec::new());
		}
		match (self.position(i), self.position(j - 1)) {
			(Some(start), Some(end)) => Entry::new(self.nodes[start..=end].to_vec()),
			_ => Entry::new(Vec::new()),
		}
	}

	/// Everything before word `i`, leading layout included.
	pub fn truncated(&self, i: usize) -> Entry {
		match self.position(i) {
			Some(end) => Entry::new(self.nodes[..end].to_vec()),
			None => self.clone(),
		}
	}

	/// The entry as a single value: the sole node, or a concatenation.
	pub fn phrase(&self) -> Node {
		let start = self.nodes.iter().position(|n| !n.is_ignorable());
		let end = self.nodes.iter().rposition(|n| !n.is_ignorable());
		let parts = match (start, end) {
			(Some(start), Some(end)) => self.nodes[start..=end].to_vec(),
			_ => Vec::new(),
		};
		if parts.len() == 1 {
			parts.into_iter().next().unwrap_or_else(|| Node::text(""))
		} else {
			Node::Concat(Concat { parts, pass: None })
		}
	}

	/// Leading whitespace of the statement.
	pub fn indent(&self) -> &str {
		match self.nodes.first() {
			Some(Node::Blank(s)) => s,
			_ => "",
		}
	}

	pub fn unparse(&self) -> String {
		self.nodes.iter().map(Node::unparse).collect()
	}
}
