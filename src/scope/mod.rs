//! The namespace tree and its lazy path resolution.
//!
//! Structural children point at their parent weakly; transient scopes
//! (overlays, forks, lists and children made by `create_child`) hold their
//! parent strongly until they are bound into the tree.

pub mod eval;
pub mod resolve;

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::warn;

use crate::error::{AridError, Result};
use crate::model::{Node, Value};

pub use eval::{Eval, MAX_DEPTH};
pub use resolve::{resolve_function, resolve_path};

/// Binding name marking a wildcard template.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Name(String),
	/// Opaque key of an appended list item.
	Anon(usize),
}

impl Key {
	pub fn name(&self) -> Option<&str> {
		match self {
			Key::Name(n) => Some(n),
			Key::Anon(_) => None,
		}
	}

	fn is_wildcard(&self) -> bool {
		self.name() == Some(WILDCARD)
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Key::Name(n) => f.write_str(n),
			Key::Anon(i) => write!(f, "#{i}"),
		}
	}
}

enum Parent {
	Root,
	Weak(Weak<RefCell<ScopeData>>),
	Strong(Scope),
}

struct ScopeData {
	parent: Parent,
	bindings: IndexMap<Key, Node>,
	bases: Vec<Scope>,
	is_list: bool,
	next_anon: usize,
	label: Option<String>,
}

/// A node of the namespace tree. Cloning shares the same scope.
#[derive(Clone)]
pub struct Scope(Rc<RefCell<ScopeData>>);

impl Default for Scope {
	fn default() -> Self {
		Self::new()
	}
}

impl Scope {
	/// A root scope; the builtin table is consulted after it.
	pub fn new() -> Self {
		Self::with_parent(Parent::Root, false, Vec::new())
	}

	fn with_parent(parent: Parent, is_list: bool, bases: Vec<Scope>) -> Self {
		Scope(Rc::new(RefCell::new(ScopeData {
			parent,
			bindings: IndexMap::new(),
			bases,
			is_list,
			next_anon: 0,
			label: None,
		})))
	}

	/// A mutable child: local bindings shadow, inherited ones stay shared.
	pub fn create_child(&self) -> Scope {
		Self::with_parent(Parent::Strong(self.clone()), false, Vec::new())
	}

	/// An empty list whose items resolve relative to this scope.
	pub fn create_list(&self) -> Scope {
		Self::with_parent(Parent::Strong(self.clone()), true, Vec::new())
	}

	/// A view parented to `parent` that merges `layers`, earlier layers winning.
	pub(crate) fn overlay(parent: &Scope, layers: Vec<Scope>) -> Scope {
		let is_list = layers.first().is_some_and(Scope::is_list);
		Self::with_parent(Parent::Strong(parent.clone()), is_list, layers)
	}

	fn structural_child(&self, is_list: bool) -> Scope {
		Self::with_parent(Parent::Weak(Rc::downgrade(&self.0)), is_list, Vec::new())
	}

	pub fn ptr_eq(&self, other: &Scope) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub(crate) fn id(&self) -> usize {
		Rc::as_ptr(&self.0) as usize
	}

	/// The scope a view stands for: an overlay's head layer, else this scope.
	/// Overlays are rebuilt on every lookup, so cycle detection keys on this.
	pub(crate) fn identity(&self) -> usize {
		match self.0.borrow().bases.first() {
			Some(head) => head.identity(),
			None => self.id(),
		}
	}

	pub fn is_list(&self) -> bool {
		self.0.borrow().is_list
	}

	pub fn set_label(&self, label: impl Into<String>) {
		self.0.borrow_mut().label = Some(label.into());
	}

	/// Nearest label on this scope or its enclosing scopes.
	pub fn label(&self) -> Option<String> {
		if let Some(label) = self.0.borrow().label.clone() {
			return Some(label);
		}
		self.enclosing().iter().find_map(|s| s.0.borrow().label.clone())
	}

	pub fn parent(&self) -> Option<Scope> {
		match &self.0.borrow().parent {
			Parent::Root => None,
			Parent::Weak(w) => w.upgrade().map(Scope),
			Parent::Strong(s) => Some(s.clone()),
		}
	}

	/// Enclosing scopes from nearest to farthest.
	pub fn enclosing(&self) -> Vec<Scope> {
		let mut chain = Vec::new();
		let mut current = self.parent();
		while let Some(scope) = current {
			current = scope.parent();
			chain.push(scope);
		}
		chain
	}

	pub(crate) fn bases(&self) -> Vec<Scope> {
		self.0.borrow().bases.clone()
	}

	/// This scope's own binding for `name`, ignoring bases and ancestors.
	pub fn local(&self, name: &str) -> Option<Node> {
		self.0
			.borrow()
			.bindings
			.get(&Key::Name(name.to_string()))
			.cloned()
	}

	/// Own bindings followed by those inherited from bases, wildcard excluded.
	pub fn items(&self) -> Vec<(Key, Node)> {
		let mut items: Vec<(Key, Node)> = Vec::new();
		let mut names = HashSet::new();
		let mut seen = HashSet::new();
		self.collect_items(&mut items, &mut names, &mut seen);
		items
	}

	fn collect_items(
		&self,
		items: &mut Vec<(Key, Node)>,
		names: &mut HashSet<String>,
		seen: &mut HashSet<usize>,
	) {
		if !seen.insert(self.id()) {
			return;
		}
		for (key, node) in &self.0.borrow().bindings {
			if key.is_wildcard() {
				continue;
			}
			if let Key::Name(name) = key
				&& !names.insert(name.clone())
			{
				continue;
			}
			items.push((key.clone(), node.clone()));
		}
		for base in self.bases() {
			base.collect_items(items, names, seen);
		}
	}

	/// Items with their values resolved in this scope.
	pub fn resolved_items(&self, eval: &mut Eval) -> Result<Vec<(Key, Node)>> {
		let mut out = Vec::new();
		for (key, node) in self.items() {
			let value = match &key {
				Key::Name(name) => resolve_path(eval, self, std::slice::from_ref(name))?,
				Key::Anon(_) => node.resolve(eval, self)?,
			};
			out.push((key, value));
		}
		Ok(out)
	}

	/// Bind a node under `key`, detaching any strong links back into this tree.
	pub(crate) fn bind(&self, key: Key, node: Node) {
		if let Node::Scope(scope) = &node {
			scope.settle_into(self);
		}
		self.0.borrow_mut().bindings.insert(key, node);
	}

	/// Downgrade strong parent links that point at `target` or its ancestors.
	fn settle_into(&self, target: &Scope) {
		let mut ancestry: HashSet<usize> = target.enclosing().iter().map(Scope::id).collect();
		ancestry.insert(target.id());
		let mut stack = vec![self.clone()];
		let mut seen = HashSet::new();
		while let Some(scope) = stack.pop() {
			if !seen.insert(scope.id()) || ancestry.contains(&scope.id()) {
				continue;
			}
			let mut data = scope.0.borrow_mut();
			if let Parent::Strong(parent) = &data.parent {
				let parent = parent.clone();
				if ancestry.contains(&parent.id()) {
					data.parent = Parent::Weak(Rc::downgrade(&parent.0));
				} else {
					stack.push(parent);
				}
			}
			stack.extend(data.bases.iter().cloned());
		}
	}

	/// Append under a fresh opaque key.
	pub fn push(&self, node: Node) -> Key {
		let key = {
			let mut data = self.0.borrow_mut();
			let key = Key::Anon(data.next_anon);
			data.next_anon += 1;
			key
		};
		self.bind(key.clone(), node);
		key
	}

	/// Walk `path` through own bindings, creating child scopes where missing.
	pub fn materialize<S: AsRef<str>>(&self, path: &[S]) -> Scope {
		let mut current = self.clone();
		for name in path {
			let name = name.as_ref();
			current = match current.local(name) {
				Some(Node::Scope(scope)) => scope,
				existing => {
					if let Some(node) = existing {
						warn!(name, kind = node.kind(), "replacing value with a scope");
					}
					let child = current.structural_child(false);
					current.bind(Key::Name(name.to_string()), Node::Scope(child.clone()));
					child
				}
			};
		}
		current
	}

	/// The local scope at `path`, or a fresh list bound there.
	pub fn materialize_list<S: AsRef<str>>(&self, path: &[S]) -> Scope {
		let Some((last, init)) = path.split_last() else {
			return self.clone();
		};
		let container = self.materialize(init);
		match container.local(last.as_ref()) {
			Some(Node::Scope(scope)) => scope,
			_ => {
				let list = container.structural_child(true);
				container.bind(Key::Name(last.as_ref().to_string()), Node::Scope(list.clone()));
				list
			}
		}
	}

	/// Bind `node` at `path`, creating intermediate scopes.
	pub fn set<S: AsRef<str>>(&self, path: &[S], node: Node) -> Result<()> {
		let Some((last, init)) = path.split_last() else {
			return Err(AridError::NotAPath);
		};
		if node.is_ignorable() {
			return Err(AridError::NotAResolvable);
		}
		self.materialize(init)
			.bind(Key::Name(last.as_ref().to_string()), node);
		Ok(())
	}

	/// Append `node` to the list at `path`, creating a local list if needed.
	pub fn append<S: AsRef<str>>(&self, path: &[S], node: Node) -> Result<()> {
		if path.is_empty() {
			return Err(AridError::NotAPath);
		}
		if node.is_ignorable() {
			return Err(AridError::NotAResolvable);
		}
		self.materialize_list(path).push(node);
		Ok(())
	}

	pub fn resolved<S: AsRef<str>>(&self, path: &[S]) -> Result<Node> {
		self.resolved_with(&mut Eval::new(), path)
	}

	pub fn resolved_with<S: AsRef<str>>(&self, eval: &mut Eval, path: &[S]) -> Result<Node> {
		let path: Vec<String> = path.iter().map(|s| s.as_ref().to_string()).collect();
		resolve_path(eval, self, &path)
	}

	/// Resolve `path` and unravel the result to plain data.
	pub fn unravelled<S: AsRef<str>>(&self, path: &[S]) -> Result<Value> {
		let mut eval = Eval::new();
		self.resolved_with(&mut eval, path)?.unravel(&mut eval)
	}

	pub fn unravel(&self, eval: &mut Eval) -> Result<Value> {
		let items = self.resolved_items(eval)?;
		if self.is_list() {
			items
				.into_iter()
				.map(|(_, node)| node.unravel(eval))
				.collect::<Result<Vec<_>>>()
				.map(Value::List)
		} else {
			let mut map = IndexMap::new();
			for (key, node) in items {
				map.insert(key.to_string(), node.unravel(eval)?);
			}
			Ok(Value::Map(map))
		}
	}

	/// Run statement text against this scope.
	pub fn execute(&self, text: &str) -> Result<()> {
		let mut repl = crate::repl::Repl::new(self);
		repl.execute_text(text)?;
		repl.close()
	}
}

impl fmt::Debug for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let data = self.0.borrow();
		let keys: Vec<String> = data.bindings.keys().map(Key::to_string).collect();
		f.debug_struct("Scope")
			.field("is_list", &data.is_list)
			.field("keys", &keys)
			.field("bases", &data.bases.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_set_creates_intermediate_scopes() {
		let scope = Scope::new();
		scope.set(&["a", "b", "c"], Node::text("x")).unwrap();
		let a = scope.local("a").unwrap();
		let b = a.as_scope().unwrap().local("b").unwrap();
		assert_eq!(b.as_scope().unwrap().local("c"), Some(Node::text("x")));
	}

	#[test]
	fn test_set_rejects_empty_path() {
		let scope = Scope::new();
		let empty: [&str; 0] = [];
		assert!(matches!(
			scope.set(&empty, Node::text("x")).unwrap_err(),
			AridError::NotAPath
		));
	}

	#[test]
	fn test_set_rejects_ignorable() {
		let scope = Scope::new();
		assert!(matches!(
			scope.set(&["a"], Node::Blank(" ".to_string())).unwrap_err(),
			AridError::NotAResolvable
		));
	}

	#[test]
	fn test_append_uses_fresh_keys() {
		let scope = Scope::new();
		scope.append(&["v"], Node::text("a")).unwrap();
		scope.append(&["v"], Node::text("a")).unwrap();
		let v = scope.local("v").unwrap();
		let list = v.as_scope().unwrap();
		assert!(list.is_list());
		assert_eq!(list.items().len(), 2);
		assert_eq!(
			scope.unravelled(&["v"]).unwrap(),
			Value::List(vec![Value::text("a"), Value::text("a")])
		);
	}

	#[test]
	fn test_wildcard_hidden_from_items() {
		let scope = Scope::new();
		scope.set(&["*", "x"], Node::text("t")).unwrap();
		scope.set(&["y"], Node::text("v")).unwrap();
		let keys: Vec<Key> = scope.items().into_iter().map(|(k, _)| k).collect();
		assert_eq!(keys, vec![Key::Name("y".to_string())]);
	}

	#[test]
	fn test_structural_child_parent_is_weak_but_reachable() {
		let scope = Scope::new();
		let child = scope.materialize(&["a"]);
		assert!(child.parent().unwrap().ptr_eq(&scope));
		assert_eq!(child.enclosing().len(), 1);
	}

	#[test]
	fn test_create_child_does_not_mutate_parent() {
		let parent = Scope::new();
		parent.set(&["x"], Node::text("1")).unwrap();
		let child = parent.create_child();
		child.set(&["x"], Node::text("2")).unwrap();
		assert_eq!(parent.resolved(&["x"]).unwrap(), Node::text("1"));
		assert_eq!(child.resolved(&["x"]).unwrap(), Node::text("2"));
	}

	#[test]
	fn test_bound_fork_does_not_own_its_parent() {
		let scope = Scope::new();
		let fork = scope.create_child();
		scope.set(&["f"], Node::Scope(fork.clone())).unwrap();
		assert_eq!(Rc::strong_count(&scope.0), 1);
		assert!(fork.parent().unwrap().ptr_eq(&scope));
	}

	#[test]
	fn test_label_is_inherited() {
		let scope = Scope::new();
		scope.set_label("outer");
		let child = scope.create_child();
		assert_eq!(child.label().as_deref(), Some("outer"));
	}
}
