use std::collections::HashSet;

use tracing::trace;

use crate::error::{AridError, Result};
use crate::functions;
use crate::model::Node;
use crate::scope::{Eval, MAX_DEPTH, Scope, WILDCARD};

/// A binding that may supply the value for one path segment.
struct Candidate {
	node: Node,
	/// Bound directly in the scope being searched rather than in a base or template.
	own: bool,
}

/// Whether wildcard templates may supply a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Templates {
	Apply,
	Skip,
}

/// Resolve `path` relative to `scope`.
///
/// Each segment is looked up in the current scope: its own binding, then the
/// same name in its bases. With nothing found, enclosing scopes are searched
/// for the longest suffix of the path consumed so far, nearest scope first.
/// Wildcard templates of the current scope are merged in as defaults.
pub fn resolve_path(eval: &mut Eval, scope: &Scope, path: &[String]) -> Result<Node> {
	guarded(eval, scope, path, Templates::Apply)
}

/// Resolve a function name. Wildcard templates never supply one.
pub fn resolve_function(eval: &mut Eval, scope: &Scope, name: &str) -> Result<Node> {
	guarded(eval, scope, &[name.to_string()], Templates::Skip)
}

fn guarded(eval: &mut Eval, scope: &Scope, path: &[String], templates: Templates) -> Result<Node> {
	if path.is_empty() {
		return Ok(Node::Scope(scope.clone()));
	}
	let key = (scope.identity(), path.to_vec());
	if eval.active.contains(&key) {
		return Err(AridError::Cycle {
			path: path.to_vec(),
		});
	}
	if eval.active.len() >= MAX_DEPTH {
		return Err(AridError::RecursionLimit {
			path: path.to_vec(),
		});
	}
	trace!(path = %path.join(" "), depth = eval.depth(), "resolving");
	eval.active.push(key);
	let result = walk(eval, scope, path, templates);
	eval.active.pop();
	match result {
		Err(AridError::NoSuchPath {
			path: failed,
			causes,
		}) if failed != path => Err(AridError::NoSuchPath {
			path: path.to_vec(),
			causes: vec![AridError::NoSuchPath {
				path: failed,
				causes,
			}],
		}),
		Err(AridError::RecursionLimit { .. }) if eval.depth() == 0 => Err(AridError::RecursionLimit {
			path: path.to_vec(),
		}),
		other => other,
	}
}

fn walk(eval: &mut Eval, scope: &Scope, path: &[String], templates: Templates) -> Result<Node> {
	let mut current = scope.clone();
	for end in 1..path.len() {
		match step(eval, &current, &path[..end], templates)? {
			Node::Scope(next) => current = next,
			_ => return Err(AridError::no_such_path(path)),
		}
	}
	step(eval, &current, path, templates)
}

/// Resolve the last segment of `consumed` in `scope`.
///
/// Concrete bindings win: own and base bindings first, then ancestor-suffix
/// fallback. Templates fill in as default layers under a concrete scope, and
/// stand alone only when nothing concrete exists.
fn step(eval: &mut Eval, scope: &Scope, consumed: &[String], templates: Templates) -> Result<Node> {
	let Some(name) = consumed.last() else {
		return Ok(Node::Scope(scope.clone()));
	};
	let templated = defaults(scope, name, templates);
	let mut found = bound(scope, name);
	if !found.is_empty() {
		found.extend(templated);
		return merge(eval, scope, found, false);
	}
	let inherited = fallback(eval, scope, consumed, templates);
	if templated.is_empty() {
		return inherited;
	}
	match inherited {
		Ok(Node::Scope(concrete)) => {
			let mut found = vec![Candidate {
				node: Node::Scope(concrete),
				own: false,
			}];
			found.extend(templated);
			merge(eval, scope, found, true)
		}
		Err(AridError::NoSuchPath { .. }) => merge(eval, scope, templated, true),
		other => other,
	}
}

fn bound(scope: &Scope, name: &str) -> Vec<Candidate> {
	let mut found = Vec::new();
	collect(scope, name, true, &mut found, &mut HashSet::new());
	found
}

/// Wildcard templates of `scope` that apply to a child called `name`.
fn defaults(scope: &Scope, name: &str, templates: Templates) -> Vec<Candidate> {
	if templates == Templates::Skip || name == WILDCARD {
		return Vec::new();
	}
	bound(scope, WILDCARD)
}

fn candidates(scope: &Scope, name: &str, templates: Templates) -> Vec<Candidate> {
	let mut found = bound(scope, name);
	found.extend(defaults(scope, name, templates));
	found
}

fn collect(scope: &Scope, name: &str, own: bool, found: &mut Vec<Candidate>, seen: &mut HashSet<usize>) {
	if !seen.insert(scope.id()) {
		return;
	}
	if let Some(node) = scope.local(name) {
		found.push(Candidate { node, own });
	}
	for base in scope.bases() {
		collect(&base, name, false, found, seen);
	}
}

/// Resolve the first candidate against `scope`; scopes among the rest become default layers.
fn merge(eval: &mut Eval, scope: &Scope, found: Vec<Candidate>, wrap: bool) -> Result<Node> {
	let mut found = found.into_iter();
	let Some(Candidate { node, own }) = found.next() else {
		return Err(AridError::no_such_path(&[]));
	};
	let head = match node.resolve(eval, scope)? {
		Node::Scope(head) => head,
		value => return Ok(value),
	};
	let mut layers = vec![head];
	for candidate in found {
		match candidate.node.resolve(eval, scope) {
			Ok(Node::Scope(layer)) => layers.push(layer),
			Ok(_) | Err(AridError::NoSuchPath { .. }) => {}
			Err(e) => return Err(e),
		}
	}
	if layers.len() == 1 && own && !wrap {
		return Ok(Node::Scope(layers.remove(0)));
	}
	Ok(Node::Scope(Scope::overlay(scope, layers)))
}

/// Search enclosing scopes for a suffix of `consumed`, longest suffix first.
fn fallback(eval: &mut Eval, scope: &Scope, consumed: &[String], templates: Templates) -> Result<Node> {
	let enclosing = scope.enclosing();
	let mut causes = Vec::new();
	for len in (1..=consumed.len()).rev() {
		let suffix = &consumed[consumed.len() - len..];
		for outer in &enclosing {
			let Some(found) = lookup_within(eval, outer, suffix, templates)? else {
				continue;
			};
			trace!(suffix = %suffix.join(" "), "fallback match");
			match merge(eval, scope, found, true) {
				Err(e @ AridError::NoSuchPath { .. }) => causes.push(e),
				other => return other,
			}
		}
		if let [name] = suffix
			&& let Some(node) = functions::builtin(name)?
		{
			return node.resolve(eval, scope);
		}
	}
	Err(AridError::NoSuchPath {
		path: consumed.to_vec(),
		causes,
	})
}

/// Candidates for `suffix` reached through `outer`'s own bindings and bases.
///
/// The suffix's first word must be bound in `outer` itself: `outer`'s templates
/// only apply below it, while walking into the children the suffix names.
fn lookup_within(
	eval: &mut Eval,
	outer: &Scope,
	suffix: &[String],
	templates: Templates,
) -> Result<Option<Vec<Candidate>>> {
	let Some((last, init)) = suffix.split_last() else {
		return Ok(None);
	};
	let mut current = outer.clone();
	let mut allowed = Templates::Skip;
	for name in init {
		let found = candidates(&current, name, allowed);
		if found.is_empty() {
			return Ok(None);
		}
		match merge(eval, &current, found, false) {
			Ok(Node::Scope(next)) => current = next,
			Ok(_) | Err(AridError::NoSuchPath { .. }) => return Ok(None),
			Err(e) => return Err(e),
		}
		allowed = templates;
	}
	let found = candidates(&current, last, allowed);
	Ok(if found.is_empty() { None } else { Some(found) })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn path(words: &[&str]) -> Vec<String> {
		words.iter().map(|w| w.to_string()).collect()
	}

	#[test]
	fn test_empty_path_is_scope_itself() {
		let scope = Scope::new();
		let node = resolve_path(&mut Eval::new(), &scope, &[]).unwrap();
		assert!(node.as_scope().unwrap().ptr_eq(&scope));
	}

	#[test]
	fn test_direct_binding() {
		let scope = Scope::new();
		scope.set(&["a", "b"], Node::text("x")).unwrap();
		let node = resolve_path(&mut Eval::new(), &scope, &path(&["a", "b"])).unwrap();
		assert_eq!(node, Node::text("x"));
	}

	#[test]
	fn test_missing_path() {
		let scope = Scope::new();
		match resolve_path(&mut Eval::new(), &scope, &path(&["nope"])).unwrap_err() {
			AridError::NoSuchPath { path, .. } => assert_eq!(path, vec!["nope".to_string()]),
			_ => panic!("Expected NoSuchPath error"),
		}
	}

	#[test]
	fn test_builtins_are_found_last() {
		let scope = Scope::new();
		let node = resolve_path(&mut Eval::new(), &scope, &path(&["LF"])).unwrap();
		assert_eq!(node, Node::text("\n"));
		scope.set(&["LF"], Node::text("mine")).unwrap();
		let node = resolve_path(&mut Eval::new(), &scope, &path(&["LF"])).unwrap();
		assert_eq!(node, Node::text("mine"));
	}

	#[test]
	fn test_found_scope_in_ancestor_is_overlay() {
		let scope = Scope::new();
		scope.set(&["shared", "x"], Node::text("1")).unwrap();
		let child = scope.materialize(&["child"]);
		let node = resolve_path(&mut Eval::new(), &child, &path(&["shared"])).unwrap();
		let view = node.as_scope().unwrap();
		assert!(view.parent().unwrap().ptr_eq(&child));
	}

	#[test]
	fn test_active_pair_reentry_is_a_cycle() {
		let scope = Scope::new();
		let mut eval = Eval::new();
		eval.active.push((scope.identity(), path(&["x"])));
		assert!(matches!(
			resolve_path(&mut eval, &scope, &path(&["x"])).unwrap_err(),
			AridError::Cycle { .. }
		));
	}

	#[test]
	fn test_function_names_skip_templates() {
		let scope = Scope::new();
		scope.set(&["hmm", "*", "woo"], Node::text("yay")).unwrap();
		let hmm = scope.materialize(&["hmm"]);
		match resolve_function(&mut Eval::new(), &hmm, "lower").unwrap() {
			Node::Function(f) => assert_eq!(f.name(), "lower"),
			other => panic!("Expected function, got {other:?}"),
		}
		assert!(matches!(
			resolve_function(&mut Eval::new(), &hmm, "nosuch").unwrap_err(),
			AridError::NoSuchPath { .. }
		));
		let node = resolve_path(&mut Eval::new(), &hmm, &path(&["nosuch"])).unwrap();
		assert!(node.as_scope().is_some());
	}

	#[test]
	fn test_ancestor_templates_do_not_match_suffix() {
		let scope = Scope::new();
		scope.set(&["woo"], Node::text("outer")).unwrap();
		scope.set(&["yay", "*", "port"], Node::text("100")).unwrap();
		let child = scope.materialize(&["yay", "2"]);
		let node = resolve_path(&mut Eval::new(), &child, &path(&["woo"])).unwrap();
		assert_eq!(node, Node::text("outer"));
	}

	#[test]
	fn test_sibling_cycle_through_overlays() {
		let scope = Scope::new();
		scope.execute("p x = $(q x)\nq x = $(p x)\n").unwrap();
		match resolve_path(&mut Eval::new(), &scope, &path(&["p", "x"])).unwrap_err() {
			AridError::Cycle { path } => assert_eq!(path, vec!["q".to_string(), "x".to_string()]),
			other => panic!("Expected Cycle error, got {other:?}"),
		}
	}

	#[test]
	fn test_overlay_identity_is_its_head() {
		let scope = Scope::new();
		let head = scope.materialize(&["head"]);
		let view = Scope::overlay(&scope, vec![head.clone()]);
		assert_eq!(view.identity(), head.identity());
		assert_ne!(view.id(), head.id());
	}

	#[test]
	fn test_depth_limit_reports_outermost_path() {
		let worker = std::thread::Builder::new()
			.stack_size(64 * 1024 * 1024)
			.spawn(|| {
				let scope = Scope::new();
				let chain: String = (0..=MAX_DEPTH)
					.map(|i| format!("n{i} = $(n{})\n", i + 1))
					.collect();
				scope.execute(&chain).unwrap();
				let mut eval = Eval::new();
				let err = resolve_path(&mut eval, &scope, &path(&["n0"])).unwrap_err();
				(err, eval.depth())
			})
			.unwrap();
		let (err, depth) = worker.join().unwrap();
		match err {
			AridError::RecursionLimit { path } => assert_eq!(path, vec!["n0".to_string()]),
			other => panic!("Expected RecursionLimit error, got {other:?}"),
		}
		assert_eq!(depth, 0);
	}

	#[test]
	fn test_depth_guard() {
		let scope = Scope::new();
		let mut eval = Eval::new();
		for i in 0..MAX_DEPTH {
			eval.active.push((i, Vec::new()));
		}
		assert!(matches!(
			resolve_path(&mut eval, &scope, &path(&["x"])).unwrap_err(),
			AridError::RecursionLimit { .. }
		));
	}
}
