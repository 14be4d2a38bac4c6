//! Scope frames used to bind identifiers to the kind of declaration they name.
//!
//! Frames are chained through `enclosing` and looked up innermost first. The
//! four kinds differ in what an outer frame may contribute:
//!
//! |Kind|Created for|Sees plain variables of
//! --|--|--
//! Hoisted|program|itself, its immediate enclosing frame
//! Class|class body|itself, its immediate enclosing frame
//! Local|function and method bodies|itself only
//! Closure|function expressions|itself, and captures from the enclosing Local/Closure frame
//!
//! Function, class and member names stay visible through every frame.

use std::collections::HashMap;

use tracing::trace;

use crate::utils::RcCell;

/// What kind of declaration a name refers to, this decides how it is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
	Variable,
	/// A variable read by a closure from the frame it was created in.
	ClosureVariable,
	Function,
	Class,
	ClassProperty,
	ClassMethod,
	ClassConst,
	/// A function or class provided by the target runtime.
	RuntimeBuiltin,
}

impl BindingKind {
	pub fn is_variable(self) -> bool { matches!(self, BindingKind::Variable | BindingKind::ClosureVariable) }
}

impl std::fmt::Display for BindingKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			BindingKind::Variable => "variable",
			BindingKind::ClosureVariable => "closure-variable",
			BindingKind::Function => "function",
			BindingKind::Class => "class",
			BindingKind::ClassProperty => "property",
			BindingKind::ClassMethod => "method",
			BindingKind::ClassConst => "const",
			BindingKind::RuntimeBuiltin => "builtin",
		};
		write!(f, "{name}")
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentKind {
	Hoisted,
	Class,
	Local,
	Closure,
}

impl EnvironmentKind {
	/// Local and Closure frames isolate plain variables from outer frames.
	pub fn isolates(self) -> bool { matches!(self, EnvironmentKind::Local | EnvironmentKind::Closure) }
}

/// A single scope frame
#[derive(Debug)]
pub struct Environment {
	kind:      EnvironmentKind,
	bindings:  HashMap<String, BindingKind>,
	enclosing: Option<RcCell<Environment>>,
	/// Names this closure frame read from its enclosing frame, in first-use order.
	captures:  Vec<String>,
}

impl Environment {
	fn new(kind: EnvironmentKind, enclosing: Option<RcCell<Environment>>) -> Self {
		Self { kind, bindings: HashMap::new(), enclosing, captures: Vec::new() }
	}

	pub fn hoisted() -> Self { Self::new(EnvironmentKind::Hoisted, None) }

	pub fn class(enclosing: RcCell<Environment>) -> Self { Self::new(EnvironmentKind::Class, Some(enclosing)) }

	pub fn local(enclosing: RcCell<Environment>) -> Self { Self::new(EnvironmentKind::Local, Some(enclosing)) }

	pub fn closure(enclosing: RcCell<Environment>) -> Self { Self::new(EnvironmentKind::Closure, Some(enclosing)) }

	#[cfg(test)]
	pub fn enclosing(&self) -> Option<&RcCell<Environment>> { self.enclosing.as_ref() }

	/// Bind a name in this frame. Defining an existing name overwrites its kind.
	pub fn define(&mut self, name: &str, kind: BindingKind) {
		trace!(?kind, name, frame = ?self.kind, "define");
		self.bindings.insert(name.to_string(), kind);
	}

	/// Look a name up in this frame only.
	pub fn get(&self, name: &str) -> Option<BindingKind> { self.bindings.get(name).copied() }

	pub fn captures(&self) -> &[String] { &self.captures }

	fn capture(&mut self, name: &str) {
		if !self.captures.iter().any(|captured| captured == name) {
			self.captures.push(name.to_string());
		}
	}
}

impl RcCell<Environment> {
	/// Resolve a name starting from this frame.
	///
	/// A closure frame that finds the name as a variable of its enclosing
	/// Local/Closure frame records the capture and reports a
	/// `ClosureVariable`. Past the first hop (or any hop out of an isolating
	/// frame) only non-variable bindings are accepted.
	pub fn lookup(&self, name: &str) -> Option<BindingKind> {
		let (kind, enclosing) = {
			let env = self.borrow();
			if let Some(binding) = env.get(name) {
				return Some(binding);
			}
			(env.kind, env.enclosing.clone()?)
		};

		if kind == EnvironmentKind::Closure && enclosing.borrow().kind.isolates() {
			if let Some(binding) = enclosing.lookup(name).filter(|binding| binding.is_variable()) {
				trace!(name, ?binding, "captured by closure");
				self.borrow_mut().capture(name);
				return Some(BindingKind::ClosureVariable);
			}
		}

		let mut isolated = kind.isolates();
		let mut frame = Some(enclosing);
		while let Some(env) = frame {
			let next = {
				let env = env.borrow();
				if let Some(binding) = env.get(name) {
					if !binding.is_variable() || !isolated {
						return Some(binding);
					}
				}
				env.enclosing.clone()
			};
			isolated = true;
			frame = next;
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn program() -> RcCell<Environment> { RcCell::new(Environment::hoisted()) }

	#[test]
	fn redefining_overwrites() {
		let env = program();
		env.borrow_mut().define("a", BindingKind::Variable);
		env.borrow_mut().define("a", BindingKind::Function);
		assert_eq!(env.lookup("a"), Some(BindingKind::Function));
	}

	#[test]
	fn local_hides_outer_variables_but_not_functions() {
		let global = program();
		global.borrow_mut().define("a", BindingKind::Variable);
		global.borrow_mut().define("f", BindingKind::Function);
		let local = RcCell::new(Environment::local(global));
		assert_eq!(local.lookup("a"), None);
		assert_eq!(local.lookup("f"), Some(BindingKind::Function));
	}

	#[test]
	fn class_frame_sees_immediate_enclosing_variables_only() {
		let global = program();
		global.borrow_mut().define("a", BindingKind::Variable);
		let class = RcCell::new(Environment::class(global.clone()));
		assert_eq!(class.lookup("a"), Some(BindingKind::Variable));
		let inner = RcCell::new(Environment::class(class));
		assert_eq!(inner.lookup("a"), None);
	}

	#[test]
	fn closure_captures_once() {
		let global = program();
		let function = RcCell::new(Environment::local(global));
		function.borrow_mut().define("x", BindingKind::Variable);
		let closure = RcCell::new(Environment::closure(function));
		assert_eq!(closure.lookup("x"), Some(BindingKind::ClosureVariable));
		assert_eq!(closure.lookup("x"), Some(BindingKind::ClosureVariable));
		assert_eq!(closure.borrow().captures(), ["x".to_string()]);
	}

	#[test]
	fn nested_closures_capture_transitively() {
		let function = RcCell::new(Environment::local(program()));
		function.borrow_mut().define("x", BindingKind::Variable);
		let outer = RcCell::new(Environment::closure(function));
		let inner = RcCell::new(Environment::closure(outer.clone()));
		assert_eq!(inner.lookup("x"), Some(BindingKind::ClosureVariable));
		assert_eq!(inner.borrow().captures(), ["x".to_string()]);
		assert_eq!(outer.borrow().captures(), ["x".to_string()]);
	}

	#[test]
	fn top_level_closure_does_not_capture_program_variables() {
		let global = program();
		global.borrow_mut().define("x", BindingKind::Variable);
		let closure = RcCell::new(Environment::closure(global));
		assert_eq!(closure.lookup("x"), None);
		assert!(closure.borrow().captures().is_empty());
	}
}
