//! Binds every identifier of a parsed program to the kind of declaration it
//! names.
//!
//! The resolver walks the tree with the frames the parser attached and the
//! `Local`/`Closure` frames it creates for function bodies. Function and
//! class declarations of a block are defined before its statements run, so
//! they can be used before the line that declares them. Variables are defined
//! when their declaration is reached.

mod builtins;

pub use builtins::Builtins;
use tracing::{debug, trace};

use crate::{CompileError, ResolverOptions, UnresolvedPolicy, environment::{BindingKind, Environment}, error::binding::{BindingError, BindingErrorType}, parser::expression::{FunctionExpression, Identifier}, scanner::Token, statement::{ClassDeclaration, ClassMember, FunctionDeclaration, Parameter, Program, Statement}, utils::RcCell, visitor::{Visitor, walk_block, walk_class_member, walk_function_body, walk_parameters}};

/// Bind every identifier in `program`.
///
/// On error the tree may be partly bound and should be thrown away.
pub fn bind(program: &Program, options: &ResolverOptions) -> Result<(), CompileError> {
	let environment = program.environment.clone().unwrap_or_else(|| RcCell::new(Environment::hoisted()));
	let mut resolver = Resolver { options, environment };
	resolver.visit_program(program)?;
	debug!("bound {} top level statements", program.statements.len());
	Ok(())
}

struct Resolver<'a> {
	options:     &'a ResolverOptions,
	/// The innermost frame.
	environment: RcCell<Environment>,
}

impl Resolver<'_> {
	fn define(&self, name: &str, kind: BindingKind) { self.environment.borrow_mut().define(name, kind) }

	/// Run `visit` with `environment` as the innermost frame.
	fn scoped<T>(
		&mut self,
		environment: RcCell<Environment>,
		visit: impl FnOnce(&mut Self) -> Result<T, BindingError>,
	) -> Result<T, BindingError> {
		let enclosing = std::mem::replace(&mut self.environment, environment);
		let result = visit(self);
		self.environment = enclosing;
		result
	}

	fn local(&self) -> RcCell<Environment> { RcCell::new(Environment::local(self.environment.clone())) }

	fn define_parameters(&self, parameters: &[Parameter]) {
		for parameter in parameters {
			self.define(&parameter.name.lexeme, BindingKind::Variable);
		}
	}

	/// Frames first, then the runtime, then the policy.
	fn resolve(&self, name: &str, line: usize) -> Result<BindingKind, BindingError> {
		if let Some(kind) = self.environment.lookup(name) {
			return Ok(kind);
		}
		if self.options.builtins.contains(name) {
			return Ok(BindingKind::RuntimeBuiltin);
		}
		match self.options.unresolved {
			UnresolvedPolicy::Error => {
				Err(BindingError::new(line, BindingErrorType::UndeclaredIdentifier(name.to_string())))
			}
			UnresolvedPolicy::Variable => Ok(BindingKind::Variable),
			UnresolvedPolicy::Function => Ok(BindingKind::Function),
		}
	}
}

impl Visitor for Resolver<'_> {
	type Error = BindingError;

	/// Named functions and classes are visible in the whole block.
	fn visit_block(&mut self, statements: &[Statement]) -> Result<(), BindingError> {
		for statement in statements {
			match statement {
				Statement::Function(function) => self.define(&function.name.lexeme, BindingKind::Function),
				Statement::Class(class) => self.define(&class.name.lexeme, BindingKind::Class),
				_ => {}
			}
		}
		walk_block(self, statements)
	}

	fn visit_identifier(&mut self, identifier: &Identifier) -> Result<(), BindingError> {
		let kind = self.resolve(&identifier.name, identifier.line)?;
		trace!(name = %identifier.name, line = identifier.line, %kind, "bind");
		identifier
			.bind(kind)
			.map_err(|_| BindingError::new(identifier.line, BindingErrorType::AlreadyBound(identifier.name.clone())))
	}

	fn visit_variable(&mut self, name: &Token) -> Result<(), BindingError> {
		self.define(&name.lexeme, BindingKind::Variable);
		Ok(())
	}

	fn visit_function_declaration(&mut self, function: &FunctionDeclaration) -> Result<(), BindingError> {
		walk_parameters(self, &function.parameters)?;
		let environment = self.local();
		self.scoped(environment, |resolver| {
			resolver.define_parameters(&function.parameters);
			walk_function_body(resolver, &function.body)
		})
	}

	fn visit_function_expression(&mut self, function: &FunctionExpression) -> Result<(), BindingError> {
		walk_parameters(self, &function.parameters)?;
		let environment = RcCell::new(Environment::closure(self.environment.clone()));
		self.scoped(environment.clone(), |resolver| {
			resolver.define_parameters(&function.parameters);
			walk_function_body(resolver, &function.body)
		})?;
		let captures = environment.borrow().captures().to_vec();
		trace!(?captures, line = function.line, "closure");
		function
			.set_captures(captures)
			.map_err(|_| BindingError::new(function.line, BindingErrorType::AlreadyBound("fun".to_string())))
	}

	fn visit_class_declaration(&mut self, class: &ClassDeclaration) -> Result<(), BindingError> {
		let environment = match &class.environment {
			Some(environment) => environment.clone(),
			None => {
				let environment = RcCell::new(Environment::class(self.environment.clone()));
				for parameter in class.parameters.iter().filter(|parameter| parameter.promotion.is_some()) {
					environment.borrow_mut().define(&parameter.name.lexeme, BindingKind::ClassProperty);
				}
				environment
			}
		};
		for member in &class.members {
			let (name, kind) = match member {
				ClassMember::Method(method) => (&method.function.name, BindingKind::ClassMethod),
				ClassMember::AbstractMethod(method) => (&method.name, BindingKind::ClassMethod),
				ClassMember::Property(property) => (&property.name, BindingKind::ClassProperty),
				ClassMember::Const(constant) => (&constant.name, BindingKind::ClassConst),
				ClassMember::Initializer(_) => continue,
			};
			environment.borrow_mut().define(&name.lexeme, kind);
		}

		self.scoped(environment, |resolver| {
			// The constructor: its parameters, the parent call and every init block.
			walk_parameters(resolver, &class.parameters)?;
			let constructor = resolver.local();
			resolver.scoped(constructor, |resolver| {
				resolver.define_parameters(&class.parameters);
				for argument in class.superclass.iter().filter_map(|superclass| superclass.arguments.as_ref()).flatten() {
					resolver.visit_expression(argument)?;
				}
				for member in &class.members {
					if let ClassMember::Initializer(statements) = member {
						resolver.visit_block(statements)?;
					}
				}
				Ok(())
			})?;

			if let Some(iterates) = &class.iterates {
				let environment = resolver.local();
				resolver.scoped(environment, |resolver| resolver.visit_expression(iterates))?;
			}
			for member in &class.members {
				if !matches!(member, ClassMember::Initializer(_)) {
					walk_class_member(resolver, member)?;
				}
			}
			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	use indoc::indoc;

	use super::*;
	use crate::{ParserOptions, parser::Parser, scanner::Scanner, visitor::walk_function};

	fn bind_with(source: &str, options: &ResolverOptions, parser: ParserOptions) -> Result<Program, CompileError> {
		let tokens = Scanner::new(source).scan_tokens()?;
		let program = Parser::new(tokens, parser).parse()?;
		bind(&program, options)?;
		Ok(program)
	}

	fn bind_source(source: &str) -> Result<Program, CompileError> {
		bind_with(source, &ResolverOptions::default(), ParserOptions::default())
	}

	fn undeclared(source: &str) -> String {
		match bind_source(source) {
			Err(CompileError::BindingError(BindingError { r#type: BindingErrorType::UndeclaredIdentifier(name), .. })) => {
				name
			}
			other => panic!("expected an undeclared identifier, got {other:?}"),
		}
	}

	/// Identifier names with their bindings, and closure captures, in walk order.
	#[derive(Default)]
	struct Bound {
		identifiers: Vec<(String, Option<BindingKind>)>,
		captures:    Vec<Vec<String>>,
	}

	impl Visitor for Bound {
		type Error = ();

		fn visit_identifier(&mut self, identifier: &Identifier) -> Result<(), ()> {
			self.identifiers.push((identifier.name.clone(), identifier.binding()));
			Ok(())
		}

		fn visit_function_expression(&mut self, function: &FunctionExpression) -> Result<(), ()> {
			self.captures.push(function.captures().to_vec());
			walk_function(self, &function.parameters, &function.body)
		}
	}

	fn bound(program: &Program) -> Bound {
		let mut bound = Bound::default();
		bound.visit_program(program).unwrap();
		bound
	}

	fn kinds(source: &str) -> Vec<(String, BindingKind)> {
		let program = bind_source(source).unwrap();
		bound(&program)
			.identifiers
			.into_iter()
			.map(|(name, kind)| (name, kind.expect("every identifier is bound")))
			.collect()
	}

	fn kind(name: &str, kind: BindingKind) -> (String, BindingKind) { (name.to_string(), kind) }

	#[test]
	fn functions_are_hoisted_in_any_order() {
		let source = "fun a() { b() } fun b() { a() } a()";
		assert_eq!(kinds(source), [
			kind("b", BindingKind::Function),
			kind("a", BindingKind::Function),
			kind("a", BindingKind::Function)
		]);
		let swapped = "fun b() { a() } fun a() { b() } a()";
		assert!(bind_source(swapped).is_ok());
		assert_eq!(kinds("new A()\nclass A {}"), [kind("A", BindingKind::Class)]);
	}

	#[test]
	fn function_locals_do_not_leak() {
		assert_eq!(undeclared("fun a() { var b; } b;"), "b");
		let error = bind_source("fun a() { var b; }\nb;").unwrap_err();
		assert_eq!(error.to_string(), "Binding error: line 2: Undeclared identifier: b");
	}

	#[test]
	fn functions_do_not_see_outer_variables() {
		assert_eq!(undeclared("var a; fun f() { a; }"), "a");
		assert!(bind_source("fun g() {} fun f() { g(); }").is_ok());
		assert_eq!(undeclared("a; var a"), "a");
	}

	#[test]
	fn blocks_do_not_isolate() {
		assert_eq!(kinds("fun a() { { var b; } b; }"), [kind("b", BindingKind::Variable)]);
		assert_eq!(kinds("fun a() { { fun c() {} } c() }"), [kind("c", BindingKind::Function)]);
		assert_eq!(kinds("var x = 1; { x }"), [kind("x", BindingKind::Variable)]);
	}

	#[test]
	fn class_members_are_registered_before_bodies() {
		assert_eq!(kinds("class A { fun b() => c; fun c() => 1; }"), [kind("c", BindingKind::ClassMethod)]);
	}

	#[test]
	fn class_scopes() {
		let source = indoc! {"
			class A(val p, q) extends B(q) {
				const C = 1
				var x = C
				init { x = p + q }
				fun m() => this.x + x + C + p + n()
				fun n() => 1
			}
		"};
		assert_eq!(kinds(source), [
			kind("q", BindingKind::Variable),
			kind("C", BindingKind::ClassConst),
			kind("x", BindingKind::ClassProperty),
			kind("p", BindingKind::Variable),
			kind("q", BindingKind::Variable),
			kind("x", BindingKind::ClassProperty),
			kind("C", BindingKind::ClassConst),
			kind("p", BindingKind::ClassProperty),
			kind("n", BindingKind::ClassMethod),
		]);
		assert_eq!(undeclared("class A(q) { fun m() => q }"), "q");
	}

	#[test]
	fn closures_capture_once() {
		let source = "fun f() { var a = 1; val g = fun (b) => a + a + b; }";
		let program = bind_source(source).unwrap();
		let bound = bound(&program);
		assert_eq!(bound.identifiers, [
			("a".to_string(), Some(BindingKind::ClosureVariable)),
			("a".to_string(), Some(BindingKind::ClosureVariable)),
			("b".to_string(), Some(BindingKind::Variable)),
		]);
		assert_eq!(bound.captures, [vec!["a".to_string()]]);
	}

	#[test]
	fn nested_closures_capture_transitively() {
		let source = indoc! {"
			fun f() {
				var a = 1
				val g = fun () {
					val h = fun () => a
				}
			}
		"};
		let program = bind_source(source).unwrap();
		assert_eq!(bound(&program).captures, [vec!["a".to_string()], vec!["a".to_string()]]);
	}

	#[test]
	fn top_level_closures_do_not_capture() {
		assert_eq!(undeclared("var a = 1; val g = fun () => a"), "a");
		assert_eq!(kinds("val g = fun (x = y) => x\nfun y() {}"), [
			kind("y", BindingKind::Function),
			kind("x", BindingKind::Variable)
		]);
	}

	#[test]
	fn loop_and_catch_variables() {
		assert_eq!(kinds("foreach (k, v in []) echo k, v"), [
			kind("k", BindingKind::Variable),
			kind("v", BindingKind::Variable)
		]);
		assert_eq!(kinds("try {} catch (e: Exception) { throw e }"), [kind("e", BindingKind::Variable)]);
		assert_eq!(kinds("val [a, , 'k' => b] = []\na + b"), [
			kind("a", BindingKind::Variable),
			kind("b", BindingKind::Variable)
		]);
	}

	#[test]
	fn builtins_and_policies() {
		assert_eq!(kinds("strlen('a')"), [kind("strlen", BindingKind::RuntimeBuiltin)]);
		let no_builtins = ResolverOptions { builtins: Builtins::none(), ..ResolverOptions::default() };
		assert!(bind_with("strlen('a')", &no_builtins, ParserOptions::default()).is_err());

		let as_function = ResolverOptions { unresolved: UnresolvedPolicy::Function, ..ResolverOptions::default() };
		let program = bind_with("dump(x)", &as_function, ParserOptions::default()).unwrap();
		assert_eq!(bound(&program).identifiers, [
			("dump".to_string(), Some(BindingKind::Function)),
			("x".to_string(), Some(BindingKind::Function)),
		]);

		let as_variable = ResolverOptions { unresolved: UnresolvedPolicy::Variable, ..ResolverOptions::default() };
		let program = bind_with("x", &as_variable, ParserOptions::default()).unwrap();
		assert_eq!(bound(&program).identifiers, [("x".to_string(), Some(BindingKind::Variable))]);
	}

	#[test]
	fn binds_without_parser_frames() {
		let parser = ParserOptions { environments: false, ..ParserOptions::default() };
		let program = bind_with("class A(val p) { fun m() => p }", &ResolverOptions::default(), parser).unwrap();
		assert_eq!(bound(&program).identifiers, [("p".to_string(), Some(BindingKind::ClassProperty))]);
	}

	#[test]
	fn classes_in_functions_see_the_function_scope() {
		assert_eq!(kinds("fun f() { class A { fun m() => new A() } }"), [kind("A", BindingKind::Class)]);
		assert_eq!(kinds("fun f() { fun g() {} class A { fun m() => g() } }"), [kind("g", BindingKind::Function)]);
		assert_eq!(undeclared("var a = 1\nfun f() { class A { var x = a } }"), "a");
		assert_eq!(kinds("class A { fun m() { class B { fun n() => new B() } } }"), [kind("B", BindingKind::Class)]);
	}

	#[test]
	fn parser_frames_do_not_change_bindings() {
		fn outcome(source: &str, environments: bool) -> Result<Vec<(String, Option<BindingKind>)>, String> {
			let parser = ParserOptions { environments, ..ParserOptions::default() };
			match bind_with(source, &ResolverOptions::default(), parser) {
				Ok(program) => Ok(bound(&program).identifiers),
				Err(error) => Err(error.to_string()),
			}
		}

		for source in [
			"fun f() { class A { fun m() => new A() } }",
			"fun f() { fun g() {} class A { fun m() => g() } }",
			"var a = 1\nfun f() { class A { var x = a } }",
			"var a = 1\nclass A(val p) { var x = a\nfun m() => p + x }",
			"class A { init { class B { fun n() => new B() } } }",
		] {
			assert_eq!(outcome(source, true), outcome(source, false), "{source}");
		}
	}

	#[test]
	fn binding_twice_fails() {
		let program = bind_source("fun f() {} f()").unwrap();
		match bind(&program, &ResolverOptions::default()) {
			Err(CompileError::BindingError(error)) => {
				assert_eq!(error.r#type, BindingErrorType::AlreadyBound("f".to_string()))
			}
			other => panic!("expected a binding error, got {other:?}"),
		}
	}
}
