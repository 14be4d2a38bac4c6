//! Class declarations.
//!
//! ``` BNF
//! classDecl   → "class" IDENT visibility? ( "(" ctorParams? ")" )?
//!               ( "extends" IDENT ( "(" arguments? ")" )? )?
//!               ( "implements" IDENT ( "," IDENT )* )?
//!               ( "iterates" expression )?
//!               "{" ( ";" | member )* "}" ;
//! ctorParam   → ( visibility? "final"? ( "var" | "val" ) )? IDENT ( ":" type )? ( "=" expression )? ;
//! member      → visibility? "fun" IDENT "(" params? ")" ( ":" type )? body
//!             | "abstract" "{" ( ";" | visibility? "fun" IDENT "(" params? ")" ( ":" type )? )* "}"
//!             | visibility? "final"? ( "var" | "val" ) IDENT ( ":" type )? ( "=" expression )?
//!             | visibility? "const" IDENT ( ":" type )? "=" expression
//!             | "init" block ;
//! ```

use TokenType::*;

use crate::{environment::{BindingKind, Environment}, error::parser::{ParseErrorType, ParserError}, parser::Parser, scanner::TokenType, statement::{AbstractMethod, ClassConst, ClassDeclaration, ClassMember, ClassMethod, ClassProperty, Promotion, SuperClass, Visibility}, utils::RcCell};

impl Parser {
	/// `class` (and `abstract`) were consumed.
	pub(super) fn class_declaration(&mut self, is_abstract: bool) -> Result<ClassDeclaration, ParserError> {
		let name = self.consume(Identifier, "Expect class name.")?;
		let constructor_visibility = self.visibility();
		let parameters = if self.match_tokens(&[LeftParen]) { self.parameters(true)? } else { Vec::new() };
		let superclass = if self.match_tokens(&[Extends]) {
			let name = self.consume(Identifier, "Expect superclass name.")?;
			let arguments = if self.match_tokens(&[LeftParen]) { Some(self.arguments()?) } else { None };
			Some(SuperClass { name, arguments })
		} else {
			None
		};
		let mut interfaces = Vec::new();
		if self.match_tokens(&[Implements]) {
			loop {
				interfaces.push(self.consume(Identifier, "Expect interface name.")?);
				if !self.match_tokens(&[Comma]) {
					break;
				}
			}
		}
		let iterates = if self.match_tokens(&[Iterates]) { Some(*self.expression()?) } else { None };

		// Promoted parameters are properties before any member is seen. A class
		// inside a function body gets its frame from the resolver.
		let environment = if self.functions > 0 {
			None
		} else {
			self.environments.last().map(|enclosing| RcCell::new(Environment::class(enclosing.clone())))
		};
		if let Some(environment) = &environment {
			for parameter in parameters.iter().filter(|parameter| parameter.promotion.is_some()) {
				environment.borrow_mut().define(&parameter.name.lexeme, BindingKind::ClassProperty);
			}
			self.environments.push(environment.clone());
		}
		let members = self.class_body();
		if environment.is_some() {
			self.environments.pop();
		}

		Ok(ClassDeclaration {
			name,
			is_abstract,
			constructor_visibility,
			parameters,
			superclass,
			interfaces,
			iterates,
			members: members?,
			environment,
		})
	}

	fn class_body(&mut self) -> Result<Vec<ClassMember>, ParserError> {
		self.consume(LeftBrace, "Expect '{' before class body.")?;
		let mut members = Vec::new();
		self.skip_separators();
		while !self.check(&RightBrace) && !self.is_at_end() {
			self.class_member(&mut members)?;
			self.skip_separators();
		}
		self.consume(RightBrace, "Expect '}' after class body.")?;
		Ok(members)
	}

	fn class_member(&mut self, members: &mut Vec<ClassMember>) -> Result<(), ParserError> {
		if self.match_tokens(&[Abstract]) {
			self.consume(LeftBrace, "Expect '{' after 'abstract'.")?;
			self.skip_separators();
			while !self.check(&RightBrace) && !self.is_at_end() {
				members.push(ClassMember::AbstractMethod(self.abstract_method()?));
				self.skip_separators();
			}
			self.consume(RightBrace, "Expect '}' after abstract methods.")?;
			return Ok(());
		}
		if self.check(&Identifier) && self.peek().lexeme == "init" && self.peek_nth(1).r#type == LeftBrace {
			self.advance();
			self.advance();
			members.push(ClassMember::Initializer(self.function_scope(Self::block)?));
			return Ok(());
		}

		let visibility = self.visibility();
		let member = if self.match_tokens(&[Fun]) {
			ClassMember::Method(ClassMethod { visibility, function: self.function_declaration()? })
		} else if self.match_tokens(&[Const]) {
			let name = self.consume(Identifier, "Expect constant name.")?;
			let r#type = self.optional_type()?;
			self.consume(Equal, "Expect '=' after constant name.")?;
			let initializer = *self.expression()?;
			self.terminator("Expect ';' after constant.")?;
			ClassMember::Const(ClassConst { visibility, name, r#type, initializer })
		} else {
			let is_final = self.match_tokens(&[Final]);
			if !self.match_tokens(&[Var, Val]) {
				return Err(self.error(self.peek(), ParseErrorType::Expect("Expect member declaration.")));
			}
			let mutable = self.previous().r#type == Var;
			let name = self.consume(Identifier, "Expect property name.")?;
			let r#type = self.optional_type()?;
			let initializer = if self.match_tokens(&[Equal]) { Some(*self.expression()?) } else { None };
			self.terminator("Expect ';' after property.")?;
			ClassMember::Property(ClassProperty { visibility, is_final, mutable, name, r#type, initializer })
		};
		members.push(member);
		Ok(())
	}

	fn abstract_method(&mut self) -> Result<AbstractMethod, ParserError> {
		let visibility = self.visibility();
		self.consume(Fun, "Expect 'fun' before abstract method.")?;
		let name = self.consume(Identifier, "Expect method name.")?;
		self.consume(LeftParen, "Expect '(' after method name.")?;
		let parameters = self.parameters(false)?;
		let return_type = self.optional_type()?;
		self.terminator("Expect ';' after abstract method.")?;
		Ok(AbstractMethod { visibility, name, parameters, return_type })
	}

	fn visibility(&mut self) -> Option<Visibility> {
		if self.match_tokens(&[Public]) {
			Some(Visibility::Public)
		} else if self.match_tokens(&[Protected]) {
			Some(Visibility::Protected)
		} else if self.match_tokens(&[Private]) {
			Some(Visibility::Private)
		} else {
			None
		}
	}

	/// `visibility? final? (var | val)` in front of a constructor parameter.
	pub(super) fn promotion(&mut self) -> Result<Option<Promotion>, ParserError> {
		let visibility = self.visibility();
		let is_final = self.match_tokens(&[Final]);
		if self.match_tokens(&[Var, Val]) {
			return Ok(Some(Promotion { visibility, mutable: self.previous().r#type == Var, is_final }));
		}
		if visibility.is_some() || is_final {
			return Err(self.error(self.peek(), ParseErrorType::Expect("Expect 'var' or 'val' for promoted parameter.")));
		}
		Ok(None)
	}
}

#[cfg(test)]
mod tests {
	use indoc::indoc;

	use crate::{CompileError, ParserOptions, environment::BindingKind, error::parser::ParseErrorType, parser::Parser, scanner::Scanner, statement::{ClassDeclaration, ClassMember, FunctionBody, Program, Statement}};

	fn parse_program(input: &str) -> Result<Program, CompileError> {
		let tokens = Scanner::new(input).scan_tokens()?;
		Parser::new(tokens, ParserOptions::default()).parse()
	}

	fn parse_class(input: &str) -> (Program, ClassDeclaration) {
		let program = parse_program(input).unwrap();
		let Some(Statement::Class(class)) = program.statements.first() else { panic!("not a class") };
		let class = class.clone();
		(program, class)
	}

	fn parse_error(input: &str) -> ParseErrorType {
		match parse_program(input) {
			Err(CompileError::ParseError(error)) => error.r#type,
			other => panic!("expected a parse error, got {other:?}"),
		}
	}

	#[test]
	fn parse_empty_class() {
		let (_, class) = parse_class("class A {}");
		assert_eq!(class.to_string(), "(class A)");
		assert!(!class.has_constructor());
	}

	#[test]
	fn parse_class_header() {
		let (_, class) = parse_class(
			"abstract class A private (val a: Int, public final var b = 1,) extends B(a) implements C, D iterates items {}",
		);
		assert_eq!(
			class.to_string(),
			"(abstract class A private (val a: Int public final var b = 1) (extends B a) (implements C D) (iterates items))"
		);
		assert!(class.has_constructor());
	}

	#[test]
	fn parse_class_members() {
		let (_, class) = parse_class(indoc! {"
			class A {
				const X = 1
				private val y: Int = 2;;
				var z
				init { z = y }
				fun get(): Int => this.z
				abstract {
					fun run(a)
					protected fun stop(): Void;
				}
			}
		"});
		assert_eq!(
			class.to_string(),
			"(class A (const X = 1) (val y: Int = 2) (var z) (init (block (= z y);)) (fun get (): Int (=> (. this z))) \
			 (abstract run (a)) (abstract stop (): Void))"
		);
	}

	#[test]
	fn promoted_parameters_are_properties() {
		let (program, class) = parse_class("class A(val a, b) extends B {}");
		let environment = class.environment.unwrap();
		assert_eq!(environment.borrow().get("a"), Some(BindingKind::ClassProperty));
		assert_eq!(environment.borrow().get("b"), None);
		let enclosing = environment.borrow().enclosing().cloned().unwrap();
		assert!(enclosing.ptr_eq(&program.environment.unwrap()));
	}

	#[test]
	fn classes_in_function_bodies_have_no_parser_frame() {
		let program = parse_program("fun f() { class A(val a) {} }\nclass B { init { class C {} } fun m() => fun () { class D {} } }").unwrap();
		let Statement::Function(function) = &program.statements[0] else { panic!("not a function") };
		let FunctionBody::Block(body) = &function.body else { panic!("not a block body") };
		let Statement::Class(class) = &body[0] else { panic!("not a class") };
		assert!(class.environment.is_none());

		let Statement::Class(class) = &program.statements[1] else { panic!("not a class") };
		assert!(class.environment.is_some());
		let ClassMember::Initializer(statements) = &class.members[0] else { panic!("not an init block") };
		let Statement::Class(nested) = &statements[0] else { panic!("not a class") };
		assert!(nested.environment.is_none());
	}

	#[test]
	fn parse_class_errors() {
		assert_eq!(parse_error("class A { const X }"), ParseErrorType::Expect("Expect '=' after constant name."));
		assert_eq!(parse_error("class A(public b) {}"), ParseErrorType::Expect("Expect 'var' or 'val' for promoted parameter."));
		assert_eq!(parse_error("class A { b }"), ParseErrorType::Expect("Expect member declaration."));
		assert_eq!(parse_error("class A {"), ParseErrorType::Expect("Expect '}' after class body."));
	}
}
