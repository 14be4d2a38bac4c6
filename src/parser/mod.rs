//! The `Scanner` use `Lexical grammar`, implement `alphabet` as `Characters`,
//! `string` as `Lexme` or `Token`
//! The `Parser` use `Syntactic grammar`, implement `alphabet` as `Tokens`,
//! `string` as `Expression`
//!
//! Statement grammar, see `precedence.rs` for expressions and `class.rs` for
//! class bodies:
//!
//! ``` BNF
//! program      → ";"* ( declaration ";"* )* EOF ;
//! declaration  → tryStmt | throwStmt | classDecl | "abstract" classDecl
//!              | funDecl | varDecl | statement ;
//! funDecl      → "fun" IDENT "(" params? ")" ( ":" type )? body ;
//! body         → block | "=>" expression terminator ;
//! varDecl      → ( "var" | "val" ) ( IDENT ( ":" type )? ( "=" expression )?
//!                                  | "[" destructure "]" "=" expression ) terminator ;
//! statement    → foreachStmt | forStmt | ifStmt | whileStmt | echoStmt
//!              | returnStmt | "break" | "continue" | block | exprStmt ;
//! ```
//!
//! Semicolons are optional. A statement also ends at the end of input, before
//! a `}` or `else`, before a keyword that starts a declaration and before a
//! token on a later line.

mod class;
pub mod expression;
mod precedence;
pub mod types;

use TokenType::*;
use tracing::{debug, warn};

use crate::{CompileError, ParserOptions, environment::Environment, error::parser::{ParseError, ParseErrorType, ParserError}, parser::{expression::Expression, types::TypeAnnotation}, scanner::{Token, TokenType}, statement::{CatchClause, Destructuring, DestructuringElement, Foreach, ForeachVariable, FunctionBody, FunctionDeclaration, Parameter, Program, Statement, VarDeclaration}, utils::RcCell};

/// A recursive descent parser over the scanned tokens.
pub struct Parser {
	tokens:       Vec<Token>,
	/// Index of the next token to consume.
	current:      usize,
	options:      ParserOptions,
	/// Open scope frames, the program frame first.
	environments: Vec<RcCell<Environment>>,
	/// Errors recovered from so far.
	errors:       Vec<ParseError>,
	depth:        usize,
	/// Function bodies open around the current token.
	functions:    usize,
}

impl Parser {
	pub fn new(mut tokens: Vec<Token>, options: ParserOptions) -> Self {
		if tokens.last().is_none_or(|token| token.r#type != Eof) {
			let line = tokens.last().map_or(1, |token| token.line);
			tokens.push(Token::new(Eof, "", line));
		}
		let environments =
			if options.environments { vec![RcCell::new(Environment::hoisted())] } else { Vec::new() };

		Self { tokens, current: 0, options, environments, errors: Vec::new(), depth: 0, functions: 0 }
	}

	/// Parse the whole token stream.
	///
	/// Strict parsing stops at the first error. With recovery enabled the
	/// parser skips to the next statement and reports every error at the end.
	pub fn parse(mut self) -> Result<Program, CompileError> {
		let statements = match self.declarations_until(&Eof) {
			Ok(statements) => statements,
			Err(ParserError::InternalError(e)) => return Err(e.into()),
			Err(ParserError::ParseError(e)) => return Err(e.into()),
		};
		if !self.errors.is_empty() {
			return Err(CompileError::ParserErrors(self.errors));
		}
		debug!("parsed {} top level statements", statements.len());

		Ok(Program { statements, environment: self.environments.first().cloned() })
	}

	/// Parse declarations up to `end` without consuming it.
	fn declarations_until(&mut self, end: &TokenType) -> Result<Vec<Statement>, ParserError> {
		let mut statements = Vec::new();
		self.skip_separators();
		while !self.check(end) && !self.is_at_end() {
			match self.declaration() {
				Ok(statement) => statements.push(statement),
				Err(ParserError::ParseError(error)) if self.options.recovery => {
					warn!("recovering from {error}");
					self.errors.push(error);
					self.synchronize(end);
				}
				Err(error) => return Err(error),
			}
			self.skip_separators();
		}
		Ok(statements)
	}

	fn declaration(&mut self) -> Result<Statement, ParserError> {
		self.nested(|parser| match parser.peek().r#type.clone() {
			Try => {
				parser.advance();
				parser.try_statement()
			}
			Throw => {
				parser.advance();
				let value = parser.expression()?;
				parser.terminator("Expect ';' after thrown value.")?;
				Ok(Statement::Throw(*value))
			}
			Class => {
				parser.advance();
				Ok(Statement::Class(parser.class_declaration(false)?))
			}
			Abstract if parser.peek_nth(1).r#type == Class => {
				parser.advance();
				parser.advance();
				Ok(Statement::Class(parser.class_declaration(true)?))
			}
			Fun if parser.peek_nth(1).r#type == Identifier => {
				parser.advance();
				Ok(Statement::Function(parser.function_declaration()?))
			}
			Var | Val => {
				parser.advance();
				parser.var_declaration(true)
			}
			_ => parser.statement(),
		})
	}

	fn statement(&mut self) -> Result<Statement, ParserError> {
		let statement: fn(&mut Self) -> Result<Statement, ParserError> = match self.peek().r#type {
			Foreach => Self::foreach_statement,
			For => Self::for_statement,
			If => Self::if_statement,
			While => Self::while_statement,
			Echo => Self::echo_statement,
			Return => Self::return_statement,
			Break => |parser| {
				parser.terminator("Expect ';' after 'break'.")?;
				Ok(Statement::Break)
			},
			Continue => |parser| {
				parser.terminator("Expect ';' after 'continue'.")?;
				Ok(Statement::Continue)
			},
			LeftBrace => |parser| Ok(Statement::Block(parser.block()?)),
			_ => {
				let expression = self.expression()?;
				self.terminator("Expect ';' after expression.")?;
				return Ok(Statement::Expression(*expression));
			}
		};
		self.advance(); // consume the keyword
		statement(self)
	}

	/// The body of `if`, `while`, `for` and `foreach`.
	fn body(&mut self) -> Result<Box<Statement>, ParserError> { Ok(Box::new(self.nested(Self::statement)?)) }

	/// Parse the statements of a block whose `{` was consumed, and its `}`.
	fn block(&mut self) -> Result<Vec<Statement>, ParserError> {
		let statements = self.declarations_until(&RightBrace)?;
		self.consume(RightBrace, "Expect '}' after block.")?;
		Ok(statements)
	}

	/// `var` or `val` was consumed.
	fn var_declaration(&mut self, terminated: bool) -> Result<Statement, ParserError> {
		let mutable = self.previous().r#type == Var;
		if self.match_tokens(&[LeftBracket]) {
			return self.destructuring(mutable, terminated);
		}
		let name = self.consume(Identifier, "Expect variable name.")?;
		let r#type = self.optional_type()?;
		let initializer = if self.match_tokens(&[Equal]) { Some(*self.expression()?) } else { None };
		if terminated {
			self.terminator("Expect ';' after variable declaration.")?;
		}
		Ok(Statement::Var(VarDeclaration { name, mutable, r#type, initializer }))
	}

	fn destructuring(&mut self, mutable: bool, terminated: bool) -> Result<Statement, ParserError> {
		let mut elements = Vec::new();
		while !self.check(&RightBracket) {
			if self.match_tokens(&[Comma]) {
				elements.push(None);
				continue;
			}
			let key = if self.at_literal_key() {
				let key = self.primary()?;
				self.advance(); // consume '=>'
				Some(*key)
			} else {
				None
			};
			let name = self.consume(Identifier, "Expect variable name in destructuring.")?;
			let r#type = self.optional_type()?;
			elements.push(Some(DestructuringElement { key, name, r#type }));
			if !self.match_tokens(&[Comma]) {
				break;
			}
		}
		self.consume(RightBracket, "Expect ']' after destructuring pattern.")?;
		self.consume(Equal, "Expect '=' after destructuring pattern.")?;
		let initializer = *self.expression()?;
		if terminated {
			self.terminator("Expect ';' after variable declaration.")?;
		}
		Ok(Statement::Destructuring(Destructuring { elements, mutable, initializer }))
	}

	/// Number of tokens a literal array key spans, `None` when the current
	/// token can't start one.
	fn literal_key_length(&self) -> Option<usize> {
		match self.peek().r#type {
			NumberLiteral(_) | StringLiteral(_) => Some(1),
			TemplateStart => match (&self.peek_nth(1).r#type, &self.peek_nth(2).r#type) {
				(TemplateEnd, _) => Some(2),
				(StringPart(_), TemplateEnd) => Some(3),
				_ => None,
			},
			_ => None,
		}
	}

	/// A literal key directly followed by `=>`.
	fn at_literal_key(&self) -> bool { self.literal_key_length().is_some_and(|n| self.peek_nth(n).r#type == Arrow) }

	/// `fun` was consumed.
	fn function_declaration(&mut self) -> Result<FunctionDeclaration, ParserError> {
		let name = self.consume(Identifier, "Expect function name.")?;
		self.consume(LeftParen, "Expect '(' after function name.")?;
		let parameters = self.parameters(false)?;
		let return_type = self.optional_type()?;
		let body = self.function_body(true)?;
		Ok(FunctionDeclaration { name, parameters, return_type, body })
	}

	/// Parse parameters after the consumed `(`, up to and including `)`.
	fn parameters(&mut self, allow_promotion: bool) -> Result<Vec<Parameter>, ParserError> {
		let mut parameters = Vec::new();
		while !self.check(&RightParen) {
			let promotion = if allow_promotion { self.promotion()? } else { None };
			let name = self.consume(Identifier, "Expect parameter name.")?;
			let r#type = self.optional_type()?;
			let default = if self.match_tokens(&[Equal]) { Some(*self.expression()?) } else { None };
			parameters.push(Parameter { name, r#type, default, promotion });
			if !self.match_tokens(&[Comma]) {
				break;
			}
		}
		self.consume(RightParen, "Expect ')' after parameters.")?;
		Ok(parameters)
	}

	fn function_body(&mut self, terminated: bool) -> Result<FunctionBody, ParserError> {
		if self.match_tokens(&[Arrow]) {
			let expression = self.function_scope(Self::expression)?;
			if terminated {
				self.terminator("Expect ';' after function body.")?;
			}
			return Ok(FunctionBody::Arrow(expression));
		}
		self.consume(LeftBrace, "Expect '{' before function body.")?;
		Ok(FunctionBody::Block(self.function_scope(Self::block)?))
	}

	/// Run `parse` inside a function, method, closure or `init` body.
	fn function_scope<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, ParserError>) -> Result<T, ParserError> {
		self.functions += 1;
		let result = parse(self);
		self.functions -= 1;
		result
	}

	/// `: Type` if present.
	fn optional_type(&mut self) -> Result<Option<TypeAnnotation>, ParserError> {
		if self.match_tokens(&[Colon]) { Ok(Some(self.type_annotation()?)) } else { Ok(None) }
	}

	fn condition(&mut self, message: &'static str) -> Result<Expression, ParserError> {
		self.consume(LeftParen, message)?;
		let condition = self.expression()?;
		self.consume(RightParen, "Expect ')' after condition.")?;
		Ok(*condition)
	}

	fn echo_statement(&mut self) -> Result<Statement, ParserError> {
		let mut values = vec![*self.expression()?];
		while self.match_tokens(&[Comma]) {
			values.push(*self.expression()?);
		}
		self.terminator("Expect ';' after echo values.")?;
		Ok(Statement::Echo(values))
	}

	fn return_statement(&mut self) -> Result<Statement, ParserError> {
		let value = if self.at_terminator() { None } else { Some(*self.expression()?) };
		self.terminator("Expect ';' after return value.")?;
		Ok(Statement::Return(value))
	}

	fn if_statement(&mut self) -> Result<Statement, ParserError> {
		let condition = self.condition("Expect '(' after 'if'.")?;
		let then_branch = self.body()?;
		let else_branch = if self.match_tokens(&[Else]) { Some(self.body()?) } else { None };
		Ok(Statement::If { condition, then_branch, else_branch })
	}

	fn while_statement(&mut self) -> Result<Statement, ParserError> {
		let condition = self.condition("Expect '(' after 'while'.")?;
		Ok(Statement::While { condition, body: self.body()? })
	}

	fn for_statement(&mut self) -> Result<Statement, ParserError> {
		self.consume(LeftParen, "Expect '(' after 'for'.")?;
		let initializer = if self.match_tokens(&[Semicolon]) {
			None
		} else {
			let initializer = if self.match_tokens(&[Var, Val]) {
				self.var_declaration(false)?
			} else {
				Statement::Expression(*self.expression()?)
			};
			self.consume(Semicolon, "Expect ';' after loop initializer.")?;
			Some(Box::new(initializer))
		};
		let condition = if self.check(&Semicolon) { None } else { Some(*self.expression()?) };
		self.consume(Semicolon, "Expect ';' after loop condition.")?;
		let increment = if self.check(&RightParen) { None } else { Some(*self.expression()?) };
		self.consume(RightParen, "Expect ')' after for clauses.")?;
		Ok(Statement::For { initializer, condition, increment, body: self.body()? })
	}

	fn foreach_statement(&mut self) -> Result<Statement, ParserError> {
		self.consume(LeftParen, "Expect '(' after 'foreach'.")?;
		let first = self.foreach_variable()?;
		let (key, value) =
			if self.match_tokens(&[Comma]) { (Some(first), self.foreach_variable()?) } else { (None, first) };
		self.consume(In, "Expect 'in' after foreach variables.")?;
		let iterable = *self.expression()?;
		self.consume(RightParen, "Expect ')' after foreach iterable.")?;
		Ok(Statement::Foreach(Foreach { key, value, iterable, body: self.body()? }))
	}

	fn foreach_variable(&mut self) -> Result<ForeachVariable, ParserError> {
		let name = self.consume(Identifier, "Expect foreach variable name.")?;
		Ok(ForeachVariable { name, r#type: self.optional_type()? })
	}

	fn try_statement(&mut self) -> Result<Statement, ParserError> {
		self.consume(LeftBrace, "Expect '{' after 'try'.")?;
		let body = self.block()?;
		let mut catches = Vec::new();
		while self.match_tokens(&[Catch]) {
			self.consume(LeftParen, "Expect '(' after 'catch'.")?;
			let variable = self.consume(Identifier, "Expect catch variable name.")?;
			let mut types = Vec::new();
			if self.match_tokens(&[Colon]) {
				loop {
					types.push(self.consume(Identifier, "Expect exception type.")?);
					if !self.match_tokens(&[Pipe]) {
						break;
					}
				}
			}
			self.consume(RightParen, "Expect ')' after catch clause.")?;
			self.consume(LeftBrace, "Expect '{' before catch body.")?;
			catches.push(CatchClause { variable, types, body: self.block()? });
		}
		let finally = if self.match_tokens(&[Finally]) {
			self.consume(LeftBrace, "Expect '{' after 'finally'.")?;
			Some(self.block()?)
		} else {
			None
		};
		if catches.is_empty() && finally.is_none() {
			return Err(self.error(self.peek(), ParseErrorType::Expect("Expect 'catch' or 'finally' after try block.")));
		}
		Ok(Statement::Try { body, catches, finally })
	}

	/// Whether the current statement may end before the next token.
	fn at_terminator(&self) -> bool {
		let next = self.peek();
		matches!(next.r#type, Semicolon | Eof | RightBrace | Else)
			|| next.r#type.starts_declaration()
			|| next.line > self.previous().line
	}

	fn terminator(&mut self, message: &'static str) -> Result<(), ParserError> {
		if self.match_tokens(&[Semicolon]) || self.at_terminator() {
			return Ok(());
		}
		Err(self.error(self.peek(), ParseErrorType::Expect(message)))
	}

	/// Empty statements.
	fn skip_separators(&mut self) { while self.match_tokens(&[Semicolon]) {} }

	/// Skip tokens until something that can start a statement, staying in
	/// front of the `end` of the enclosing block.
	fn synchronize(&mut self, end: &TokenType) {
		if self.check(end) {
			return;
		}
		self.advance();
		while !self.is_at_end() && !self.check(end) {
			if self.previous().r#type == Semicolon || self.peek().r#type.starts_declaration() {
				return;
			}
			self.advance();
		}
	}

	/// Run `parse` one nesting level deeper.
	fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, ParserError>) -> Result<T, ParserError> {
		self.deepen()?;
		let result = parse(self);
		self.depth -= 1;
		result
	}

	/// Run `parse`, which may call `deepen` any number of times, and restore
	/// the depth afterwards.
	fn chained<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, ParserError>) -> Result<T, ParserError> {
		let depth = self.depth;
		let result = parse(self);
		self.depth = depth;
		result
	}

	fn deepen(&mut self) -> Result<(), ParserError> {
		if self.depth >= self.options.max_depth {
			return Err(self.error(self.peek(), ParseErrorType::TooDeep(self.options.max_depth)));
		}
		self.depth += 1;
		Ok(())
	}

	fn peek(&self) -> &Token { self.peek_nth(0) }

	/// The token `n` places after the current one, the end of input stays put.
	fn peek_nth(&self, n: usize) -> &Token { &self.tokens[(self.current + n).min(self.tokens.len() - 1)] }

	fn previous(&self) -> &Token { &self.tokens[self.current.saturating_sub(1)] }

	fn is_at_end(&self) -> bool { self.peek().r#type == Eof }

	/// Consume the current token and return it.
	fn advance(&mut self) -> Token {
		let token = self.peek().clone();
		if !self.is_at_end() {
			self.current += 1;
		}
		token
	}

	fn check(&self, r#type: &TokenType) -> bool { &self.peek().r#type == r#type }

	fn match_tokens(&mut self, types: &[TokenType]) -> bool {
		if types.iter().any(|r#type| self.check(r#type)) {
			self.advance();
			return true;
		}
		false
	}

	fn consume(&mut self, r#type: TokenType, message: &'static str) -> Result<Token, ParserError> {
		if self.check(&r#type) {
			return Ok(self.advance());
		}
		Err(self.error(self.peek(), ParseErrorType::Expect(message)))
	}

	fn error(&self, token: &Token, r#type: ParseErrorType) -> ParserError {
		let at = if token.r#type == Eof { "at end".to_string() } else { format!("at '{}'", token.lexeme) };
		ParseError::new(token.line, r#type, at).into()
	}
}

#[cfg(test)]
mod tests {
	use indoc::indoc;

	use super::*;
	use crate::scanner::Scanner;

	fn parse_with(input: &str, options: ParserOptions) -> Result<Program, CompileError> {
		let tokens = Scanner::new(input).scan_tokens()?;
		Parser::new(tokens, options).parse()
	}

	fn parse(input: &str, equals: &str) {
		let program = parse_with(input, ParserOptions::default()).unwrap();
		assert_eq!(program.to_string(), equals);
	}

	fn parse_error(input: &str) -> ParseError {
		match parse_with(input, ParserOptions::default()) {
			Err(CompileError::ParseError(error)) => error,
			other => panic!("expected a parse error, got {other:?}"),
		}
	}

	#[test]
	fn parse_optional_terminators() {
		parse("var a var b", "(var a)\n(var b)");
		parse("a;;;(b)", "a;\n(group b);");
		parse(";;a;", "a;");
		parse("val a = 1\nval b = 2", "(val a = 1)\n(val b = 2)");
		parse("{ a }", "(block a;)");
	}

	#[test]
	fn parse_missing_terminator() {
		let error = parse_error("a b");
		assert_eq!(error.r#type, ParseErrorType::Expect("Expect ';' after expression."));
		assert_eq!(error.to_string(), "line 1: Expect ';' after expression. at 'b'");
	}

	#[test]
	fn parse_destructuring_holes() {
		parse("var [, , c] = e", "(var [_ _ c] = e)");
		parse("val [a, 'k' => b: Int] = e", "(val [a \"k\" => b: Int] = e)");
		parse("var [\"k\" => a, 2 => b] = e", "(var [\"k\" => a 2 => b] = e)");

		let program = parse_with("var [, , c] = e", ParserOptions::default()).unwrap();
		let Statement::Destructuring(destructuring) = &program.statements[0] else { panic!("not a destructuring") };
		assert!(destructuring.elements[0].is_none());
		assert!(destructuring.elements[1].is_none());
		assert_eq!(destructuring.elements[2].as_ref().map(|e| e.name.lexeme.as_str()), Some("c"));
	}

	#[test]
	fn parse_functions() {
		parse("fun f(a, b: Int = 1): Int { return a }", "(fun f (a b: Int = 1): Int (block (return a)))");
		parse("fun f() => 1", "(fun f () (=> 1))");
		parse("fun f(a,) {}", "(fun f (a) (block))");
		parse("val f = fun (x) => x * 2", "(val f = (fun (x) (=> (* x 2))))");
	}

	#[test]
	fn parse_control_flow() {
		parse("if (a) b else c", "(if a b; c;)");
		parse("while (a) { a-- }", "(while a (block (post-- a);))");
		parse("for (var i = 0; i < 3; i++) echo i", "(for (var i = 0) (< i 3) (post++ i) (echo i))");
		parse("for (;;) break", "(for _ _ _ (break))");
		parse("foreach (k, v: Int in xs) continue", "(foreach k v: Int in xs (continue))");
		parse("echo a, b", "(echo a b)");
		parse("fun f() { return }", "(fun f () (block (return)))");
	}

	#[test]
	fn parse_try_catch() {
		parse(
			indoc! {"
				try {
					throw new E()
				} catch (e: A|B) {
					echo e
				} finally {
					done()
				}
			"},
			"(try (block (throw (new (call E)))) (catch e: A|B (block (echo e))) (finally (block (call done);)))",
		);
		parse("try {} catch (e) {}", "(try (block) (catch e (block)))");
		assert_eq!(
			parse_error("try {}").r#type,
			ParseErrorType::Expect("Expect 'catch' or 'finally' after try block.")
		);
	}

	#[test]
	fn parse_types() {
		parse("var a: ?Map<String, List<Int>>|Nil", "(var a: ?Map<String, List<Int>>|Nil)");
		assert_eq!(parse_error("var a: = 1").r#type, ParseErrorType::Expect("Expect type name."));
	}

	#[test]
	fn parse_recovers_every_error() {
		let options = ParserOptions { recovery: true, ..ParserOptions::default() };
		let source = indoc! {"
			var = 1;
			val ok = 2;
			fun f() { 1 + ; }
			echo )
		"};
		match parse_with(source, options) {
			Err(CompileError::ParserErrors(errors)) => {
				assert_eq!(errors.len(), 3);
				assert_eq!(errors[0].line, 1);
				assert_eq!(errors[1].line, 3);
				assert_eq!(errors[2].line, 4);
			}
			other => panic!("expected parser errors, got {other:?}"),
		}
		assert!(matches!(parse_with(source, ParserOptions::default()), Err(CompileError::ParseError(_))));
	}

	#[test]
	fn parse_depth_guard() {
		let options = ParserOptions { max_depth: 16, ..ParserOptions::default() };
		let source = format!("{}1{}", "(".repeat(32), ")".repeat(32));
		match parse_with(&source, options) {
			Err(CompileError::ParseError(error)) => assert_eq!(error.r#type, ParseErrorType::TooDeep(16)),
			other => panic!("expected a depth error, got {other:?}"),
		}
		let source = format!("{}1{}", "(".repeat(8), ")".repeat(8));
		assert!(parse_with(&source, options).is_ok());
	}

	#[test]
	fn parse_depth_counts_chains() {
		let options = ParserOptions { max_depth: 16, ..ParserOptions::default() };
		for source in [format!("1{}", " + 1".repeat(32)), format!("a{}", ".b".repeat(32)), format!("f{}", "()".repeat(32))] {
			match parse_with(&source, options) {
				Err(CompileError::ParseError(error)) => assert_eq!(error.r#type, ParseErrorType::TooDeep(16)),
				other => panic!("expected a depth error, got {other:?}"),
			}
		}
		assert!(parse_with(&format!("1{}", " + 1".repeat(8)), options).is_ok());
		assert!(parse_with(&format!("a{}", ".b".repeat(8)), options).is_ok());
		// Sibling chains do not add up.
		assert!(parse_with(&format!("f({})", vec!["1 + 1 + 1"; 32].join(", ")), options).is_ok());
	}

	#[test]
	fn parse_without_environments() {
		let options = ParserOptions { environments: false, ..ParserOptions::default() };
		let program = parse_with("class A(var a) {}", options).unwrap();
		assert!(program.environment.is_none());
		let Statement::Class(class) = &program.statements[0] else { panic!("not a class") };
		assert!(class.environment.is_none());
	}
}
