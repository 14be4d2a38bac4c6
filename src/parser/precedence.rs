//! Expression grammar, one function per precedence level.
//!
//! |Name|Operators|Associates
//! --|--|--
//! Assignment|= += -= *= /= %= **= +.= ??=|Right
//! Ternary|? :|None
//! Coalesce|??|Right
//! Or|or \|\||Left
//! And|and &&|Left
//! Equality|== != === !== <=>|Left
//! Comparison|< > <= >=|Left
//! Concat|+.|Left
//! Term|+ -|Left
//! Factor|* / %|Left
//! Instanceof|instanceof|Left
//! Exponent|**|Right
//! Unary|! - + -- ++|Right
//!
//! ``` BNF
//! expression     → assignment ;
//! assignment     → ternary ( ASSIGN_OP assignment )? ;
//! ternary        → coalesce ( "?" coalesce ":" coalesce )? ;
//! coalesce       → or ( "??" coalesce )? ;
//! or             → and ( ( "or" | "||" ) and )* ;
//! and            → equality ( ( "and" | "&&" ) equality )* ;
//! equality       → comparison ( ( "==" | "!=" | "===" | "!==" | "<=>" ) comparison )* ;
//! comparison     → concat ( ( ">" | ">=" | "<" | "<=" ) concat )* ;
//! concat         → term ( "+." term )* ;
//! term           → factor ( ( "-" | "+" ) factor )* ;
//! factor         → instanceof ( ( "/" | "*" | "%" ) instanceof )* ;
//! instanceof     → exponent ( "instanceof" exponent )* ;
//! exponent       → unary ( "**" exponent )? ;
//! unary          → ( "!" | "-" | "+" | "--" | "++" ) unary | match ;
//! match          → "match" "(" expression ")" "{" arms "}" | postfix ;
//! postfix        → new ( "++" | "--" )? ;
//! new            → ( "new" | "clone" ) new | call ;
//! call           → primary ( "(" arguments? ")" | "." IDENT | "?." IDENT
//!                          | "::" IDENT | "[" expression? "]" )* ;
//! primary        → NUMBER | STRING | template | "true" | "false" | "nil"
//!                | "(" expression ")" | array | "this" | "super" | IDENT
//!                | "fun" "(" params? ")" ( ":" type )? body ;
//! ```

use TokenType::*;

use crate::{error::parser::{ParseErrorType, ParserError}, parser::{Parser, expression::{self, ArrayItem, Expression, FunctionExpression, LiteralValue, MatchArm, TemplatePart}}, scanner::TokenType};

type ExpressionResult = Result<Box<Expression>, ParserError>;

impl Parser {
	pub(super) fn expression(&mut self) -> ExpressionResult { self.nested(Self::assignment) }

	fn assignment(&mut self) -> ExpressionResult {
		let target = self.ternary()?;
		if self.match_tokens(&[
			Equal,
			PlusEqual,
			MinusEqual,
			StarEqual,
			SlashEqual,
			PercentEqual,
			StarStarEqual,
			PlusDotEqual,
			QuestionQuestionEqual,
		]) {
			let operator = self.previous().clone();
			if !target.is_assignable() {
				return Err(self.error(&operator, ParseErrorType::InvalidAssignmentTarget));
			}
			let value = self.expression()?;
			return Ok(Expression::assign(target, operator, value));
		}
		Ok(target)
	}

	/// Both branches are parsed one level tighter, `a ? b : c ? d : e` needs
	/// parentheses.
	fn ternary(&mut self) -> ExpressionResult {
		let condition = self.coalesce()?;
		if self.match_tokens(&[Question]) {
			let then_branch = self.coalesce()?;
			self.consume(Colon, "Expect ':' after then branch of ternary expression.")?;
			let else_branch = self.coalesce()?;
			return Ok(Expression::ternary(condition, then_branch, else_branch));
		}
		Ok(condition)
	}

	fn coalesce(&mut self) -> ExpressionResult {
		let left = self.or()?;
		if self.match_tokens(&[QuestionQuestion]) {
			let operator = self.previous().clone();
			return Ok(Expression::binary(left, operator, self.nested(Self::coalesce)?));
		}
		Ok(left)
	}

	fn or(&mut self) -> ExpressionResult { self.left_associative(&[Or, PipePipe], Self::and) }

	fn and(&mut self) -> ExpressionResult { self.left_associative(&[And, AmpAmp], Self::equality) }

	/// Chains are accepted and group to the left.
	fn equality(&mut self) -> ExpressionResult {
		self.left_associative(&[EqualEqual, BangEqual, EqualEqualEqual, BangEqualEqual, Spaceship], Self::comparison)
	}

	fn comparison(&mut self) -> ExpressionResult {
		self.left_associative(&[Greater, GreaterEqual, Less, LessEqual], Self::concat)
	}

	fn concat(&mut self) -> ExpressionResult { self.left_associative(&[PlusDot], Self::term) }

	fn term(&mut self) -> ExpressionResult { self.left_associative(&[Minus, Plus], Self::factor) }

	fn factor(&mut self) -> ExpressionResult { self.left_associative(&[Slash, Star, Percent], Self::instanceof) }

	fn instanceof(&mut self) -> ExpressionResult { self.left_associative(&[Instanceof], Self::exponent) }

	/// `operand ( operator operand )*`. Every operator nests the tree one
	/// level deeper, so a long chain counts against the depth limit.
	fn left_associative(
		&mut self,
		operators: &[TokenType],
		operand: fn(&mut Self) -> ExpressionResult,
	) -> ExpressionResult {
		self.chained(|parser| {
			let mut expression = operand(parser)?;
			while operators.contains(&parser.peek().r#type) {
				parser.deepen()?;
				expression = Expression::binary(expression, parser.advance(), operand(parser)?)
			}
			Ok(expression)
		})
	}

	fn exponent(&mut self) -> ExpressionResult {
		let base = self.unary()?;
		if matches!(self.peek().r#type, StarStar) {
			let operator = self.advance();
			return Ok(Expression::binary(base, operator, self.nested(Self::exponent)?));
		}
		Ok(base)
	}

	fn unary(&mut self) -> ExpressionResult {
		if matches!(self.peek().r#type, Bang | Minus | Plus | MinusMinus | PlusPlus) {
			let operator = self.advance();
			return Ok(Expression::unary(operator, self.nested(Self::unary)?));
		}
		self.match_expression()
	}

	fn match_expression(&mut self) -> ExpressionResult {
		if !self.match_tokens(&[Match]) {
			return self.postfix();
		}
		self.consume(LeftParen, "Expect '(' after 'match'.")?;
		let subject = self.expression()?;
		self.consume(RightParen, "Expect ')' after match subject.")?;
		self.consume(LeftBrace, "Expect '{' before match arms.")?;
		let mut arms = Vec::new();
		while !self.check(&RightBrace) {
			let mut conditions = Vec::new();
			if !self.match_tokens(&[Default]) {
				loop {
					conditions.push(*self.expression()?);
					if !self.match_tokens(&[Comma]) || self.check(&Arrow) {
						break;
					}
				}
			}
			self.consume(Arrow, "Expect '=>' after match condition.")?;
			arms.push(MatchArm { conditions, body: *self.expression()? });
			if !self.match_tokens(&[Comma]) {
				break;
			}
		}
		self.consume(RightBrace, "Expect '}' after match arms.")?;
		Ok(Box::new(Expression::Match { subject, arms }))
	}

	/// `++` and `--` on the same line as their target.
	fn postfix(&mut self) -> ExpressionResult {
		let target = self.new_expression()?;
		if matches!(self.peek().r#type, PlusPlus | MinusMinus) && self.peek().line == self.previous().line {
			let operator = self.advance();
			if !matches!(*target, Expression::Identifier(_)) {
				return Err(self.error(&operator, ParseErrorType::InvalidPostfixTarget));
			}
			return Ok(Box::new(Expression::Postfix { operator, target }));
		}
		Ok(target)
	}

	fn new_expression(&mut self) -> ExpressionResult {
		if self.match_tokens(&[New]) {
			return Ok(Box::new(Expression::New(self.nested(Self::new_expression)?)));
		}
		if self.match_tokens(&[Clone]) {
			return Ok(Box::new(Expression::Clone(self.nested(Self::new_expression)?)));
		}
		self.call()
	}

	/// Calls and member access, left to right. A `(` or `[` on a later line
	/// starts a new statement instead.
	fn call(&mut self) -> ExpressionResult { self.chained(Self::call_chain) }

	fn call_chain(&mut self) -> ExpressionResult {
		let mut expression = self.primary()?;
		loop {
			let same_line = self.peek().line == self.previous().line;
			let link = match self.peek().r#type {
				LeftParen | LeftBracket => same_line,
				Dot | QuestionDot | ColonColon => true,
				_ => false,
			};
			if !link {
				break;
			}
			self.deepen()?;
			if same_line && self.match_tokens(&[LeftParen]) {
				expression = Expression::call(expression, self.arguments()?);
			} else if self.match_tokens(&[Dot]) {
				let name = self.consume(Identifier, "Expect property name after '.'.")?;
				expression = Box::new(Expression::Get { object: expression, name });
			} else if self.match_tokens(&[QuestionDot]) {
				let name = self.consume(Identifier, "Expect property name after '?.'.")?;
				expression = Box::new(Expression::NullsafeGet { object: expression, name });
			} else if self.match_tokens(&[ColonColon]) {
				let name = if self.match_tokens(&[Class]) {
					self.previous().clone()
				} else {
					self.consume(Identifier, "Expect member name after '::'.")?
				};
				expression = Box::new(Expression::StaticGet { class: expression, name });
			} else if same_line && self.match_tokens(&[LeftBracket]) {
				let index = if self.check(&RightBracket) { None } else { Some(self.expression()?) };
				self.consume(RightBracket, "Expect ']' after index.")?;
				expression = Box::new(Expression::Index { object: expression, index });
			} else {
				break;
			}
		}
		Ok(expression)
	}

	/// Arguments after the consumed `(`, a trailing comma is allowed.
	pub(super) fn arguments(&mut self) -> Result<Vec<Expression>, ParserError> {
		let mut arguments = Vec::new();
		while !self.check(&RightParen) {
			arguments.push(*self.expression()?);
			if !self.match_tokens(&[Comma]) {
				break;
			}
		}
		self.consume(RightParen, "Expect ')' after arguments.")?;
		Ok(arguments)
	}

	pub(super) fn primary(&mut self) -> ExpressionResult {
		let start = self.current;
		let token = self.advance();
		let expression = match token.r#type {
			False => Expression::Literal(LiteralValue::Boolean(false)),
			True => Expression::Literal(LiteralValue::Boolean(true)),
			Nil => Expression::Literal(LiteralValue::Nil),
			NumberLiteral(n) => Expression::Literal(LiteralValue::Number(n)),
			StringLiteral(s) => Expression::Literal(LiteralValue::String(s)),
			TemplateStart => return self.template(),
			LeftParen => {
				let expression = self.expression()?;
				self.consume(RightParen, "Expect ')' after expression.")?;
				Expression::Grouping(expression)
			}
			LeftBracket => return self.array(),
			This => Expression::This,
			Super => Expression::Super,
			Identifier => Expression::Identifier(expression::Identifier::new(&token.lexeme, token.line)),
			Fun => return self.function_expression(token.line),
			_ => {
				self.current = start;
				return Err(self.error(&token, ParseErrorType::ExpectedExpression));
			}
		};
		Ok(Box::new(expression))
	}

	/// The parts of a double quoted string after its `TemplateStart`. A string
	/// without interpolation becomes a plain literal.
	fn template(&mut self) -> ExpressionResult {
		let mut parts = Vec::new();
		loop {
			match self.advance().r#type {
				StringPart(text) => parts.push(TemplatePart::Text(text)),
				InterpolationStart => {
					let expression = self.expression()?;
					self.consume(InterpolationEnd, "Expect '}' after interpolated expression.")?;
					parts.push(TemplatePart::Expression(*expression));
				}
				TemplateEnd => break,
				_ => return Err(self.error(self.previous(), ParseErrorType::Expect("Expect '\"' after string."))),
			}
		}
		if parts.len() <= 1 && !matches!(parts.first(), Some(TemplatePart::Expression(_))) {
			let text = match parts.pop() {
				Some(TemplatePart::Text(text)) => text,
				_ => String::new(),
			};
			return Ok(Box::new(Expression::Literal(LiteralValue::String(text))));
		}
		Ok(Box::new(Expression::Template(parts)))
	}

	/// Items after the consumed `[`. `key =>` is only a key when a literal is
	/// directly followed by the arrow.
	fn array(&mut self) -> ExpressionResult {
		let mut items = Vec::new();
		while !self.check(&RightBracket) {
			let key = if self.at_literal_key() {
				let key = self.primary()?;
				self.advance(); // consume '=>'
				Some(*key)
			} else {
				None
			};
			items.push(ArrayItem { key, value: *self.expression()? });
			if !self.match_tokens(&[Comma]) {
				break;
			}
		}
		self.consume(RightBracket, "Expect ']' after array items.")?;
		Ok(Box::new(Expression::Array(items)))
	}

	fn function_expression(&mut self, line: usize) -> ExpressionResult {
		self.consume(LeftParen, "Expect '(' after 'fun'.")?;
		let parameters = self.parameters(false)?;
		let return_type = self.optional_type()?;
		let body = self.function_body(false)?;
		Ok(Box::new(Expression::Function(FunctionExpression::new(parameters, return_type, body, line))))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{CompileError, ParserOptions, scanner::Scanner, statement::Statement};

	fn parse_expression(input: &str) -> Result<String, CompileError> {
		let tokens = Scanner::new(input).scan_tokens()?;
		let program = Parser::new(tokens, ParserOptions::default()).parse()?;
		match program.statements.first() {
			Some(Statement::Expression(expression)) => Ok(expression.to_string()),
			other => panic!("expected an expression statement, got {other:?}"),
		}
	}

	fn parse(input: &str, equals: &str) { assert_eq!(parse_expression(input).unwrap(), equals); }

	fn parse_error(input: &str) -> ParseErrorType {
		match parse_expression(input) {
			Err(CompileError::ParseError(error)) => error.r#type,
			other => panic!("expected a parse error, got {other:?}"),
		}
	}

	#[test]
	fn parse_arithmetic() {
		parse("1 + 2 * 3", "(+ 1 (* 2 3))");
		parse("1 * 2 + 3", "(+ (* 1 2) 3)");
		parse("3 + 4 * (-2 - 1)", "(+ 3 (* 4 (group (- (- 2) 1))))");
		parse("8 + 800.3 * 123 / 65 - (2 + 3)", "(- (+ 8 (/ (* 800.3 123) 65)) (group (+ 2 3)))");
		parse("a % b * c", "(* (% a b) c)");
		parse("a +. b + c", "(+. a (+ b c))");
	}

	#[test]
	fn parse_right_associative() {
		parse("a ** b ** c", "(** a (** b c))");
		parse("-a ** b", "(** (- a) b)");
		parse("a ?? b ?? c", "(?? a (?? b c))");
		parse("a = b = c", "(= a (= b c))");
		parse("a += b ??= c", "(+= a (??= b c))");
	}

	#[test]
	fn parse_ternary() {
		parse("a ? b : c ?? d", "(? a b (?? c d))");
		parse("a == 1 ? b : c", "(? (== a 1) b c)");
		parse("a ? (b ? c : d) : e", "(? a (group (? b c d)) e)");
		parse("x = a ? b : c", "(= x (? a b c))");
	}

	#[test]
	fn parse_logic_and_equality() {
		parse("a or b and c", "(or a (and b c))");
		parse("a || b && c", "(|| a (&& b c))");
		parse("1 == 2 == 3", "(== (== 1 2) 3)");
		parse("a !== b", "(!== a b)");
		parse("a <=> b", "(<=> a b)");
		parse("1 < 2 == true", "(== (< 1 2) true)");
		parse("!a instanceof B", "(instanceof (! a) B)");
	}

	#[test]
	fn parse_unary_and_postfix() {
		parse("!!true", "(! (! true))");
		parse("++i", "(++ i)");
		parse("i++", "(post++ i)");
		parse("-i--", "(- (post-- i))");
	}

	#[test]
	fn parse_calls_and_members() {
		parse("f(1, 2,)", "(call f 1 2)");
		parse("a.b()", "(call (. a b))");
		parse("a?.b", "(?. a b)");
		parse("A::b", "(:: A b)");
		parse("A::class", "(:: A class)");
		parse("a.b[c](d)", "(call ([] (. a b) c) d)");
		parse("a[] = 1", "(= ([] a) 1)");
		parse("this.a = super.b", "(= (. this a) (. super b))");
		parse("new A(1)", "(new (call A 1))");
		parse("clone a.b", "(clone (. a b))");
	}

	#[test]
	fn parse_arrays() {
		parse("[1, 'k' => 2, x]", "(array 1 (=> \"k\" 2) x)");
		parse("['k' + 1]", "(array (+ \"k\" 1))");
		parse("[\"k\" => [], 2 => 3,]", "(array (=> \"k\" (array)) (=> 2 3))");
	}

	#[test]
	fn parse_match() {
		parse("match (x) { 1, 2 => a, default => b }", "(match x (1 2 => a) (default => b))");
		parse("match (x) {}", "(match x)");
		parse("match (x) { 1, => a, }", "(match x (1 => a))");
	}

	#[test]
	fn parse_templates() {
		parse("\"${name}\"", "(template name)");
		parse("\"\"", "\"\"");
		parse("\"literal\"", "\"literal\"");
		parse("\"Hi ${name}!\"", "(template \"Hi \" name \"!\")");
		parse("\"a ${\"b ${c}\"}\"", "(template \"a \" (template \"b \" c))");
		parse("\"${a}${b}\"", "(template a b)");
	}

	#[test]
	fn parse_closures() {
		parse("fun (a) { return a }", "(fun (a) (block (return a)))");
		parse("fun (a: Int = 1): Int => a", "(fun (a: Int = 1): Int (=> a))");
	}

	#[test]
	fn parse_invalid_targets() {
		assert_eq!(parse_error("1 = 2"), ParseErrorType::InvalidAssignmentTarget);
		assert_eq!(parse_error("a?.b = 1"), ParseErrorType::InvalidAssignmentTarget);
		assert_eq!(parse_error("a + b = c"), ParseErrorType::InvalidAssignmentTarget);
		assert_eq!(parse_error("1++"), ParseErrorType::InvalidPostfixTarget);
		assert_eq!(parse_error("a.b++"), ParseErrorType::InvalidPostfixTarget);
		assert_eq!(parse_error("+"), ParseErrorType::ExpectedExpression);
		assert_eq!(parse_error("(1"), ParseErrorType::Expect("Expect ')' after expression."));
		assert_eq!(parse_error("a ? b"), ParseErrorType::Expect("Expect ':' after then branch of ternary expression."));
	}
}
