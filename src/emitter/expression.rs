//! Expressions as PHP source.
//!
//! Operands get parentheses when they bind looser than their position allows.
//! The ladder follows the source grammar, which matches PHP except that PHP
//! binds `**` and `instanceof` tighter than unary operators and refuses to
//! chain comparisons. Those operands are parenthesized explicitly.

use anyhow::{Result, anyhow};
use TokenType::*;

use crate::{emitter::{Emitter, types::return_hint}, environment::BindingKind, parser::expression::{Expression, FunctionExpression, Identifier, LiteralValue, TemplatePart}, scanner::{Token, TokenType}, statement::FunctionBody};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Precedence {
	Lowest,
	Assignment,
	Ternary,
	Coalesce,
	Or,
	And,
	Equality,
	Comparison,
	Concat,
	Term,
	Factor,
	Instanceof,
	Exponent,
	Unary,
	Postfix,
	New,
	Call,
	Primary,
}

impl Precedence {
	/// One level tighter.
	fn next(self) -> Self {
		use Precedence::*;
		match self {
			Lowest => Assignment,
			Assignment => Ternary,
			Ternary => Coalesce,
			Coalesce => Or,
			Or => And,
			And => Equality,
			Equality => Comparison,
			Comparison => Concat,
			Concat => Term,
			Term => Factor,
			Factor => Instanceof,
			Instanceof => Exponent,
			Exponent => Unary,
			Unary => Postfix,
			Postfix => New,
			New => Call,
			Call | Primary => Primary,
		}
	}

	fn of_operator(r#type: &TokenType) -> Self {
		match r#type {
			QuestionQuestion => Self::Coalesce,
			Or | PipePipe => Self::Or,
			And | AmpAmp => Self::And,
			EqualEqual | BangEqual | EqualEqualEqual | BangEqualEqual | Spaceship => Self::Equality,
			Less | LessEqual | Greater | GreaterEqual => Self::Comparison,
			PlusDot => Self::Concat,
			Plus | Minus => Self::Term,
			Star | Slash | Percent => Self::Factor,
			Instanceof => Self::Instanceof,
			StarStar => Self::Exponent,
			_ => Self::Lowest,
		}
	}

	fn of(expression: &Expression) -> Self {
		match expression {
			Expression::Literal(_)
			| Expression::Identifier(_)
			| Expression::This
			| Expression::Super
			| Expression::Grouping(_)
			| Expression::Array(_) => Self::Primary,
			Expression::Template(_) => Self::Concat,
			Expression::Unary { .. } => Self::Unary,
			Expression::Postfix { .. } | Expression::Match { .. } => Self::Postfix,
			Expression::Binary { operator, .. } => Self::of_operator(&operator.r#type),
			Expression::Ternary { .. } => Self::Ternary,
			Expression::Assign { .. } | Expression::Function(_) => Self::Assignment,
			Expression::Call { .. }
			| Expression::Get { .. }
			| Expression::NullsafeGet { .. }
			| Expression::StaticGet { .. }
			| Expression::Index { .. } => Self::Call,
			Expression::New(_) | Expression::Clone(_) => Self::New,
		}
	}
}

/// The PHP spelling of an operator.
fn operator(token: &Token) -> &str {
	match token.r#type {
		PlusDot => ".",
		PlusDotEqual => ".=",
		And | AmpAmp => "&&",
		Or | PipePipe => "||",
		_ => token.lexeme.as_str(),
	}
}

fn parenthesize(code: String) -> String { format!("({code})") }

/// A PHP string literal, single quoted unless it holds control characters.
pub(super) fn string_literal(value: &str) -> String {
	if !value.chars().any(char::is_control) {
		return format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"));
	}
	let mut literal = String::from("\"");
	for c in value.chars() {
		match c {
			'\n' => literal.push_str("\\n"),
			'\t' => literal.push_str("\\t"),
			'\r' => literal.push_str("\\r"),
			'\\' | '"' | '$' => {
				literal.push('\\');
				literal.push(c);
			}
			c if c.is_control() => literal.push_str(&format!("\\u{{{:x}}}", c as u32)),
			c => literal.push(c),
		}
	}
	literal.push('"');
	literal
}

impl Emitter {
	pub(super) fn expression(&self, expression: &Expression) -> Result<String> { self.operand(expression, Precedence::Lowest) }

	/// Render `expression` where at least `min` binding strength is needed.
	fn operand(&self, expression: &Expression, min: Precedence) -> Result<String> {
		let code = self.render(expression)?;
		Ok(if Precedence::of(expression) < min { parenthesize(code) } else { code })
	}

	fn render(&self, expression: &Expression) -> Result<String> {
		Ok(match expression {
			Expression::Literal(literal) => match literal {
				LiteralValue::Number(n) => n.to_string(),
				LiteralValue::String(s) => string_literal(s),
				LiteralValue::Boolean(b) => b.to_string(),
				LiteralValue::Nil => "null".to_string(),
			},
			Expression::Template(parts) => self.template(parts)?,
			Expression::Identifier(identifier) => identifier_name(identifier)?,
			Expression::This => "$this".to_string(),
			Expression::Super => "parent".to_string(),
			Expression::Grouping(inner) => parenthesize(self.expression(inner)?),
			Expression::Unary { operator, right } => {
				let operand = self.operand(right, Precedence::Unary)?;
				// `- -a` must not turn into `--$a`.
				if matches!(operator.r#type, Minus | Plus) && operand.starts_with(['-', '+']) {
					format!("{}{}", operator.lexeme, parenthesize(operand))
				} else {
					format!("{}{operand}", operator.lexeme)
				}
			}
			Expression::Postfix { operator, target } => {
				format!("{}{}", self.operand(target, Precedence::Postfix)?, operator.lexeme)
			}
			Expression::Binary { left, operator: token, right } => self.binary(left, token, right)?,
			Expression::Ternary { condition, then_branch, else_branch } => format!(
				"{} ? {} : {}",
				self.operand(condition, Precedence::Coalesce)?,
				self.operand(then_branch, Precedence::Coalesce)?,
				self.operand(else_branch, Precedence::Coalesce)?
			),
			Expression::Assign { target, operator: token, value } => format!(
				"{} {} {}",
				self.operand(target, Precedence::Call)?,
				operator(token),
				self.operand(value, Precedence::Assignment)?
			),
			Expression::Call { callee, arguments, .. } => {
				format!("{}({})", self.operand(callee, Precedence::Call)?, self.arguments(arguments)?)
			}
			Expression::Get { object, name } => match object.as_ref() {
				Expression::Super => format!("parent::{}", name.lexeme),
				object => format!("{}->{}", self.operand(object, Precedence::Call)?, name.lexeme),
			},
			Expression::NullsafeGet { object, name } => {
				format!("{}?->{}", self.operand(object, Precedence::Call)?, name.lexeme)
			}
			Expression::StaticGet { class, name } => {
				format!("{}::{}", self.operand(class, Precedence::Call)?, name.lexeme)
			}
			Expression::Index { object, index, .. } => {
				let index = match index {
					Some(index) => self.expression(index)?,
					None => String::new(),
				};
				format!("{}[{index}]", self.operand(object, Precedence::Call)?)
			}
			Expression::Array(items) => {
				let items = items
					.iter()
					.map(|item| {
						let value = self.operand(&item.value, Precedence::Assignment)?;
						Ok(match &item.key {
							Some(key) => format!("{} => {value}", self.expression(key)?),
							None => value,
						})
					})
					.collect::<Result<Vec<_>>>()?;
				format!("[{}]", items.join(", "))
			}
			Expression::Match { subject, arms, .. } => {
				let inner = self.indentation(1);
				let mut code = format!("match ({}) {{\n", self.expression(subject)?);
				for arm in arms {
					let conditions = if arm.is_default() {
						"default".to_string()
					} else {
						arm.conditions.iter().map(|condition| self.expression(condition)).collect::<Result<Vec<_>>>()?.join(", ")
					};
					code.push_str(&format!("{inner}{conditions} => {},\n", self.nested(1).expression(&arm.body)?));
				}
				code.push_str(&format!("{}}}", self.indentation(0)));
				code
			}
			Expression::New(class) => format!("new {}", self.operand(class, Precedence::New)?),
			Expression::Clone(object) => format!("clone {}", self.operand(object, Precedence::New)?),
			Expression::Function(function) => self.closure(function)?,
		})
	}

	fn binary(&self, left: &Expression, token: &Token, right: &Expression) -> Result<String> {
		let precedence = Precedence::of_operator(&token.r#type);
		let (left_min, right_min) = match precedence {
			Precedence::Exponent | Precedence::Coalesce => (precedence.next(), precedence),
			Precedence::Equality | Precedence::Comparison => (precedence.next(), precedence.next()),
			_ => (precedence, precedence.next()),
		};
		let mut left = (self.operand(left, left_min)?, left);
		let mut right = (self.operand(right, right_min)?, right);
		if matches!(precedence, Precedence::Exponent | Precedence::Instanceof) {
			for (code, expression) in [&mut left, &mut right] {
				if matches!(expression, Expression::Unary { .. }) {
					*code = parenthesize(std::mem::take(code));
				}
			}
		}
		Ok(format!("{} {} {}", left.0, operator(token), right.0))
	}

	pub(super) fn arguments(&self, arguments: &[Expression]) -> Result<String> {
		let arguments = arguments
			.iter()
			.map(|argument| self.operand(argument, Precedence::Assignment))
			.collect::<Result<Vec<_>>>()?;
		Ok(arguments.join(", "))
	}

	/// Text and expressions joined with `.`.
	fn template(&self, parts: &[TemplatePart]) -> Result<String> {
		let mut pieces = parts
			.iter()
			.map(|part| match part {
				TemplatePart::Text(text) => Ok(string_literal(text)),
				TemplatePart::Expression(expression) => self.operand(expression, Precedence::Term),
			})
			.collect::<Result<Vec<_>>>()?;
		if pieces.len() == 1 {
			pieces.insert(0, "''".to_string());
		}
		Ok(pieces.join(" . "))
	}

	fn closure(&self, function: &FunctionExpression) -> Result<String> {
		let mut code = format!("function ({})", self.parameters(&function.parameters)?);
		if !function.captures().is_empty() {
			let captures = function.captures().iter().map(|name| format!("${name}")).collect::<Vec<_>>();
			code.push_str(&format!(" use ({})", captures.join(", ")));
		}
		code.push_str(&return_hint(&function.return_type));
		match &function.body {
			FunctionBody::Arrow(expression) => {
				code.push_str(&format!(" {{ return {}; }}", self.expression(expression)?));
			}
			FunctionBody::Block(statements) => {
				let mut body = self.function_body();
				body.statements(statements)?;
				code.push_str(&format!(" {{\n{}{}}}", body.output, self.indentation(0)));
			}
		}
		Ok(code)
	}
}

/// How a bound identifier reads in PHP.
fn identifier_name(identifier: &Identifier) -> Result<String> {
	let kind = identifier
		.binding()
		.ok_or_else(|| anyhow!("identifier `{}` on line {} was never bound", identifier.name, identifier.line))?;
	Ok(match kind {
		BindingKind::Variable | BindingKind::ClosureVariable => format!("${}", identifier.name),
		BindingKind::ClassProperty | BindingKind::ClassMethod => format!("$this->{}", identifier.name),
		BindingKind::ClassConst => format!("self::{}", identifier.name),
		BindingKind::Function | BindingKind::Class | BindingKind::RuntimeBuiltin => identifier.name.clone(),
	})
}
