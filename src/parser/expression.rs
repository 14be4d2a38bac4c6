//! Expression AST nodes
//!
//! An `Expression` is a tree structure representing code like `-123 *
//! (45.67)` as nested nodes. Every node owns its children.
//!
//! `Display` renders the tree as an S-expression, which is what the parser
//! tests compare against.

use std::{cell::OnceCell, fmt::{self, Display}};

use crate::{environment::BindingKind, parser::types::TypeAnnotation, scanner::Token, statement::{FunctionBody, Parameter}};

/// Expression AST nodes
#[derive(Debug, Clone)]
pub enum Expression {
	Literal(LiteralValue),
	/// A double quoted string with at least one interpolation, or several text parts.
	Template(Vec<TemplatePart>),
	Identifier(Identifier),
	This,
	Super,
	Grouping(Box<Expression>),
	Unary { operator: Token, right: Box<Expression> },
	/// `i++` and `i--`, the target is always an identifier.
	Postfix { operator: Token, target: Box<Expression> },
	Binary { left: Box<Expression>, operator: Token, right: Box<Expression> },
	Ternary { condition: Box<Expression>, then_branch: Box<Expression>, else_branch: Box<Expression> },
	/// Plain and compound assignment, the target is an identifier, member get or index.
	Assign { target: Box<Expression>, operator: Token, value: Box<Expression> },
	Call { callee: Box<Expression>, arguments: Vec<Expression> },
	/// `object.name`
	Get { object: Box<Expression>, name: Token },
	/// `object?.name`
	NullsafeGet { object: Box<Expression>, name: Token },
	/// `Class::name`
	StaticGet { class: Box<Expression>, name: Token },
	/// `object[index]`, or `object[]` when appending.
	Index { object: Box<Expression>, index: Option<Box<Expression>> },
	Array(Vec<ArrayItem>),
	Match { subject: Box<Expression>, arms: Vec<MatchArm> },
	New(Box<Expression>),
	Clone(Box<Expression>),
	Function(FunctionExpression),
}

impl Expression {
	pub fn unary(operator: Token, right: Box<Self>) -> Box<Self> { Box::new(Self::Unary { operator, right }) }

	pub fn binary(left: Box<Self>, operator: Token, right: Box<Self>) -> Box<Self> {
		Box::new(Self::Binary { left, operator, right })
	}

	pub fn ternary(condition: Box<Self>, then_branch: Box<Self>, else_branch: Box<Self>) -> Box<Self> {
		Box::new(Self::Ternary { condition, then_branch, else_branch })
	}

	pub fn assign(target: Box<Self>, operator: Token, value: Box<Self>) -> Box<Self> {
		Box::new(Self::Assign { target, operator, value })
	}

	pub fn call(callee: Box<Self>, arguments: Vec<Self>) -> Box<Self> { Box::new(Self::Call { callee, arguments }) }

	/// Whether the expression may stand on the left of `=`.
	pub fn is_assignable(&self) -> bool { matches!(self, Self::Identifier(_) | Self::Get { .. } | Self::Index { .. }) }
}

/// Literal values in the AST
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
	Number(f64),
	String(String),
	Boolean(bool),
	Nil,
}

/// A name used as a value. The resolver records what it refers to exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
	pub name: String,
	pub line: usize,
	binding:  OnceCell<BindingKind>,
}

impl Identifier {
	pub fn new(name: &str, line: usize) -> Self { Self { name: name.to_string(), line, binding: OnceCell::new() } }

	pub fn binding(&self) -> Option<BindingKind> { self.binding.get().copied() }

	/// Record the binding, fails with the existing kind when already bound.
	pub fn bind(&self, kind: BindingKind) -> Result<(), BindingKind> {
		self.binding.set(kind).map_err(|_| self.binding().unwrap_or(kind))
	}
}

#[derive(Debug, Clone)]
pub enum TemplatePart {
	Text(String),
	Expression(Expression),
}

/// `value` or `key => value` inside an array literal
#[derive(Debug, Clone)]
pub struct ArrayItem {
	pub key:   Option<Expression>,
	pub value: Expression,
}

#[derive(Debug, Clone)]
pub struct MatchArm {
	/// Empty for the `default` arm.
	pub conditions: Vec<Expression>,
	pub body:       Expression,
}

impl MatchArm {
	pub fn is_default(&self) -> bool { self.conditions.is_empty() }
}

/// An anonymous function. The resolver fills in the variables it captures.
#[derive(Debug, Clone)]
pub struct FunctionExpression {
	pub parameters:  Vec<Parameter>,
	pub return_type: Option<TypeAnnotation>,
	pub body:        FunctionBody,
	pub line:        usize,
	captures:        OnceCell<Vec<String>>,
}

impl FunctionExpression {
	pub fn new(parameters: Vec<Parameter>, return_type: Option<TypeAnnotation>, body: FunctionBody, line: usize) -> Self {
		Self { parameters, return_type, body, line, captures: OnceCell::new() }
	}

	/// Captured names in first-use order, empty until resolved.
	pub fn captures(&self) -> &[String] { self.captures.get().map(Vec::as_slice).unwrap_or_default() }

	pub fn set_captures(&self, captures: Vec<String>) -> Result<(), Vec<String>> { self.captures.set(captures) }
}

impl Display for Expression {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Expression::Literal(lit) => write!(f, "{lit}"),
			Expression::Template(parts) => {
				write!(f, "(template")?;
				for part in parts {
					match part {
						TemplatePart::Text(text) => write!(f, " {:?}", text)?,
						TemplatePart::Expression(expr) => write!(f, " {expr}")?,
					}
				}
				write!(f, ")")
			}
			Expression::Identifier(identifier) => write!(f, "{}", identifier.name),
			Expression::This => write!(f, "this"),
			Expression::Super => write!(f, "super"),
			Expression::Grouping(expression) => write!(f, "(group {expression})"),
			Expression::Unary { operator, right } => write!(f, "({} {right})", operator.lexeme),
			Expression::Postfix { operator, target } => write!(f, "(post{} {target})", operator.lexeme),
			Expression::Binary { left, operator, right } => write!(f, "({} {left} {right})", operator.lexeme),
			Expression::Ternary { condition, then_branch, else_branch } => {
				write!(f, "(? {condition} {then_branch} {else_branch})")
			}
			Expression::Assign { target, operator, value } => write!(f, "({} {target} {value})", operator.lexeme),
			Expression::Call { callee, arguments, .. } => {
				write!(f, "(call {callee}")?;
				for argument in arguments {
					write!(f, " {argument}")?;
				}
				write!(f, ")")
			}
			Expression::Get { object, name } => write!(f, "(. {object} {})", name.lexeme),
			Expression::NullsafeGet { object, name } => write!(f, "(?. {object} {})", name.lexeme),
			Expression::StaticGet { class, name } => write!(f, "(:: {class} {})", name.lexeme),
			Expression::Index { object, index: Some(index), .. } => write!(f, "([] {object} {index})"),
			Expression::Index { object, index: None, .. } => write!(f, "([] {object})"),
			Expression::Array(items) => {
				write!(f, "(array")?;
				for item in items {
					match &item.key {
						Some(key) => write!(f, " (=> {key} {})", item.value)?,
						None => write!(f, " {}", item.value)?,
					}
				}
				write!(f, ")")
			}
			Expression::Match { subject, arms, .. } => {
				write!(f, "(match {subject}")?;
				for arm in arms {
					if arm.is_default() {
						write!(f, " (default => {})", arm.body)?;
					} else {
						let conditions = arm.conditions.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" ");
						write!(f, " ({conditions} => {})", arm.body)?;
					}
				}
				write!(f, ")")
			}
			Expression::New(class) => write!(f, "(new {class})"),
			Expression::Clone(object) => write!(f, "(clone {object})"),
			Expression::Function(function) => {
				let parameters = function.parameters.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(" ");
				write!(f, "(fun ({parameters})")?;
				if let Some(return_type) = &function.return_type {
					write!(f, ": {return_type}")?;
				}
				write!(f, " {})", function.body)
			}
		}
	}
}

impl Display for LiteralValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LiteralValue::Number(n) => write!(f, "{n}"),
			LiteralValue::String(s) => write!(f, "{s:?}"),
			LiteralValue::Boolean(b) => write!(f, "{b}"),
			LiteralValue::Nil => write!(f, "nil"),
		}
	}
}
