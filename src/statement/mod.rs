//! There is no place in the grammar where both an expression and a statement
//! are allowed. The operands of, say, `+` are always expressions, never
//! statements. The body of a `while` loop is always a statement.
//!
//! Declarations live here too: variables, destructuring, functions and
//! classes with their members.

use std::fmt::{self, Display};

use crate::{environment::Environment, parser::{expression::Expression, types::TypeAnnotation}, scanner::Token, utils::RcCell};

/// A statement in the programming language.
#[derive(Debug, Clone)]
pub enum Statement {
	/// An expression used as a statement.
	Expression(Expression),
	/// A variable declaration statement.
	Var(VarDeclaration),
	/// `var [a, , 'k' => b] = value`
	Destructuring(Destructuring),
	Function(FunctionDeclaration),
	Class(ClassDeclaration),
	/// An output statement with one or more values.
	Echo(Vec<Expression>),
	/// A return statement.
	Return(Option<Expression>),
	If {
		condition:   Expression,
		then_branch: Box<Statement>,
		else_branch: Option<Box<Statement>>,
	},
	While {
		condition: Expression,
		body:      Box<Statement>,
	},
	For {
		initializer: Option<Box<Statement>>,
		condition:   Option<Expression>,
		increment:   Option<Expression>,
		body:        Box<Statement>,
	},
	Foreach(Foreach),
	/// A block of statements.
	Block(Vec<Statement>),
	Try {
		body:    Vec<Statement>,
		catches: Vec<CatchClause>,
		finally: Option<Vec<Statement>>,
	},
	Throw(Expression),
	/// A break statement to exit loops.
	Break,
	Continue,
}

#[derive(Debug, Clone)]
pub struct VarDeclaration {
	/// The token of the variable being declared.
	pub name:        Token,
	/// `var` declares a mutable variable, `val` an immutable one.
	pub mutable:     bool,
	pub r#type:      Option<TypeAnnotation>,
	/// An optional initializer expression.
	pub initializer: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct Destructuring {
	/// One slot per position, `None` for a hole.
	pub elements:    Vec<Option<DestructuringElement>>,
	pub mutable:     bool,
	pub initializer: Expression,
}

#[derive(Debug, Clone)]
pub struct DestructuringElement {
	pub key:    Option<Expression>,
	pub name:   Token,
	pub r#type: Option<TypeAnnotation>,
}

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
	pub name:        Token,
	pub parameters:  Vec<Parameter>,
	pub return_type: Option<TypeAnnotation>,
	pub body:        FunctionBody,
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
	Block(Vec<Statement>),
	/// `=> expression`, returns the expression.
	Arrow(Box<Expression>),
}

#[derive(Debug, Clone)]
pub struct Parameter {
	pub name:      Token,
	pub r#type:    Option<TypeAnnotation>,
	pub default:   Option<Expression>,
	/// Set for constructor parameters that also declare a property.
	pub promotion: Option<Promotion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Promotion {
	pub visibility: Option<Visibility>,
	pub mutable:    bool,
	pub is_final:   bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
	Public,
	Protected,
	Private,
}

impl Display for Visibility {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Visibility::Public => write!(f, "public"),
			Visibility::Protected => write!(f, "protected"),
			Visibility::Private => write!(f, "private"),
		}
	}
}

#[derive(Debug, Clone)]
pub struct ClassDeclaration {
	pub name:                   Token,
	pub is_abstract:            bool,
	pub constructor_visibility: Option<Visibility>,
	/// Constructor parameters from the class header.
	pub parameters:             Vec<Parameter>,
	pub superclass:             Option<SuperClass>,
	pub interfaces:             Vec<Token>,
	/// The expression instances iterate over.
	pub iterates:               Option<Expression>,
	pub members:                Vec<ClassMember>,
	/// Built while parsing unless environments are disabled.
	pub environment:            Option<RcCell<Environment>>,
}

impl ClassDeclaration {
	/// Whether the class needs a generated constructor.
	pub fn has_constructor(&self) -> bool {
		!self.parameters.is_empty()
			|| self.superclass.as_ref().is_some_and(|superclass| superclass.arguments.is_some())
			|| self.members.iter().any(|member| matches!(member, ClassMember::Initializer(_)))
	}
}

#[derive(Debug, Clone)]
pub struct SuperClass {
	pub name:      Token,
	/// Arguments forwarded to the parent constructor.
	pub arguments: Option<Vec<Expression>>,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
	Method(ClassMethod),
	AbstractMethod(AbstractMethod),
	Property(ClassProperty),
	Const(ClassConst),
	/// An `init { ... }` block, part of the constructor.
	Initializer(Vec<Statement>),
}

#[derive(Debug, Clone)]
pub struct ClassMethod {
	pub visibility: Option<Visibility>,
	pub function:   FunctionDeclaration,
}

#[derive(Debug, Clone)]
pub struct AbstractMethod {
	pub visibility:  Option<Visibility>,
	pub name:        Token,
	pub parameters:  Vec<Parameter>,
	pub return_type: Option<TypeAnnotation>,
}

#[derive(Debug, Clone)]
pub struct ClassProperty {
	pub visibility:  Option<Visibility>,
	pub is_final:    bool,
	pub mutable:     bool,
	pub name:        Token,
	pub r#type:      Option<TypeAnnotation>,
	pub initializer: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct ClassConst {
	pub visibility:  Option<Visibility>,
	pub name:        Token,
	pub r#type:      Option<TypeAnnotation>,
	pub initializer: Expression,
}

#[derive(Debug, Clone)]
pub struct Foreach {
	pub key:      Option<ForeachVariable>,
	pub value:    ForeachVariable,
	pub iterable: Expression,
	pub body:     Box<Statement>,
}

#[derive(Debug, Clone)]
pub struct ForeachVariable {
	pub name:   Token,
	pub r#type: Option<TypeAnnotation>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
	pub variable: Token,
	/// Caught class names, empty catches everything.
	pub types:    Vec<Token>,
	pub body:     Vec<Statement>,
}

/// The root of the tree
#[derive(Debug, Clone)]
pub struct Program {
	pub statements:  Vec<Statement>,
	/// The top level frame, functions and classes are hoisted into it.
	pub environment: Option<RcCell<Environment>>,
}

fn block(f: &mut fmt::Formatter<'_>, statements: &[Statement]) -> fmt::Result {
	write!(f, "(block")?;
	for statement in statements {
		write!(f, " {statement}")?;
	}
	write!(f, ")")
}

fn typed(f: &mut fmt::Formatter<'_>, r#type: &Option<TypeAnnotation>) -> fmt::Result {
	match r#type {
		Some(r#type) => write!(f, ": {type}"),
		None => Ok(()),
	}
}

fn parameters(parameters: &[Parameter]) -> String {
	parameters.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(" ")
}

impl Display for Statement {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Statement::Expression(expression) => write!(f, "{expression};"),
			Statement::Var(var) => {
				write!(f, "({} {}", if var.mutable { "var" } else { "val" }, var.name.lexeme)?;
				typed(f, &var.r#type)?;
				if let Some(initializer) = &var.initializer {
					write!(f, " = {initializer}")?;
				}
				write!(f, ")")
			}
			Statement::Destructuring(destructuring) => {
				write!(f, "({} [", if destructuring.mutable { "var" } else { "val" })?;
				for (i, element) in destructuring.elements.iter().enumerate() {
					if i > 0 {
						write!(f, " ")?;
					}
					match element {
						Some(element) => {
							if let Some(key) = &element.key {
								write!(f, "{key} => ")?;
							}
							write!(f, "{}", element.name.lexeme)?;
							typed(f, &element.r#type)?;
						}
						None => write!(f, "_")?,
					}
				}
				write!(f, "] = {})", destructuring.initializer)
			}
			Statement::Function(function) => write!(f, "{function}"),
			Statement::Class(class) => write!(f, "{class}"),
			Statement::Echo(values) => {
				write!(f, "(echo")?;
				for value in values {
					write!(f, " {value}")?;
				}
				write!(f, ")")
			}
			Statement::Return(Some(value)) => write!(f, "(return {value})"),
			Statement::Return(None) => write!(f, "(return)"),
			Statement::If { condition, then_branch, else_branch } => {
				write!(f, "(if {condition} {then_branch}")?;
				if let Some(else_branch) = else_branch {
					write!(f, " {else_branch}")?;
				}
				write!(f, ")")
			}
			Statement::While { condition, body } => write!(f, "(while {condition} {body})"),
			Statement::For { initializer, condition, increment, body } => {
				write!(f, "(for")?;
				match initializer {
					Some(initializer) => write!(f, " {initializer}")?,
					None => write!(f, " _")?,
				}
				match condition {
					Some(condition) => write!(f, " {condition}")?,
					None => write!(f, " _")?,
				}
				match increment {
					Some(increment) => write!(f, " {increment}")?,
					None => write!(f, " _")?,
				}
				write!(f, " {body})")
			}
			Statement::Foreach(foreach) => {
				write!(f, "(foreach")?;
				if let Some(key) = &foreach.key {
					write!(f, " {}", key.name.lexeme)?;
					typed(f, &key.r#type)?;
				}
				write!(f, " {}", foreach.value.name.lexeme)?;
				typed(f, &foreach.value.r#type)?;
				write!(f, " in {} {})", foreach.iterable, foreach.body)
			}
			Statement::Block(statements) => block(f, statements),
			Statement::Try { body, catches, finally } => {
				write!(f, "(try ")?;
				block(f, body)?;
				for catch in catches {
					write!(f, " (catch {}", catch.variable.lexeme)?;
					if !catch.types.is_empty() {
						let types = catch.types.iter().map(|t| t.lexeme.as_str()).collect::<Vec<_>>().join("|");
						write!(f, ": {types}")?;
					}
					write!(f, " ")?;
					block(f, &catch.body)?;
					write!(f, ")")?;
				}
				if let Some(finally) = finally {
					write!(f, " (finally ")?;
					block(f, finally)?;
					write!(f, ")")?;
				}
				write!(f, ")")
			}
			Statement::Throw(value) => write!(f, "(throw {value})"),
			Statement::Break => write!(f, "(break)"),
			Statement::Continue => write!(f, "(continue)"),
		}
	}
}

impl Display for FunctionDeclaration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "(fun {} ({})", self.name.lexeme, parameters(&self.parameters))?;
		typed(f, &self.return_type)?;
		write!(f, " {})", self.body)
	}
}

impl Display for FunctionBody {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FunctionBody::Block(statements) => block(f, statements),
			FunctionBody::Arrow(expression) => write!(f, "(=> {expression})"),
		}
	}
}

impl Display for Parameter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if let Some(promotion) = &self.promotion {
			if let Some(visibility) = promotion.visibility {
				write!(f, "{visibility} ")?;
			}
			if promotion.is_final {
				write!(f, "final ")?;
			}
			write!(f, "{} ", if promotion.mutable { "var" } else { "val" })?;
		}
		write!(f, "{}", self.name.lexeme)?;
		typed(f, &self.r#type)?;
		if let Some(default) = &self.default {
			write!(f, " = {default}")?;
		}
		Ok(())
	}
}

impl Display for ClassDeclaration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({}class {}", if self.is_abstract { "abstract " } else { "" }, self.name.lexeme)?;
		if let Some(visibility) = self.constructor_visibility {
			write!(f, " {visibility}")?;
		}
		if !self.parameters.is_empty() {
			write!(f, " ({})", parameters(&self.parameters))?;
		}
		if let Some(superclass) = &self.superclass {
			write!(f, " (extends {}", superclass.name.lexeme)?;
			for argument in superclass.arguments.iter().flatten() {
				write!(f, " {argument}")?;
			}
			write!(f, ")")?;
		}
		if !self.interfaces.is_empty() {
			let interfaces = self.interfaces.iter().map(|t| t.lexeme.as_str()).collect::<Vec<_>>().join(" ");
			write!(f, " (implements {interfaces})")?;
		}
		if let Some(iterates) = &self.iterates {
			write!(f, " (iterates {iterates})")?;
		}
		for member in &self.members {
			write!(f, " {member}")?;
		}
		write!(f, ")")
	}
}

impl Display for ClassMember {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ClassMember::Method(method) => write!(f, "{}", method.function),
			ClassMember::AbstractMethod(method) => {
				write!(f, "(abstract {} ({})", method.name.lexeme, parameters(&method.parameters))?;
				typed(f, &method.return_type)?;
				write!(f, ")")
			}
			ClassMember::Property(property) => {
				write!(f, "({} {}", if property.mutable { "var" } else { "val" }, property.name.lexeme)?;
				typed(f, &property.r#type)?;
				if let Some(initializer) = &property.initializer {
					write!(f, " = {initializer}")?;
				}
				write!(f, ")")
			}
			ClassMember::Const(constant) => {
				write!(f, "(const {}", constant.name.lexeme)?;
				typed(f, &constant.r#type)?;
				write!(f, " = {})", constant.initializer)
			}
			ClassMember::Initializer(statements) => {
				write!(f, "(init ")?;
				block(f, statements)?;
				write!(f, ")")
			}
		}
	}
}

impl Display for Program {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let statements = self.statements.iter().map(|s| s.to_string()).collect::<Vec<_>>();
		write!(f, "{}", statements.join("\n"))
	}
}
