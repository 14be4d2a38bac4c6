//! Tree traversal shared by the passes over a parsed program.
//!
//! Every `visit_*` method defaults to the matching `walk_*` function, which
//! visits the children of the node. A pass overrides the nodes it cares about
//! and calls `walk_*` itself when it still wants the children.

use crate::{parser::expression::{Expression, FunctionExpression, Identifier, TemplatePart}, scanner::Token, statement::{ClassDeclaration, ClassMember, FunctionBody, FunctionDeclaration, Parameter, Program, Statement}};

pub trait Visitor: Sized {
	type Error;

	fn visit_program(&mut self, program: &Program) -> Result<(), Self::Error> { walk_program(self, program) }

	fn visit_statement(&mut self, statement: &Statement) -> Result<(), Self::Error> { walk_statement(self, statement) }

	/// The statements of a block or a function body.
	fn visit_block(&mut self, statements: &[Statement]) -> Result<(), Self::Error> { walk_block(self, statements) }

	fn visit_expression(&mut self, expression: &Expression) -> Result<(), Self::Error> {
		walk_expression(self, expression)
	}

	fn visit_identifier(&mut self, _identifier: &Identifier) -> Result<(), Self::Error> { Ok(()) }

	/// A name introduced by `var`, destructuring, `foreach` or `catch`.
	fn visit_variable(&mut self, _name: &Token) -> Result<(), Self::Error> { Ok(()) }

	fn visit_function_declaration(&mut self, function: &FunctionDeclaration) -> Result<(), Self::Error> {
		walk_function(self, &function.parameters, &function.body)
	}

	fn visit_function_expression(&mut self, function: &FunctionExpression) -> Result<(), Self::Error> {
		walk_function(self, &function.parameters, &function.body)
	}

	fn visit_class_declaration(&mut self, class: &ClassDeclaration) -> Result<(), Self::Error> {
		walk_class_declaration(self, class)
	}
}

pub fn walk_program<V: Visitor>(visitor: &mut V, program: &Program) -> Result<(), V::Error> {
	visitor.visit_block(&program.statements)
}

pub fn walk_block<V: Visitor>(visitor: &mut V, statements: &[Statement]) -> Result<(), V::Error> {
	statements.iter().try_for_each(|statement| visitor.visit_statement(statement))
}

pub fn walk_statement<V: Visitor>(visitor: &mut V, statement: &Statement) -> Result<(), V::Error> {
	match statement {
		Statement::Expression(expression) | Statement::Throw(expression) => visitor.visit_expression(expression),
		Statement::Var(var) => {
			if let Some(initializer) = &var.initializer {
				visitor.visit_expression(initializer)?;
			}
			visitor.visit_variable(&var.name)
		}
		Statement::Destructuring(destructuring) => {
			visitor.visit_expression(&destructuring.initializer)?;
			for element in destructuring.elements.iter().flatten() {
				if let Some(key) = &element.key {
					visitor.visit_expression(key)?;
				}
				visitor.visit_variable(&element.name)?;
			}
			Ok(())
		}
		Statement::Function(function) => visitor.visit_function_declaration(function),
		Statement::Class(class) => visitor.visit_class_declaration(class),
		Statement::Echo(values) => values.iter().try_for_each(|value| visitor.visit_expression(value)),
		Statement::Return(value) => match value {
			Some(value) => visitor.visit_expression(value),
			None => Ok(()),
		},
		Statement::If { condition, then_branch, else_branch } => {
			visitor.visit_expression(condition)?;
			visitor.visit_statement(then_branch)?;
			match else_branch {
				Some(else_branch) => visitor.visit_statement(else_branch),
				None => Ok(()),
			}
		}
		Statement::While { condition, body } => {
			visitor.visit_expression(condition)?;
			visitor.visit_statement(body)
		}
		Statement::For { initializer, condition, increment, body } => {
			if let Some(initializer) = initializer {
				visitor.visit_statement(initializer)?;
			}
			if let Some(condition) = condition {
				visitor.visit_expression(condition)?;
			}
			if let Some(increment) = increment {
				visitor.visit_expression(increment)?;
			}
			visitor.visit_statement(body)
		}
		Statement::Foreach(foreach) => {
			visitor.visit_expression(&foreach.iterable)?;
			if let Some(key) = &foreach.key {
				visitor.visit_variable(&key.name)?;
			}
			visitor.visit_variable(&foreach.value.name)?;
			visitor.visit_statement(&foreach.body)
		}
		Statement::Block(statements) => visitor.visit_block(statements),
		Statement::Try { body, catches, finally } => {
			visitor.visit_block(body)?;
			for catch in catches {
				visitor.visit_variable(&catch.variable)?;
				visitor.visit_block(&catch.body)?;
			}
			match finally {
				Some(finally) => visitor.visit_block(finally),
				None => Ok(()),
			}
		}
		Statement::Break | Statement::Continue => Ok(()),
	}
}

/// Parameter defaults, then the body.
pub fn walk_function<V: Visitor>(visitor: &mut V, parameters: &[Parameter], body: &FunctionBody) -> Result<(), V::Error> {
	walk_parameters(visitor, parameters)?;
	walk_function_body(visitor, body)
}

pub fn walk_parameters<V: Visitor>(visitor: &mut V, parameters: &[Parameter]) -> Result<(), V::Error> {
	parameters.iter().filter_map(|parameter| parameter.default.as_ref()).try_for_each(|default| visitor.visit_expression(default))
}

pub fn walk_function_body<V: Visitor>(visitor: &mut V, body: &FunctionBody) -> Result<(), V::Error> {
	match body {
		FunctionBody::Block(statements) => visitor.visit_block(statements),
		FunctionBody::Arrow(expression) => visitor.visit_expression(expression),
	}
}

pub fn walk_class_declaration<V: Visitor>(visitor: &mut V, class: &ClassDeclaration) -> Result<(), V::Error> {
	walk_parameters(visitor, &class.parameters)?;
	for argument in class.superclass.iter().filter_map(|superclass| superclass.arguments.as_ref()).flatten() {
		visitor.visit_expression(argument)?;
	}
	if let Some(iterates) = &class.iterates {
		visitor.visit_expression(iterates)?;
	}
	class.members.iter().try_for_each(|member| walk_class_member(visitor, member))
}

pub fn walk_class_member<V: Visitor>(visitor: &mut V, member: &ClassMember) -> Result<(), V::Error> {
	match member {
		ClassMember::Method(method) => visitor.visit_function_declaration(&method.function),
		ClassMember::AbstractMethod(method) => walk_parameters(visitor, &method.parameters),
		ClassMember::Property(property) => match &property.initializer {
			Some(initializer) => visitor.visit_expression(initializer),
			None => Ok(()),
		},
		ClassMember::Const(constant) => visitor.visit_expression(&constant.initializer),
		ClassMember::Initializer(statements) => visitor.visit_block(statements),
	}
}

pub fn walk_expression<V: Visitor>(visitor: &mut V, expression: &Expression) -> Result<(), V::Error> {
	match expression {
		Expression::Literal(_) | Expression::This | Expression::Super => Ok(()),
		Expression::Template(parts) => parts.iter().try_for_each(|part| match part {
			TemplatePart::Text(_) => Ok(()),
			TemplatePart::Expression(expression) => visitor.visit_expression(expression),
		}),
		Expression::Identifier(identifier) => visitor.visit_identifier(identifier),
		Expression::Grouping(inner) | Expression::New(inner) | Expression::Clone(inner) => visitor.visit_expression(inner),
		Expression::Unary { right, .. } => visitor.visit_expression(right),
		Expression::Postfix { target, .. } => visitor.visit_expression(target),
		Expression::Binary { left, right, .. } => {
			visitor.visit_expression(left)?;
			visitor.visit_expression(right)
		}
		Expression::Ternary { condition, then_branch, else_branch } => {
			visitor.visit_expression(condition)?;
			visitor.visit_expression(then_branch)?;
			visitor.visit_expression(else_branch)
		}
		Expression::Assign { target, value, .. } => {
			visitor.visit_expression(target)?;
			visitor.visit_expression(value)
		}
		Expression::Call { callee, arguments, .. } => {
			visitor.visit_expression(callee)?;
			arguments.iter().try_for_each(|argument| visitor.visit_expression(argument))
		}
		Expression::Get { object, .. } | Expression::NullsafeGet { object, .. } => visitor.visit_expression(object),
		Expression::StaticGet { class, .. } => visitor.visit_expression(class),
		Expression::Index { object, index, .. } => {
			visitor.visit_expression(object)?;
			match index {
				Some(index) => visitor.visit_expression(index),
				None => Ok(()),
			}
		}
		Expression::Array(items) => items.iter().try_for_each(|item| {
			if let Some(key) = &item.key {
				visitor.visit_expression(key)?;
			}
			visitor.visit_expression(&item.value)
		}),
		Expression::Match { subject, arms, .. } => {
			visitor.visit_expression(subject)?;
			arms.iter().try_for_each(|arm| {
				arm.conditions.iter().try_for_each(|condition| visitor.visit_expression(condition))?;
				visitor.visit_expression(&arm.body)
			})
		}
		Expression::Function(function) => visitor.visit_function_expression(function),
	}
}
