//! PHP source generation from a bound program.
//!
//! Every identifier must carry a binding, the kind decides how the name is
//! spelled: `$a`, `$this->a`, `self::A` or a bare function or class name.

mod expression;
pub mod types;

use anyhow::{Result, bail};
use tracing::debug;

use crate::{CompileError, emitter::types::{doc_type, return_hint, type_hint}, parser::types::TypeAnnotation, statement::{ClassDeclaration, ClassMember, FunctionBody, FunctionDeclaration, Parameter, Program, Statement, Visibility}};

const INDENT: &str = "    ";

/// Render `program` as a PHP file.
pub fn emit(program: &Program) -> Result<String, CompileError> {
	let mut emitter = Emitter::default();
	emitter.statements(&program.statements)?;
	debug!(bytes = emitter.output.len(), "emitted php");
	Ok(format!("<?php\n\n{}", emitter.output))
}

#[derive(Debug, Default)]
struct Emitter {
	output:      String,
	indent:      usize,
	/// Inside the body of a function, method, constructor or closure.
	in_function: bool,
}

impl Emitter {
	/// An empty emitter `levels` deeper than this one.
	fn nested(&self, levels: usize) -> Self {
		Self { output: String::new(), indent: self.indent + levels, in_function: self.in_function }
	}

	/// An empty emitter for a function body one level deeper.
	fn function_body(&self) -> Self { Self { in_function: true, ..self.nested(1) } }

	fn indentation(&self, levels: usize) -> String { INDENT.repeat(self.indent + levels) }

	fn line(&mut self, text: impl AsRef<str>) {
		let indentation = self.indentation(0);
		self.output.push_str(&indentation);
		self.output.push_str(text.as_ref());
		self.output.push('\n');
	}

	/// Append the output of a nested emitter.
	fn append(&mut self, nested: Self) { self.output.push_str(&nested.output) }

	/// Statements, with a blank line around function and class declarations.
	/// Inside a function body those declarations come first in their block.
	fn statements(&mut self, statements: &[Statement]) -> Result<()> {
		let statements = if self.in_function {
			let (declarations, rest): (Vec<_>, Vec<_>) =
				statements.iter().partition(|statement| is_declaration(statement));
			declarations.into_iter().chain(rest).collect::<Vec<_>>()
		} else {
			statements.iter().collect()
		};
		let mut after_declaration = false;
		for (i, statement) in statements.into_iter().enumerate() {
			let declaration = is_declaration(statement);
			if i > 0 && (declaration || after_declaration) {
				self.output.push('\n');
			}
			self.statement(statement)?;
			after_declaration = declaration;
		}
		Ok(())
	}

	/// A loop or branch body one level deeper, blocks are unwrapped.
	fn body(&self, statement: &Statement) -> Result<Self> {
		let mut body = self.nested(1);
		match statement {
			Statement::Block(statements) => body.statements(statements)?,
			statement => body.statement(statement)?,
		}
		Ok(body)
	}

	fn block(&self, statements: &[Statement]) -> Result<Self> {
		let mut body = self.nested(1);
		body.statements(statements)?;
		Ok(body)
	}

	fn statement(&mut self, statement: &Statement) -> Result<()> {
		match statement {
			Statement::Expression(_) | Statement::Var(_) | Statement::Destructuring(_) => {
				if let Statement::Var(var) = statement {
					if let Some(r#type) = var.r#type.as_ref().filter(|r#type| !r#type.is_representable()) {
						self.line(format!("/** @var {} ${} */", doc_type(r#type), var.name.lexeme));
					}
				}
				let code = self.simple_statement(statement)?;
				self.line(format!("{code};"));
			}
			Statement::Function(function) if self.in_function => {
				let condition = format!("!function_exists('{}')", function.name.lexeme);
				self.guarded(&condition, |body| body.function(function, None))?
			}
			Statement::Function(function) => self.function(function, None)?,
			Statement::Class(class) if self.in_function => {
				let condition = format!("!class_exists('{}', false)", class.name.lexeme);
				self.guarded(&condition, |body| body.class(class))?
			}
			Statement::Class(class) => self.class(class)?,
			Statement::Echo(values) => {
				let values = values.iter().map(|value| self.expression(value)).collect::<Result<Vec<_>>>()?;
				self.line(format!("echo {};", values.join(", ")));
			}
			Statement::Return(Some(value)) => {
				let value = self.expression(value)?;
				self.line(format!("return {value};"));
			}
			Statement::Return(None) => self.line("return;"),
			Statement::If { condition, then_branch, else_branch } => {
				let condition = self.expression(condition)?;
				self.line(format!("if ({condition}) {{"));
				let body = self.body(then_branch)?;
				self.append(body);
				let mut next = else_branch.as_deref();
				while let Some(branch) = next {
					if let Statement::If { condition, then_branch, else_branch } = branch {
						let condition = self.expression(condition)?;
						self.line(format!("}} elseif ({condition}) {{"));
						let body = self.body(then_branch)?;
						self.append(body);
						next = else_branch.as_deref();
					} else {
						self.line("} else {");
						let body = self.body(branch)?;
						self.append(body);
						next = None;
					}
				}
				self.line("}");
			}
			Statement::While { condition, body } => {
				let condition = self.expression(condition)?;
				self.line(format!("while ({condition}) {{"));
				let body = self.body(body)?;
				self.append(body);
				self.line("}");
			}
			Statement::For { initializer, condition, increment, body } => {
				let initializer = match initializer {
					Some(initializer) => self.simple_statement(initializer)?,
					None => String::new(),
				};
				let condition = match condition {
					Some(condition) => format!(" {}", self.expression(condition)?),
					None => String::new(),
				};
				let increment = match increment {
					Some(increment) => format!(" {}", self.expression(increment)?),
					None => String::new(),
				};
				self.line(format!("for ({initializer};{condition};{increment}) {{"));
				let body = self.body(body)?;
				self.append(body);
				self.line("}");
			}
			Statement::Foreach(foreach) => {
				let iterable = self.expression(&foreach.iterable)?;
				let key = match &foreach.key {
					Some(key) => format!("${} => ", key.name.lexeme),
					None => String::new(),
				};
				self.line(format!("foreach ({iterable} as {key}${}) {{", foreach.value.name.lexeme));
				let body = self.body(&foreach.body)?;
				self.append(body);
				self.line("}");
			}
			Statement::Block(statements) => {
				self.line("{");
				let body = self.block(statements)?;
				self.append(body);
				self.line("}");
			}
			Statement::Try { body, catches, finally } => {
				self.line("try {");
				let body = self.block(body)?;
				self.append(body);
				for catch in catches {
					let types = match catch.types.as_slice() {
						[] => "\\Throwable".to_string(),
						types => types.iter().map(|r#type| r#type.lexeme.as_str()).collect::<Vec<_>>().join("|"),
					};
					self.line(format!("}} catch ({types} ${}) {{", catch.variable.lexeme));
					let body = self.block(&catch.body)?;
					self.append(body);
				}
				if let Some(finally) = finally {
					self.line("} finally {");
					let body = self.block(finally)?;
					self.append(body);
				}
				self.line("}");
			}
			Statement::Throw(value) => {
				let value = self.expression(value)?;
				self.line(format!("throw {value};"));
			}
			Statement::Break => self.line("break;"),
			Statement::Continue => self.line("continue;"),
		}
		Ok(())
	}

	/// A statement that fits on one line without its `;`, also used as a
	/// `for` initializer.
	fn simple_statement(&self, statement: &Statement) -> Result<String> {
		Ok(match statement {
			Statement::Expression(expression) => self.expression(expression)?,
			Statement::Var(var) => {
				let value = match &var.initializer {
					Some(initializer) => self.expression(initializer)?,
					None => "null".to_string(),
				};
				format!("${} = {value}", var.name.lexeme)
			}
			Statement::Destructuring(destructuring) => {
				let elements = destructuring
					.elements
					.iter()
					.map(|element| match element {
						Some(element) => match &element.key {
							Some(key) => Ok(format!("{} => ${}", self.expression(key)?, element.name.lexeme)),
							None => Ok(format!("${}", element.name.lexeme)),
						},
						None => Ok(String::new()),
					})
					.collect::<Result<Vec<_>>>()?;
				format!("[{}] = {}", elements.join(", "), self.expression(&destructuring.initializer)?)
			}
			other => bail!("statement cannot be written on a single line: {other}"),
		})
	}

	fn parameters(&self, parameters: &[Parameter]) -> Result<String> {
		let parameters = parameters
			.iter()
			.map(|parameter| {
				let mut code = String::new();
				if let Some(promotion) = &parameter.promotion {
					code.push_str(visibility(promotion.visibility));
					if promotion.is_final {
						code.push_str(" final");
					}
					if !promotion.mutable {
						code.push_str(" readonly");
					}
					code.push(' ');
				}
				match &parameter.r#type {
					Some(r#type) => code.push_str(&format!("{} ", type_hint(r#type))),
					None if parameter.promotion.is_some_and(|promotion| !promotion.mutable) => code.push_str("mixed "),
					None => {}
				}
				code.push_str(&format!("${}", parameter.name.lexeme));
				if let Some(default) = &parameter.default {
					code.push_str(&format!(" = {}", self.expression(default)?));
				}
				Ok(code)
			})
			.collect::<Result<Vec<_>>>()?;
		Ok(parameters.join(", "))
	}

	/// `/** ... */` for the types a hint cannot express.
	fn docblock(&mut self, parameters: &[Parameter], return_type: &Option<TypeAnnotation>) {
		let mut tags = parameters
			.iter()
			.filter_map(|parameter| {
				let r#type = parameter.r#type.as_ref().filter(|r#type| !r#type.is_representable())?;
				Some(format!("@param {} ${}", doc_type(r#type), parameter.name.lexeme))
			})
			.collect::<Vec<_>>();
		if let Some(r#type) = return_type.as_ref().filter(|r#type| !r#type.is_representable()) {
			tags.push(format!("@return {}", doc_type(r#type)));
		}
		if tags.is_empty() {
			return;
		}
		self.line("/**");
		for tag in tags {
			self.line(format!(" * {tag}"));
		}
		self.line(" */");
	}

	/// `if (condition) { ... }` around what `emit` writes.
	fn guarded(&mut self, condition: &str, emit: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
		self.line(format!("if ({condition}) {{"));
		let mut body = self.nested(1);
		emit(&mut body)?;
		self.append(body);
		self.line("}");
		Ok(())
	}

	/// A named function, or a method when `visibility` is given.
	fn function(&mut self, function: &FunctionDeclaration, visibility: Option<&str>) -> Result<()> {
		self.docblock(&function.parameters, &function.return_type);
		let modifier = visibility.map(|visibility| format!("{visibility} ")).unwrap_or_default();
		let parameters = self.parameters(&function.parameters)?;
		self.line(format!(
			"{modifier}function {}({parameters}){}",
			function.name.lexeme,
			return_hint(&function.return_type)
		));
		self.line("{");
		let mut body = self.function_body();
		match &function.body {
			FunctionBody::Block(statements) => body.statements(statements)?,
			FunctionBody::Arrow(expression) => {
				let value = body.expression(expression)?;
				body.line(format!("return {value};"));
			}
		}
		self.append(body);
		self.line("}");
		Ok(())
	}

	fn class(&mut self, class: &ClassDeclaration) -> Result<()> {
		let mut header = format!("{}class {}", if class.is_abstract { "abstract " } else { "" }, class.name.lexeme);
		if let Some(superclass) = &class.superclass {
			header.push_str(&format!(" extends {}", superclass.name.lexeme));
		}
		let mut interfaces = class.interfaces.iter().map(|interface| interface.lexeme.clone()).collect::<Vec<_>>();
		if class.iterates.is_some() {
			interfaces.push("\\IteratorAggregate".to_string());
		}
		if !interfaces.is_empty() {
			header.push_str(&format!(" implements {}", interfaces.join(", ")));
		}
		self.line(header);
		self.line("{");

		// Sections are separated by a blank line.
		let mut sections: Vec<Self> = Vec::new();
		let mut constants = self.nested(1);
		let mut properties = self.nested(1);
		for member in &class.members {
			match member {
				ClassMember::Const(constant) => {
					let modifier = constant.visibility.map(|visibility| format!("{visibility} ")).unwrap_or_default();
					let value = constants.expression(&constant.initializer)?;
					constants.line(format!("{modifier}const {} = {value};", constant.name.lexeme));
				}
				ClassMember::Property(property) => {
					if let Some(r#type) = property.r#type.as_ref().filter(|r#type| !r#type.is_representable()) {
						properties.line(format!("/** @var {} */", doc_type(r#type)));
					}
					let mut code = visibility(property.visibility).to_string();
					if property.is_final {
						code.push_str(" final");
					}
					let readonly = !property.mutable && property.initializer.is_none();
					if readonly {
						code.push_str(" readonly");
					}
					match &property.r#type {
						Some(r#type) => code.push_str(&format!(" {}", type_hint(r#type))),
						None if readonly => code.push_str(" mixed"),
						None => {}
					}
					code.push_str(&format!(" ${}", property.name.lexeme));
					if let Some(initializer) = &property.initializer {
						code.push_str(&format!(" = {}", properties.expression(initializer)?));
					}
					properties.line(format!("{code};"));
				}
				_ => {}
			}
		}
		sections.extend([constants, properties].into_iter().filter(|section| !section.output.is_empty()));

		if class.has_constructor() {
			sections.push(self.constructor(class)?);
		}
		for member in &class.members {
			match member {
				ClassMember::Method(method) => {
					let mut section = self.nested(1);
					section.function(&method.function, Some(visibility(method.visibility)))?;
					sections.push(section);
				}
				ClassMember::AbstractMethod(method) => {
					let mut section = self.nested(1);
					section.docblock(&method.parameters, &method.return_type);
					let parameters = section.parameters(&method.parameters)?;
					section.line(format!(
						"abstract {} function {}({parameters}){};",
						visibility(method.visibility),
						method.name.lexeme,
						return_hint(&method.return_type)
					));
					sections.push(section);
				}
				_ => {}
			}
		}
		if let Some(iterates) = &class.iterates {
			let mut section = self.nested(1);
			section.line("public function getIterator(): \\Iterator");
			section.line("{");
			let mut body = section.nested(1);
			let iterable = body.expression(iterates)?;
			body.line(format!("yield from {iterable};"));
			section.append(body);
			section.line("}");
			sections.push(section);
		}

		for (i, section) in sections.into_iter().enumerate() {
			if i > 0 {
				self.output.push('\n');
			}
			self.append(section);
		}
		self.line("}");
		Ok(())
	}

	/// `__construct` with the promoted parameters, the parent call and the
	/// `init` blocks in source order.
	fn constructor(&self, class: &ClassDeclaration) -> Result<Self> {
		let mut section = self.nested(1);
		section.docblock(&class.parameters, &None);
		let parameters = section.parameters(&class.parameters)?;
		section.line(format!("{} function __construct({parameters})", visibility(class.constructor_visibility)));
		section.line("{");
		let mut body = section.function_body();
		if let Some(arguments) = class.superclass.as_ref().and_then(|superclass| superclass.arguments.as_ref()) {
			let arguments = body.arguments(arguments)?;
			body.line(format!("parent::__construct({arguments});"));
		}
		for member in &class.members {
			if let ClassMember::Initializer(statements) = member {
				body.statements(statements)?;
			}
		}
		section.append(body);
		section.line("}");
		Ok(section)
	}
}

fn is_declaration(statement: &Statement) -> bool { matches!(statement, Statement::Function(_) | Statement::Class(_)) }

fn visibility(visibility: Option<Visibility>) -> &'static str {
	match visibility.unwrap_or(Visibility::Public) {
		Visibility::Public => "public",
		Visibility::Protected => "protected",
		Visibility::Private => "private",
	}
}

#[cfg(test)]
mod tests {
	use indoc::indoc;

	use super::*;
	use crate::{ParserOptions, ResolverOptions, parser::Parser, resolver, scanner::Scanner};

	fn compile(source: &str) -> String {
		let tokens = Scanner::new(source).scan_tokens().unwrap();
		let program = Parser::new(tokens, ParserOptions::default()).parse().unwrap();
		resolver::bind(&program, &ResolverOptions::default()).unwrap();
		emit(&program).unwrap()
	}

	#[test]
	fn functions_and_calls() {
		let source = indoc! {"
			fun add(a: Int, b: Int): Int => a + b
			echo add(1, 2)
		"};
		assert_eq!(compile(source), indoc! {"
			<?php

			function add(int $a, int $b): int
			{
			    return $a + $b;
			}

			echo add(1, 2);
		"});
	}

	#[test]
	fn variables_and_operators() {
		let source = indoc! {"
			var name = 'world'
			val greeting = 'Hello, ' +. name
			echo greeting, strlen(name)
			var a = nil
			echo (1 + 2) * 3, 2 ** -1, !a instanceof B
			class B {}
		"};
		assert_eq!(compile(source), indoc! {"
			<?php

			$name = 'world';
			$greeting = 'Hello, ' . $name;
			echo $greeting, strlen($name);
			$a = null;
			echo (1 + 2) * 3, 2 ** (-1), (!$a) instanceof B;

			class B
			{
			}
		"});
	}

	#[test]
	fn closures_capture_by_list() {
		let source = indoc! {"
			fun adder(n) {
				return fun (x) => x + n
			}
			val twice = fun (f) {
				return f(f(1))
			}
		"};
		assert_eq!(compile(source), indoc! {"
			<?php

			function adder($n)
			{
			    return function ($x) use ($n) { return $x + $n; };
			}

			$twice = function ($f) {
			    return $f($f(1));
			};
		"});
	}

	#[test]
	fn declarations_in_function_bodies_are_hoisted_and_guarded() {
		let source = indoc! {"
			fun outer() {
				echo inner()
				fun inner() => 1
				class Helper {}
			}
		"};
		assert_eq!(compile(source), indoc! {"
			<?php

			function outer()
			{
			    if (!function_exists('inner')) {
			        function inner()
			        {
			            return 1;
			        }
			    }

			    if (!class_exists('Helper', false)) {
			        class Helper
			        {
			        }
			    }

			    echo inner();
			}
		"});
	}

	#[test]
	fn control_flow() {
		let source = indoc! {"
			for (var i = 0; i < 3; i++) {
				if (i == 0) echo 'zero'
				else if (i == 1) { echo 'one' }
				else { continue }
			}
			foreach (k, v in [1, 'b' => 2]) echo k, v
			while (true) break
		"};
		assert_eq!(compile(source), indoc! {"
			<?php

			for ($i = 0; $i < 3; $i++) {
			    if ($i == 0) {
			        echo 'zero';
			    } elseif ($i == 1) {
			        echo 'one';
			    } else {
			        continue;
			    }
			}
			foreach ([1, 'b' => 2] as $k => $v) {
			    echo $k, $v;
			}
			while (true) {
			    break;
			}
		"});
	}

	#[test]
	fn try_and_match() {
		let source = indoc! {"
			try {
				throw new Exception('no')
			} catch (e: InvalidArgumentException|RuntimeException) {
				echo 1
			} catch (e) {
				echo match (e) { 1, 2 => 'low', default => 'high' }
			} finally {
				echo 'done'
			}
		"};
		assert_eq!(compile(source), indoc! {"
			<?php

			try {
			    throw new Exception('no');
			} catch (InvalidArgumentException|RuntimeException $e) {
			    echo 1;
			} catch (\\Throwable $e) {
			    echo match ($e) {
			        1, 2 => 'low',
			        default => 'high',
			    };
			} finally {
			    echo 'done';
			}
		"});
	}

	#[test]
	fn classes() {
		let source = indoc! {"
			class Point(val x: Int, val y: Int = 0) extends Shape('point') {
				const ORIGIN = 0
				private var moves = 0
				init { moves = ORIGIN }
				fun length(): Float => sqrt(x * x + y * y)
			}
			abstract class Shape(var name: String) {
				abstract {
					fun area(): Float
				}
			}
		"};
		assert_eq!(compile(source), indoc! {"
			<?php

			class Point extends Shape
			{
			    const ORIGIN = 0;

			    private $moves = 0;

			    public function __construct(public readonly int $x, public readonly int $y = 0)
			    {
			        parent::__construct('point');
			        $this->moves = self::ORIGIN;
			    }

			    public function length(): float
			    {
			        return sqrt($this->x * $this->x + $this->y * $this->y);
			    }
			}

			abstract class Shape
			{
			    public function __construct(public string $name)
			    {
			    }

			    abstract public function area(): float;
			}
		"});
	}

	#[test]
	fn iterable_classes_with_generic_types() {
		let source = indoc! {"
			class Bag(val items: List<Int>) iterates items {
				fun first(): ?Int => items[0] ?? nil
			}
		"};
		assert_eq!(compile(source), indoc! {"
			<?php

			class Bag implements \\IteratorAggregate
			{
			    /**
			     * @param array<int> $items
			     */
			    public function __construct(public readonly array $items)
			    {
			    }

			    public function first(): ?int
			    {
			        return $this->items[0] ?? null;
			    }

			    public function getIterator(): \\Iterator
			    {
			        yield from $this->items;
			    }
			}
		"});
	}

	#[test]
	fn templates_and_escapes() {
		let source = "val who = 'you'\necho \"hi ${who}!\", \"${who}\", 'a\\'b'";
		assert_eq!(compile(source), indoc! {"
			<?php

			$who = 'you';
			echo 'hi ' . $who . '!', '' . $who, 'a\\'b';
		"});
	}

	#[test]
	fn chained_comparisons_are_parenthesized() {
		assert_eq!(compile("echo 1 < 2 < 3"), "<?php\n\necho (1 < 2) < 3;\n");
		assert_eq!(compile("echo 1 < 2 == true"), "<?php\n\necho 1 < 2 == true;\n");
		assert_eq!(compile("echo 1 == 2 == false"), "<?php\n\necho (1 == 2) == false;\n");
	}

	#[test]
	fn unbound_identifiers_fail() {
		let tokens = Scanner::new("echo a").scan_tokens().unwrap();
		let program = Parser::new(tokens, ParserOptions::default()).parse().unwrap();
		assert!(matches!(emit(&program), Err(CompileError::InternalError(_))));
	}
}
