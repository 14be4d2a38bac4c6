use std::{fs::read_to_string, io::Write, path::Path};

use anyhow::Context;
use tracing::debug;

use crate::{CompileError, CompileOptions, emitter::emit, parser::Parser, resolver::bind, scanner::Scanner, statement::Program};

/// Phloxer is the main struct for the compiler, it owns the options every
/// compilation runs with.
#[derive(Debug, Clone, Default)]
pub struct Phloxer {
	options: CompileOptions,
}

impl Phloxer {
	pub fn new(options: CompileOptions) -> Self { Self { options } }

	pub fn options(&self) -> &CompileOptions { &self.options }

	/// Compile `source` to a PHP file.
	pub fn compile(&self, source: &str) -> Result<String, CompileError> {
		let program = self.parse(source)?;
		bind(&program, &self.options.resolver)?;
		debug!("bound");
		emit(&program)
	}

	pub fn compile_file<P: AsRef<Path>>(&self, path: P) -> Result<String, CompileError> {
		let source = read_to_string(path).context("Failed open source file")?;
		self.compile(&source)
	}

	/// The parsed tree of a source file, one statement per line.
	pub fn ast<P: AsRef<Path>>(&self, path: P) -> Result<String, CompileError> {
		let source = read_to_string(path).context("Failed open source file")?;
		Ok(self.parse(&source)?.to_string())
	}

	/// Compile each line read from stdin and print the PHP.
	pub fn run_prompt(&self) {
		let mut input = String::new();
		let stdin = std::io::stdin();
		loop {
			input.clear();
			print!("> ");
			if let Err(e) = std::io::stdout().flush() {
				eprintln!("Failed flush: {e}");
			}
			match stdin.read_line(&mut input) {
				Ok(0) => {
					println!("\nExited phloxer repl");
					break;
				}
				Ok(_) => {}
				Err(e) => {
					eprintln!("Failed read line: {e}");
					continue;
				}
			}
			match self.compile(input.trim()) {
				Ok(php) => print!("{php}"),
				Err(e) => eprintln!("Failed compile prompt: {e}"),
			}
		}
	}
}

impl Phloxer {
	fn parse(&self, source: &str) -> Result<Program, CompileError> {
		let tokens = Scanner::new(source).scan_tokens()?;
		debug!(tokens = tokens.len(), "scanned");
		Parser::new(tokens, self.options.parser).parse()
	}
}
