use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::{Builtins, CompileOptions, ParserOptions, ResolverOptions, UnresolvedPolicy};

#[derive(Parser)]
#[command(name = "phloxer", about = "Compile a Lox dialect to PHP source.")]
pub struct Cli {
	#[command(subcommand)]
	pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
	/// Compile a source file
	File {
		path:        PathBuf,
		/// Write the PHP here instead of stdout
		#[arg(short, long)]
		output:      Option<PathBuf>,
		/// What an identifier no scope declares becomes
		#[arg(long, value_enum, default_value_t = Unresolved::Error)]
		unresolved:  Unresolved,
		/// Do not treat PHP standard functions and classes as declared
		#[arg(long)]
		no_builtins: bool,
	},
	/// Print the parsed tree of a source file
	Ast {
		path:    PathBuf,
		/// Report every parse error instead of the first
		#[arg(long)]
		recover: bool,
	},
	/// Compile lines from stdin
	Repl,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unresolved {
	Error,
	Variable,
	Function,
}

impl From<Unresolved> for UnresolvedPolicy {
	fn from(unresolved: Unresolved) -> Self {
		match unresolved {
			Unresolved::Error => UnresolvedPolicy::Error,
			Unresolved::Variable => UnresolvedPolicy::Variable,
			Unresolved::Function => UnresolvedPolicy::Function,
		}
	}
}

impl Mode {
	/// The compile options the flags ask for.
	pub fn options(&self) -> CompileOptions {
		match self {
			Mode::File { unresolved, no_builtins, .. } => CompileOptions {
				parser:   ParserOptions::default(),
				resolver: ResolverOptions {
					unresolved: (*unresolved).into(),
					builtins:   if *no_builtins { Builtins::none() } else { Builtins::php() },
				},
			},
			Mode::Ast { recover, .. } => CompileOptions {
				parser:   ParserOptions { recovery: *recover, ..ParserOptions::default() },
				resolver: ResolverOptions::default(),
			},
			Mode::Repl => CompileOptions::default(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn file_flags() {
		let cli = Cli::parse_from(["phloxer", "file", "a.lox", "-o", "a.php", "--unresolved", "function", "--no-builtins"]);
		let options = cli.mode.options();
		assert_eq!(options.resolver.unresolved, UnresolvedPolicy::Function);
		assert!(options.resolver.builtins.is_empty());
		match cli.mode {
			Mode::File { path, output, .. } => {
				assert_eq!(path, PathBuf::from("a.lox"));
				assert_eq!(output, Some(PathBuf::from("a.php")));
			}
			other => panic!("expected file mode, got {other:?}"),
		}
	}

	#[test]
	fn ast_recovery() {
		let cli = Cli::parse_from(["phloxer", "ast", "a.lox", "--recover"]);
		assert!(cli.mode.options().parser.recovery);
		let cli = Cli::parse_from(["phloxer", "repl"]);
		assert_eq!(cli.mode.options().resolver.unresolved, UnresolvedPolicy::Error);
	}
}
