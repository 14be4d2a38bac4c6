pub mod binding;
pub mod parser;
pub mod scanner;

use std::fmt::Display;

/// CompileError is the top-level error type for the compiler.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
	/// Internal compiler error, should never happen
	#[error("CompilerInternalError: {0}")]
	InternalError(#[from] anyhow::Error),
	/// Scanner errors encountered during scanning
	#[error("Generated {} scanner errors:\n{}", .0.len(), join_lines(.0))]
	ScannerErrors(Vec<scanner::ScanError>),
	/// The first parse error, strict mode aborts on it
	#[error("Parse error: {0}")]
	ParseError(#[from] parser::ParseError),
	/// Every parse error collected in recovery mode
	#[error("Generated {} parser errors:\n{}", .0.len(), join_lines(.0))]
	ParserErrors(Vec<parser::ParseError>),
	/// An identifier that no reachable scope declares
	#[error("Binding error: {0}")]
	BindingError(#[from] binding::BindingError),
}

fn join_lines<T: Display>(errors: &[T]) -> String {
	errors.iter().map(|e| e.to_string()).collect::<Vec<String>>().join("\n")
}
