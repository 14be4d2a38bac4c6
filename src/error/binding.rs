/// Errors that can occur while binding identifiers to declarations
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("line {line}: {type}")]
pub struct BindingError {
	pub line:   usize,
	pub r#type: BindingErrorType,
}

impl BindingError {
	pub fn new(line: usize, r#type: BindingErrorType) -> Self { Self { line, r#type } }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BindingErrorType {
	/// No reachable frame declares the name and the policy refuses to guess
	#[error("Undeclared identifier: {0}")]
	UndeclaredIdentifier(String),
	/// The tree was already bound by an earlier pass
	#[error("Identifier bound twice: {0}")]
	AlreadyBound(String),
}
