#[derive(thiserror::Error, Debug)]
pub enum ParserError {
	#[error("{0}")]
	InternalError(#[from] anyhow::Error),
	#[error(transparent)]
	ParseError(#[from] ParseError),
}

/// A grammar rule the next token could not satisfy.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("line {line}: {type} {at}")]
pub struct ParseError {
	pub line:   usize,
	pub r#type: ParseErrorType,
	/// Where the error happened, `at end` or `at 'lexeme'`.
	pub at:     String,
}

impl ParseError {
	pub fn new(line: usize, r#type: ParseErrorType, at: String) -> Self { Self { line, r#type, at } }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorType {
	/// `Expect X`, the payload is the full message.
	Expect(&'static str),
	ExpectedExpression,
	InvalidAssignmentTarget,
	InvalidPostfixTarget,
	/// Nesting exceeded the configured recursion guard.
	TooDeep(usize),
}

impl std::fmt::Display for ParseErrorType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use ParseErrorType::*;
		match self {
			Expect(message) => {
				write!(f, "{message}")
			}
			ExpectedExpression => {
				write!(f, "Expect expression.")
			}
			InvalidAssignmentTarget => {
				write!(f, "Invalid assignment target.")
			}
			InvalidPostfixTarget => {
				write!(f, "Invalid postfix target.")
			}
			TooDeep(limit) => {
				write!(f, "Nesting deeper than {limit} levels.")
			}
		}
	}
}
