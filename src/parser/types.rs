use std::fmt::{self, Display};

use TokenType::*;

use crate::{error::parser::ParserError, parser::Parser, scanner::TokenType};

/// A type annotation as written in the source, `?Map<String, Int>|Nil`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotation {
	Named { name: String, arguments: Vec<TypeAnnotation>, nullable: bool },
	/// Two or more alternatives joined by `|`.
	Union(Vec<TypeAnnotation>),
}

impl TypeAnnotation {
	pub fn named(name: &str) -> Self { Self::Named { name: name.to_string(), arguments: Vec::new(), nullable: false } }

	/// Whether a PHP type hint can express the annotation in full, generic
	/// arguments only survive in docblocks.
	pub fn is_representable(&self) -> bool {
		match self {
			Self::Named { arguments, .. } => arguments.is_empty(),
			Self::Union(alternatives) => alternatives.iter().all(Self::is_representable),
		}
	}
}

impl Display for TypeAnnotation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Named { name, arguments, nullable } => {
				if *nullable {
					write!(f, "?")?;
				}
				write!(f, "{name}")?;
				if !arguments.is_empty() {
					let arguments = arguments.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
					write!(f, "<{arguments}>")?;
				}
				Ok(())
			}
			Self::Union(alternatives) => {
				let alternatives = alternatives.iter().map(|a| a.to_string()).collect::<Vec<_>>().join("|");
				write!(f, "{alternatives}")
			}
		}
	}
}

impl Parser {
	/// Parse `?Name<Argument, ...>` optionally followed by `| alternative`.
	pub(super) fn type_annotation(&mut self) -> Result<TypeAnnotation, ParserError> {
		let first = self.named_type()?;
		if !self.check(&Pipe) {
			return Ok(first);
		}
		let mut alternatives = vec![first];
		while self.match_tokens(&[Pipe]) {
			alternatives.push(self.named_type()?);
		}
		Ok(TypeAnnotation::Union(alternatives))
	}

	fn named_type(&mut self) -> Result<TypeAnnotation, ParserError> {
		let nullable = self.match_tokens(&[Question]);
		let name = self.consume(Identifier, "Expect type name.")?;
		let mut arguments = Vec::new();
		if self.match_tokens(&[Less]) {
			loop {
				arguments.push(self.type_annotation()?);
				if !self.match_tokens(&[Comma]) {
					break;
				}
			}
			self.consume(Greater, "Expect '>' after type arguments.")?;
		}
		Ok(TypeAnnotation::Named { name: name.lexeme, arguments, nullable })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn representable_types() {
		assert!(TypeAnnotation::named("Int").is_representable());
		let list = TypeAnnotation::Named {
			name:      "List".to_string(),
			arguments: vec![TypeAnnotation::named("Int")],
			nullable:  false,
		};
		assert!(!list.is_representable());
		assert!(!TypeAnnotation::Union(vec![TypeAnnotation::named("Nil"), list.clone()]).is_representable());
		assert_eq!(list.to_string(), "List<Int>");
	}
}
