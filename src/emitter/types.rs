//! Type annotations as PHP type hints and docblock types.

use crate::parser::types::TypeAnnotation;

fn php_name(name: &str) -> &str {
	match name {
		"Int" => "int",
		"Float" => "float",
		"String" => "string",
		"Bool" => "bool",
		"Any" => "mixed",
		"Void" => "void",
		"Nil" => "null",
		"List" | "Array" | "Map" => "array",
		"Callable" => "callable",
		"Iterable" => "iterable",
		"Object" => "object",
		other => other,
	}
}

/// The type hint, generic arguments are dropped.
pub fn type_hint(annotation: &TypeAnnotation) -> String {
	match annotation {
		TypeAnnotation::Named { name, nullable, .. } => {
			let name = php_name(name);
			if *nullable && !matches!(name, "mixed" | "null") { format!("?{name}") } else { name.to_string() }
		}
		TypeAnnotation::Union(alternatives) => {
			let mut names: Vec<String> = Vec::new();
			for alternative in alternatives {
				let (hint, nullable) = match alternative {
					TypeAnnotation::Named { name, nullable, .. } => (php_name(name).to_string(), *nullable),
					union => (type_hint(union), false),
				};
				for name in std::iter::once(hint).chain(nullable.then(|| "null".to_string())) {
					if !names.contains(&name) {
						names.push(name);
					}
				}
			}
			names.join("|")
		}
	}
}

/// The full type with its arguments, for docblocks.
pub fn doc_type(annotation: &TypeAnnotation) -> String {
	match annotation {
		TypeAnnotation::Named { name, arguments, nullable } => {
			let mut doc = if *nullable { format!("?{}", php_name(name)) } else { php_name(name).to_string() };
			if !arguments.is_empty() {
				let arguments = arguments.iter().map(doc_type).collect::<Vec<_>>().join(", ");
				doc.push_str(&format!("<{arguments}>"));
			}
			doc
		}
		TypeAnnotation::Union(alternatives) => alternatives.iter().map(doc_type).collect::<Vec<_>>().join("|"),
	}
}

/// `: hint` after a parameter list, or nothing.
pub fn return_hint(annotation: &Option<TypeAnnotation>) -> String {
	annotation.as_ref().map(|annotation| format!(": {}", type_hint(annotation))).unwrap_or_default()
}
