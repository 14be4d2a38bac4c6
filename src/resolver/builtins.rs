use std::collections::HashSet;

/// Functions and classes the PHP runtime provides without a declaration.
const PHP: &[&str] = &[
	// functions
	"abs",
	"array_filter",
	"array_key_exists",
	"array_keys",
	"array_map",
	"array_merge",
	"array_pop",
	"array_push",
	"array_reduce",
	"array_reverse",
	"array_shift",
	"array_slice",
	"array_sum",
	"array_values",
	"ceil",
	"count",
	"date",
	"explode",
	"floatval",
	"floor",
	"implode",
	"in_array",
	"intval",
	"is_array",
	"is_int",
	"is_null",
	"is_numeric",
	"is_string",
	"iterator_to_array",
	"json_decode",
	"json_encode",
	"max",
	"microtime",
	"min",
	"pow",
	"print_r",
	"printf",
	"range",
	"round",
	"sort",
	"sprintf",
	"sqrt",
	"str_contains",
	"str_repeat",
	"str_replace",
	"str_starts_with",
	"strlen",
	"strtolower",
	"strtoupper",
	"strval",
	"substr",
	"time",
	"trim",
	"ucfirst",
	"usort",
	"var_dump",
	// classes and interfaces
	"ArrayIterator",
	"ArrayObject",
	"Closure",
	"Countable",
	"DateTime",
	"Error",
	"Exception",
	"Generator",
	"InvalidArgumentException",
	"IteratorAggregate",
	"LogicException",
	"RuntimeException",
	"Stringable",
	"Throwable",
	"Traversable",
	"stdClass",
];

/// An immutable table of names that resolve to `RuntimeBuiltin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Builtins {
	names: HashSet<String>,
}

impl Builtins {
	/// The PHP standard functions and classes.
	pub fn php() -> Self { Self::from_names(PHP.iter().copied()) }

	pub fn none() -> Self { Self { names: HashSet::new() } }

	pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
		Self { names: names.into_iter().map(str::to_string).collect() }
	}

	pub fn contains(&self, name: &str) -> bool { self.names.contains(name) }

	pub fn len(&self) -> usize { self.names.len() }

	pub fn is_empty(&self) -> bool { self.names.is_empty() }
}

impl Default for Builtins {
	fn default() -> Self { Self::php() }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builtin_tables() {
		let php = Builtins::php();
		assert!(php.contains("strlen"));
		assert!(php.contains("Exception"));
		assert!(!php.contains("strlen2"));
		assert_eq!(php.len(), PHP.len());
		assert!(Builtins::none().is_empty());
		assert_eq!(Builtins::default(), php);
		assert!(Builtins::from_names(["dump"]).contains("dump"));
	}
}
