//! Knobs for one compilation. Every call builds its own state from these, so
//! the same options can be shared between compilations.

use crate::resolver::Builtins;

/// Options for the whole pipeline.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
	pub parser:   ParserOptions,
	pub resolver: ResolverOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
	/// Build scope frames while parsing. Callers that only want a syntax tree
	/// can turn this off, the resolver then creates the frames itself.
	pub environments: bool,
	/// Keep parsing after an error and report every error at the end.
	pub recovery:     bool,
	/// How deep statements and expressions may nest. Every operator of a
	/// chain such as `a + b + c` or `a.b().c` counts as one level.
	pub max_depth:    usize,
}

impl Default for ParserOptions {
	fn default() -> Self { Self { environments: true, recovery: false, max_depth: 64 } }
}

/// What to do with a name no frame or builtin declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedPolicy {
	/// Fail with an undeclared identifier error.
	#[default]
	Error,
	/// Treat it as a variable.
	Variable,
	/// Treat it as a function.
	Function,
}

#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
	pub unresolved: UnresolvedPolicy,
	pub builtins:   Builtins,
}
