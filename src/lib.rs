//! # How Lox source becomes PHP source
//!
//! User's source code: `val average = (min + max) / 2`

//! ## Scanning
//!
//! The scanner turns characters into tokens. Whitespace and comments are
//! dropped, newlines are not: a later line ends the statement before it, so
//! the parser needs each token's line. Double quoted strings become a run of
//! text parts and embedded expressions.

//! ## Parsing
//!
//! A recursive descent parser builds the syntax tree and, while it goes, the
//! frames that hold top level and class member names.
//!
//! ``` markdown
//! average (Statement::Var)
//! └── / (Expression::Binary)
//!     ├── (group) (Expression::Grouping)
//!     │   └── + (Expression::Binary)
//!     │       ├── min (Expression::Identifier)
//!     │       └── max (Expression::Identifier)
//!     └── 2 (Expression::Literal)
//! ```

//! ## Binding
//!
//! PHP spells a name differently depending on what it names: `$min` for a
//! variable, `$this->min` for a property, `self::MIN` for a constant and a
//! bare `min` for a function. The resolver walks the tree with a chain of
//! frames and writes the kind of every identifier into the tree. Closures also
//! learn which variables they capture, which becomes their `use (...)` list.

//! ## Emitting
//!
//! The emitter reads the bound tree and prints PHP. It adds the parentheses the
//! PHP precedence table needs and never looks a name up again.

pub mod cli;
mod emitter;
mod environment;
mod error;
mod options;
mod parser;
mod phloxer;
mod resolver;
mod scanner;
mod statement;
mod utils;
mod visitor;

pub use environment::BindingKind;
pub use error::{CompileError, binding::{BindingError, BindingErrorType}, parser::{ParseError, ParseErrorType}, scanner::{ScanError, ScanErrorType, ScannerError}};
pub use options::{CompileOptions, ParserOptions, ResolverOptions, UnresolvedPolicy};
pub use phloxer::Phloxer;
pub use resolver::Builtins;
