/// A token produced by the scanner
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
	pub r#type: TokenType,
	pub lexeme: String,
	pub line:   usize,
}

impl Token {
	pub fn new(r#type: TokenType, lexeme: impl Into<String>, line: usize) -> Self {
		Self { r#type, lexeme: lexeme.into(), line }
	}
}

/// The different types of tokens, literal tokens carry their value
#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
	/// New Line Character `\n`.
	NewLine,
	/// Empty Character: ` `, `\r`, `\t`.
	EmptyChar,
	/// Comment `//` or /* ... */
	Comment,
	/// Left parenthesis `(`.
	LeftParen,
	/// Right parenthesis `)`.
	RightParen,
	/// Left brace `{`.
	LeftBrace,
	/// Right brace `}`.
	RightBrace,
	/// Left bracket `[`.
	LeftBracket,
	/// Right bracket `]`.
	RightBracket,
	/// Comma `,`.
	Comma,
	/// Dot `.`.
	Dot,
	/// Null-safe member access `?.`.
	QuestionDot,
	/// Static member access `::`.
	ColonColon,
	/// Colon `:`.
	Colon,
	/// Semicolon `;`.
	Semicolon,
	/// Question mark `?`.
	Question,
	/// Null coalesce `??`.
	QuestionQuestion,
	/// Null coalesce assignment `??=`.
	QuestionQuestionEqual,
	/// Fat arrow `=>`.
	Arrow,
	/// Pipe `|`, separates union types.
	Pipe,
	/// Logical and `&&`.
	AmpAmp,
	/// Logical or `||`.
	PipePipe,
	/// Minus `-`.
	Minus,
	/// Minus equal `-=`.
	MinusEqual,
	/// Decrement `--`.
	MinusMinus,
	/// Plus `+`.
	Plus,
	/// Plus equal `+=`.
	PlusEqual,
	/// Increment `++`.
	PlusPlus,
	/// String concatenation `+.`.
	PlusDot,
	/// String concatenation assignment `+.=`.
	PlusDotEqual,
	/// Slash `/`.
	Slash,
	/// Slash equal `/=`.
	SlashEqual,
	/// Asterisk `*`.
	Star,
	/// Asterisk equal `*=`.
	StarEqual,
	/// Exponent `**`.
	StarStar,
	/// Exponent assignment `**=`.
	StarStarEqual,
	/// Percent `%`.
	Percent,
	/// Percent equal `%=`.
	PercentEqual,
	/// Bang `!`.
	Bang,
	/// Bang equal `!=`.
	BangEqual,
	/// Not identical `!==`.
	BangEqualEqual,
	/// Equal `=`.
	Equal,
	/// Equal equal `==`.
	EqualEqual,
	/// Identical `===`.
	EqualEqualEqual,
	/// Greater than `>`.
	Greater,
	/// Greater than or equal `>=`.
	GreaterEqual,
	/// Less than `<`.
	Less,
	/// Less than or equal `<=`.
	LessEqual,
	/// Spaceship `<=>`.
	Spaceship,
	/// Identifier, e.g. variable or function name.
	Identifier,
	/// Single quoted string literal, e.g. `'hello'`.
	StringLiteral(String),
	/// Number literal, e.g. `123.45`.
	NumberLiteral(f64),
	/// Opening `"` of a double quoted string.
	TemplateStart,
	/// Literal text inside a double quoted string.
	StringPart(String),
	/// `${` inside a double quoted string.
	InterpolationStart,
	/// The `}` closing an interpolation.
	InterpolationEnd,
	/// Closing `"` of a double quoted string.
	TemplateEnd,
	Abstract,
	/// Logical AND keyword.
	And,
	Break,
	Catch,
	/// Class keyword.
	Class,
	Clone,
	Const,
	Continue,
	/// Match fallback arm.
	Default,
	/// Output statement keyword.
	Echo,
	/// Else keyword.
	Else,
	Extends,
	/// Boolean literal `false`.
	False,
	Final,
	Finally,
	/// For loop keyword.
	For,
	Foreach,
	/// Function keyword.
	Fun,
	/// If statement keyword.
	If,
	Implements,
	In,
	Instanceof,
	/// Marks the expression a class iterates over.
	Iterates,
	Match,
	New,
	/// Nil literal (null equivalent).
	Nil,
	/// Logical OR keyword.
	Or,
	Private,
	Protected,
	Public,
	/// Return statement keyword.
	Return,
	/// Super keyword (for inheritance).
	Super,
	/// This keyword (current instance reference).
	This,
	Throw,
	/// Boolean literal `true`.
	True,
	Try,
	/// Immutable variable declaration keyword.
	Val,
	/// Variable declaration keyword.
	Var,
	/// While loop keyword.
	While,
	/// End of file/input.
	Eof,
}

impl TokenType {
	pub fn is_ignored(&self) -> bool {
		matches!(self, TokenType::EmptyChar | TokenType::NewLine | TokenType::Comment)
	}

	/// Whether a token of this type begins a declaration, which also ends the
	/// statement before it.
	pub fn starts_declaration(&self) -> bool {
		use TokenType::*;
		matches!(
			self,
			Abstract
				| Break | Class | Continue
				| Echo | For | Foreach
				| Fun | If | Return
				| Throw | Try | Val
				| Var | While
		)
	}

	pub fn keyword_or_identifier(value: &str) -> Self {
		match value {
			"abstract" => TokenType::Abstract,
			"and" => TokenType::And,
			"break" => TokenType::Break,
			"catch" => TokenType::Catch,
			"class" => TokenType::Class,
			"clone" => TokenType::Clone,
			"const" => TokenType::Const,
			"continue" => TokenType::Continue,
			"default" => TokenType::Default,
			"echo" => TokenType::Echo,
			"else" => TokenType::Else,
			"extends" => TokenType::Extends,
			"false" => TokenType::False,
			"final" => TokenType::Final,
			"finally" => TokenType::Finally,
			"for" => TokenType::For,
			"foreach" => TokenType::Foreach,
			"fun" => TokenType::Fun,
			"if" => TokenType::If,
			"implements" => TokenType::Implements,
			"in" => TokenType::In,
			"instanceof" => TokenType::Instanceof,
			"iterates" => TokenType::Iterates,
			"match" => TokenType::Match,
			"new" => TokenType::New,
			"nil" => TokenType::Nil,
			"or" => TokenType::Or,
			"private" => TokenType::Private,
			"protected" => TokenType::Protected,
			"public" => TokenType::Public,
			"return" => TokenType::Return,
			"super" => TokenType::Super,
			"this" => TokenType::This,
			"throw" => TokenType::Throw,
			"true" => TokenType::True,
			"try" => TokenType::Try,
			"val" => TokenType::Val,
			"var" => TokenType::Var,
			"while" => TokenType::While,
			_ => TokenType::Identifier,
		}
	}
}
