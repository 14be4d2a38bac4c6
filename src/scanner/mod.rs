//! Turns source text into tokens.
//!
//! Keywords are part of the shape of the language’s grammar, so at the point
//! that we recognize a lexeme we also remember which kind of lexeme it
//! represents: a different type for each keyword, operator, bit of punctuation
//! and literal type. We can’t detect a reserved word until we’ve reached the
//! end of what might instead be an identifier, this is `maximal munch`.
//!
//! Double quoted strings are not a single token. The scanner splits them into
//! a run of literal text and embedded expressions:
//!
//! ``` markdown
//! "Hi ${name}!"  =>  TemplateStart StringPart("Hi ") InterpolationStart
//!                    Identifier(name) InterpolationEnd StringPart("!") TemplateEnd
//! ```
//!
//! Braces inside an interpolation nest, so the scanner keeps one open-brace
//! counter per unclosed `${`.
mod token;

use std::{iter::Peekable, str::CharIndices};

use TokenType::*;
use anyhow::Context;
pub use token::*;
use tracing::debug;

use crate::{CompileError, ScanError, ScanErrorType, ScannerError};

/// A scanner for source code
pub struct Scanner<'a> {
	/// User input source code
	source:         &'a str,
	/// User input source code iterator
	source_iter:    Peekable<CharIndices<'a>>,
	/// Points at the beginning of the current lexeme
	start:          usize,
	/// Points at the character currently being considered
	cursor:         usize,
	/// Tracks what source line `current` is on so we can produce tokens that know
	/// their location.
	line:           usize,
	/// Open brace count for every unclosed `${`, innermost last.
	interpolations: Vec<usize>,
}

impl<'a> Scanner<'a> {
	pub fn new(source: &'a str) -> Self {
		let source_iter = source.char_indices().peekable();

		Self { source, source_iter, start: 0, cursor: 0, line: 1, interpolations: Vec::new() }
	}

	/// Scan all tokens from the source code
	pub fn scan_tokens(mut self) -> Result<Vec<Token>, CompileError> {
		let mut tokens = Vec::new();
		let mut errors = Vec::new();
		while let Some(&(index, _)) = self.source_iter.peek() {
			// We are at the beginning of the next lexeme.
			self.start = index;
			self.cursor = self.start;
			match self.scan_token(&mut tokens) {
				Err(ScannerError::ScanError(e)) => {
					debug!("scan error: {e}");
					errors.push(e);
				}
				Err(ScannerError::InternalError(e)) => {
					return Err(e.into());
				}
				Ok(_) => {}
			}
		}
		if !self.interpolations.is_empty() {
			errors.push(ScanError::new(self.line, ScanErrorType::UnterminatedInterpolation));
		}
		if !errors.is_empty() {
			return Err(CompileError::ScannerErrors(errors));
		}
		tokens.push(Token::new(Eof, "", self.line));
		debug!("scanned {} tokens over {} lines", tokens.len(), self.line);
		Ok(tokens)
	}

	/// Scan a single token from the source code
	fn scan_token(&mut self, tokens: &mut Vec<Token>) -> Result<(), ScannerError> {
		let next_char = self.advance().context("Unexpected EOF")?;
		#[rustfmt::skip]
		let r#type = match next_char {
			'(' => LeftParen,
			')' => RightParen,
			'{' => {
				if let Some(depth) = self.interpolations.last_mut() { *depth += 1; }
				LeftBrace
			}
			'}' => match self.interpolations.last().copied() {
				Some(0) => {
					self.interpolations.pop();
					tokens.push(Token::new(InterpolationEnd, "}", self.line));
					return self.template_body(tokens);
				}
				Some(depth) => {
					self.interpolations.pop();
					self.interpolations.push(depth - 1);
					RightBrace
				}
				None => RightBrace,
			},
			'[' => LeftBracket,
			']' => RightBracket,
			',' => Comma,
			'.' => Dot,
			';' => Semicolon,
			'|' => if self.match_next('|') { PipePipe } else { Pipe },
			'&' => if self.match_next('&') { AmpAmp } else {
				return Err(ScanError::new(self.line, ScanErrorType::UnexpectedCharacter('&')).into())
			},
			':' => if self.match_next(':') { ColonColon } else { Colon },
			'?' => if self.match_next('?') {
				if self.match_next('=') { QuestionQuestionEqual } else { QuestionQuestion }
			} else if self.match_next('.') { QuestionDot } else { Question },
			'-' => if self.match_next('-') { MinusMinus } else if self.match_next('=') { MinusEqual } else { Minus },
			'+' => if self.match_next('+') { PlusPlus }
				else if self.match_next('=') { PlusEqual }
				else if self.match_next('.') { if self.match_next('=') { PlusDotEqual } else { PlusDot } }
				else { Plus },
			'*' => if self.match_next('*') {
				if self.match_next('=') { StarStarEqual } else { StarStar }
			} else if self.match_next('=') { StarEqual } else { Star },
			'%' => if self.match_next('=') { PercentEqual } else { Percent },
			'!' => if self.match_next('=') {
				if self.match_next('=') { BangEqualEqual } else { BangEqual }
			} else { Bang },
			'=' => if self.match_next('=') {
				if self.match_next('=') { EqualEqualEqual } else { EqualEqual }
			} else if self.match_next('>') { Arrow } else { Equal },
			'<' => if self.match_next('=') {
				if self.match_next('>') { Spaceship } else { LessEqual }
			} else { Less },
			'>' => if self.match_next('=') { GreaterEqual } else { Greater },
			'/' => if self.match_next('/') {
				while self.peek().is_some_and(|c| c != '\n') { self.advance(); }
				Comment
			} else if self.match_next('*') {
				let mut closed = false;
				while let Some(c) = self.peek() {
					if c == '*' && self.peek_second().is_some_and(|c| c == '/') {
						self.advance(); // consume '*'
						self.advance(); // consume '/'
						closed = true;
						break;
					}
					if c == '\n' { self.line += 1; }
					self.advance();
				}
				if closed { Comment } else { return Err(ScanError::new(self.line, ScanErrorType::UnterminatedBlockComment).into()) }
			} else if self.match_next('=') { SlashEqual } else { Slash },
			' ' | '\r' | '\t' => EmptyChar,
			'\n' => { self.line += 1; NewLine }
			'\'' => self.string()?,
			'"' => {
				tokens.push(Token::new(TemplateStart, "\"", self.line));
				return self.template_body(tokens);
			}
			c if c.is_ascii_digit() => self.number()?,
			c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
			_ => return Err(ScanError::new(self.line, ScanErrorType::UnexpectedCharacter(next_char)).into()),
		};

		if !r#type.is_ignored() {
			let lexeme = &self.source[self.start..self.cursor];
			tokens.push(Token::new(r#type, lexeme, self.line));
		}

		Ok(())
	}

	/// Match the next character if it is the expected one
	fn match_next(&mut self, expected: char) -> bool {
		matches!(self.peek(), Some(c) if c == expected && { self.advance(); true })
	}

	/// Advance to the next character
	fn advance(&mut self) -> Option<char> {
		let (i, c) = self.source_iter.next()?;
		self.cursor = i + c.len_utf8();
		Some(c)
	}

	/// Peek the current character
	fn peek(&mut self) -> Option<char> { self.source_iter.peek().map(|&(_, c)| c) }

	/// Peek the second character ahead
	fn peek_second(&mut self) -> Option<char> {
		let mut it = self.source_iter.clone();
		it.next()?;
		it.peek().map(|&(_, c)| c)
	}

	/// Scan a single quoted string literal, only `\'` and `\\` are escapes
	fn string(&mut self) -> Result<TokenType, ScannerError> {
		let mut value = String::new();
		loop {
			match self.advance() {
				None => return Err(ScanError::new(self.line, ScanErrorType::UnterminatedString).into()),
				Some('\'') => return Ok(StringLiteral(value)),
				Some('\\') if matches!(self.peek(), Some('\'' | '\\')) => {
					value.extend(self.advance());
				}
				Some(c) => {
					if c == '\n' {
						self.line += 1;
					}
					value.push(c);
				}
			}
		}
	}

	/// Scan the text of a double quoted string up to its closing quote or the
	/// next `${`, pushing the tokens found on the way.
	fn template_body(&mut self, tokens: &mut Vec<Token>) -> Result<(), ScannerError> {
		let mut text = String::new();
		let mut text_line = self.line;
		loop {
			let Some(c) = self.advance() else {
				return Err(ScanError::new(self.line, ScanErrorType::UnterminatedString).into());
			};
			match c {
				'"' => {
					push_text(tokens, &mut text, text_line);
					tokens.push(Token::new(TemplateEnd, "\"", self.line));
					return Ok(());
				}
				'$' if self.match_next('{') => {
					push_text(tokens, &mut text, text_line);
					tokens.push(Token::new(InterpolationStart, "${", self.line));
					self.interpolations.push(0);
					return Ok(());
				}
				'\\' => {
					let escaped = self.advance().ok_or_else(|| ScanError::new(self.line, ScanErrorType::UnterminatedString))?;
					match escaped {
						'n' => text.push('\n'),
						't' => text.push('\t'),
						'r' => text.push('\r'),
						'"' | '\\' | '$' => text.push(escaped),
						other => {
							text.push('\\');
							text.push(other);
						}
					}
				}
				'\n' => {
					if text.is_empty() {
						text_line = self.line;
					}
					self.line += 1;
					text.push(c);
				}
				_ => {
					if text.is_empty() {
						text_line = self.line;
					}
					text.push(c);
				}
			}
		}
	}

	/// Scan a number literal
	fn number(&mut self) -> Result<TokenType, ScannerError> {
		while self.peek().is_some_and(|c| c.is_ascii_digit()) {
			self.advance();
		}

		// Look for a fractional part.
		if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
			self.advance(); // consume '.'
			while self.peek().is_some_and(|c| c.is_ascii_digit()) {
				self.advance();
			}
		}

		let s = &self.source[self.start..self.cursor];
		Ok(NumberLiteral(s.parse().context("Failed to parse number literal")?))
	}

	/// Scan an identifier or keyword
	fn identifier(&mut self) -> TokenType {
		while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
			self.advance();
		}
		let text = &self.source[self.start..self.cursor];
		TokenType::keyword_or_identifier(text)
	}
}

/// Flush pending template text as a `StringPart`, empty text yields nothing.
fn push_text(tokens: &mut Vec<Token>, text: &mut String, line: usize) {
	if !text.is_empty() {
		let value = std::mem::take(text);
		tokens.push(Token::new(StringPart(value.clone()), value, line));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn scan(input: &str, ok: bool) {
		let scanner = Scanner::new(input);
		let result = scanner.scan_tokens();
		assert!(result.is_ok() == ok, "{input:?} => {result:?}");
	}

	fn types(input: &str) -> Vec<TokenType> {
		Scanner::new(input).scan_tokens().unwrap().into_iter().map(|t| t.r#type).collect()
	}

	#[test]
	fn scan_tokens() {
		scan("", true);
		scan("(", true);
		scan("(){}[]", true);
		scan(" ( ) ", true);
		scan("@", false);
		scan("你好", false);
		scan(r#""世界""#, true);
		scan("12345", true);
		scan(r#"// Comment"#, true);
		scan("/* Unterminated comment ", false);
		scan("user", true);
		scan("return", true);
	}

	#[test]
	fn scan_operators() {
		assert_eq!(types("+ +. +.= ++ +="), vec![Plus, PlusDot, PlusDotEqual, PlusPlus, PlusEqual, Eof]);
		assert_eq!(types("* ** **= *="), vec![Star, StarStar, StarStarEqual, StarEqual, Eof]);
		assert_eq!(types("= == === =>"), vec![Equal, EqualEqual, EqualEqualEqual, Arrow, Eof]);
		assert_eq!(types("! != !=="), vec![Bang, BangEqual, BangEqualEqual, Eof]);
		assert_eq!(types("< <= <=> > >="), vec![Less, LessEqual, Spaceship, Greater, GreaterEqual, Eof]);
		assert_eq!(types("? ?? ??= ?."), vec![Question, QuestionQuestion, QuestionQuestionEqual, QuestionDot, Eof]);
		assert_eq!(types(": :: | || &&"), vec![Colon, ColonColon, Pipe, PipePipe, AmpAmp, Eof]);
		assert_eq!(types("- -- -= % %= / /="), vec![
			Minus,
			MinusMinus,
			MinusEqual,
			Percent,
			PercentEqual,
			Slash,
			SlashEqual,
			Eof
		]);
		scan("&", false);
	}

	#[test]
	fn scan_numbers() {
		assert_eq!(types("42 3.14"), vec![NumberLiteral(42.0), NumberLiteral(3.14), Eof]);
		// A trailing dot is member access, not a fraction.
		assert_eq!(types("1."), vec![NumberLiteral(1.0), Dot, Eof]);
	}

	#[test]
	fn scan_single_quoted_strings() {
		assert_eq!(types(r"'it\'s'"), vec![StringLiteral("it's".to_string()), Eof]);
		assert_eq!(types(r"'a\nb'"), vec![StringLiteral(r"a\nb".to_string()), Eof]);
		scan("'open", false);
	}

	#[test]
	fn scan_plain_double_quoted_string() {
		assert_eq!(types(r#""hello""#), vec![TemplateStart, StringPart("hello".to_string()), TemplateEnd, Eof]);
		assert_eq!(types(r#""""#), vec![TemplateStart, TemplateEnd, Eof]);
		assert_eq!(types(r#""a\n\"b\"""#), vec![
			TemplateStart,
			StringPart("a\n\"b\"".to_string()),
			TemplateEnd,
			Eof
		]);
	}

	#[test]
	fn scan_interpolation() {
		assert_eq!(types(r#""Hi ${name}!""#), vec![
			TemplateStart,
			StringPart("Hi ".to_string()),
			InterpolationStart,
			Identifier,
			InterpolationEnd,
			StringPart("!".to_string()),
			TemplateEnd,
			Eof
		]);
		assert_eq!(types(r#""${a}""#), vec![TemplateStart, InterpolationStart, Identifier, InterpolationEnd, TemplateEnd, Eof]);
		assert_eq!(types(r#""\${a}""#), vec![TemplateStart, StringPart("${a}".to_string()), TemplateEnd, Eof]);
	}

	#[test]
	fn scan_nested_interpolation() {
		assert_eq!(types(r#""${ f({}) + "${x}" }""#), vec![
			TemplateStart,
			InterpolationStart,
			Identifier,
			LeftParen,
			LeftBrace,
			RightBrace,
			RightParen,
			Plus,
			TemplateStart,
			InterpolationStart,
			Identifier,
			InterpolationEnd,
			TemplateEnd,
			InterpolationEnd,
			TemplateEnd,
			Eof
		]);
		scan(r#""${a"#, false);
		scan(r#""${a}"#, false);
	}

	#[test]
	fn scan_keywords() {
		assert_eq!(types("fun val var echo foreach in match default iterates"), vec![
			Fun, Val, Var, Echo, Foreach, In, Match, Default, Iterates, Eof
		]);
		assert_eq!(types("init"), vec![Identifier, Eof]);
	}

	#[test]
	fn scan_comments_and_lines() {
		let tokens = Scanner::new("a // one\n/* two\nthree */ b").scan_tokens().unwrap();
		assert_eq!(tokens.len(), 3);
		assert_eq!(tokens[0].line, 1);
		assert_eq!(tokens[1].lexeme, "b");
		assert_eq!(tokens[1].line, 3);
		assert_eq!(tokens[2].r#type, Eof);
		assert_eq!(tokens[2].line, 3);
	}

	#[test]
	fn scan_collects_every_error() {
		match Scanner::new("@ # ok").scan_tokens() {
			Err(CompileError::ScannerErrors(errors)) => {
				assert_eq!(errors.len(), 2);
				assert_eq!(errors[0].r#type, ScanErrorType::UnexpectedCharacter('@'));
			}
			other => panic!("expected scanner errors, got {other:?}"),
		}
	}
}
