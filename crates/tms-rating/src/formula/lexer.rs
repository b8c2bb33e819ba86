//! Splits formula text into tokens.

use super::FormulaError;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
	Number(Decimal),
	Ident(String),
	Plus,
	Minus,
	Star,
	Slash,
	LParen,
	RParen,
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Token::Number(n) => write!(f, "{}", n),
			Token::Ident(name) => f.write_str(name),
			Token::Plus => f.write_str("+"),
			Token::Minus => f.write_str("-"),
			Token::Star => f.write_str("*"),
			Token::Slash => f.write_str("/"),
			Token::LParen => f.write_str("("),
			Token::RParen => f.write_str(")"),
		}
	}
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
	pub token: Token,
	pub position: usize,
}

pub fn tokenize(text: &str) -> Result<Vec<Spanned>, FormulaError> {
	let mut tokens = Vec::new();
	let mut chars = text.char_indices().peekable();

	while let Some(&(position, c)) = chars.peek() {
		let token = match c {
			c if c.is_whitespace() => {
				chars.next();
				continue;
			},
			'+' => Token::Plus,
			'-' => Token::Minus,
			'*' => Token::Star,
			'/' => Token::Slash,
			'(' => Token::LParen,
			')' => Token::RParen,
			c if c.is_ascii_digit() || c == '.' => {
				let end = scan(&mut chars, |c| c.is_ascii_digit() || c == '.');
				let literal = &text[position..end];
				let value = Decimal::from_str(literal)
					.map_err(|_| FormulaError::InvalidNumber(literal.to_string()))?;
				tokens.push(Spanned {
					token: Token::Number(value),
					position,
				});
				continue;
			},
			c if c.is_ascii_alphabetic() || c == '_' => {
				let end = scan(&mut chars, |c| c.is_ascii_alphanumeric() || c == '_');
				tokens.push(Spanned {
					token: Token::Ident(text[position..end].to_string()),
					position,
				});
				continue;
			},
			other => {
				return Err(FormulaError::UnexpectedCharacter {
					character: other,
					position,
				})
			},
		};
		chars.next();
		tokens.push(Spanned { token, position });
	}

	Ok(tokens)
}

// Consumes characters while `accept` holds and returns the end offset.
fn scan<I>(chars: &mut std::iter::Peekable<I>, accept: impl Fn(char) -> bool) -> usize
where
	I: Iterator<Item = (usize, char)>,
{
	let mut end = 0;
	while let Some(&(position, c)) = chars.peek() {
		if !accept(c) {
			return position;
		}
		end = position + c.len_utf8();
		chars.next();
	}
	end
}
