//! Recursive-descent parser and evaluator.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr    := term (("+" | "-") term)*
//! term    := unary (("*" | "/") unary)*
//! unary   := "-" unary | primary
//! primary := NUMBER | IDENT | "(" expr ")"
//! ```

use super::lexer::{Spanned, Token};
use super::{FormulaError, Variables};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	Add,
	Sub,
	Mul,
	Div,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
	Number(Decimal),
	Variable(String),
	Neg(Box<Expr>),
	Binary {
		op: BinaryOp,
		lhs: Box<Expr>,
		rhs: Box<Expr>,
	},
}

impl Expr {
	/// Collects the names of every variable the expression reads.
	pub fn collect_variables<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
		match self {
			Expr::Number(_) => {},
			Expr::Variable(name) => {
				out.insert(name.as_str());
			},
			Expr::Neg(inner) => inner.collect_variables(out),
			Expr::Binary { lhs, rhs, .. } => {
				lhs.collect_variables(out);
				rhs.collect_variables(out);
			},
		}
	}

	pub fn evaluate(&self, variables: &Variables) -> Result<Decimal, FormulaError> {
		match self {
			Expr::Number(value) => Ok(*value),
			Expr::Variable(name) => variables
				.get(name)
				.ok_or_else(|| FormulaError::InvalidVariables(vec![name.clone()])),
			Expr::Neg(inner) => Ok(-inner.evaluate(variables)?),
			Expr::Binary { op, lhs, rhs } => {
				let lhs = lhs.evaluate(variables)?;
				let rhs = rhs.evaluate(variables)?;
				match op {
					BinaryOp::Add => lhs.checked_add(rhs).ok_or(FormulaError::Overflow),
					BinaryOp::Sub => lhs.checked_sub(rhs).ok_or(FormulaError::Overflow),
					BinaryOp::Mul => lhs.checked_mul(rhs).ok_or(FormulaError::Overflow),
					BinaryOp::Div => {
						if rhs.is_zero() {
							return Err(FormulaError::DivisionByZero);
						}
						lhs.checked_div(rhs).ok_or(FormulaError::Overflow)
					},
				}
			},
		}
	}
}

/// Deepest nesting of groups, negations and operator chains a formula may
/// have.
pub const MAX_DEPTH: usize = 64;

/// A parsed subexpression with the height of its tree.
type Parsed = (Expr, usize);

pub struct Parser<'a> {
	tokens: &'a [Spanned],
	pos: usize,
	depth: usize,
}

impl<'a> Parser<'a> {
	pub fn new(tokens: &'a [Spanned]) -> Self {
		Self {
			tokens,
			pos: 0,
			depth: 0,
		}
	}

	/// Parses the whole token stream as one expression.
	pub fn parse(mut self) -> Result<Expr, FormulaError> {
		if self.tokens.is_empty() {
			return Err(FormulaError::Empty);
		}
		let (expr, _) = self.expr()?;
		match self.tokens.get(self.pos) {
			None => Ok(expr),
			Some(extra) => Err(unexpected(extra)),
		}
	}

	fn peek(&self) -> Option<&'a Token> {
		self.tokens.get(self.pos).map(|s| &s.token)
	}

	fn advance(&mut self) -> Option<&'a Spanned> {
		let next = self.tokens.get(self.pos);
		if next.is_some() {
			self.pos += 1;
		}
		next
	}

	/// Runs `parse` one recursion level deeper.
	fn nested<T>(
		&mut self,
		parse: impl FnOnce(&mut Self) -> Result<T, FormulaError>,
	) -> Result<T, FormulaError> {
		if self.depth >= MAX_DEPTH {
			return Err(FormulaError::TooDeep(MAX_DEPTH));
		}
		self.depth += 1;
		let result = parse(self);
		self.depth -= 1;
		result
	}

	fn expr(&mut self) -> Result<Parsed, FormulaError> {
		let mut lhs = self.term()?;
		loop {
			let op = match self.peek() {
				Some(Token::Plus) => BinaryOp::Add,
				Some(Token::Minus) => BinaryOp::Sub,
				_ => return Ok(lhs),
			};
			self.pos += 1;
			let rhs = self.term()?;
			lhs = binary(op, lhs, rhs)?;
		}
	}

	fn term(&mut self) -> Result<Parsed, FormulaError> {
		let mut lhs = self.unary()?;
		loop {
			let op = match self.peek() {
				Some(Token::Star) => BinaryOp::Mul,
				Some(Token::Slash) => BinaryOp::Div,
				_ => return Ok(lhs),
			};
			self.pos += 1;
			let rhs = self.unary()?;
			lhs = binary(op, lhs, rhs)?;
		}
	}

	fn unary(&mut self) -> Result<Parsed, FormulaError> {
		if self.peek() == Some(&Token::Minus) {
			self.pos += 1;
			let (inner, height) = self.nested(Self::unary)?;
			return Ok((Expr::Neg(Box::new(inner)), height + 1));
		}
		self.primary()
	}

	fn primary(&mut self) -> Result<Parsed, FormulaError> {
		let spanned = self.advance().ok_or(FormulaError::UnexpectedEnd)?;
		match &spanned.token {
			Token::Number(value) => Ok((Expr::Number(*value), 1)),
			Token::Ident(name) => Ok((Expr::Variable(name.clone()), 1)),
			Token::LParen => {
				let inner = self.nested(Self::expr)?;
				match self.advance() {
					Some(Spanned {
						token: Token::RParen,
						..
					}) => Ok(inner),
					Some(other) => Err(unexpected(other)),
					None => Err(FormulaError::UnclosedParenthesis {
						position: spanned.position,
					}),
				}
			},
			_ => Err(unexpected(spanned)),
		}
	}
}

fn binary(
	op: BinaryOp,
	(lhs, lhs_height): Parsed,
	(rhs, rhs_height): Parsed,
) -> Result<Parsed, FormulaError> {
	let height = lhs_height.max(rhs_height) + 1;
	if height > MAX_DEPTH {
		return Err(FormulaError::TooDeep(MAX_DEPTH));
	}
	let expr = Expr::Binary {
		op,
		lhs: Box::new(lhs),
		rhs: Box::new(rhs),
	};
	Ok((expr, height))
}

fn unexpected(spanned: &Spanned) -> FormulaError {
	FormulaError::UnexpectedToken {
		token: spanned.token.to_string(),
		position: spanned.position,
	}
}
