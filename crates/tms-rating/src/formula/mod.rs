//! Safe arithmetic formulas for shipments rated `OTHER`.
//!
//! A formula is parsed once into an expression tree and evaluated over
//! [`Decimal`] values. Only the operators `+ - * /`, unary minus,
//! parentheses, decimal literals and the names in [`ALLOWED_VARIABLES`] are
//! accepted; anything else is rejected before evaluation.

mod lexer;
mod parser;

use lexer::{tokenize, Token};
use parser::{Expr, Parser};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use thiserror::Error;
use tms_types::Shipment;

/// Names a formula may refer to.
pub const ALLOWED_VARIABLES: &[&str] = &[
	"freight_charge",
	"other_charge",
	"mileage",
	"weight",
	"stops",
	"rating_units",
	"temperature_differential",
	"equipment_cost_per_mile",
	"hazmat_additional_rate",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
	#[error("Formula is empty")]
	Empty,
	#[error("Unexpected character '{character}' at position {position}")]
	UnexpectedCharacter { character: char, position: usize },
	#[error("Invalid number '{0}'")]
	InvalidNumber(String),
	#[error("Unexpected token '{token}' at position {position}")]
	UnexpectedToken { token: String, position: usize },
	#[error("Unexpected end of formula")]
	UnexpectedEnd,
	#[error("Parenthesis opened at position {position} is never closed")]
	UnclosedParenthesis { position: usize },
	/// Sorted, without duplicates.
	#[error("Invalid variables: {}", .0.join(", "))]
	InvalidVariables(Vec<String>),
	#[error("Division by zero")]
	DivisionByZero,
	#[error("Arithmetic overflow")]
	Overflow,
	#[error("Formula nests deeper than {0} levels")]
	TooDeep(usize),
}

/// Values bound to formula variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables(BTreeMap<&'static str, Decimal>);

impl Variables {
	/// Binds every allowed variable from the shipment's rating inputs.
	/// Unset optional inputs evaluate as zero.
	pub fn from_shipment(shipment: &Shipment) -> Self {
		Self::default()
			.with(
				"freight_charge",
				shipment.freight_charge_amount.unwrap_or_default(),
			)
			.with("other_charge", shipment.other_charge_amount)
			.with("mileage", shipment.mileage.unwrap_or_default())
			.with("weight", shipment.weight)
			.with("stops", Decimal::from(shipment.stop_count))
			.with("rating_units", Decimal::from(shipment.rating_units))
			.with(
				"temperature_differential",
				shipment.temperature_differential(),
			)
			.with(
				"equipment_cost_per_mile",
				shipment.equipment_cost_per_mile.unwrap_or_default(),
			)
			.with(
				"hazmat_additional_rate",
				shipment.hazmat_additional_rate.unwrap_or_default(),
			)
	}

	/// Binds `name` to `value`. Names outside [`ALLOWED_VARIABLES`] are ignored.
	pub fn with(mut self, name: &str, value: Decimal) -> Self {
		if let Some(allowed) = ALLOWED_VARIABLES.iter().find(|v| **v == name) {
			self.0.insert(*allowed, value);
		}
		self
	}

	pub fn get(&self, name: &str) -> Option<Decimal> {
		self.0.get(name).copied()
	}
}

/// A parsed formula whose variables are all allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
	text: String,
	expr: Expr,
}

impl Formula {
	/// Parses `text`.
	///
	/// Disallowed variables are reported before syntax errors, so a caller
	/// always learns every offending name.
	pub fn parse(text: &str) -> Result<Self, FormulaError> {
		let tokens = tokenize(text)?;

		let invalid: BTreeSet<&str> = tokens
			.iter()
			.filter_map(|s| match &s.token {
				Token::Ident(name) if !ALLOWED_VARIABLES.contains(&name.as_str()) => {
					Some(name.as_str())
				},
				_ => None,
			})
			.collect();
		if !invalid.is_empty() {
			return Err(FormulaError::InvalidVariables(
				invalid.into_iter().map(String::from).collect(),
			));
		}

		let expr = Parser::new(&tokens).parse()?;
		Ok(Self {
			text: text.to_string(),
			expr,
		})
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	/// Variables the formula reads, in name order.
	pub fn variables(&self) -> Vec<&str> {
		let mut names = BTreeSet::new();
		self.expr.collect_variables(&mut names);
		names.into_iter().collect()
	}

	pub fn evaluate(&self, variables: &Variables) -> Result<Decimal, FormulaError> {
		self.expr.evaluate(variables)
	}
}

impl FromStr for Formula {
	type Err = FormulaError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

/// Parses and evaluates `text` in one step.
pub fn evaluate(text: &str, variables: &Variables) -> Result<Decimal, FormulaError> {
	Formula::parse(text)?.evaluate(variables)
}
