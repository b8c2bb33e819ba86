//! Shipment rating.
//!
//! Turns a shipment's rate method and charges into a monetary sub-total.
//! Shipments rated `OTHER` may carry a formula template, evaluated by the
//! sandboxed expression evaluator in [`formula`].

use rust_decimal::Decimal;
use thiserror::Error;
use tms_types::{FieldErrors, Shipment};
use tracing::{debug, instrument};

pub mod calculator;
pub mod formula;
pub mod validation;

pub use calculator::calculate_total;
pub use formula::{Formula, FormulaError, Variables, ALLOWED_VARIABLES};
pub use validation::validate_shipment_rating;

/// Errors that can occur while rating a shipment.
#[derive(Debug, Error)]
pub enum RatingError {
	/// The rating inputs failed validation.
	#[error("Validation failed: {0}")]
	Rejected(FieldErrors),
	#[error("Formula error: {0}")]
	Formula(#[from] FormulaError),
	#[error("Missing rating input: {0}")]
	MissingInput(&'static str),
	#[error("Arithmetic overflow while rating")]
	Overflow,
}

impl RatingError {
	pub fn field_errors(&self) -> Option<&FieldErrors> {
		match self {
			RatingError::Rejected(errors) => Some(errors),
			_ => None,
		}
	}
}

/// Validates the shipment's rating inputs and computes its sub-total.
#[instrument(skip_all, fields(shipment = %shipment.id, method = %shipment.rate_method))]
pub fn rate_shipment(shipment: &Shipment) -> Result<Decimal, RatingError> {
	validate_shipment_rating(shipment)
		.into_result()
		.map_err(RatingError::Rejected)?;
	let total = calculate_total(shipment)?;
	debug!(%total, "shipment rated");
	Ok(total)
}
