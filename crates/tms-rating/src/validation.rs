//! Checks a shipment's rating inputs before it is rated.

use crate::formula::{Formula, FormulaError};
use rust_decimal::Decimal;
use tms_types::{FieldErrors, RateMethod, Shipment};

pub const FLAT_WITHOUT_FREIGHT: &str =
	"Freight Rate Method is Flat but Freight Charge Amount is not set. Please try again.";
pub const PER_MILE_WITHOUT_MILEAGE: &str =
	"Rating Method 'PER-MILE' requires Mileage to be set. Please try again.";
pub const PER_POUND_WITHOUT_WEIGHT: &str =
	"Weight cannot be 0, and rating method is per weight. Please try again.";
pub const FORMULA_REQUIRES_OTHER: &str =
	"Formula template can only be used with rating method 'OTHER'. Please try again.";

/// Every problem with the shipment's rating inputs, keyed by field.
///
/// A zero freight charge or mileage counts as unset.
pub fn validate_shipment_rating(shipment: &Shipment) -> FieldErrors {
	let mut errors = FieldErrors::new();
	let is_unset = |value: Option<Decimal>| value.map_or(true, |v| v.is_zero());

	match shipment.rate_method {
		RateMethod::Flat if is_unset(shipment.freight_charge_amount) => {
			errors.add("freight_charge_amount", FLAT_WITHOUT_FREIGHT);
		},
		RateMethod::PerMile if is_unset(shipment.mileage) => {
			errors.add("mileage", PER_MILE_WITHOUT_MILEAGE);
		},
		RateMethod::PerPound if shipment.weight < Decimal::ONE => {
			errors.add("rate_method", PER_POUND_WITHOUT_WEIGHT);
		},
		_ => {},
	}

	if let Some(template) = &shipment.formula_template {
		if shipment.rate_method != RateMethod::Other {
			errors.add("formula_template", FORMULA_REQUIRES_OTHER);
		}
		if let Err(err) = Formula::parse(&template.formula_text) {
			errors.add("formula_text", formula_message(&err));
		}
	}

	errors
}

fn formula_message(err: &FormulaError) -> String {
	match err {
		FormulaError::InvalidVariables(names) => format!(
			"Formula template contains invalid variables: {}. Please try again.",
			names.join(", ")
		),
		other => format!(
			"Formula template is not a valid expression: {}. Please try again.",
			other
		),
	}
}
