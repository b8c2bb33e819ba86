//! Shipment sub-total calculation.

use crate::formula::{Formula, Variables};
use crate::RatingError;
use rust_decimal::Decimal;
use tms_types::{RateMethod, Shipment};

/// Computes the sub-total of `shipment` under its rate method.
///
/// | Method      | Total                                   |
/// |-------------|-----------------------------------------|
/// | `FLAT`      | freight + other                         |
/// | `PER_MILE`  | freight × mileage + other               |
/// | `PER_STOP`  | freight × stops + other                 |
/// | `PER_POUND` | freight × weight + other                |
/// | `OTHER`     | the formula, or freight × units + other |
///
/// The inputs are expected to have passed
/// [`validate_shipment_rating`](crate::validate_shipment_rating); a missing
/// freight charge or mileage is reported as [`RatingError::MissingInput`].
pub fn calculate_total(shipment: &Shipment) -> Result<Decimal, RatingError> {
	let other = shipment.other_charge_amount;

	if shipment.rate_method == RateMethod::Other {
		if let Some(template) = &shipment.formula_template {
			let formula = Formula::parse(&template.formula_text)?;
			return Ok(formula.evaluate(&Variables::from_shipment(shipment))?);
		}
	}

	let freight = shipment
		.freight_charge_amount
		.ok_or(RatingError::MissingInput("freight_charge_amount"))?;

	let multiplier = match shipment.rate_method {
		RateMethod::Flat => return checked_add(freight, other),
		RateMethod::PerMile => shipment
			.mileage
			.ok_or(RatingError::MissingInput("mileage"))?,
		RateMethod::PerStop => Decimal::from(shipment.stop_count),
		RateMethod::PerPound => shipment.weight,
		RateMethod::Other => Decimal::from(shipment.rating_units),
	};

	let base = freight
		.checked_mul(multiplier)
		.ok_or(RatingError::Overflow)?;
	checked_add(base, other)
}

fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal, RatingError> {
	a.checked_add(b).ok_or(RatingError::Overflow)
}
