//! Shipment rating inputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the freight charge of a shipment is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateMethod {
	#[default]
	Flat,
	PerMile,
	PerStop,
	PerPound,
	/// Rating units, or a formula template when one is attached.
	Other,
}

impl RateMethod {
	pub fn as_str(&self) -> &'static str {
		match self {
			RateMethod::Flat => "FLAT",
			RateMethod::PerMile => "PER_MILE",
			RateMethod::PerStop => "PER_STOP",
			RateMethod::PerPound => "PER_POUND",
			RateMethod::Other => "OTHER",
		}
	}
}

impl fmt::Display for RateMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for RateMethod {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().replace('-', "_").as_str() {
			"FLAT" => Ok(RateMethod::Flat),
			"PER_MILE" => Ok(RateMethod::PerMile),
			"PER_STOP" => Ok(RateMethod::PerStop),
			"PER_POUND" => Ok(RateMethod::PerPound),
			"OTHER" => Ok(RateMethod::Other),
			other => Err(format!("unknown rate method '{}'", other)),
		}
	}
}

/// A stored arithmetic expression used to price shipments rated `OTHER`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaTemplate {
	pub id: String,
	pub name: String,
	/// Expression over the rating variables, e.g. `freight_charge * mileage`.
	pub formula_text: String,
}

/// The rating-relevant part of a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
	pub id: String,
	pub organization_id: String,
	#[serde(default)]
	pub rate_method: RateMethod,
	#[serde(default)]
	pub freight_charge_amount: Option<Decimal>,
	#[serde(default)]
	pub other_charge_amount: Decimal,
	#[serde(default)]
	pub mileage: Option<Decimal>,
	#[serde(default)]
	pub weight: Decimal,
	#[serde(default = "default_rating_units")]
	pub rating_units: u32,
	/// Number of stops across all movements of the shipment.
	#[serde(default)]
	pub stop_count: u32,
	#[serde(default)]
	pub hazardous_material: bool,
	#[serde(default)]
	pub temperature_min: Option<Decimal>,
	#[serde(default)]
	pub temperature_max: Option<Decimal>,
	#[serde(default)]
	pub equipment_cost_per_mile: Option<Decimal>,
	#[serde(default)]
	pub hazmat_additional_rate: Option<Decimal>,
	#[serde(default)]
	pub formula_template: Option<FormulaTemplate>,
	/// Computed sub-total. Written back when the shipment is rated.
	#[serde(default)]
	pub sub_total: Option<Decimal>,
}

fn default_rating_units() -> u32 {
	1
}

impl Shipment {
	/// Creates an unrated shipment with every optional input unset.
	pub fn new(id: impl Into<String>, organization_id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			organization_id: organization_id.into(),
			rate_method: RateMethod::default(),
			freight_charge_amount: None,
			other_charge_amount: Decimal::ZERO,
			mileage: None,
			weight: Decimal::ZERO,
			rating_units: default_rating_units(),
			stop_count: 0,
			hazardous_material: false,
			temperature_min: None,
			temperature_max: None,
			equipment_cost_per_mile: None,
			hazmat_additional_rate: None,
			formula_template: None,
			sub_total: None,
		}
	}

	/// Spread between the maximum and minimum temperature, zero when either is unset.
	pub fn temperature_differential(&self) -> Decimal {
		match (self.temperature_min, self.temperature_max) {
			(Some(min), Some(max)) => max - min,
			_ => Decimal::ZERO,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	#[test]
	fn test_rate_method_parse_accepts_dashes() {
		assert_eq!("per-mile".parse::<RateMethod>().unwrap(), RateMethod::PerMile);
		assert_eq!("OTHER".parse::<RateMethod>().unwrap(), RateMethod::Other);
		assert!("per-hour".parse::<RateMethod>().is_err());
	}

	#[test]
	fn test_temperature_differential() {
		let mut shipment = Shipment::new("s1", "org");
		assert_eq!(shipment.temperature_differential(), Decimal::ZERO);

		shipment.temperature_min = Some(dec!(-10));
		assert_eq!(shipment.temperature_differential(), Decimal::ZERO);

		shipment.temperature_max = Some(dec!(35.5));
		assert_eq!(shipment.temperature_differential(), dec!(45.5));
	}

	#[test]
	fn test_shipment_deserialize_defaults() {
		let shipment: Shipment =
			serde_json::from_str(r#"{"id":"s1","organization_id":"org"}"#).unwrap();
		assert_eq!(shipment.rating_units, 1);
		assert_eq!(shipment.rate_method, RateMethod::Flat);
		assert!(shipment.freight_charge_amount.is_none());
	}
}
