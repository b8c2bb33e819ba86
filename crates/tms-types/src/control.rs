//! Per-organization control records.
//!
//! Controls are configuration toggles that parametrize the dispatch rules.
//! They are loaded from the organization sections of the configuration file.

use crate::movement::StopType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which late stops produce a service incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceIncidentPolicy {
	#[default]
	Never,
	Pickup,
	Delivery,
	PickupAndDelivery,
	/// Every stop except the shipper's pickups.
	AllExceptShipper,
}

impl ServiceIncidentPolicy {
	/// Names accepted in configuration files.
	pub const NAMES: &'static [&'static str] = &[
		"never",
		"pickup",
		"delivery",
		"pickup_and_delivery",
		"all_except_shipper",
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			ServiceIncidentPolicy::Never => "never",
			ServiceIncidentPolicy::Pickup => "pickup",
			ServiceIncidentPolicy::Delivery => "delivery",
			ServiceIncidentPolicy::PickupAndDelivery => "pickup_and_delivery",
			ServiceIncidentPolicy::AllExceptShipper => "all_except_shipper",
		}
	}

	/// Returns whether a late stop of the given type counts under this policy.
	pub fn covers(&self, stop_type: StopType) -> bool {
		match self {
			ServiceIncidentPolicy::Never => false,
			ServiceIncidentPolicy::Pickup => stop_type.is_pickup(),
			ServiceIncidentPolicy::Delivery => stop_type.is_delivery(),
			ServiceIncidentPolicy::PickupAndDelivery => {
				stop_type.is_pickup() || stop_type.is_delivery()
			},
			ServiceIncidentPolicy::AllExceptShipper => !stop_type.is_pickup(),
		}
	}
}

impl fmt::Display for ServiceIncidentPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ServiceIncidentPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"never" => Ok(Self::Never),
			"pickup" => Ok(Self::Pickup),
			"delivery" => Ok(Self::Delivery),
			"pickup_and_delivery" => Ok(Self::PickupAndDelivery),
			"all_except_shipper" => Ok(Self::AllExceptShipper),
			other => Err(format!(
				"unknown service incident policy '{}', expected one of: {}",
				other,
				Self::NAMES.join(", ")
			)),
		}
	}
}

/// Dispatch configuration of one organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchControl {
	/// Enforce license, physical, medical, MVR and termination checks.
	#[serde(default)]
	pub regulatory_check: bool,
	/// Require the primary worker and tractor to share a fleet.
	#[serde(default)]
	pub tractor_worker_fleet_constraint: bool,
	#[serde(default)]
	pub record_service_incident: ServiceIncidentPolicy,
	/// Minutes a stop may run past its appointment window before it is late.
	#[serde(default)]
	pub grace_period: u32,
}

/// Shipment configuration of one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentControl {
	/// Recompute the shipment sub-total whenever it is rated.
	#[serde(default = "default_auto_shipment_total")]
	pub auto_shipment_total: bool,
}

fn default_auto_shipment_total() -> bool {
	true
}

impl Default for ShipmentControl {
	fn default() -> Self {
		Self {
			auto_shipment_total: default_auto_shipment_total(),
		}
	}
}
