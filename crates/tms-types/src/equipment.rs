//! Tractor and trailer types.

use serde::{Deserialize, Serialize};

/// Availability of a piece of equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentStatus {
	#[default]
	Available,
	OutOfService,
	AtMaintenance,
	Sold,
	Lost,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tractor {
	pub id: String,
	pub code: String,
	#[serde(default)]
	pub fleet_code: Option<String>,
	#[serde(default)]
	pub status: EquipmentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trailer {
	pub id: String,
	pub code: String,
	#[serde(default)]
	pub status: EquipmentStatus,
}
