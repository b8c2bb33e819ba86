//! Worker and regulatory profile types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Commercial license endorsement held by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Endorsement {
	#[default]
	None,
	Hazmat,
	Tanker,
	/// Tanker and hazmat combined.
	X,
}

impl Endorsement {
	/// True when the endorsement allows hauling hazardous material.
	pub fn allows_hazmat(&self) -> bool {
		matches!(self, Endorsement::Hazmat | Endorsement::X)
	}
}

/// Regulatory information consulted before a worker can be dispatched.
///
/// Every date is optional; a missing date never fails a check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProfile {
	#[serde(default)]
	pub endorsement: Endorsement,
	#[serde(default)]
	pub license_expiration_date: Option<NaiveDate>,
	#[serde(default)]
	pub physical_due_date: Option<NaiveDate>,
	#[serde(default)]
	pub medical_cert_date: Option<NaiveDate>,
	#[serde(default)]
	pub mvr_due_date: Option<NaiveDate>,
	#[serde(default)]
	pub hazmat_expiration_date: Option<NaiveDate>,
	#[serde(default)]
	pub termination_date: Option<NaiveDate>,
}

/// A driver that can be assigned to a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
	pub id: String,
	pub code: String,
	#[serde(default)]
	pub fleet_code: Option<String>,
	#[serde(default)]
	pub profile: WorkerProfile,
}
