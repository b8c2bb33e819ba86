//! Movement and stop types.
//!
//! A movement is one leg of a shipment's execution. It carries the assigned
//! workers and equipment and owns an ordered list of stops. Movements and
//! stops share the same status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status shared by movements and stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
	/// Planned but not started.
	#[default]
	New,
	/// Equipment is on the road.
	InProgress,
	/// Finished.
	Completed,
	/// Cancelled. Voided records are frozen.
	Voided,
}

impl Status {
	/// Returns the wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			Status::New => "NEW",
			Status::InProgress => "IN_PROGRESS",
			Status::Completed => "COMPLETED",
			Status::Voided => "VOIDED",
		}
	}

	/// Returns the human readable label used in validation messages.
	pub fn label(&self) -> &'static str {
		match self {
			Status::New => "New",
			Status::InProgress => "In Progress",
			Status::Completed => "Completed",
			Status::Voided => "Voided",
		}
	}

	/// True for IN_PROGRESS and COMPLETED, the statuses that require an
	/// assigned worker and tractor.
	pub fn is_underway(&self) -> bool {
		matches!(self, Status::InProgress | Status::Completed)
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Status {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().replace('-', "_").as_str() {
			"NEW" => Ok(Status::New),
			"IN_PROGRESS" => Ok(Status::InProgress),
			"COMPLETED" => Ok(Status::Completed),
			"VOIDED" => Ok(Status::Voided),
			other => Err(format!("unknown status '{}'", other)),
		}
	}
}

/// Kind of work performed at a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopType {
	Pickup,
	SplitPickup,
	Delivery,
	SplitDrop,
	Other,
}

impl StopType {
	/// Pickup and split pickup stops.
	pub fn is_pickup(&self) -> bool {
		matches!(self, StopType::Pickup | StopType::SplitPickup)
	}

	/// Delivery and split drop stops.
	pub fn is_delivery(&self) -> bool {
		matches!(self, StopType::Delivery | StopType::SplitDrop)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			StopType::Pickup => "PICKUP",
			StopType::SplitPickup => "SPLIT_PICKUP",
			StopType::Delivery => "DELIVERY",
			StopType::SplitDrop => "SPLIT_DROP",
			StopType::Other => "OTHER",
		}
	}
}

impl fmt::Display for StopType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single pickup, delivery or other event within a movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
	pub id: String,
	pub movement_id: String,
	/// 1-based position within the movement.
	pub sequence: u32,
	pub stop_type: StopType,
	#[serde(default)]
	pub status: Status,
	/// Time the equipment is expected to arrive.
	pub appointment_window_start: DateTime<Utc>,
	/// Time the equipment is expected to depart.
	pub appointment_window_end: DateTime<Utc>,
	#[serde(default)]
	pub arrival_time: Option<DateTime<Utc>>,
	#[serde(default)]
	pub departure_time: Option<DateTime<Utc>>,
}

/// One leg of a shipment with its equipment and worker assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
	pub id: String,
	/// Human facing reference number, used in validation messages.
	pub ref_num: String,
	pub organization_id: String,
	pub shipment_id: String,
	/// Position of this leg within its shipment. Earlier legs have lower values.
	pub sequence: u32,
	#[serde(default)]
	pub status: Status,
	#[serde(default)]
	pub tractor_id: Option<String>,
	#[serde(default)]
	pub primary_worker_id: Option<String>,
	#[serde(default)]
	pub secondary_worker_id: Option<String>,
	#[serde(default)]
	pub trailer_id: Option<String>,
	/// Last update time in Unix seconds.
	#[serde(default)]
	pub updated_at: u64,
}
