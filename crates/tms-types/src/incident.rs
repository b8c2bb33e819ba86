//! Service incident records.

use crate::movement::StopType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record that a stop was served later than its appointment allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceIncident {
	pub id: String,
	pub organization_id: String,
	pub movement_id: String,
	pub stop_id: String,
	pub stop_type: StopType,
	/// Minutes between the appointment window end and the arrival.
	pub delay_minutes: i64,
	pub created_at: DateTime<Utc>,
}
