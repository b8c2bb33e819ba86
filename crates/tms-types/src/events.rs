//! Events published on the engine's event bus.
//!
//! Handlers publish one event per accepted or rejected operation so that
//! other components (and the CLI) can react without polling storage.

use crate::{FieldErrors, ServiceIncident, Status};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level event, grouped by the record it concerns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TmsEvent {
	Movement(MovementEvent),
	Stop(StopEvent),
	Shipment(ShipmentEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MovementEvent {
	/// A movement passed validation and was stored.
	Saved { movement_id: String },
	/// A movement moved from one status to another.
	StatusChanged {
		movement_id: String,
		from: Status,
		to: Status,
	},
	/// A save or status change was refused.
	Rejected {
		movement_id: String,
		errors: FieldErrors,
	},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StopEvent {
	/// Arrival or departure times were recorded and the status re-derived.
	Recorded {
		stop_id: String,
		movement_id: String,
		status: Status,
	},
	/// A late stop produced a service incident.
	IncidentRecorded { incident: ServiceIncident },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShipmentEvent {
	/// A shipment was rated and its sub-total written back.
	Rated { shipment_id: String, total: Decimal },
	RatingRejected {
		shipment_id: String,
		errors: FieldErrors,
	},
}
