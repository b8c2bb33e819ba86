//! Dispatch rules for movements and stops.
//!
//! This crate decides whether a movement's worker and equipment assignment is
//! legal, whether a movement may change status, whether a late stop spawns a
//! service incident, and what status a stop has given its actual times. All
//! rules are pure functions over the records they inspect; persistence and
//! event publication live in the engine.

use thiserror::Error;
use tms_types::{FieldErrors, Status};

pub mod context;
pub mod rules;
pub mod stop;
pub mod transition;
pub mod validator;

pub use context::{DispatchRequest, MovementContext};
pub use stop::{
	delay_minutes, derive_stop_status, is_late, movement_status_from_stops,
	service_incident_for, should_create_service_incident, validate_stop,
};
pub use transition::{check_transition, is_valid_transition};
pub use validator::MovementValidator;

/// Errors raised by dispatch rule evaluation.
#[derive(Debug, Error)]
pub enum DispatchError {
	/// One or more rules failed. The payload holds every message.
	#[error("Validation failed: {0}")]
	Rejected(FieldErrors),
	#[error("Invalid status transition from {from} to {to}")]
	InvalidTransition { from: Status, to: Status },
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
}

impl DispatchError {
	/// The field errors carried by a rejection, if any.
	pub fn field_errors(&self) -> Option<&FieldErrors> {
		match self {
			DispatchError::Rejected(errors) => Some(errors),
			_ => None,
		}
	}
}

impl From<FieldErrors> for DispatchError {
	fn from(errors: FieldErrors) -> Self {
		DispatchError::Rejected(errors)
	}
}
