//! Rules tying a movement's status to its stops, its shipment and its
//! stored state.

use super::MovementRule;
use crate::MovementContext;
use tms_types::{FieldErrors, Status};

pub const FIRST_STOP_NEW: &str = "Cannot change status to anything other than `NEW` if any of \
	the stops are not in progress. Please try again.";
pub const STOPS_STARTED: &str = "Cannot change status to `NEW` if any of the stops are in \
	progress or completed. Please try again.";
pub const STOPS_OPEN: &str = "Cannot change status to `COMPLETED` if any of the stops are in \
	progress or new. Please try again.";
pub const VOIDED: &str = "Cannot update a voided movement. Please contact your administrator.";

/// Keeps the movement status consistent with its stops:
/// an underway movement needs its first stop started, a NEW movement may not
/// have started stops, and a COMPLETED movement needs every stop completed.
pub struct StopStatusRule;

impl MovementRule for StopStatusRule {
	fn name(&self) -> &'static str {
		"stop_status"
	}

	fn check(&self, ctx: &MovementContext<'_>, errors: &mut FieldErrors) {
		let status = ctx.movement.status;

		if status.is_underway() && ctx.first_stop().is_some_and(|s| s.status == Status::New) {
			errors.add("status", FIRST_STOP_NEW);
		}
		if status == Status::New && ctx.stops.iter().any(|s| s.status.is_underway()) {
			errors.add("status", STOPS_STARTED);
		}
		if status == Status::Completed
			&& ctx
				.stops
				.iter()
				.any(|s| matches!(s.status, Status::New | Status::InProgress))
		{
			errors.add("status", STOPS_OPEN);
		}
	}
}

/// An underway movement requires every earlier movement of the shipment to
/// be completed. One message per blocking movement.
pub struct PreviousMovementRule;

impl MovementRule for PreviousMovementRule {
	fn name(&self) -> &'static str {
		"previous_movement"
	}

	fn check(&self, ctx: &MovementContext<'_>, errors: &mut FieldErrors) {
		let status = ctx.movement.status;
		if !status.is_underway() {
			return;
		}

		let mut blocking: Vec<_> = ctx
			.earlier_movements()
			.filter(|m| m.status != Status::Completed)
			.collect();
		blocking.sort_by_key(|m| m.sequence);

		for previous in blocking {
			errors.add(
				"status",
				format!(
					"The previous movement (ID: {}) must be completed before this movement can \
					be set to `{}` Please try again.",
					previous.ref_num,
					status.label()
				),
			);
		}
	}
}

/// Once stored as VOIDED, a movement can no longer be changed.
pub struct VoidedMovementRule;

impl MovementRule for VoidedMovementRule {
	fn name(&self) -> &'static str {
		"voided_movement"
	}

	fn check(&self, ctx: &MovementContext<'_>, errors: &mut FieldErrors) {
		if ctx.persisted.is_some_and(|m| m.status == Status::Voided) {
			errors.add("status", VOIDED);
		}
	}
}
