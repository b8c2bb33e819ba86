//! Worker and tractor assignment rules.

use super::MovementRule;
use crate::MovementContext;
use tms_types::FieldErrors;

pub const SAME_WORKER: &str =
	"Primary worker cannot be the same as secondary worker. Please try again.";
pub const FLEET_MISMATCH: &str = "The primary worker and tractor must belong to the same fleet \
	to add or update a record. Please ensure they are part of the same fleet and try again.";

fn required_message(what: &str) -> String {
	format!(
		"{} is required before movement status can be changed to `In Progress` or `Completed`. \
		Please try again.",
		what
	)
}

/// The primary and secondary worker must be different people.
pub struct DistinctWorkersRule;

impl MovementRule for DistinctWorkersRule {
	fn name(&self) -> &'static str {
		"distinct_workers"
	}

	fn check(&self, ctx: &MovementContext<'_>, errors: &mut FieldErrors) {
		let movement = ctx.movement;
		if movement.primary_worker_id.is_some()
			&& movement.primary_worker_id == movement.secondary_worker_id
		{
			errors.add("primary_worker", SAME_WORKER);
		}
	}
}

/// A movement that is underway needs a primary worker and a tractor. Each
/// missing assignment is reported on its own field.
pub struct RequiredAssignmentRule;

impl MovementRule for RequiredAssignmentRule {
	fn name(&self) -> &'static str {
		"required_assignment"
	}

	fn check(&self, ctx: &MovementContext<'_>, errors: &mut FieldErrors) {
		let movement = ctx.movement;
		if !movement.status.is_underway() {
			return;
		}
		if movement.primary_worker_id.is_none() {
			errors.add("primary_worker", required_message("Primary worker"));
		}
		if movement.tractor_id.is_none() {
			errors.add("tractor", required_message("Tractor"));
		}
	}
}

/// With `tractor_worker_fleet_constraint`, the primary worker and the
/// tractor must share a fleet code.
pub struct FleetMatchRule;

impl MovementRule for FleetMatchRule {
	fn name(&self) -> &'static str {
		"fleet_match"
	}

	fn check(&self, ctx: &MovementContext<'_>, errors: &mut FieldErrors) {
		if !ctx.control.tractor_worker_fleet_constraint {
			return;
		}
		let (Some(worker), Some(tractor)) = (ctx.primary_worker, ctx.tractor) else {
			return;
		};
		if worker.fleet_code != tractor.fleet_code {
			errors.add("primary_worker", FLEET_MISMATCH);
			errors.add("tractor", FLEET_MISMATCH);
		}
	}
}
