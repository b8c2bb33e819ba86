//! Movement validation rules.
//!
//! Each rule inspects a [`MovementContext`] and appends its messages to a
//! shared [`FieldErrors`]. Rules never short-circuit one another, so a caller
//! sees every violation at once.

use crate::MovementContext;
use tms_types::FieldErrors;

pub mod assignment;
pub mod equipment;
pub mod hazmat;
pub mod regulatory;
pub mod status;

/// A single movement rule.
pub trait MovementRule: Send + Sync {
	/// Short name used in logs.
	fn name(&self) -> &'static str;

	fn check(&self, ctx: &MovementContext<'_>, errors: &mut FieldErrors);
}

/// The standard rule set in evaluation order.
pub fn default_rules() -> Vec<Box<dyn MovementRule>> {
	vec![
		Box::new(regulatory::RegulatoryRule),
		Box::new(hazmat::HazmatRule),
		Box::new(assignment::DistinctWorkersRule),
		Box::new(status::StopStatusRule),
		Box::new(assignment::RequiredAssignmentRule),
		Box::new(assignment::FleetMatchRule),
		Box::new(status::PreviousMovementRule),
		Box::new(equipment::TrailerAvailableRule),
		Box::new(status::VoidedMovementRule),
	]
}
