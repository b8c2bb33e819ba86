//! The movement validator.

use crate::rules::{default_rules, MovementRule};
use crate::{DispatchError, MovementContext};
use tms_types::FieldErrors;
use tracing::{debug, instrument};

/// Runs an ordered set of [`MovementRule`]s and aggregates their messages.
pub struct MovementValidator {
	rules: Vec<Box<dyn MovementRule>>,
}

impl Default for MovementValidator {
	fn default() -> Self {
		Self::new(default_rules())
	}
}

impl MovementValidator {
	pub fn new(rules: Vec<Box<dyn MovementRule>>) -> Self {
		Self { rules }
	}

	/// Names of the rules in evaluation order.
	pub fn rule_names(&self) -> Vec<&'static str> {
		self.rules.iter().map(|rule| rule.name()).collect()
	}

	/// Evaluates every rule. An empty result means the movement is valid.
	#[instrument(skip_all, fields(movement = %ctx.movement.id, status = %ctx.movement.status))]
	pub fn validate(&self, ctx: &MovementContext<'_>) -> FieldErrors {
		let mut errors = FieldErrors::new();
		for rule in &self.rules {
			let before = errors.message_count();
			rule.check(ctx, &mut errors);
			let added = errors.message_count() - before;
			if added > 0 {
				debug!(rule = rule.name(), added, "rule reported violations");
			}
		}
		errors
	}

	/// Like [`validate`](Self::validate) but fails with
	/// [`DispatchError::Rejected`] when any rule fired.
	pub fn check(&self, ctx: &MovementContext<'_>) -> Result<(), DispatchError> {
		self.validate(ctx).into_result().map_err(DispatchError::Rejected)
	}
}
