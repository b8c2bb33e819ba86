//! Hazardous material endorsements.

use super::MovementRule;
use crate::MovementContext;
use tms_types::FieldErrors;

pub const NOT_CERTIFIED: &str =
	"Worker must be hazmat certified to haul this shipment. Please try again.";
pub const CERTIFICATION_EXPIRED: &str =
	"Worker hazmat certification has expired. Please try again.";

/// Requires every assigned worker of a hazmat shipment to hold a current
/// hazmat endorsement.
pub struct HazmatRule;

impl MovementRule for HazmatRule {
	fn name(&self) -> &'static str {
		"hazmat"
	}

	fn check(&self, ctx: &MovementContext<'_>, errors: &mut FieldErrors) {
		if !ctx.hazardous_material {
			return;
		}

		for (field, worker) in ctx.assigned_workers() {
			let profile = &worker.profile;
			if !profile.endorsement.allows_hazmat() {
				errors.add(field, NOT_CERTIFIED);
			}
			if profile
				.hazmat_expiration_date
				.is_some_and(|date| date < ctx.today)
			{
				errors.add(field, CERTIFICATION_EXPIRED);
			}
		}
	}
}
