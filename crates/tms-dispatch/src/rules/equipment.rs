//! Equipment availability.

use super::MovementRule;
use crate::MovementContext;
use tms_types::{EquipmentStatus, FieldErrors};

pub const TRAILER_UNAVAILABLE: &str =
	"Cannot assign a trailer that is not `available`. Please try again.";

/// An assigned trailer must be available.
pub struct TrailerAvailableRule;

impl MovementRule for TrailerAvailableRule {
	fn name(&self) -> &'static str {
		"trailer_available"
	}

	fn check(&self, ctx: &MovementContext<'_>, errors: &mut FieldErrors) {
		if ctx
			.trailer
			.is_some_and(|trailer| trailer.status != EquipmentStatus::Available)
		{
			errors.add("trailer", TRAILER_UNAVAILABLE);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::fixtures::*;
	use tms_types::{DispatchControl, Trailer};

	#[test]
	fn test_trailer_status() {
		let mut request = request();
		request.movement.trailer_id = Some("tr1".into());
		request.trailer = Some(Trailer {
			id: "tr1".into(),
			code: "TR1".into(),
			status: EquipmentStatus::AtMaintenance,
		});
		let control = DispatchControl::default();

		let mut errors = FieldErrors::new();
		TrailerAvailableRule.check(&request.context(&control, None, today()), &mut errors);
		assert_eq!(
			errors.get("trailer").unwrap(),
			&[TRAILER_UNAVAILABLE.to_string()]
		);

		request.trailer.as_mut().unwrap().status = EquipmentStatus::Available;
		let mut errors = FieldErrors::new();
		TrailerAvailableRule.check(&request.context(&control, None, today()), &mut errors);
		assert!(errors.is_empty());
	}
}
