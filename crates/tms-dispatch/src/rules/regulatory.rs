//! Worker regulatory compliance.

use super::MovementRule;
use crate::MovementContext;
use chrono::NaiveDate;
use tms_types::{FieldErrors, WorkerProfile};

const TERMINATED: &str =
	"Cannot assign a terminated worker. Please update the worker's profile and try again.";

/// Rejects workers whose license, physical, medical certificate or MVR has
/// lapsed, and workers with a termination date. Only runs when the
/// organization enables `regulatory_check`.
pub struct RegulatoryRule;

fn expired_message(what: &str) -> String {
	format!(
		"Cannot assign a worker with an expired {}. Please update the worker's profile and try again.",
		what
	)
}

/// Documents that lapse, with the wording used in their message.
fn dated_documents(profile: &WorkerProfile) -> [(&'static str, Option<NaiveDate>); 4] {
	[
		("license", profile.license_expiration_date),
		("physical", profile.physical_due_date),
		("medical certificate", profile.medical_cert_date),
		("MVR", profile.mvr_due_date),
	]
}

impl MovementRule for RegulatoryRule {
	fn name(&self) -> &'static str {
		"regulatory"
	}

	fn check(&self, ctx: &MovementContext<'_>, errors: &mut FieldErrors) {
		if !ctx.control.regulatory_check {
			return;
		}

		for (field, worker) in ctx.assigned_workers() {
			for (what, date) in dated_documents(&worker.profile) {
				if date.is_some_and(|date| date < ctx.today) {
					errors.add(field, expired_message(what));
				}
			}
			if worker.profile.termination_date.is_some() {
				errors.add(field, TERMINATED);
			}
		}
	}
}
