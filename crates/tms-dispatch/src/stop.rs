//! Stop lateness, service incidents and stop status.
//!
//! A stop is late when its equipment arrived more than the organization's
//! grace period after the end of the appointment window. Depending on the
//! organization's incident policy, a late stop produces a [`ServiceIncident`].

use chrono::{DateTime, Duration, Utc};
use tms_types::{DispatchControl, FieldErrors, Movement, ServiceIncident, Status, Stop};
use uuid::Uuid;

pub const WINDOW_REVERSED: &str = "Appointment window end must be after the start.";
pub const DEPARTURE_WITHOUT_ARRIVAL: &str = "Must set arrival time before setting departure time.";
pub const DEPARTURE_BEFORE_ARRIVAL: &str = "Departure time must be after arrival time.";
pub const STATUS_REGRESSION: &str =
	"Cannot change status to new if the status was previously in progress or completed.";
pub const PREVIOUS_STOP_OPEN: &str =
	"Cannot change status to in progress or completed if previous stop is not completed.";
pub const BEFORE_PREVIOUS_STOP: &str = "Appointment time must be after previous stop.";
pub const MOVEMENT_VOIDED: &str = "Cannot record stops of a voided movement.";

/// Whether `stop` arrived after its window end plus `grace_period` minutes.
///
/// Arriving exactly at the end of the grace period is on time. A stop
/// without an arrival is never late.
pub fn is_late(stop: &Stop, grace_period: u32) -> bool {
	let deadline = stop.appointment_window_end + Duration::minutes(i64::from(grace_period));
	stop.arrival_time.is_some_and(|arrival| arrival > deadline)
}

/// Whole minutes between the window end and the arrival. Negative when the
/// stop arrived early, `None` without an arrival.
pub fn delay_minutes(stop: &Stop) -> Option<i64> {
	stop.arrival_time
		.map(|arrival| (arrival - stop.appointment_window_end).num_minutes())
}

/// Whether a late `stop` must be recorded under the organization's policy.
pub fn should_create_service_incident(stop: &Stop, control: &DispatchControl) -> bool {
	control.record_service_incident.covers(stop.stop_type) && is_late(stop, control.grace_period)
}

/// Builds the incident for `stop` when the policy requires one.
pub fn service_incident_for(
	stop: &Stop,
	movement: &Movement,
	control: &DispatchControl,
	now: DateTime<Utc>,
) -> Option<ServiceIncident> {
	if !should_create_service_incident(stop, control) {
		return None;
	}
	Some(ServiceIncident {
		id: Uuid::new_v4().to_string(),
		organization_id: movement.organization_id.clone(),
		movement_id: movement.id.clone(),
		stop_id: stop.id.clone(),
		stop_type: stop.stop_type,
		delay_minutes: delay_minutes(stop)?,
		created_at: now,
	})
}

/// Status implied by the stop's actual times.
///
/// Arrival and departure mean COMPLETED, arrival alone means IN_PROGRESS;
/// otherwise the current status stands.
pub fn derive_stop_status(stop: &Stop) -> Status {
	match (stop.arrival_time, stop.departure_time) {
		(Some(_), Some(_)) => Status::Completed,
		(Some(_), None) => Status::InProgress,
		_ => stop.status,
	}
}

/// Movement status implied by its stops, if it should change.
///
/// A started stop moves a NEW movement to IN_PROGRESS and a movement whose
/// stops are all completed becomes COMPLETED. Voided and completed movements
/// are left alone.
pub fn movement_status_from_stops(current: Status, stops: &[Stop]) -> Option<Status> {
	if matches!(current, Status::Voided | Status::Completed) || stops.is_empty() {
		return None;
	}
	if stops.iter().all(|s| s.status == Status::Completed) {
		return Some(Status::Completed);
	}
	if current == Status::New && stops.iter().any(|s| s.status.is_underway()) {
		return Some(Status::InProgress);
	}
	None
}

/// Checks a stop's own times and its relation to the stop before it.
///
/// `previous` is the stop with the preceding sequence in the same movement
/// and `persisted` the stored version of `stop`.
pub fn validate_stop(stop: &Stop, previous: Option<&Stop>, persisted: Option<&Stop>) -> FieldErrors {
	let mut errors = FieldErrors::new();

	if stop.appointment_window_end < stop.appointment_window_start {
		errors.add("appointment_window_end", WINDOW_REVERSED);
	}

	match (stop.arrival_time, stop.departure_time) {
		(None, Some(_)) => errors.add("departure_time", DEPARTURE_WITHOUT_ARRIVAL),
		(Some(arrival), Some(departure)) if departure < arrival => {
			errors.add("departure_time", DEPARTURE_BEFORE_ARRIVAL)
		},
		_ => {},
	}

	if stop.status == Status::New && persisted.is_some_and(|old| old.status.is_underway()) {
		errors.add("status", STATUS_REGRESSION);
	}

	if let Some(previous) = previous {
		if stop.appointment_window_start < previous.appointment_window_end {
			errors.add("appointment_window_start", BEFORE_PREVIOUS_STOP);
		}
		if stop.status.is_underway() && previous.status != Status::Completed {
			errors.add("status", PREVIOUS_STOP_OPEN);
		}
	}

	errors
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::fixtures::{movement, stop};
	use tms_types::{ServiceIncidentPolicy, StopType};

	fn minutes_after_end(stop: &Stop, minutes: i64) -> DateTime<Utc> {
		stop.appointment_window_end + Duration::minutes(minutes)
	}

	fn control(policy: ServiceIncidentPolicy, grace_period: u32) -> DispatchControl {
		DispatchControl {
			record_service_incident: policy,
			grace_period,
			..Default::default()
		}
	}

	#[test]
	fn test_lateness_boundary() {
		let mut s = stop("m1", 1, StopType::Delivery, Status::New);
		assert!(!is_late(&s, 0));

		s.arrival_time = Some(minutes_after_end(&s, 15));
		assert!(!is_late(&s, 15));
		assert!(is_late(&s, 14));

		s.arrival_time = Some(s.appointment_window_end + Duration::seconds(15 * 60 + 1));
		assert!(is_late(&s, 15));
	}

	#[test]
	fn test_delay_minutes() {
		let mut s = stop("m1", 1, StopType::Pickup, Status::New);
		assert_eq!(delay_minutes(&s), None);
		s.arrival_time = Some(minutes_after_end(&s, 45));
		assert_eq!(delay_minutes(&s), Some(45));
		s.arrival_time = Some(minutes_after_end(&s, -30));
		assert_eq!(delay_minutes(&s), Some(-30));
	}

	#[test]
	fn test_incident_follows_policy() {
		let mut pickup = stop("m1", 1, StopType::Pickup, Status::New);
		pickup.arrival_time = Some(minutes_after_end(&pickup, 60));
		let mut delivery = stop("m1", 2, StopType::Delivery, Status::New);
		delivery.arrival_time = Some(minutes_after_end(&delivery, 60));

		let delivery_only = control(ServiceIncidentPolicy::Delivery, 30);
		assert!(!should_create_service_incident(&pickup, &delivery_only));
		assert!(should_create_service_incident(&delivery, &delivery_only));

		let shipper_exempt = control(ServiceIncidentPolicy::AllExceptShipper, 30);
		assert!(!should_create_service_incident(&pickup, &shipper_exempt));
		assert!(should_create_service_incident(&delivery, &shipper_exempt));

		let generous = control(ServiceIncidentPolicy::PickupAndDelivery, 90);
		assert!(!should_create_service_incident(&delivery, &generous));

		let never = control(ServiceIncidentPolicy::Never, 0);
		assert!(!should_create_service_incident(&delivery, &never));
	}

	#[test]
	fn test_service_incident_for() {
		let m = movement("m1", 1, Status::InProgress);
		let mut s = stop("m1", 2, StopType::Delivery, Status::New);
		s.arrival_time = Some(minutes_after_end(&s, 75));
		let now = Utc::now();

		let incident =
			service_incident_for(&s, &m, &control(ServiceIncidentPolicy::Delivery, 15), now)
				.unwrap();
		assert_eq!(incident.delay_minutes, 75);
		assert_eq!(incident.stop_id, s.id);
		assert_eq!(incident.organization_id, "acme");
		assert_eq!(incident.created_at, now);

		assert!(
			service_incident_for(&s, &m, &control(ServiceIncidentPolicy::Pickup, 15), now)
				.is_none()
		);
	}

	#[test]
	fn test_derive_stop_status() {
		let mut s = stop("m1", 1, StopType::Pickup, Status::New);
		assert_eq!(derive_stop_status(&s), Status::New);

		s.arrival_time = Some(minutes_after_end(&s, 0));
		assert_eq!(derive_stop_status(&s), Status::InProgress);

		s.departure_time = Some(minutes_after_end(&s, 30));
		assert_eq!(derive_stop_status(&s), Status::Completed);
	}

	#[test]
	fn test_movement_status_from_stops() {
		let mut stops = vec![
			stop("m1", 1, StopType::Pickup, Status::InProgress),
			stop("m1", 2, StopType::Delivery, Status::New),
		];
		assert_eq!(
			movement_status_from_stops(Status::New, &stops),
			Some(Status::InProgress)
		);
		assert_eq!(movement_status_from_stops(Status::InProgress, &stops), None);

		stops[0].status = Status::Completed;
		stops[1].status = Status::Completed;
		assert_eq!(
			movement_status_from_stops(Status::InProgress, &stops),
			Some(Status::Completed)
		);
		assert_eq!(movement_status_from_stops(Status::Voided, &stops), None);
		assert_eq!(movement_status_from_stops(Status::New, &[]), None);
	}

	#[test]
	fn test_validate_stop_times() {
		let mut s = stop("m1", 1, StopType::Pickup, Status::New);
		assert!(validate_stop(&s, None, None).is_empty());

		s.appointment_window_end = s.appointment_window_start - Duration::minutes(1);
		s.departure_time = Some(s.appointment_window_start);
		let errors = validate_stop(&s, None, None);
		assert_eq!(
			errors.get("appointment_window_end").unwrap(),
			&[WINDOW_REVERSED.to_string()]
		);
		assert_eq!(
			errors.get("departure_time").unwrap(),
			&[DEPARTURE_WITHOUT_ARRIVAL.to_string()]
		);

		s.arrival_time = Some(s.appointment_window_start + Duration::minutes(10));
		let errors = validate_stop(&s, None, None);
		assert_eq!(
			errors.get("departure_time").unwrap(),
			&[DEPARTURE_BEFORE_ARRIVAL.to_string()]
		);
	}

	#[test]
	fn test_validate_stop_against_neighbours() {
		let previous = stop("m1", 1, StopType::Pickup, Status::InProgress);
		let mut s = stop("m1", 2, StopType::Delivery, Status::InProgress);
		s.appointment_window_start = previous.appointment_window_start - Duration::hours(1);

		let errors = validate_stop(&s, Some(&previous), None);
		assert!(errors.contains("appointment_window_start"));
		assert_eq!(
			errors.get("status").unwrap(),
			&[PREVIOUS_STOP_OPEN.to_string()]
		);

		let stored = stop("m1", 2, StopType::Delivery, Status::Completed);
		s.status = Status::New;
		let errors = validate_stop(&s, None, Some(&stored));
		assert_eq!(
			errors.get("status").unwrap(),
			&[STATUS_REGRESSION.to_string()]
		);
	}

	#[test]
	fn test_window_overlapping_previous_stop() {
		let previous = stop("m1", 1, StopType::Pickup, Status::Completed);
		let mut s = stop("m1", 2, StopType::Delivery, Status::New);

		s.appointment_window_start = previous.appointment_window_end - Duration::hours(1);
		s.appointment_window_end = previous.appointment_window_end + Duration::hours(2);
		let errors = validate_stop(&s, Some(&previous), None);
		assert_eq!(
			errors.get("appointment_window_start").unwrap(),
			&[BEFORE_PREVIOUS_STOP.to_string()]
		);

		s.appointment_window_start = previous.appointment_window_end;
		assert!(validate_stop(&s, Some(&previous), None).is_empty());
	}
}
