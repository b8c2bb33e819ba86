//! Records shared by the engine tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tms_dispatch::DispatchRequest;
use tms_types::{Movement, Status, Stop, StopType, Tractor, Worker};

pub fn today() -> NaiveDate {
	NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

/// 10:00 UTC on [`today`], the end of every fixture appointment window.
pub fn window_end() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
}

pub fn movement(id: &str, sequence: u32, status: Status) -> Movement {
	Movement {
		id: id.to_string(),
		ref_num: format!("MOV-{}", id.to_uppercase()),
		organization_id: "acme".into(),
		shipment_id: "ship-1".into(),
		sequence,
		status,
		tractor_id: Some("t1".into()),
		primary_worker_id: Some("w1".into()),
		secondary_worker_id: None,
		trailer_id: None,
		updated_at: 0,
	}
}

pub fn stop(movement_id: &str, sequence: u32, stop_type: StopType) -> Stop {
	let offset = chrono::Duration::hours(i64::from(sequence - 1) * 4);
	Stop {
		id: format!("{}-s{}", movement_id, sequence),
		movement_id: movement_id.to_string(),
		sequence,
		stop_type,
		status: Status::New,
		appointment_window_start: window_end() - chrono::Duration::hours(2) + offset,
		appointment_window_end: window_end() + offset,
		arrival_time: None,
		departure_time: None,
	}
}

/// A NEW movement `m1` with worker `w1`, tractor `t1`, a pickup and a delivery.
pub fn request() -> DispatchRequest {
	let mut request = DispatchRequest::new(movement("m1", 1, Status::New));
	request.stops = vec![
		stop("m1", 1, StopType::Pickup),
		stop("m1", 2, StopType::Delivery),
	];
	request.workers = vec![Worker {
		id: "w1".into(),
		code: "W1".into(),
		fleet_code: Some("EAST".into()),
		profile: Default::default(),
	}];
	request.tractor = Some(Tractor {
		id: "t1".into(),
		code: "T1".into(),
		fleet_code: Some("EAST".into()),
		status: Default::default(),
	});
	request
}
