//! Inputs of the movement validator.

use crate::DispatchError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tms_types::{DispatchControl, Movement, Stop, Tractor, Trailer, Worker};

/// A movement together with every record its rules consult.
///
/// This is the document accepted by `tms validate-movement` and by the
/// engine's movement handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
	pub movement: Movement,
	#[serde(default)]
	pub stops: Vec<Stop>,
	/// Workers referenced by the movement. Unreferenced entries are ignored.
	#[serde(default)]
	pub workers: Vec<Worker>,
	#[serde(default)]
	pub tractor: Option<Tractor>,
	#[serde(default)]
	pub trailer: Option<Trailer>,
	/// Whether the movement's shipment carries hazardous material.
	#[serde(default)]
	pub hazardous_material: bool,
	/// The other movements of the same shipment.
	#[serde(default)]
	pub shipment_movements: Vec<Movement>,
}

impl DispatchRequest {
	pub fn new(movement: Movement) -> Self {
		Self {
			movement,
			stops: Vec::new(),
			workers: Vec::new(),
			tractor: None,
			trailer: None,
			hazardous_material: false,
			shipment_movements: Vec::new(),
		}
	}

	/// Rejects documents whose parts do not belong together.
	pub fn check_shape(&self) -> Result<(), DispatchError> {
		if let Some(stop) = self
			.stops
			.iter()
			.find(|stop| stop.movement_id != self.movement.id)
		{
			return Err(DispatchError::InvalidRequest(format!(
				"stop {} belongs to movement {}, not {}",
				stop.id, stop.movement_id, self.movement.id
			)));
		}
		if let Some(other) = self
			.shipment_movements
			.iter()
			.find(|other| other.shipment_id != self.movement.shipment_id)
		{
			return Err(DispatchError::InvalidRequest(format!(
				"movement {} belongs to shipment {}, not {}",
				other.id, other.shipment_id, self.movement.shipment_id
			)));
		}
		let movement = &self.movement;
		let primary = movement.primary_worker_id.as_deref();
		let secondary = movement.secondary_worker_id.as_deref();
		let unresolved = [
			("primary worker", primary, self.worker(primary).is_some()),
			("secondary worker", secondary, self.worker(secondary).is_some()),
			("tractor", movement.tractor_id.as_deref(), self.tractor().is_some()),
			("trailer", movement.trailer_id.as_deref(), self.trailer().is_some()),
		]
		.into_iter()
		.find_map(|(kind, id, resolved)| id.filter(|_| !resolved).map(|id| (kind, id)));
		if let Some((kind, id)) = unresolved {
			return Err(DispatchError::InvalidRequest(format!(
				"{} {} of movement {} is not supplied",
				kind, id, movement.id
			)));
		}
		Ok(())
	}

	fn worker(&self, id: Option<&str>) -> Option<&Worker> {
		let id = id?;
		self.workers.iter().find(|worker| worker.id == id)
	}

	fn tractor(&self) -> Option<&Tractor> {
		self.tractor
			.as_ref()
			.filter(|t| self.movement.tractor_id.as_deref() == Some(t.id.as_str()))
	}

	fn trailer(&self) -> Option<&Trailer> {
		self.trailer
			.as_ref()
			.filter(|t| self.movement.trailer_id.as_deref() == Some(t.id.as_str()))
	}

	/// Borrows this request as a validator context.
	///
	/// `persisted` is the stored version of the movement, when one exists.
	pub fn context<'a>(
		&'a self,
		control: &'a DispatchControl,
		persisted: Option<&'a Movement>,
		today: NaiveDate,
	) -> MovementContext<'a> {
		let movement = &self.movement;
		MovementContext {
			movement,
			persisted,
			stops: &self.stops,
			control,
			primary_worker: self.worker(movement.primary_worker_id.as_deref()),
			secondary_worker: self.worker(movement.secondary_worker_id.as_deref()),
			tractor: self.tractor(),
			trailer: self.trailer(),
			hazardous_material: self.hazardous_material,
			shipment_movements: &self.shipment_movements,
			today,
		}
	}
}

/// Everything a validation rule may look at, resolved and borrowed.
#[derive(Debug, Clone, Copy)]
pub struct MovementContext<'a> {
	pub movement: &'a Movement,
	pub persisted: Option<&'a Movement>,
	pub stops: &'a [Stop],
	pub control: &'a DispatchControl,
	pub primary_worker: Option<&'a Worker>,
	pub secondary_worker: Option<&'a Worker>,
	pub tractor: Option<&'a Tractor>,
	pub trailer: Option<&'a Trailer>,
	pub hazardous_material: bool,
	pub shipment_movements: &'a [Movement],
	/// Date expirations are compared against.
	pub today: NaiveDate,
}

impl<'a> MovementContext<'a> {
	/// Assigned workers paired with the field their errors are reported on.
	pub fn assigned_workers(&self) -> impl Iterator<Item = (&'static str, &'a Worker)> {
		[
			("primary_worker", self.primary_worker),
			("secondary_worker", self.secondary_worker),
		]
		.into_iter()
		.filter_map(|(field, worker)| worker.map(|w| (field, w)))
	}

	/// The stop with the lowest sequence.
	pub fn first_stop(&self) -> Option<&'a Stop> {
		self.stops.iter().min_by_key(|stop| stop.sequence)
	}

	/// Movements of the same shipment that come before this one.
	pub fn earlier_movements(&self) -> impl Iterator<Item = &'a Movement> {
		let movement = self.movement;
		self.shipment_movements.iter().filter(move |other| {
			other.id != movement.id
				&& other.shipment_id == movement.shipment_id
				&& other.sequence < movement.sequence
		})
	}
}

#[cfg(test)]
pub(crate) mod fixtures {
	use super::*;
	use chrono::{TimeZone, Utc};
	use tms_types::{Status, StopType, WorkerProfile};

	pub fn today() -> NaiveDate {
		NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
	}

	pub fn movement(id: &str, sequence: u32, status: Status) -> Movement {
		Movement {
			id: id.to_string(),
			ref_num: format!("MOV-{}", id.to_uppercase()),
			organization_id: "acme".into(),
			shipment_id: "ship-1".into(),
			sequence,
			status,
			tractor_id: None,
			primary_worker_id: None,
			secondary_worker_id: None,
			trailer_id: None,
			updated_at: 0,
		}
	}

	pub fn worker(id: &str) -> Worker {
		Worker {
			id: id.to_string(),
			code: id.to_uppercase(),
			fleet_code: Some("EAST".into()),
			profile: WorkerProfile::default(),
		}
	}

	pub fn tractor(id: &str) -> Tractor {
		Tractor {
			id: id.to_string(),
			code: id.to_uppercase(),
			fleet_code: Some("EAST".into()),
			status: Default::default(),
		}
	}

	pub fn stop(movement_id: &str, sequence: u32, stop_type: StopType, status: Status) -> Stop {
		Stop {
			id: format!("{}-s{}", movement_id, sequence),
			movement_id: movement_id.to_string(),
			sequence,
			stop_type,
			status,
			appointment_window_start: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
			appointment_window_end: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
			arrival_time: None,
			departure_time: None,
		}
	}

	/// A NEW movement with one worker, a tractor and two NEW stops.
	pub fn request() -> DispatchRequest {
		let mut movement = movement("m1", 1, Status::New);
		movement.primary_worker_id = Some("w1".into());
		movement.tractor_id = Some("t1".into());

		DispatchRequest {
			stops: vec![
				stop("m1", 1, StopType::Pickup, Status::New),
				stop("m1", 2, StopType::Delivery, Status::New),
			],
			workers: vec![worker("w1"), worker("w2")],
			tractor: Some(tractor("t1")),
			trailer: None,
			hazardous_material: false,
			shipment_movements: Vec::new(),
			movement,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::fixtures::*;
	use super::*;
	use tms_types::Status;

	#[test]
	fn test_context_resolves_assignments() {
		let mut request = fixtures::request();
		request.movement.secondary_worker_id = Some("w2".into());
		let control = DispatchControl::default();
		let ctx = request.context(&control, None, today());

		assert_eq!(ctx.primary_worker.map(|w| w.id.as_str()), Some("w1"));
		assert_eq!(ctx.secondary_worker.map(|w| w.id.as_str()), Some("w2"));
		assert_eq!(ctx.tractor.map(|t| t.id.as_str()), Some("t1"));
		assert_eq!(ctx.assigned_workers().count(), 2);
		assert_eq!(ctx.first_stop().map(|s| s.sequence), Some(1));
	}

	#[test]
	fn test_context_ignores_unassigned_equipment() {
		let mut request = fixtures::request();
		request.movement.tractor_id = Some("t9".into());
		let control = DispatchControl::default();
		let ctx = request.context(&control, None, today());
		assert!(ctx.tractor.is_none());
	}

	#[test]
	fn test_earlier_movements() {
		let mut request = fixtures::request();
		request.movement.sequence = 2;
		request.shipment_movements = vec![
			movement("m0", 1, Status::Completed),
			movement("m1", 2, Status::New),
			movement("m3", 3, Status::New),
		];
		let control = DispatchControl::default();
		let ctx = request.context(&control, None, today());
		let earlier: Vec<_> = ctx.earlier_movements().map(|m| m.id.as_str()).collect();
		assert_eq!(earlier, vec!["m0"]);
	}

	#[test]
	fn test_request_from_json() {
		let json = r#"{
			"movement": {
				"id": "m1",
				"ref_num": "MOV-1",
				"organization_id": "acme",
				"shipment_id": "ship-1",
				"sequence": 1,
				"status": "IN_PROGRESS",
				"primary_worker_id": "w1"
			},
			"stops": [{
				"id": "s1",
				"movement_id": "m1",
				"sequence": 1,
				"stop_type": "PICKUP",
				"appointment_window_start": "2024-06-01T08:00:00Z",
				"appointment_window_end": "2024-06-01T10:00:00Z"
			}],
			"workers": [{"id": "w1", "code": "W1"}]
		}"#;

		let request: DispatchRequest = serde_json::from_str(json).unwrap();
		assert_eq!(request.movement.status, Status::InProgress);
		assert_eq!(request.stops[0].status, Status::New);
		assert!(request.tractor.is_none());
		assert!(!request.hazardous_material);
		assert!(request.check_shape().is_ok());
	}

	#[test]
	fn test_check_shape() {
		let mut request = fixtures::request();
		assert!(request.check_shape().is_ok());

		request.stops[0].movement_id = "other".into();
		assert!(matches!(
			request.check_shape(),
			Err(DispatchError::InvalidRequest(_))
		));
	}

	#[test]
	fn test_check_shape_requires_assigned_records() {
		let mut request = fixtures::request();
		request.hazardous_material = true;
		request.workers.clear();
		assert!(matches!(
			request.check_shape(),
			Err(DispatchError::InvalidRequest(msg)) if msg.contains("primary worker w1")
		));

		let mut request = fixtures::request();
		request.movement.secondary_worker_id = Some("w9".into());
		assert!(request.check_shape().is_err());

		let mut request = fixtures::request();
		request.movement.tractor_id = Some("t9".into());
		assert!(matches!(
			request.check_shape(),
			Err(DispatchError::InvalidRequest(msg)) if msg.contains("tractor t9")
		));

		let mut request = fixtures::request();
		request.movement.trailer_id = Some("tr1".into());
		assert!(request.check_shape().is_err());
		request.trailer = Some(Trailer {
			id: "tr1".into(),
			code: "TR1".into(),
			status: Default::default(),
		});
		assert!(request.check_shape().is_ok());
	}
}
