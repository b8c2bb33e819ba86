//! Stop handler for recording arrival and departure times.
//!
//! Recording a stop derives its status from the actual times, validates it
//! against the stop before it, records a service incident when the stop was
//! late under the organization's policy, and carries the resulting progress
//! over to the movement. Stops of voided movements are not recorded.

use crate::engine::event_bus::EventBus;
use crate::state::{MovementStateError, MovementStateMachine};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tms_dispatch::stop::MOVEMENT_VOIDED;
use tms_dispatch::{
	derive_stop_status, movement_status_from_stops, service_incident_for, validate_stop,
};
use tms_storage::StorageService;
use tms_types::{
	format_delay, truncate_id, DispatchControl, FieldErrors, MovementEvent, ServiceIncident,
	Status, Stop, StopEvent, StorageKey, TmsEvent,
};
use tracing::{debug, info, instrument, warn};

/// Errors that can occur while recording a stop.
#[derive(Debug, Error)]
pub enum StopError {
	#[error("Validation failed: {0}")]
	Rejected(FieldErrors),
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("State error: {0}")]
	State(#[from] MovementStateError),
}

/// What recording a stop changed.
#[derive(Debug, Clone)]
pub struct StopOutcome {
	/// The stop as stored, with its derived status.
	pub stop: Stop,
	/// The incident recorded by this call, if any.
	pub incident: Option<ServiceIncident>,
	/// The movement's new status when the stop moved it forward.
	pub movement_status: Option<Status>,
}

pub struct StopHandler {
	storage: Arc<StorageService>,
	state_machine: Arc<MovementStateMachine>,
	event_bus: EventBus,
}

impl StopHandler {
	pub fn new(
		storage: Arc<StorageService>,
		state_machine: Arc<MovementStateMachine>,
		event_bus: EventBus,
	) -> Self {
		Self {
			storage,
			state_machine,
			event_bus,
		}
	}

	#[instrument(skip_all, fields(stop_id = %truncate_id(&stop.id), movement_id = %truncate_id(&stop.movement_id)))]
	pub async fn record(
		&self,
		mut stop: Stop,
		control: &DispatchControl,
		now: DateTime<Utc>,
	) -> Result<StopOutcome, StopError> {
		let movement = self.state_machine.get_movement(&stop.movement_id).await?;
		if movement.status == Status::Voided {
			let mut errors = FieldErrors::new();
			errors.add("status", MOVEMENT_VOIDED);
			warn!("Stop of voided movement rejected");
			return Err(StopError::Rejected(errors));
		}
		let mut siblings = self.state_machine.movement_stops(&stop.movement_id).await?;

		let persisted = siblings.iter().find(|s| s.id == stop.id);
		let previous = siblings
			.iter()
			.filter(|s| s.id != stop.id && s.sequence < stop.sequence)
			.max_by_key(|s| s.sequence);

		stop.status = derive_stop_status(&stop);
		let errors = validate_stop(&stop, previous, persisted);
		if !errors.is_empty() {
			warn!(violations = errors.message_count(), "Stop rejected");
			return Err(StopError::Rejected(errors));
		}

		self.storage
			.store(StorageKey::Stops.as_str(), &stop.id, &stop)
			.await
			.map_err(|e| StopError::Storage(e.to_string()))?;
		debug!(status = %stop.status, "Stop recorded");
		self.event_bus
			.publish(TmsEvent::Stop(StopEvent::Recorded {
				stop_id: stop.id.clone(),
				movement_id: stop.movement_id.clone(),
				status: stop.status,
			}))
			.ok();

		let incident = match service_incident_for(&stop, &movement, control, now) {
			Some(incident) => self.record_incident(incident).await?,
			None => None,
		};

		siblings.retain(|s| s.id != stop.id);
		siblings.push(stop.clone());
		let movement_status = match movement_status_from_stops(movement.status, &siblings) {
			Some(target) => {
				// A NEW movement passes through IN_PROGRESS on its way to COMPLETED.
				let mut from = movement.status;
				if from == Status::New && target == Status::Completed {
					self.progress(&movement.id, from, Status::InProgress).await?;
					from = Status::InProgress;
				}
				self.progress(&movement.id, from, target).await?;
				Some(target)
			},
			None => None,
		};

		Ok(StopOutcome {
			stop,
			incident,
			movement_status,
		})
	}

	async fn progress(&self, movement_id: &str, from: Status, to: Status) -> Result<(), StopError> {
		self.state_machine.advance_status(movement_id, to).await?;
		info!(%from, %to, "Movement progressed from stops");
		self.event_bus
			.publish(TmsEvent::Movement(MovementEvent::StatusChanged {
				movement_id: movement_id.to_string(),
				from,
				to,
			}))
			.ok();
		Ok(())
	}

	/// Incidents recorded for `stop_id`.
	pub async fn incidents_for(&self, stop_id: &str) -> Result<Vec<ServiceIncident>, StopError> {
		let incidents: Vec<ServiceIncident> = self
			.storage
			.retrieve_all(StorageKey::ServiceIncidents.as_str())
			.await
			.map_err(|e| StopError::Storage(e.to_string()))?;
		Ok(incidents
			.into_iter()
			.filter(|incident| incident.stop_id == stop_id)
			.collect())
	}

	// A stop yields at most one incident, however often it is recorded.
	async fn record_incident(
		&self,
		incident: ServiceIncident,
	) -> Result<Option<ServiceIncident>, StopError> {
		if !self.incidents_for(&incident.stop_id).await?.is_empty() {
			debug!("Service incident already recorded");
			return Ok(None);
		}

		self.storage
			.store(
				StorageKey::ServiceIncidents.as_str(),
				&incident.id,
				&incident,
			)
			.await
			.map_err(|e| StopError::Storage(e.to_string()))?;
		info!(
			incident_id = %truncate_id(&incident.id),
			stop_type = %incident.stop_type,
			delay = %format_delay(incident.delay_minutes),
			"Service incident recorded"
		);
		self.event_bus
			.publish(TmsEvent::Stop(StopEvent::IncidentRecorded {
				incident: incident.clone(),
			}))
			.ok();
		Ok(Some(incident))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{request, window_end};
	use chrono::Duration;
	use tms_dispatch::MovementValidator;
	use tms_storage::implementations::memory::MemoryStorage;
	use tms_types::ServiceIncidentPolicy;

	struct Harness {
		handler: StopHandler,
		state_machine: Arc<MovementStateMachine>,
		storage: Arc<StorageService>,
		event_bus: EventBus,
	}

	async fn harness() -> Harness {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let state_machine = Arc::new(MovementStateMachine::new(
			storage.clone(),
			Arc::new(MovementValidator::default()),
		));
		let request = request();
		state_machine.store_movement(&request.movement).await.unwrap();
		for stop in &request.stops {
			storage
				.store(StorageKey::Stops.as_str(), &stop.id, stop)
				.await
				.unwrap();
		}
		let event_bus = EventBus::new(16);
		Harness {
			handler: StopHandler::new(storage.clone(), state_machine.clone(), event_bus.clone()),
			state_machine,
			storage,
			event_bus,
		}
	}

	fn control() -> DispatchControl {
		DispatchControl {
			record_service_incident: ServiceIncidentPolicy::PickupAndDelivery,
			grace_period: 30,
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_arrival_starts_stop_and_movement() {
		let h = harness().await;
		let mut stop = request().stops[0].clone();
		stop.arrival_time = Some(window_end() - Duration::minutes(20));

		let outcome = h.handler.record(stop, &control(), Utc::now()).await.unwrap();
		assert_eq!(outcome.stop.status, Status::InProgress);
		assert!(outcome.incident.is_none());
		assert_eq!(outcome.movement_status, Some(Status::InProgress));
		assert_eq!(
			h.state_machine.get_movement("m1").await.unwrap().status,
			Status::InProgress
		);
	}

	#[tokio::test]
	async fn test_late_stop_records_one_incident() {
		let h = harness().await;
		let mut events = h.event_bus.subscribe();
		let mut stop = request().stops[0].clone();
		stop.arrival_time = Some(window_end() + Duration::minutes(45));

		let outcome = h
			.handler
			.record(stop.clone(), &control(), Utc::now())
			.await
			.unwrap();
		let incident = outcome.incident.unwrap();
		assert_eq!(incident.delay_minutes, 45);
		assert_eq!(incident.organization_id, "acme");

		stop.departure_time = Some(window_end() + Duration::minutes(90));
		let outcome = h.handler.record(stop, &control(), Utc::now()).await.unwrap();
		assert_eq!(outcome.stop.status, Status::Completed);
		assert!(outcome.incident.is_none());
		assert_eq!(h.handler.incidents_for("m1-s1").await.unwrap().len(), 1);

		let mut recorded = 0;
		while let Ok(event) = events.try_recv() {
			if matches!(event, TmsEvent::Stop(StopEvent::IncidentRecorded { .. })) {
				recorded += 1;
			}
		}
		assert_eq!(recorded, 1);
	}

	#[tokio::test]
	async fn test_within_grace_period_is_not_an_incident() {
		let h = harness().await;
		let mut stop = request().stops[0].clone();
		stop.arrival_time = Some(window_end() + Duration::minutes(30));

		let outcome = h.handler.record(stop, &control(), Utc::now()).await.unwrap();
		assert!(outcome.incident.is_none());
	}

	#[tokio::test]
	async fn test_rejects_departure_before_arrival() {
		let h = harness().await;
		let mut stop = request().stops[0].clone();
		stop.arrival_time = Some(window_end());
		stop.departure_time = Some(window_end() - Duration::minutes(5));

		match h.handler.record(stop, &control(), Utc::now()).await {
			Err(StopError::Rejected(errors)) => assert!(errors.contains("departure_time")),
			other => panic!("unexpected outcome {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_later_stop_waits_for_previous() {
		let h = harness().await;
		let mut stop = request().stops[1].clone();
		stop.arrival_time = Some(stop.appointment_window_start);

		match h.handler.record(stop, &control(), Utc::now()).await {
			Err(StopError::Rejected(errors)) => assert!(errors.contains("status")),
			other => panic!("unexpected outcome {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_all_stops_completed_completes_movement() {
		let h = harness().await;
		let stops = request().stops;
		for stop in stops {
			let mut stop = stop;
			stop.arrival_time = Some(stop.appointment_window_start);
			stop.departure_time = Some(stop.appointment_window_start + Duration::minutes(30));
			h.handler.record(stop, &control(), Utc::now()).await.unwrap();
		}
		assert_eq!(
			h.state_machine.get_movement("m1").await.unwrap().status,
			Status::Completed
		);
	}

	#[tokio::test]
	async fn test_last_stop_walks_new_movement_to_completed() {
		let h = harness().await;
		let mut events = h.event_bus.subscribe();
		let mut stops = request().stops;
		for stop in &mut stops {
			stop.arrival_time = Some(stop.appointment_window_start);
			stop.departure_time = Some(stop.appointment_window_start + Duration::minutes(30));
			stop.status = Status::Completed;
		}
		h.storage
			.store(StorageKey::Stops.as_str(), &stops[1].id, &stops[1])
			.await
			.unwrap();

		let outcome = h
			.handler
			.record(stops[0].clone(), &control(), Utc::now())
			.await
			.unwrap();
		assert_eq!(outcome.movement_status, Some(Status::Completed));

		let mut changes = Vec::new();
		while let Ok(event) = events.try_recv() {
			if let TmsEvent::Movement(MovementEvent::StatusChanged { from, to, .. }) = event {
				changes.push((from, to));
			}
		}
		assert_eq!(
			changes,
			vec![
				(Status::New, Status::InProgress),
				(Status::InProgress, Status::Completed)
			]
		);
	}

	#[tokio::test]
	async fn test_voided_movement_takes_no_stops() {
		let h = harness().await;
		h.state_machine
			.advance_status("m1", Status::Voided)
			.await
			.unwrap();
		let mut stop = request().stops[0].clone();
		stop.arrival_time = Some(window_end() + Duration::minutes(90));

		match h.handler.record(stop, &control(), Utc::now()).await {
			Err(StopError::Rejected(errors)) => assert_eq!(
				errors.get("status").unwrap(),
				&[MOVEMENT_VOIDED.to_string()]
			),
			other => panic!("unexpected outcome {:?}", other),
		}
		let stored: Stop = h
			.storage
			.retrieve(StorageKey::Stops.as_str(), "m1-s1")
			.await
			.unwrap();
		assert!(stored.arrival_time.is_none());
		assert!(h.handler.incidents_for("m1-s1").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_unknown_movement() {
		let h = harness().await;
		let mut stop = request().stops[0].clone();
		stop.movement_id = "m9".into();
		assert!(matches!(
			h.handler.record(stop, &control(), Utc::now()).await,
			Err(StopError::State(MovementStateError::MovementNotFound(_)))
		));
	}
}
