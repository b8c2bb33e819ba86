//! Movement handler for saving movements and changing their status.
//!
//! Runs the movement validator against what is stored for the movement, its
//! stops and its shipment, persists accepted movements together with their
//! stops and publishes the outcome on the event bus.

use crate::engine::event_bus::EventBus;
use crate::state::{MovementStateError, MovementStateMachine};
use chrono::NaiveDate;
use std::sync::Arc;
use tms_dispatch::{check_transition, DispatchRequest, MovementValidator};
use tms_types::{
	truncate_id, DispatchControl, FieldErrors, Movement, MovementEvent, Status, TmsEvent,
};
use tracing::{info, instrument, warn};

pub struct MovementHandler {
	validator: Arc<MovementValidator>,
	state_machine: Arc<MovementStateMachine>,
	event_bus: EventBus,
}

impl MovementHandler {
	pub fn new(
		validator: Arc<MovementValidator>,
		state_machine: Arc<MovementStateMachine>,
		event_bus: EventBus,
	) -> Self {
		Self {
			validator,
			state_machine,
			event_bus,
		}
	}

	/// Runs every movement rule without persisting anything.
	#[instrument(skip_all, fields(movement_id = %truncate_id(&request.movement.id)))]
	pub async fn validate(
		&self,
		request: &DispatchRequest,
		control: &DispatchControl,
		today: NaiveDate,
	) -> Result<FieldErrors, MovementStateError> {
		let resolved = self.state_machine.resolve(request).await?;
		Ok(resolved.validate(&self.validator, control, today))
	}

	/// Validates and stores the movement and its stops.
	///
	/// A status different from the stored one must be a legal transition.
	/// Stops keep the arrival and departure times recorded for them.
	#[instrument(skip_all, fields(movement_id = %truncate_id(&request.movement.id)))]
	pub async fn save(
		&self,
		request: &DispatchRequest,
		control: &DispatchControl,
		today: NaiveDate,
	) -> Result<Movement, MovementStateError> {
		let resolved = self.state_machine.resolve(request).await?;

		let errors = resolved.validate(&self.validator, control, today);
		if !errors.is_empty() {
			return Err(self.reject(&request.movement.id, errors));
		}

		let previous_status = resolved.persisted.as_ref().map(|m| m.status);
		if let Some(from) = previous_status {
			check_transition(from, request.movement.status)?;
		}

		let movement = self.state_machine.store_movement(&request.movement).await?;
		self.state_machine
			.store_stops(&resolved.request.stops)
			.await?;
		info!(status = %movement.status, "Movement saved");

		self.event_bus
			.publish(TmsEvent::Movement(MovementEvent::Saved {
				movement_id: movement.id.clone(),
			}))
			.ok();
		if let Some(from) = previous_status.filter(|from| *from != movement.status) {
			self.publish_status_change(&movement.id, from, movement.status);
		}

		Ok(movement)
	}

	/// Moves a stored movement to `to` through the state machine.
	#[instrument(skip_all, fields(movement_id = %truncate_id(&request.movement.id), to = %to))]
	pub async fn update_status(
		&self,
		request: &DispatchRequest,
		control: &DispatchControl,
		to: Status,
		today: NaiveDate,
	) -> Result<Movement, MovementStateError> {
		let from = self
			.state_machine
			.get_movement(&request.movement.id)
			.await?
			.status;

		let movement = match self
			.state_machine
			.transition_status(request, control, to, today)
			.await
		{
			Ok(movement) => movement,
			Err(MovementStateError::Rejected(errors)) => {
				return Err(self.reject(&request.movement.id, errors));
			},
			Err(e) => return Err(e),
		};

		info!(%from, "Movement status changed");
		self.publish_status_change(&movement.id, from, to);
		Ok(movement)
	}

	fn publish_status_change(&self, movement_id: &str, from: Status, to: Status) {
		self.event_bus
			.publish(TmsEvent::Movement(MovementEvent::StatusChanged {
				movement_id: movement_id.to_string(),
				from,
				to,
			}))
			.ok();
	}

	fn reject(&self, movement_id: &str, errors: FieldErrors) -> MovementStateError {
		warn!(violations = errors.message_count(), "Movement rejected");
		self.event_bus
			.publish(TmsEvent::Movement(MovementEvent::Rejected {
				movement_id: movement_id.to_string(),
				errors: errors.clone(),
			}))
			.ok();
		MovementStateError::Rejected(errors)
	}
}
