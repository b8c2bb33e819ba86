//! Movement state machine implementation.
//!
//! Movements move NEW -> IN_PROGRESS -> COMPLETED, and may be VOIDED from
//! any non-terminal status. Every change is persisted with a fresh
//! `updated_at`.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tms_dispatch::{
	check_transition, validate_stop, DispatchError, DispatchRequest, MovementValidator,
};
use tms_storage::{StorageError, StorageService};
use tms_types::{DispatchControl, FieldErrors, Movement, Shipment, Status, Stop, StorageKey};

/// Errors that can occur during movement state management.
#[derive(Debug, Error)]
pub enum MovementStateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: Status, to: Status },
	#[error("Movement not found: {0}")]
	MovementNotFound(String),
	#[error("Validation failed: {0}")]
	Rejected(FieldErrors),
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	#[error("Time error: {0}")]
	TimeError(String),
}

impl From<DispatchError> for MovementStateError {
	fn from(err: DispatchError) -> Self {
		match err {
			DispatchError::Rejected(errors) => MovementStateError::Rejected(errors),
			DispatchError::InvalidTransition { from, to } => {
				MovementStateError::InvalidTransition { from, to }
			},
			DispatchError::InvalidRequest(reason) => MovementStateError::InvalidRequest(reason),
		}
	}
}

/// A request checked against what is stored.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
	/// The request with stored records in place of the caller's copies.
	pub request: DispatchRequest,
	/// The stored version of the movement, if any.
	pub persisted: Option<Movement>,
	/// Violations of the request's stops against their stored versions.
	pub stop_errors: FieldErrors,
}

impl ResolvedRequest {
	/// Every movement rule violation together with the stop violations.
	pub fn validate(
		&self,
		validator: &MovementValidator,
		control: &DispatchControl,
		today: NaiveDate,
	) -> FieldErrors {
		let mut errors =
			validator.validate(&self.request.context(control, self.persisted.as_ref(), today));
		errors.merge(self.stop_errors.clone());
		errors
	}
}

/// Manages movement status transitions and persistence.
pub struct MovementStateMachine {
	storage: Arc<StorageService>,
	validator: Arc<MovementValidator>,
}

impl MovementStateMachine {
	pub fn new(storage: Arc<StorageService>, validator: Arc<MovementValidator>) -> Self {
		Self { storage, validator }
	}

	pub async fn get_movement(&self, movement_id: &str) -> Result<Movement, MovementStateError> {
		self.find_movement(movement_id)
			.await?
			.ok_or_else(|| MovementStateError::MovementNotFound(movement_id.to_string()))
	}

	pub async fn find_movement(
		&self,
		movement_id: &str,
	) -> Result<Option<Movement>, MovementStateError> {
		self.storage
			.find(StorageKey::Movements.as_str(), movement_id)
			.await
			.map_err(|e| MovementStateError::Storage(e.to_string()))
	}

	/// Stores a movement snapshot, stamping `updated_at`.
	pub async fn store_movement(&self, movement: &Movement) -> Result<Movement, MovementStateError> {
		let mut movement = movement.clone();
		movement.updated_at = now_secs()?;
		self.storage
			.store(StorageKey::Movements.as_str(), &movement.id, &movement)
			.await
			.map_err(|e| MovementStateError::Storage(e.to_string()))?;
		Ok(movement)
	}

	/// Updates a stored movement with a closure and persists it.
	pub async fn update_movement_with<F>(
		&self,
		movement_id: &str,
		updater: F,
	) -> Result<Movement, MovementStateError>
	where
		F: FnOnce(&mut Movement),
	{
		let mut movement = self.get_movement(movement_id).await?;

		updater(&mut movement);
		movement.updated_at = now_secs()?;

		self.storage
			.update(StorageKey::Movements.as_str(), movement_id, &movement)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => {
					MovementStateError::MovementNotFound(movement_id.to_string())
				},
				other => MovementStateError::Storage(other.to_string()),
			})?;

		Ok(movement)
	}

	/// Replaces the caller's copies of stored records in `request`.
	///
	/// Other movements of the shipment and its hazardous material flag come
	/// from storage when stored. Request stops keep the arrival and
	/// departure times already recorded for them, are checked against their
	/// stored versions, and stored stops the request leaves out are added.
	pub async fn resolve(
		&self,
		request: &DispatchRequest,
	) -> Result<ResolvedRequest, MovementStateError> {
		request.check_shape()?;
		let movement = &request.movement;
		let persisted = self.find_movement(&movement.id).await?;
		let mut resolved = request.clone();

		let stored_movements: Vec<Movement> = self
			.storage
			.retrieve_all(StorageKey::Movements.as_str())
			.await
			.map_err(|e| MovementStateError::Storage(e.to_string()))?;
		let mut shipment_movements: Vec<Movement> = stored_movements
			.into_iter()
			.filter(|m| m.shipment_id == movement.shipment_id && m.id != movement.id)
			.collect();
		let unstored: Vec<Movement> = request
			.shipment_movements
			.iter()
			.filter(|m| m.id != movement.id && !shipment_movements.iter().any(|s| s.id == m.id))
			.cloned()
			.collect();
		shipment_movements.extend(unstored);
		resolved.shipment_movements = shipment_movements;

		let shipment: Option<Shipment> = self
			.storage
			.find(StorageKey::Shipments.as_str(), &movement.shipment_id)
			.await
			.map_err(|e| MovementStateError::Storage(e.to_string()))?;
		if let Some(shipment) = shipment {
			resolved.hazardous_material = shipment.hazardous_material;
		}

		let stored_stops = self.movement_stops(&movement.id).await?;
		for stop in &mut resolved.stops {
			if let Some(stored) = stored_stops.iter().find(|s| s.id == stop.id) {
				stop.arrival_time = stop.arrival_time.or(stored.arrival_time);
				stop.departure_time = stop.departure_time.or(stored.departure_time);
			}
		}
		let omitted: Vec<Stop> = stored_stops
			.iter()
			.filter(|stored| !request.stops.iter().any(|s| s.id == stored.id))
			.cloned()
			.collect();
		resolved.stops.extend(omitted);

		let mut stop_errors = FieldErrors::new();
		for stop in &resolved.stops {
			let previous = resolved
				.stops
				.iter()
				.filter(|s| s.id != stop.id && s.sequence < stop.sequence)
				.max_by_key(|s| s.sequence);
			let stored = stored_stops.iter().find(|s| s.id == stop.id);
			stop_errors.merge(validate_stop(stop, previous, stored));
		}

		Ok(ResolvedRequest {
			request: resolved,
			persisted,
			stop_errors,
		})
	}

	/// Moves the movement in `request` to `to`.
	///
	/// The request is resolved against storage and validated as if it
	/// already had the new status, before the transition table is consulted.
	/// On success the request's movement and stops become the stored
	/// snapshots.
	pub async fn transition_status(
		&self,
		request: &DispatchRequest,
		control: &DispatchControl,
		to: Status,
		today: NaiveDate,
	) -> Result<Movement, MovementStateError> {
		let mut resolved = self.resolve(request).await?;
		let persisted = resolved
			.persisted
			.clone()
			.ok_or_else(|| MovementStateError::MovementNotFound(request.movement.id.clone()))?;

		resolved.request.movement.status = to;
		resolved
			.validate(&self.validator, control, today)
			.into_result()
			.map_err(MovementStateError::Rejected)?;
		check_transition(persisted.status, to)?;

		let movement = resolved.request.movement;
		let updated = self
			.update_movement_with(&persisted.id, move |stored| *stored = movement)
			.await?;
		self.store_stops(&resolved.request.stops).await?;
		Ok(updated)
	}

	/// Stored stops of `movement_id`.
	pub async fn movement_stops(&self, movement_id: &str) -> Result<Vec<Stop>, MovementStateError> {
		let stops: Vec<Stop> = self
			.storage
			.retrieve_all(StorageKey::Stops.as_str())
			.await
			.map_err(|e| MovementStateError::Storage(e.to_string()))?;
		Ok(stops
			.into_iter()
			.filter(|s| s.movement_id == movement_id)
			.collect())
	}

	pub async fn store_stops(&self, stops: &[Stop]) -> Result<(), MovementStateError> {
		for stop in stops {
			self.storage
				.store(StorageKey::Stops.as_str(), &stop.id, stop)
				.await
				.map_err(|e| MovementStateError::Storage(e.to_string()))?;
		}
		Ok(())
	}

	/// Moves a stored movement to `to`, checking only the transition table.
	///
	/// Used when the status follows from recorded stop times rather than
	/// from a dispatcher's request.
	pub async fn advance_status(
		&self,
		movement_id: &str,
		to: Status,
	) -> Result<Movement, MovementStateError> {
		let movement = self.get_movement(movement_id).await?;
		check_transition(movement.status, to)?;
		self.update_movement_with(movement_id, |m| m.status = to)
			.await
	}
}

fn now_secs() -> Result<u64, MovementStateError> {
	Ok(SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map_err(|e| MovementStateError::TimeError(e.to_string()))?
		.as_secs())
}
