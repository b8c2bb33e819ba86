//! Dispatch engine that ties the rule crates to storage and the event bus.
//!
//! The engine resolves the controls of the organization a record belongs to,
//! hands the record to the matching handler and keeps expired storage entries
//! swept in the background.

pub mod event_bus;

use crate::handlers::{
	MovementHandler, RatingOutcome, ShipmentError, ShipmentHandler, StopError, StopHandler,
	StopOutcome,
};
use crate::state::{MovementStateError, MovementStateMachine};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tms_config::{Config, OrganizationConfig};
use tms_dispatch::{DispatchRequest, MovementValidator};
use tms_storage::StorageService;
use tms_types::{FieldErrors, Movement, Shipment, Status, Stop};
use tokio::task::JoinHandle;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Unknown organization: {0}")]
	UnknownOrganization(String),
	#[error("Service error: {0}")]
	Service(String),
	#[error(transparent)]
	Movement(#[from] MovementStateError),
	#[error(transparent)]
	Stop(#[from] StopError),
	#[error(transparent)]
	Shipment(#[from] ShipmentError),
}

impl EngineError {
	/// The rule violations behind a rejection, if this is one.
	pub fn field_errors(&self) -> Option<&FieldErrors> {
		match self {
			EngineError::Movement(MovementStateError::Rejected(errors))
			| EngineError::Stop(StopError::Rejected(errors))
			| EngineError::Shipment(ShipmentError::Rejected(errors)) => Some(errors),
			_ => None,
		}
	}
}

/// Main dispatch engine.
#[derive(Clone)]
pub struct DispatchEngine {
	/// Engine configuration.
	pub(crate) config: Config,
	/// Storage service for movements, stops, shipments and incidents.
	pub(crate) storage: Arc<StorageService>,
	/// Event bus for observers of the engine.
	pub(crate) event_bus: event_bus::EventBus,
	/// Movement state machine
	pub(crate) state_machine: Arc<MovementStateMachine>,
	/// Movement handler
	pub(crate) movement_handler: Arc<MovementHandler>,
	/// Stop handler
	pub(crate) stop_handler: Arc<StopHandler>,
	/// Shipment handler
	pub(crate) shipment_handler: Arc<ShipmentHandler>,
}

impl DispatchEngine {
	pub fn new(config: Config, storage: Arc<StorageService>, event_bus: event_bus::EventBus) -> Self {
		let validator = Arc::new(MovementValidator::default());
		let state_machine = Arc::new(MovementStateMachine::new(
			storage.clone(),
			validator.clone(),
		));

		let movement_handler = Arc::new(MovementHandler::new(
			validator,
			state_machine.clone(),
			event_bus.clone(),
		));
		let stop_handler = Arc::new(StopHandler::new(
			storage.clone(),
			state_machine.clone(),
			event_bus.clone(),
		));
		let shipment_handler = Arc::new(ShipmentHandler::new(storage.clone(), event_bus.clone()));

		Self {
			config,
			storage,
			event_bus,
			state_machine,
			movement_handler,
			stop_handler,
			shipment_handler,
		}
	}

	/// Controls of `organization_id`, or of the default organization when
	/// that one has no section of its own.
	pub fn organization(&self, organization_id: &str) -> Result<&OrganizationConfig, EngineError> {
		self.config
			.organization(organization_id)
			.or_else(|| {
				self.config
					.engine
					.default_organization
					.as_deref()
					.and_then(|default| self.config.organization(default))
			})
			.ok_or_else(|| EngineError::UnknownOrganization(organization_id.to_string()))
	}

	/// Runs every movement rule and returns the violations without storing
	/// anything. An empty result means the movement would be accepted.
	pub async fn validate_movement(
		&self,
		request: &DispatchRequest,
	) -> Result<FieldErrors, EngineError> {
		let control = &self
			.organization(&request.movement.organization_id)?
			.dispatch_control;
		Ok(self
			.movement_handler
			.validate(request, control, Utc::now().date_naive())
			.await?)
	}

	pub async fn save_movement(&self, request: &DispatchRequest) -> Result<Movement, EngineError> {
		let control = &self
			.organization(&request.movement.organization_id)?
			.dispatch_control;
		Ok(self
			.movement_handler
			.save(request, control, Utc::now().date_naive())
			.await?)
	}

	pub async fn update_movement_status(
		&self,
		request: &DispatchRequest,
		to: Status,
	) -> Result<Movement, EngineError> {
		let control = &self
			.organization(&request.movement.organization_id)?
			.dispatch_control;
		Ok(self
			.movement_handler
			.update_status(request, control, to, Utc::now().date_naive())
			.await?)
	}

	/// Records a stop of a stored movement under the movement's organization.
	pub async fn record_stop(&self, stop: Stop) -> Result<StopOutcome, EngineError> {
		let movement = self.state_machine.get_movement(&stop.movement_id).await?;
		let control = &self.organization(&movement.organization_id)?.dispatch_control;
		Ok(self.stop_handler.record(stop, control, Utc::now()).await?)
	}

	pub async fn rate_shipment(&self, shipment: Shipment) -> Result<RatingOutcome, EngineError> {
		let control = &self.organization(&shipment.organization_id)?.shipment_control;
		Ok(self.shipment_handler.rate(shipment, control).await?)
	}

	/// Removes expired entries from storage once.
	pub async fn cleanup_expired(&self) -> Result<usize, EngineError> {
		self.storage
			.cleanup_expired()
			.await
			.map_err(|e| EngineError::Service(e.to_string()))
	}

	/// Sweeps expired storage entries every `cleanup_interval_seconds` until
	/// the returned task is aborted. The first sweep runs immediately.
	pub fn spawn_cleanup(&self) -> JoinHandle<()> {
		let engine = self.clone();
		let period = Duration::from_secs(self.config.storage.cleanup_interval_seconds);
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(period);
			loop {
				interval.tick().await;
				match engine.cleanup_expired().await {
					Ok(count) if count > 0 => {
						tracing::debug!("Storage cleanup: removed {} expired entries", count);
					},
					Err(e) => {
						tracing::warn!("Storage cleanup failed: {}", e);
					},
					_ => {},
				}
			}
		})
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}
}
