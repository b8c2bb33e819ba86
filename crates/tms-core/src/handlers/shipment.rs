//! Shipment handler for rating shipments.

use crate::engine::event_bus::EventBus;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tms_rating::{rate_shipment, RatingError};
use tms_storage::StorageService;
use tms_types::{
	truncate_id, FieldErrors, Shipment, ShipmentControl, ShipmentEvent, StorageKey, TmsEvent,
};
use tracing::{info, instrument, warn};

/// Errors that can occur while rating a shipment.
#[derive(Debug, Error)]
pub enum ShipmentError {
	#[error("Validation failed: {0}")]
	Rejected(FieldErrors),
	#[error("Rating error: {0}")]
	Rating(RatingError),
	#[error("Storage error: {0}")]
	Storage(String),
}

/// A rated shipment.
#[derive(Debug, Clone)]
pub struct RatingOutcome {
	/// The shipment as stored. Its `sub_total` is only written when the
	/// organization has automatic shipment totals enabled.
	pub shipment: Shipment,
	pub total: Decimal,
}

pub struct ShipmentHandler {
	storage: Arc<StorageService>,
	event_bus: EventBus,
}

impl ShipmentHandler {
	pub fn new(storage: Arc<StorageService>, event_bus: EventBus) -> Self {
		Self { storage, event_bus }
	}

	#[instrument(skip_all, fields(shipment_id = %truncate_id(&shipment.id)))]
	pub async fn rate(
		&self,
		mut shipment: Shipment,
		control: &ShipmentControl,
	) -> Result<RatingOutcome, ShipmentError> {
		let total = match rate_shipment(&shipment) {
			Ok(total) => total,
			Err(RatingError::Rejected(errors)) => {
				warn!(violations = errors.message_count(), "Shipment rating rejected");
				self.event_bus
					.publish(TmsEvent::Shipment(ShipmentEvent::RatingRejected {
						shipment_id: shipment.id.clone(),
						errors: errors.clone(),
					}))
					.ok();
				return Err(ShipmentError::Rejected(errors));
			},
			Err(e) => return Err(ShipmentError::Rating(e)),
		};

		if control.auto_shipment_total {
			shipment.sub_total = Some(total);
		}
		self.storage
			.store(StorageKey::Shipments.as_str(), &shipment.id, &shipment)
			.await
			.map_err(|e| ShipmentError::Storage(e.to_string()))?;

		info!(method = %shipment.rate_method, %total, "Shipment rated");
		self.event_bus
			.publish(TmsEvent::Shipment(ShipmentEvent::Rated {
				shipment_id: shipment.id.clone(),
				total,
			}))
			.ok();

		Ok(RatingOutcome { shipment, total })
	}
}
