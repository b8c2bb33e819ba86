//! Handlers for the operations the engine exposes.
//!
//! Each handler owns one kind of record: movements, stops or shipments. It
//! runs the rules for that record, persists the result and publishes events.

pub mod movement;
pub mod shipment;
pub mod stop;

pub use movement::MovementHandler;
pub use shipment::{RatingOutcome, ShipmentError, ShipmentHandler};
pub use stop::{StopError, StopHandler, StopOutcome};
