//! Core dispatch engine for the TMS rule system.
//!
//! Wires the movement validator, the stop lateness detector and the rate
//! calculator to storage, and publishes what each operation did on an event
//! bus. Engines are usually created through [`EngineBuilder`].

pub mod builder;
pub mod engine;
pub mod handlers;
pub mod state;

#[cfg(test)]
mod test_support;

pub use builder::{BuilderError, EngineBuilder, EngineFactories};
pub use engine::{event_bus::EventBus, DispatchEngine, EngineError};
pub use handlers::{RatingOutcome, ShipmentError, StopError, StopOutcome};
pub use state::MovementStateError;
