//! Shared data types of the dispatch rule engine.
//!
//! Every crate in the workspace speaks in these types: movements and their
//! stops, workers and equipment, shipments with their rating inputs, the
//! per-organization control records, and the field-keyed validation errors.

/// Per-organization dispatch and shipment controls.
pub mod control;
/// Tractors and trailers.
pub mod equipment;
/// Field-keyed validation messages.
pub mod errors;
/// Event bus payloads.
pub mod events;
/// Service incidents raised for late stops.
pub mod incident;
/// Movements, stops and their shared status.
pub mod movement;
/// Backend naming contract.
pub mod registry;
/// Shipments, rate methods and formula templates.
pub mod shipment;
/// Storage namespaces.
pub mod storage;
pub mod utils;
/// Configuration schema checks.
pub mod validation;
/// Workers and their regulatory profiles.
pub mod worker;

pub use control::*;
pub use equipment::*;
pub use errors::*;
pub use events::*;
pub use incident::*;
pub use movement::*;
pub use registry::*;
pub use shipment::*;
pub use storage::*;
pub use utils::{format_delay, truncate_id};
pub use validation::*;
pub use worker::*;
