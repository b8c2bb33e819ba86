//! State management for movements.
//!
//! Provides the movement state machine, which enforces the status transition
//! table and keeps stored movement snapshots current.

pub mod movement;

pub use movement::{MovementStateError, MovementStateMachine, ResolvedRequest};
