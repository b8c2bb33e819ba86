//! Small helpers shared by every TMS crate.

pub mod formatting;

pub use formatting::{format_delay, truncate_id};
