//! Movement status transitions.

use crate::DispatchError;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use tms_types::Status;

// Each status maps to the statuses it may move to.
static TRANSITIONS: Lazy<HashMap<Status, HashSet<Status>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		Status::New,
		HashSet::from([Status::InProgress, Status::Voided]),
	);
	m.insert(
		Status::InProgress,
		HashSet::from([Status::Completed, Status::Voided]),
	);
	m.insert(Status::Completed, HashSet::new()); // terminal
	m.insert(Status::Voided, HashSet::new()); // terminal
	m
});

/// Checks if a movement may go from `from` to `to`.
///
/// Saving a movement again with its current status is allowed, except once
/// it has been voided.
pub fn is_valid_transition(from: Status, to: Status) -> bool {
	if from == to {
		return from != Status::Voided;
	}
	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}

pub fn check_transition(from: Status, to: Status) -> Result<(), DispatchError> {
	if is_valid_transition(from, to) {
		Ok(())
	} else {
		Err(DispatchError::InvalidTransition { from, to })
	}
}
