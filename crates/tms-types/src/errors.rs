//! Field-keyed validation messages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Validation messages grouped by the field they concern.
///
/// Messages for the same field are kept in the order they were added, so a
/// caller sees every rule that failed instead of only the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
		self.0.entry(field.into()).or_default().push(message.into());
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Number of fields with at least one message.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Number of messages across all fields.
	pub fn message_count(&self) -> usize {
		self.0.values().map(Vec::len).sum()
	}

	pub fn get(&self, field: &str) -> Option<&[String]> {
		self.0.get(field).map(Vec::as_slice)
	}

	pub fn contains(&self, field: &str) -> bool {
		self.0.contains_key(field)
	}

	pub fn fields(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
	}

	pub fn merge(&mut self, other: FieldErrors) {
		for (field, messages) in other.0 {
			self.0.entry(field).or_default().extend(messages);
		}
	}

	/// `Ok(())` when no messages were collected.
	pub fn into_result(self) -> Result<(), FieldErrors> {
		if self.is_empty() {
			Ok(())
		} else {
			Err(self)
		}
	}
}

impl fmt::Display for FieldErrors {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut first = true;
		for (field, messages) in &self.0 {
			for message in messages {
				if !first {
					f.write_str("; ")?;
				}
				write!(f, "{}: {}", field, message)?;
				first = false;
			}
		}
		Ok(())
	}
}
