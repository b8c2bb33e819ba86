//! Storage namespaces.

use std::str::FromStr;

/// Namespaces under which records are stored.
///
/// Keys are built as `"{namespace}:{id}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	Movements,
	Stops,
	Workers,
	Tractors,
	Trailers,
	Shipments,
	ServiceIncidents,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Movements => "movements",
			StorageKey::Stops => "stops",
			StorageKey::Workers => "workers",
			StorageKey::Tractors => "tractors",
			StorageKey::Trailers => "trailers",
			StorageKey::Shipments => "shipments",
			StorageKey::ServiceIncidents => "service_incidents",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Movements,
			Self::Stops,
			Self::Workers,
			Self::Tractors,
			Self::Trailers,
			Self::Shipments,
			Self::ServiceIncidents,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|key| key.as_str() == s).ok_or(())
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
