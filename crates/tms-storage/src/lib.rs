//! Storage for the dispatch rule engine.
//!
//! Movements, stops, shipments and service incidents are persisted as JSON
//! documents in a key/value backend. Keys are `"{namespace}:{id}"` where the
//! namespace is one of [`tms_types::StorageKey`]. Backends are pluggable and
//! selected by name from the `[storage]` configuration section.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;
use tms_types::{ConfigSchema, ImplementationRegistry};

pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Not found")]
	NotFound,
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level byte store implemented by every backend.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Returns the bytes stored under `key`, or `NotFound` when the key is
	/// absent or expired.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores bytes under `key`. A `ttl` of `None` lets the backend apply its
	/// configured default for the key's namespace.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError>;

	/// Deleting an absent key succeeds.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Ids of the live entries stored under `namespace`.
	async fn list_ids(&self, namespace: &str) -> Result<Vec<String>, StorageError>;

	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Removes expired entries and returns how many were removed.
	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		Ok(0)
	}
}

/// Constructor of a backend from its configuration section.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Every backend known to this crate as `(name, factory)` pairs.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Splits `"namespace:id"` into its parts. Keys without a namespace belong
/// to the empty namespace.
pub(crate) fn split_key(key: &str) -> (&str, &str) {
	key.split_once(':').unwrap_or(("", key))
}

fn storage_key(namespace: &str, id: &str) -> String {
	format!("{}:{}", namespace, id)
}

/// Typed JSON access on top of a [`StorageInterface`].
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores `data` with an explicit time-to-live.
	pub async fn store_with_ttl<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&storage_key(namespace, id), bytes, ttl)
			.await
	}

	/// Creates or overwrites the value stored under `namespace:id`.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.store_with_ttl(namespace, id, data, None).await
	}

	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&storage_key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Like [`retrieve`](Self::retrieve) but maps `NotFound` to `None`.
	pub async fn find<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Every value stored under `namespace`, in no particular order.
	///
	/// Entries that expire or disappear between listing and reading are skipped.
	pub async fn retrieve_all<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<T>, StorageError> {
		let ids = self.backend.list_ids(namespace).await?;
		let mut values = Vec::with_capacity(ids.len());
		for id in ids {
			if let Some(value) = self.find(namespace, &id).await? {
				values.push(value);
			}
		}
		Ok(values)
	}

	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&storage_key(namespace, id)).await
	}

	/// Overwrites an existing value. Fails with `NotFound` when there is
	/// nothing to update.
	pub async fn update<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		if !self.exists(namespace, id).await? {
			return Err(StorageError::NotFound);
		}
		self.store(namespace, id, data).await
	}

	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&storage_key(namespace, id)).await
	}

	pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.backend.cleanup_expired().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
	struct Record {
		id: String,
		value: u32,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn test_store_retrieve_and_find() {
		let storage = service();
		let record = Record {
			id: "r1".into(),
			value: 7,
		};

		storage.store("movements", "r1", &record).await.unwrap();
		let back: Record = storage.retrieve("movements", "r1").await.unwrap();
		assert_eq!(back, record);

		let missing: Option<Record> = storage.find("movements", "r2").await.unwrap();
		assert!(missing.is_none());
	}

	#[tokio::test]
	async fn test_update_requires_existing_value() {
		let storage = service();
		let record = Record {
			id: "r1".into(),
			value: 1,
		};

		let result = storage.update("stops", "r1", &record).await;
		assert!(matches!(result, Err(StorageError::NotFound)));

		storage.store("stops", "r1", &record).await.unwrap();
		let updated = Record { value: 2, ..record };
		storage.update("stops", "r1", &updated).await.unwrap();
		let back: Record = storage.retrieve("stops", "r1").await.unwrap();
		assert_eq!(back.value, 2);
	}

	#[tokio::test]
	async fn test_retrieve_all_is_scoped_to_namespace() {
		let storage = service();
		for i in 0..3 {
			let record = Record {
				id: format!("i{}", i),
				value: i,
			};
			storage
				.store("service_incidents", &record.id, &record)
				.await
				.unwrap();
		}
		storage
			.store(
				"movements",
				"m1",
				&Record {
					id: "m1".into(),
					value: 9,
				},
			)
			.await
			.unwrap();

		let mut incidents: Vec<Record> = storage.retrieve_all("service_incidents").await.unwrap();
		incidents.sort_by_key(|r| r.value);
		assert_eq!(incidents.len(), 3);
		assert_eq!(incidents[2].id, "i2");
	}

	#[test]
	fn test_split_key() {
		assert_eq!(split_key("movements:abc"), ("movements", "abc"));
		assert_eq!(split_key("movements:a:b"), ("movements", "a:b"));
		assert_eq!(split_key("bare"), ("", "bare"));
	}

	#[test]
	fn test_all_implementations_registered() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert!(names.contains(&"memory"));
		assert!(names.contains(&"file"));
	}
}
