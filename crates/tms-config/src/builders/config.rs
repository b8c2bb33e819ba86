//! Fluent construction of [`Config`] values for tests and embedding.

use crate::{Config, EngineConfig, OrganizationConfig, StorageConfig};
use std::collections::HashMap;
use tms_types::{DispatchControl, ShipmentControl};

/// Builds a [`Config`] backed by in-memory storage.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	engine_id: String,
	storage_primary: String,
	storage_implementations: HashMap<String, toml::Value>,
	cleanup_interval_seconds: u64,
	organizations: HashMap<String, OrganizationConfig>,
	default_organization: Option<String>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		let mut storage_implementations = HashMap::new();
		storage_implementations.insert(
			"memory".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);
		Self {
			engine_id: "tms-test".to_string(),
			storage_primary: "memory".to_string(),
			storage_implementations,
			cleanup_interval_seconds: 60,
			organizations: HashMap::new(),
			default_organization: None,
		}
	}

	pub fn engine_id(mut self, id: impl Into<String>) -> Self {
		self.engine_id = id.into();
		self
	}

	/// Uses the file backend rooted at `storage_path` as primary storage.
	pub fn file_storage(mut self, storage_path: impl Into<String>) -> Self {
		let mut table = toml::map::Map::new();
		table.insert(
			"storage_path".to_string(),
			toml::Value::String(storage_path.into()),
		);
		self.storage_implementations
			.insert("file".to_string(), toml::Value::Table(table));
		self.storage_primary = "file".to_string();
		self
	}

	pub fn cleanup_interval_seconds(mut self, seconds: u64) -> Self {
		self.cleanup_interval_seconds = seconds;
		self
	}

	/// Adds an organization with the given controls. The first organization
	/// added becomes the default.
	pub fn organization(
		mut self,
		id: impl Into<String>,
		dispatch_control: DispatchControl,
		shipment_control: ShipmentControl,
	) -> Self {
		let id = id.into();
		if self.default_organization.is_none() {
			self.default_organization = Some(id.clone());
		}
		self.organizations.insert(
			id,
			OrganizationConfig {
				dispatch_control,
				shipment_control,
			},
		);
		self
	}

	/// Builds the configuration. An organization named `default` with
	/// default controls is added when none was configured.
	pub fn build(self) -> Config {
		let builder = if self.organizations.is_empty() {
			self.organization(
				"default",
				DispatchControl::default(),
				ShipmentControl::default(),
			)
		} else {
			self
		};

		Config {
			engine: EngineConfig {
				id: builder.engine_id,
				default_organization: builder.default_organization,
			},
			storage: StorageConfig {
				primary: builder.storage_primary,
				implementations: builder.storage_implementations,
				cleanup_interval_seconds: builder.cleanup_interval_seconds,
			},
			organizations: builder.organizations,
		}
	}
}
