//! Builder for constructing dispatch engines.
//!
//! The storage backend is picked by name from the configuration and created
//! through a factory function, so callers decide which backends exist.

use crate::engine::{event_bus::EventBus, DispatchEngine};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tms_config::Config;
use tms_storage::{StorageError, StorageInterface, StorageService};

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Factory functions the engine is built from.
pub struct EngineFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

pub struct EngineBuilder {
	config: Config,
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn build<SF>(self, factories: EngineFactories<SF>) -> Result<DispatchEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			if let Some(factory) = factories.storage_factories.get(name) {
				match factory(config) {
					Ok(implementation) => {
						storage_impls.insert(name.clone(), implementation);
						let is_primary = &self.config.storage.primary == name;
						tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
					},
					Err(e) => {
						tracing::error!(
							component = "storage",
							implementation = %name,
							error = %e,
							"Failed to create storage implementation"
						);
						return Err(BuilderError::Config(format!(
							"Failed to create storage implementation '{}': {}",
							name, e
						)));
					},
				}
			}
		}

		if storage_impls.is_empty() {
			return Err(BuilderError::Config(
				"No valid storage implementations available".into(),
			));
		}

		let primary_storage = &self.config.storage.primary;
		let storage_backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary storage '{}' failed to load or has invalid configuration",
				primary_storage
			))
		})?;

		let storage = Arc::new(StorageService::new(storage_backend));
		let event_bus = EventBus::new(1000);

		tracing::info!(
			engine_id = %self.config.engine.id,
			organizations = self.config.organizations.len(),
			"Dispatch engine built"
		);
		Ok(DispatchEngine::new(self.config, storage, event_bus))
	}
}
