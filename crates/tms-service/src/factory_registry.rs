//! Registry of the backend factories the service can build an engine from.

use std::collections::HashMap;
use std::sync::OnceLock;
use tms_config::Config;
use tms_core::{DispatchEngine, EngineBuilder, EngineFactories};
use tms_storage::StorageFactory;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
		}
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initializes the global registry with every storage backend on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();
		for (name, factory) in tms_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}
		registry
	})
}

/// Builds an engine from the backends named in `config`.
pub fn build_engine_from_config(
	config: Config,
) -> Result<DispatchEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let mut storage_factories = HashMap::new();
	for name in config.storage.implementations.keys() {
		match registry.storage.get(name) {
			Some(factory) => {
				storage_factories.insert(name.clone(), *factory);
			},
			None => {
				let mut available: Vec<_> = registry.storage.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown storage implementation '{}'. Available: [{}]",
					name,
					available.join(", ")
				)
				.into());
			},
		}
	}

	Ok(EngineBuilder::new(config).build(EngineFactories { storage_factories })?)
}
