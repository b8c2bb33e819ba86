//! Configuration for the dispatch rule engine.
//!
//! The engine is configured from a TOML file holding the engine identity, the
//! storage backend and one section per organization with its dispatch and
//! shipment controls. Values may reference environment variables with
//! `${VAR}` or `${VAR:-default}`.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["storage.toml", "organizations.toml"]` to pull in other files
//! - Each top-level section must be unique across all files (no duplicates allowed)

pub mod builders;
mod loader;

pub use builders::config::ConfigBuilder;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tms_types::{
	DispatchControl, Field, FieldType, Schema, ServiceIncidentPolicy, ShipmentControl,
	ValidationError,
};

/// Longest grace period accepted, one day.
pub const MAX_GRACE_PERIOD_MINUTES: i64 = 24 * 60;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only, the error otherwise embeds the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

impl From<ValidationError> for ConfigError {
	fn from(err: ValidationError) -> Self {
		ConfigError::Validation(err.to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub engine: EngineConfig,
	pub storage: StorageConfig,
	/// Controls keyed by organization id.
	pub organizations: HashMap<String, OrganizationConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
	/// Identifier of this engine instance, used in logs.
	pub id: String,
	/// Organization used by the CLI when none is given on the command line.
	#[serde(default)]
	pub default_organization: Option<String>,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Implementation name to its raw configuration section.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds between sweeps of expired entries.
	pub cleanup_interval_seconds: u64,
}

/// Controls of a single organization.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrganizationConfig {
	#[serde(default)]
	pub dispatch_control: DispatchControl,
	#[serde(default)]
	pub shipment_control: ShipmentControl,
}

/// Schema of an `[organizations.<id>]` section.
fn organization_schema() -> Schema {
	Schema::new(
		vec![],
		vec![
			Field::new(
				"dispatch_control",
				FieldType::Table(Schema::new(
					vec![],
					vec![
						Field::new("regulatory_check", FieldType::Boolean),
						Field::new("tractor_worker_fleet_constraint", FieldType::Boolean),
						Field::new(
							"record_service_incident",
							FieldType::Choice(ServiceIncidentPolicy::NAMES),
						),
						Field::new(
							"grace_period",
							FieldType::Integer {
								min: Some(0),
								max: Some(MAX_GRACE_PERIOD_MINUTES),
							},
						),
					],
				)),
			),
			Field::new(
				"shipment_control",
				FieldType::Table(Schema::new(
					vec![],
					vec![Field::new("auto_shipment_total", FieldType::Boolean)],
				)),
			),
		],
	)
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of VAR_NAME, or with `default` for
/// `${VAR_NAME:-default}` when the variable is unset.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)));
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Controls of `organization_id`.
	pub fn organization(&self, organization_id: &str) -> Option<&OrganizationConfig> {
		self.organizations.get(organization_id)
	}

	/// Checks cross-field constraints that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.engine.id.is_empty() {
			return Err(ConfigError::Validation("Engine ID cannot be empty".into()));
		}

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}
		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		if self.organizations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one organization must be configured".into(),
			));
		}
		if let Some(ref default) = self.engine.default_organization {
			if !self.organizations.contains_key(default) {
				return Err(ConfigError::Validation(format!(
					"Default organization '{}' not found in organizations",
					default
				)));
			}
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	/// Parses a single configuration document, resolving environment
	/// variables and validating the result.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let raw: toml::Value = toml::from_str(&resolved)?;

		if let Some(organizations) = raw.get("organizations").and_then(|v| v.as_table()) {
			let schema = organization_schema();
			for (id, section) in organizations {
				schema.validate(section).map_err(|e| {
					ConfigError::Validation(format!("organization '{}': {}", id, e))
				})?;
			}
		}

		let config: Config = raw.try_into()?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = r#"
[engine]
id = "tms-test"
default_organization = "acme"

[storage]
primary = "memory"
cleanup_interval_seconds = 3600
[storage.implementations.memory]

[organizations.acme.dispatch_control]
regulatory_check = true
tractor_worker_fleet_constraint = true
record_service_incident = "pickup_and_delivery"
grace_period = 15

[organizations.acme.shipment_control]
auto_shipment_total = false
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TMS_TEST_HOST", "localhost");
		std::env::set_var("TMS_TEST_PORT", "5432");

		let input = "host = \"${TMS_TEST_HOST}:${TMS_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("TMS_TEST_HOST");
		std::env::remove_var("TMS_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${TMS_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${TMS_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.unwrap_err().to_string().contains("TMS_MISSING_VAR"));
	}

	#[test]
	fn test_parse_full_config() {
		let config: Config = BASE.parse().unwrap();
		let acme = config.organization("acme").unwrap();

		assert_eq!(config.engine.id, "tms-test");
		assert!(acme.dispatch_control.regulatory_check);
		assert_eq!(
			acme.dispatch_control.record_service_incident,
			ServiceIncidentPolicy::PickupAndDelivery
		);
		assert_eq!(acme.dispatch_control.grace_period, 15);
		assert!(!acme.shipment_control.auto_shipment_total);
	}

	#[test]
	fn test_organization_sections_default() {
		let config: Config = r#"
[engine]
id = "tms-test"

[storage]
primary = "memory"
cleanup_interval_seconds = 60
[storage.implementations.memory]

[organizations.bare]
"#
		.parse()
		.unwrap();
		let bare = config.organization("bare").unwrap();
		assert_eq!(
			bare.dispatch_control.record_service_incident,
			ServiceIncidentPolicy::Never
		);
		assert!(bare.shipment_control.auto_shipment_total);
	}

	#[test]
	fn test_unknown_policy_rejected() {
		let input = BASE.replace("pickup_and_delivery", "always");
		let err = Config::from_str(&input).unwrap_err().to_string();
		assert!(err.contains("organization 'acme'"), "{}", err);
		assert!(err.contains("record_service_incident"), "{}", err);
	}

	#[test]
	fn test_grace_period_bounds() {
		let input = BASE.replace("grace_period = 15", "grace_period = 5000");
		let err = Config::from_str(&input).unwrap_err().to_string();
		assert!(err.contains("greater than maximum"), "{}", err);
	}

	#[test]
	fn test_default_organization_must_exist() {
		let input = BASE.replace(
			"default_organization = \"acme\"",
			"default_organization = \"nope\"",
		);
		let err = Config::from_str(&input).unwrap_err().to_string();
		assert!(err.contains("Default organization 'nope'"));
	}

	#[test]
	fn test_primary_storage_must_be_configured() {
		let input = BASE.replace("primary = \"memory\"", "primary = \"file\"");
		let err = Config::from_str(&input).unwrap_err().to_string();
		assert!(err.contains("Primary storage 'file' not found"));
	}
}
