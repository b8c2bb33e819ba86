//! Command-line entry point for the TMS dispatch rule engine.
//!
//! Each subcommand reads one JSON document, runs it through the engine and
//! prints the result as JSON on stdout. Rule violations are printed as a
//! field-to-messages map and make the process exit with status 2.

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tms_config::Config;
use tms_core::{DispatchEngine, EngineError};
use tms_dispatch::DispatchRequest;
use tms_types::{FieldErrors, Shipment, Status, Stop};

mod factory_registry;

/// Exit status used when the engine rejects the input.
const REJECTED_EXIT_CODE: i32 = 2;

/// Command-line arguments for the dispatch service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
	/// Check a movement against every dispatch rule without storing it
	ValidateMovement {
		/// JSON dispatch request
		input: PathBuf,
	},
	/// Validate and store a movement with its stops
	SaveMovement {
		/// JSON dispatch request
		input: PathBuf,
	},
	/// Move a stored movement to another status
	UpdateStatus {
		/// JSON dispatch request
		input: PathBuf,
		/// Target status (NEW, IN_PROGRESS, COMPLETED, VOIDED)
		#[arg(long)]
		status: Status,
	},
	/// Record arrival or departure times of a stop
	RecordStop {
		/// JSON stop
		input: PathBuf,
	},
	/// Compute a shipment's total and store it
	Rate {
		/// JSON shipment
		input: PathBuf,
	},
	/// Remove expired entries from storage
	Cleanup,
}

#[derive(Debug, Error)]
enum CommandError {
	#[error("Failed to read {path}: {reason}")]
	Input { path: String, reason: String },
	#[error("Validation failed: {0}")]
	Rejected(FieldErrors),
	#[error(transparent)]
	Engine(#[from] EngineError),
}

impl CommandError {
	fn field_errors(&self) -> Option<&FieldErrors> {
		match self {
			CommandError::Rejected(errors) => Some(errors),
			CommandError::Engine(e) => e.field_errors(),
			CommandError::Input { .. } => None,
		}
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// stdout carries the command's JSON output.
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.engine.id);

	let engine = factory_registry::build_engine_from_config(config)?;

	match execute(&engine, args.command).await {
		Ok(output) => {
			println!("{}", serde_json::to_string_pretty(&output)?);
			Ok(())
		},
		Err(e) => match e.field_errors() {
			Some(errors) => {
				println!("{}", serde_json::to_string_pretty(&json!({ "errors": errors }))?);
				std::process::exit(REJECTED_EXIT_CODE);
			},
			None => Err(e.into()),
		},
	}
}

/// Runs `command` against `engine` and returns what should be printed.
async fn execute(
	engine: &DispatchEngine,
	command: Command,
) -> Result<serde_json::Value, CommandError> {
	match command {
		Command::ValidateMovement { input } => {
			let request: DispatchRequest = read_json(&input).await?;
			let errors = engine.validate_movement(&request).await?;
			errors.into_result().map_err(CommandError::Rejected)?;
			Ok(json!({ "valid": true }))
		},
		Command::SaveMovement { input } => {
			let request: DispatchRequest = read_json(&input).await?;
			let movement = engine.save_movement(&request).await?;
			Ok(json!({ "movement": movement }))
		},
		Command::UpdateStatus { input, status } => {
			let request: DispatchRequest = read_json(&input).await?;
			let movement = engine.update_movement_status(&request, status).await?;
			Ok(json!({ "movement": movement }))
		},
		Command::RecordStop { input } => {
			let stop: Stop = read_json(&input).await?;
			let outcome = engine.record_stop(stop).await?;
			Ok(json!({
				"stop": outcome.stop,
				"incident": outcome.incident,
				"movement_status": outcome.movement_status,
			}))
		},
		Command::Rate { input } => {
			let shipment: Shipment = read_json(&input).await?;
			let outcome = engine.rate_shipment(shipment).await?;
			Ok(json!({ "total": outcome.total, "shipment": outcome.shipment }))
		},
		Command::Cleanup => {
			let removed = engine.cleanup_expired().await?;
			Ok(json!({ "removed": removed }))
		},
	}
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CommandError> {
	let input_error = |reason: String| CommandError::Input {
		path: path.display().to_string(),
		reason,
	};
	let content = tokio::fs::read_to_string(path)
		.await
		.map_err(|e| input_error(e.to_string()))?;
	serde_json::from_str(&content).map_err(|e| input_error(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{TimeZone, Utc};
	use serde::Serialize;
	use tempfile::TempDir;
	use tms_config::ConfigBuilder;
	use tms_types::{Movement, RateMethod, StopType, Tractor, Worker};

	fn engine() -> DispatchEngine {
		factory_registry::build_engine_from_config(ConfigBuilder::new().build()).unwrap()
	}

	fn write_json<T: Serialize>(dir: &TempDir, name: &str, value: &T) -> PathBuf {
		let path = dir.path().join(name);
		std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
		path
	}

	fn stop(sequence: u32, stop_type: StopType) -> Stop {
		let end = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
			+ chrono::Duration::hours(i64::from(sequence) * 4);
		Stop {
			id: format!("m1-s{}", sequence),
			movement_id: "m1".into(),
			sequence,
			stop_type,
			status: Status::New,
			appointment_window_start: end - chrono::Duration::hours(2),
			appointment_window_end: end,
			arrival_time: None,
			departure_time: None,
		}
	}

	fn request() -> DispatchRequest {
		let mut request = DispatchRequest::new(Movement {
			id: "m1".into(),
			ref_num: "MOV-1".into(),
			organization_id: "default".into(),
			shipment_id: "ship-1".into(),
			sequence: 1,
			status: Status::New,
			tractor_id: Some("t1".into()),
			primary_worker_id: Some("w1".into()),
			secondary_worker_id: None,
			trailer_id: None,
			updated_at: 0,
		});
		request.stops = vec![stop(1, StopType::Pickup), stop(2, StopType::Delivery)];
		request.workers = vec![Worker {
			id: "w1".into(),
			code: "W1".into(),
			fleet_code: Some("EAST".into()),
			profile: Default::default(),
		}];
		request.tractor = Some(Tractor {
			id: "t1".into(),
			code: "T1".into(),
			fleet_code: Some("EAST".into()),
			status: Default::default(),
		});
		request
	}

	#[test]
	fn test_args_default_values() {
		let args = Args::try_parse_from(["tms", "cleanup"]).unwrap();
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
		assert_eq!(args.command, Command::Cleanup);
	}

	#[test]
	fn test_args_update_status() {
		let args = Args::try_parse_from([
			"tms",
			"--config",
			"custom.toml",
			"update-status",
			"movement.json",
			"--status",
			"in_progress",
		])
		.unwrap();
		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(
			args.command,
			Command::UpdateStatus {
				input: PathBuf::from("movement.json"),
				status: Status::InProgress,
			}
		);
		assert!(Args::try_parse_from(["tms", "update-status", "m.json", "--status", "DONE"]).is_err());
	}

	#[tokio::test]
	async fn test_validate_then_save_then_record() {
		let dir = tempfile::tempdir().unwrap();
		let engine = engine();
		let input = write_json(&dir, "movement.json", &request());

		let output = execute(&engine, Command::ValidateMovement { input: input.clone() })
			.await
			.unwrap();
		assert_eq!(output["valid"], json!(true));

		let output = execute(&engine, Command::SaveMovement { input }).await.unwrap();
		assert_eq!(output["movement"]["id"], json!("m1"));

		let mut arrived = stop(1, StopType::Pickup);
		arrived.arrival_time = Some(arrived.appointment_window_start);
		let input = write_json(&dir, "stop.json", &arrived);
		let output = execute(&engine, Command::RecordStop { input }).await.unwrap();
		assert_eq!(output["incident"], serde_json::Value::Null);
		assert_eq!(output["movement_status"], json!(Status::InProgress));
	}

	#[tokio::test]
	async fn test_rejection_carries_field_errors() {
		let dir = tempfile::tempdir().unwrap();
		let mut shipment = Shipment::new("ship-1", "default");
		shipment.rate_method = RateMethod::PerMile;
		let input = write_json(&dir, "shipment.json", &shipment);

		match execute(&engine(), Command::Rate { input }).await {
			Err(e @ CommandError::Engine(_)) => {
				assert!(e.field_errors().unwrap().contains("mileage"))
			},
			other => panic!("unexpected outcome {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_validate_reports_violations() {
		let dir = tempfile::tempdir().unwrap();
		let mut request = request();
		request.movement.secondary_worker_id = Some("w1".into());
		let input = write_json(&dir, "movement.json", &request);

		let err = execute(&engine(), Command::ValidateMovement { input })
			.await
			.unwrap_err();
		assert!(matches!(err, CommandError::Rejected(_)));
		assert!(err.field_errors().unwrap().contains("primary_worker"));
	}

	#[tokio::test]
	async fn test_unreadable_input() {
		let err = execute(
			&engine(),
			Command::Rate {
				input: PathBuf::from("/nonexistent/shipment.json"),
			},
		)
		.await
		.unwrap_err();
		assert!(matches!(err, CommandError::Input { .. }));
		assert!(err.field_errors().is_none());
	}
}
