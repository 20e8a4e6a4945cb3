//! Configuration for the strand command-line client
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional configuration file (TOML, JSON or YAML, picked by
//! extension), and explicit command-line flags.
//!
//! # Example
//!
//! ```no_run
//! use config::{Cli, Parser, setup};
//!
//! let args = Cli::parse();
//! let config = setup(&args)?;
//! println!("Connecting to {}:{}", config.host, config.port);
//! # Ok::<(), config::ConfigError>(())
//! ```

use std::path::Path;
use std::time::Duration;

pub use clap::Parser;
use log::debug;
use serde::Deserialize;
use serde::Serialize;
use telemetry::TelemetryError;
use thiserror::Error;

/// File picked up when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_PATH: &str = "conf/strand.toml";

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("Failed to read configuration file '{path}': {source}")]
	Io {
		source: std::io::Error,
		path: String,
	},

	#[error("Failed to parse TOML configuration: {0}")]
	TomlParse(#[from] toml::de::Error),

	#[error("Failed to parse JSON configuration: {0}")]
	JsonParse(#[from] serde_json::Error),

	#[error("Failed to parse YAML configuration: {0}")]
	YamlParse(#[from] serde_yaml::Error),

	#[error("Unsupported configuration format: {0}")]
	UnsupportedFormat(String),

	#[error("Configuration file has no extension")]
	NoExtension,

	#[error("Failed to initialize logging: {0}")]
	Telemetry(#[from] TelemetryError),
}

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Pipelining RESP client", long_about = None)]
pub struct Cli {
	/// Configuration file path (TOML, JSON, or YAML).
	/// Defaults to conf/strand.toml if it exists.
	#[arg(short, long)]
	pub config: Option<String>,

	/// Server host
	#[arg(long)]
	pub host: Option<String>,

	/// Server port
	#[arg(short, long)]
	pub port: Option<u16>,

	/// Connect timeout in milliseconds
	#[arg(long)]
	pub connect_timeout_ms: Option<u64>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long)]
	pub log_level: Option<String>,

	/// Send the command this many times, pipelined
	#[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
	pub repeat: u32,

	/// Wrap the commands in MULTI/EXEC
	#[arg(long, conflicts_with = "eval")]
	pub multi: bool,

	/// Run a Lua script through the server's script cache
	#[arg(long, value_name = "SCRIPT")]
	pub eval: Option<String>,

	/// Number of leading words passed to --eval as keys
	#[arg(long, requires = "eval", value_name = "N")]
	pub keys: Option<usize>,

	/// Command and arguments, e.g. `SET greeting hello`
	#[arg(
		trailing_var_arg = true,
		allow_hyphen_values = true,
		required_unless_present = "eval"
	)]
	pub words: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
	pub host: String,
	pub port: u16,
	pub connect_timeout_ms: u64,
	pub log_level: String,
	/// Idle connections kept by a pool
	pub pool_size: usize,
	/// PING pooled connections before reuse
	pub test_on_borrow: bool,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".into(),
			port: 6379,
			connect_timeout_ms: 10_000,
			log_level: "warn".into(),
			pool_size: 100,
			test_on_borrow: false,
		}
	}
}

impl ClientConfig {
	pub fn connect_timeout(&self) -> Duration {
		Duration::from_millis(self.connect_timeout_ms)
	}
}

/// Resolve the configuration and initialize logging with its level.
pub fn setup(args: &Cli) -> Result<ClientConfig, ConfigError> {
	let config = resolve(args)?;
	telemetry::logger::init(&config.log_level)?;
	debug!("Resolved configuration: {:?}", config);
	Ok(config)
}

/// Load the configuration file (if any) and apply command-line overrides.
pub fn resolve(args: &Cli) -> Result<ClientConfig, ConfigError> {
	let mut config = match args.config.as_deref() {
		Some(p) => load_from_file(p)?,
		None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_from_file(DEFAULT_CONFIG_PATH)?,
		None => ClientConfig::default(),
	};

	// Override with CLI arguments if explicitly provided
	if let Some(host) = &args.host {
		config.host = host.clone();
	}
	if let Some(port) = args.port {
		config.port = port;
	}
	if let Some(timeout) = args.connect_timeout_ms {
		config.connect_timeout_ms = timeout;
	}
	if let Some(log_level) = &args.log_level {
		config.log_level = log_level.clone();
	}
	Ok(config)
}

pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
	let path_ref = path.as_ref();
	let content = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
		path: path_ref.display().to_string(),
		source,
	})?;

	let extension = path_ref
		.extension()
		.and_then(|ext| ext.to_str())
		.ok_or(ConfigError::NoExtension)?;

	match extension.to_lowercase().as_str() {
		"toml" => Ok(toml::from_str(&content)?),
		"json" => Ok(serde_json::from_str(&content)?),
		"yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
		_ => Err(ConfigError::UnsupportedFormat(extension.to_string())),
	}
}
