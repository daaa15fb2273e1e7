//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load the TOML configuration
//! file of the opto16 reader.
//!
//! # Usage
//!
//! ```rust,no_run
//! use opto16_common::config::{AppConfig, ConfigError, ConfigLoader};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = AppConfig::load(Path::new("opto16.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "opto16-in"
//! log_level = "debug"
//!
//! [node]
//! stack = 2
//! channel = 0
//! payload = "payload"
//! payload_type = "num"
//!
//! [bus]
//! driver = "simulation"
//!
//! [[bus.simulation.boards]]
//! stack = 2
//! raw = 0xFFFE
//! ```

use crate::consts::{DEFAULT_DRIVER, SERVICE_NAME, STACK_MAX};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
///
/// This enum represents all possible errors that can occur when loading
/// configuration files.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "opto16-in"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: SERVICE_NAME.to_string(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-instance node configuration.
///
/// `stack` and `channel` are kept as raw values: they are parsed leniently at
/// request time, and an absent or non-numeric value falls back to the
/// request's own field. `payload` and `payload_type` are carried unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Stack level of the board (0..=7).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<Value>,

    /// Channel (1..=16), or 0 for all channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Value>,

    /// Pass-through payload field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,

    /// Pass-through payload type tag.
    #[serde(default, alias = "payloadType", skip_serializing_if = "Option::is_none")]
    pub payload_type: Option<String>,
}

/// One board on the simulated bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedBoard {
    /// Stack level the board answers at.
    pub stack: u8,
    /// Raw (active-low) input register word.
    #[serde(default = "default_raw")]
    pub raw: u16,
}

fn default_raw() -> u16 {
    0xFFFF
}

/// Simulation driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Boards present on the simulated bus.
    #[serde(default)]
    pub boards: Vec<SimulatedBoard>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            boards: vec![SimulatedBoard {
                stack: 0,
                raw: default_raw(),
            }],
        }
    }
}

/// Bus backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Driver name as registered in the bus registry.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Boards for the simulation driver.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl BusConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `driver` is empty
    /// - a simulated board sits outside stack levels 0..=7
    /// - two simulated boards share a stack level
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.is_empty() {
            return Err(ConfigError::ValidationError(
                "bus.driver cannot be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for board in &self.simulation.boards {
            if i64::from(board.stack) > STACK_MAX {
                return Err(ConfigError::ValidationError(format!(
                    "simulated board stack {} out of range 0..={}",
                    board.stack, STACK_MAX
                )));
            }
            if !seen.insert(board.stack) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate simulated board at stack {}",
                    board.stack
                )));
            }
        }
        Ok(())
    }
}

/// Full application configuration (`opto16.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Shared settings.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Node settings.
    #[serde(default)]
    pub node: NodeConfig,

    /// Bus settings.
    #[serde(default)]
    pub bus: BusConfig,
}

impl AppConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.bus.validate()
    }
}

/// Trait for loading configuration from TOML files.
///
/// This trait provides a default implementation that works with any type
/// implementing `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Any serde-deserializable struct can use ConfigLoader.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct TestWrapper {
            level: LogLevel,
        }

        let cases = [
            ("trace", LogLevel::Trace),
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warn", LogLevel::Warn),
            ("error", LogLevel::Error),
        ];
        for (text, expected) in cases {
            let parsed: TestWrapper = toml::from_str(&format!("level = \"{text}\"")).unwrap();
            assert_eq!(parsed.level, expected);
        }
    }

    #[test]
    fn test_log_level_to_tracing() {
        assert_eq!(tracing::Level::from(LogLevel::Warn), tracing::Level::WARN);
        assert_eq!(tracing::Level::from(LogLevel::Trace), tracing::Level::TRACE);
    }

    #[test]
    fn test_shared_config_validation_empty_service_name() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "".to_string(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_loader_file_not_found() {
        let result = AppConfig::load(Path::new("/nonexistent/path/opto16.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = AppConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let file = NamedTempFile::new().unwrap();
        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.shared.service_name, SERVICE_NAME);
        assert_eq!(config.node, NodeConfig::default());
        assert_eq!(config.bus.driver, DEFAULT_DRIVER);
        assert_eq!(config.bus.simulation.boards.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config_loads() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[shared]
service_name = "opto16-test"
log_level = "debug"

[node]
stack = 2
channel = "5"
payload = "payload"
payloadType = "num"

[bus]
driver = "simulation"

[[bus.simulation.boards]]
stack = 2
raw = 0xFFFE

[[bus.simulation.boards]]
stack = 5
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.shared.log_level, LogLevel::Debug);
        assert_eq!(config.node.stack, Some(Value::from(2)));
        assert_eq!(config.node.channel, Some(Value::from("5")));
        assert_eq!(config.node.payload_type.as_deref(), Some("num"));
        assert_eq!(config.bus.driver, "simulation");
        assert_eq!(
            config.bus.simulation.boards,
            vec![
                SimulatedBoard { stack: 2, raw: 0xFFFE },
                SimulatedBoard { stack: 5, raw: 0xFFFF },
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bus_config_rejects_bad_boards() {
        let mut bus = BusConfig::default();
        bus.simulation.boards = vec![SimulatedBoard { stack: 8, raw: 0 }];
        assert!(matches!(bus.validate(), Err(ConfigError::ValidationError(_))));

        bus.simulation.boards = vec![
            SimulatedBoard { stack: 3, raw: 0 },
            SimulatedBoard { stack: 3, raw: 1 },
        ];
        let err = bus.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
