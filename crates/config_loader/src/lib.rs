//! # Config Loader
//!
//! Loads the acquisition session configuration.
//!
//! Responsibilities:
//! - Parse TOML/JSON stream blueprints
//! - Validate checker, acquisition and sink settings
//! - Resolve optional fields to their effective values
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("config.toml")).unwrap();
//! println!("Strategy: {}", blueprint.checker.strategy());
//! ```

mod parser;
mod validator;

pub use contracts::StreamBlueprint;
pub use parser::ConfigFormat;

use contracts::{CheckerSettings, ContractError};
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<StreamBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<StreamBlueprint, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Copy of `blueprint` with every optional field set to the value the
    /// engine will actually use
    pub fn resolve(blueprint: &StreamBlueprint) -> StreamBlueprint {
        let mut resolved = blueprint.clone();
        resolved.acquisition.packet_size = Some(blueprint.packet_size());

        match &mut resolved.checker {
            CheckerSettings::SequenceCounter(s) => {
                s.acquire_from = Some(s.resolved_acquire_from());
                s.check_every = Some(s.resolved_check_every());
            }
            CheckerSettings::MarkerBit(s) => {
                s.reset_mask = Some(s.resolved_reset_mask());
            }
        }
        resolved
    }

    /// Serialize StreamBlueprint to TOML string
    pub fn to_toml(blueprint: &StreamBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize StreamBlueprint to JSON string
    pub fn to_json(blueprint: &StreamBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<StreamBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
version = "V1"

[checker]
strategy = "sequence_counter"
sample_size = 8
frames_for_sync = 2
first_counter = 1
acquire_from = 1

[acquisition]
packet_size = 32
read_chunk = 1024
max_sync_failures = 4
start_locked = false

[[sinks]]
name = "log_sink"
sink_type = "log"

[[sinks]]
name = "capture"
sink_type = "file"
queue_capacity = 64
[sinks.params]
base_path = "./output"
index = "true"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.checker.strategy(), "sequence_counter");
        assert_eq!(bp.packet_size(), 32);
        assert_eq!(bp.acquisition.max_sync_failures, 4);
        assert!(!bp.acquisition.start_locked);
        assert_eq!(bp.sinks.len(), 2);
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.checker, bp2.checker);
        assert_eq!(bp.packet_size(), bp2.packet_size());
        assert_eq!(bp.sinks.len(), bp2.sinks.len());
        assert_eq!(bp.sinks[1].params, bp2.sinks[1].params);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.checker, bp2.checker);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        // check_every not a multiple of counter_step
        let content = r#"
[checker]
strategy = "sequence_counter"
sample_size = 4
frames_for_sync = 2
counter_step = 2
check_every = 3
acquire_from = 0
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("check_every"));
    }

    #[test]
    fn test_resolve_fills_defaults() {
        let content = r#"
[checker]
strategy = "sequence_counter"
sample_size = 4
frames_for_sync = 2
first_counter = 10
counter_step = 2
"#;
        let bp = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        let resolved = ConfigLoader::resolve(&bp);

        assert_eq!(resolved.acquisition.packet_size, Some(4));
        match resolved.checker {
            CheckerSettings::SequenceCounter(s) => {
                assert_eq!(s.acquire_from, Some(10));
                assert_eq!(s.check_every, Some(2));
            }
            other => panic!("unexpected checker: {other:?}"),
        }
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(MINIMAL_TOML.as_bytes()).unwrap();

        let bp = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(bp.sinks[0].name, "log_sink");
    }

    #[test]
    fn test_load_from_path_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"), "got: {err}");
    }
}
