//! # Config Loader
//!
//! Loads the data window configuration.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a `DataWindowConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("window.toml")).unwrap();
//! println!("Input: {}", config.input_directory.display());
//! ```

mod parser;
mod validator;

pub use contracts::DataWindowConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file path
    ///
    /// The format is detected from the extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<DataWindowConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        let config = Self::load_from_str(&content, format)?;
        tracing::debug!(path = %path.display(), ?format, "loaded window configuration");
        Ok(config)
    }

    /// Load configuration from a string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DataWindowConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Check an already built configuration with the same rules as the loaders
    pub fn validate(config: &DataWindowConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    pub fn to_toml(config: &DataWindowConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(config: &DataWindowConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DataWindowConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
input_directory = "/data/api1000"
station_ids = ["1637610021"]
start_datetime = "2021-11-22T18:00:00Z"
end_datetime = "2021-11-22T18:10:00Z"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert!(config.accepts_station("1637610021"));
        assert!(config.has_time_window());
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let again = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config, again);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config, again);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
input_directory = "/data"
start_datetime = "2021-11-22T18:10:00Z"
end_datetime = "2021-11-22T18:00:00Z"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(matches!(
            result,
            Err(ContractError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("window.toml");
        std::fs::write(&toml_path, MINIMAL_TOML).unwrap();
        let config = ConfigLoader::load_from_path(&toml_path).unwrap();

        let json_path = dir.path().join("window.json");
        std::fs::write(&json_path, ConfigLoader::to_json(&config).unwrap()).unwrap();
        assert_eq!(ConfigLoader::load_from_path(&json_path).unwrap(), config);

        let yaml_path = dir.path().join("window.yaml");
        std::fs::write(&yaml_path, "input_directory: /data").unwrap();
        assert!(matches!(
            ConfigLoader::load_from_path(&yaml_path),
            Err(ContractError::ConfigParse { .. })
        ));
    }
}
