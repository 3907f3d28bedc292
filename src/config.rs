//! Configuration management for ThumbMill

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ThumbError};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Batch run settings
    pub run: RunConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Settings for one batch run, immutable for its duration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory holding the source images
    pub source_dir: PathBuf,

    /// Directory thumbnails are written to
    pub dest_dir: PathBuf,

    /// Maximum thumbnail width in pixels; height scales with aspect ratio
    pub max_width: u32,

    /// Maximum number of items processed concurrently
    pub concurrency: usize,

    /// JPEG output quality (1-100)
    pub quality: u8,

    /// Recurse into subdirectories when discovering sources
    pub recursive: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            dest_dir: PathBuf::new(),
            max_width: 320,
            concurrency: default_concurrency(),
            quality: 90,
            recursive: false,
        }
    }
}

/// Default concurrency: logical CPUs, capped to avoid excessive memory use
pub fn default_concurrency() -> usize {
    num_cpus::get().min(16)
}

impl RunConfig {
    /// Validate the configuration, failing fast before any work starts
    pub fn validate(&self) -> Result<()> {
        if self.dest_dir.as_os_str().is_empty() {
            return Err(ThumbError::config("destination directory must not be empty"));
        }

        if self.max_width == 0 {
            return Err(ThumbError::config("max width must be greater than 0"));
        }

        if self.concurrency == 0 {
            return Err(ThumbError::config("concurrency must be at least 1"));
        }

        if self.quality == 0 || self.quality > 100 {
            return Err(ThumbError::config("quality must be between 1 and 100"));
        }

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,

    /// Log file path (None = stdout)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML or YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ThumbError::config(format!("Failed to read config file {:?}: {}", path.as_ref(), e))
        })?;

        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(ThumbError::config(
                "Unsupported config file format. Use .toml or .yaml",
            )),
        }
    }

    /// Save configuration to a TOML or YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let content = match extension.to_lowercase().as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| ThumbError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| ThumbError::config(format!("YAML serialization failed: {}", e)))?,
            _ => {
                return Err(ThumbError::config(
                    "Unsupported config file format. Use .toml or .yaml",
                ))
            }
        };

        std::fs::write(&path, content).map_err(|e| {
            ThumbError::config(format!("Failed to write config file {:?}: {}", path.as_ref(), e))
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.run.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn valid_run_config() -> RunConfig {
        RunConfig {
            source_dir: PathBuf::from("photos"),
            dest_dir: PathBuf::from("thumbs"),
            max_width: 320,
            concurrency: 4,
            quality: 90,
            recursive: false,
        }
    }

    #[test]
    fn test_default_concurrency_is_bounded() {
        let concurrency = default_concurrency();
        assert!(concurrency >= 1);
        assert!(concurrency <= 16);
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_run_config().validate().is_ok());
    }

    #[test]
    fn test_empty_dest_dir_rejected() {
        let mut config = valid_run_config();
        config.dest_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_width_rejected() {
        let mut config = valid_run_config();
        config.max_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = valid_run_config();
        config.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_quality_bounds() {
        let mut config = valid_run_config();
        config.quality = 0;
        assert!(config.validate().is_err());
        config.quality = 101;
        assert!(config.validate().is_err());
        config.quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            run: valid_run_config(),
            logging: LoggingConfig::default(),
        };

        // Test TOML
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.run.max_width, 320);

        // Test YAML
        let yaml_str = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml_str).unwrap();
        assert_eq!(parsed.run.concurrency, 4);
    }

    #[test]
    fn test_config_file_io() {
        let config = Config {
            run: valid_run_config(),
            logging: LoggingConfig::default(),
        };

        // Test TOML file
        let toml_file = NamedTempFile::new().unwrap();
        let toml_path = toml_file.path().with_extension("toml");
        config.to_file(&toml_path).unwrap();
        let loaded = Config::from_file(&toml_path).unwrap();
        assert!(loaded.validate().is_ok());

        // Test YAML file
        let yaml_file = NamedTempFile::new().unwrap();
        let yaml_path = yaml_file.path().with_extension("yaml");
        config.to_file(&yaml_path).unwrap();
        let loaded = Config::from_file(&yaml_path).unwrap();
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_unknown_config_format_rejected() {
        assert!(Config::from_file("config.ini").is_err());
    }
}
