use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Largest summed R+G+B delta two pixels can have.
pub const MAX_CHANNEL_DELTA: u32 = 3 * 255;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bounds applied to a JPEG header before any pixel buffer is allocated.
#[derive(Debug, Clone, Deserialize)]
pub struct DecoderConfig {
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    /// Upper bound on the RGB output buffer, in bytes.
    #[serde(default = "default_max_alloc_bytes")]
    pub max_alloc_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    /// Pixels skipped between two samples of the backward walk.
    #[serde(default = "default_step")]
    pub step: u32,
    /// A sampled pixel counts as changed when `|dR| + |dG| + |dB| >= threshold`.
    #[serde(default = "default_threshold")]
    pub threshold: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            max_height: default_max_height(),
            max_alloc_bytes: default_max_alloc_bytes(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            step: default_step(),
            threshold: default_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling.step == 0 {
            return Err(ConfigError::Invalid("sampling.step must be greater than 0".into()));
        }
        if self.sampling.threshold > MAX_CHANNEL_DELTA {
            return Err(ConfigError::Invalid(format!(
                "sampling.threshold {} exceeds the maximum delta {MAX_CHANNEL_DELTA}",
                self.sampling.threshold
            )));
        }
        if self.decoder.max_width == 0 || self.decoder.max_height == 0 {
            return Err(ConfigError::Invalid(
                "decoder.max_width and decoder.max_height must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_max_width() -> u32 {
    8192
}
fn default_max_height() -> u32 {
    8192
}
fn default_max_alloc_bytes() -> u64 {
    256 * 1024 * 1024
}
fn default_step() -> u32 {
    4
}
fn default_threshold() -> u32 {
    60
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.decoder.max_width, 8192);
        assert_eq!(config.decoder.max_alloc_bytes, 256 * 1024 * 1024);
        assert_eq!(config.sampling.step, 4);
        assert_eq!(config.sampling.threshold, 60);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [sampling]
            threshold = 120

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.sampling.threshold, 120);
        assert_eq!(config.sampling.step, 4);
        assert_eq!(config.decoder.max_height, 8192);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn zero_step_rejected() {
        let result = Config::parse("[sampling]\nstep = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unreachable_threshold_rejected() {
        let result = Config::parse("[sampling]\nthreshold = 766\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        assert!(Config::parse("[sampling]\nthreshold = 765\n").is_ok());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let result = Config::parse("[sampling\nstep = 1");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = Config::load(Path::new("/nonexistent/frame-motion.toml"));
        assert!(matches!(result, Err(ConfigError::ReadFile(..))));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }
}
