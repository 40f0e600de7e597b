use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::system::resolver::Selector;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sampling: SamplingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub interval_secs: f64,
    pub progress_every: usize,
    pub max_samples: Option<usize>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            interval_secs: 2.0,
            progress_every: 10,
            max_samples: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
            json: false,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("restax").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("sampling interval must be positive, got {0} seconds")]
    NonPositiveInterval(f64),
    #[error("sampling interval must be a finite number of seconds")]
    NonFiniteInterval,
    #[error("output path must not be empty")]
    EmptyOutputPath,
    #[error("{role} application name must not be empty")]
    EmptySelector { role: &'static str },
    #[error("progress interval must be at least 1 sample")]
    ZeroProgressEvery,
    #[error("sample limit must be at least 1 when set")]
    ZeroMaxSamples,
}

/// Everything a run needs, before validation.
#[derive(Debug, Clone)]
pub struct SamplingRequest {
    pub foreground: String,
    pub background: String,
    pub output: PathBuf,
    pub interval_secs: f64,
    pub progress_every: usize,
    pub max_samples: Option<usize>,
}

/// Validated run settings. Constructing one is the only way into the
/// sampling loop, so a bad interval is rejected before anything starts.
#[derive(Debug, Clone)]
pub struct SamplingSettings {
    pub foreground: Selector,
    pub background: Selector,
    pub output: PathBuf,
    pub interval: Duration,
    pub progress_every: usize,
    pub max_samples: Option<usize>,
}

impl SamplingRequest {
    pub fn validate(self) -> Result<SamplingSettings, ConfigError> {
        if self.interval_secs.is_nan() {
            return Err(ConfigError::NonFiniteInterval);
        }
        if self.interval_secs <= 0.0 {
            return Err(ConfigError::NonPositiveInterval(self.interval_secs));
        }
        let interval = Duration::try_from_secs_f64(self.interval_secs)
            .map_err(|_| ConfigError::NonFiniteInterval)?;
        // Sub-nanosecond values round down to zero.
        if interval.is_zero() {
            return Err(ConfigError::NonPositiveInterval(self.interval_secs));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputPath);
        }
        if self.foreground.is_empty() {
            return Err(ConfigError::EmptySelector { role: "foreground" });
        }
        if self.background.is_empty() {
            return Err(ConfigError::EmptySelector { role: "background" });
        }
        if self.progress_every == 0 {
            return Err(ConfigError::ZeroProgressEvery);
        }
        if self.max_samples == Some(0) {
            return Err(ConfigError::ZeroMaxSamples);
        }

        Ok(SamplingSettings {
            foreground: Selector::new(&self.foreground),
            background: Selector::new(&self.background),
            output: self.output,
            interval,
            progress_every: self.progress_every,
            max_samples: self.max_samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(interval_secs: f64) -> SamplingRequest {
        SamplingRequest {
            foreground: "Code".to_string(),
            background: "Spotify".to_string(),
            output: PathBuf::from("data/baseline_log.csv"),
            interval_secs,
            progress_every: 10,
            max_samples: None,
        }
    }

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert!((config.sampling.interval_secs - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.sampling.progress_every, 10);
        assert_eq!(config.sampling.max_samples, None);
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.json);
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
[sampling]
interval_secs = 0.5
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!((config.sampling.interval_secs - 0.5).abs() < f64::EPSILON);
        // Other fields should be defaults
        assert_eq!(config.sampling.progress_every, 10);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
[sampling]
interval_secs = 1.0
progress_every = 5
max_samples = 900

[logging]
level = "debug"
json = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!((config.sampling.interval_secs - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.sampling.progress_every, 5);
        assert_eq!(config.sampling.max_samples, Some(900));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn missing_file_returns_default() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.toml"));
        assert_eq!(config.sampling.progress_every, 10);
    }

    #[test]
    fn invalid_toml_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("invalid.toml");
        std::fs::write(&temp, "this is not valid toml {{{{").unwrap();
        let config = load_config_from_path(&temp);
        assert_eq!(config.sampling.progress_every, 10);
    }

    #[test]
    fn validate_accepts_fractional_interval() {
        let settings = request(0.25).validate().unwrap();
        assert_eq!(settings.interval, Duration::from_millis(250));
        assert!(settings.foreground.matches("VSCode"));
        assert!(settings.background.matches("spotify helper"));
    }

    #[test]
    fn validate_rejects_non_positive_interval() {
        assert_eq!(
            request(0.0).validate().unwrap_err(),
            ConfigError::NonPositiveInterval(0.0)
        );
        assert_eq!(
            request(-2.0).validate().unwrap_err(),
            ConfigError::NonPositiveInterval(-2.0)
        );
    }

    #[test]
    fn validate_rejects_non_finite_interval() {
        assert_eq!(
            request(f64::NAN).validate().unwrap_err(),
            ConfigError::NonFiniteInterval
        );
        assert_eq!(
            request(f64::INFINITY).validate().unwrap_err(),
            ConfigError::NonFiniteInterval
        );
    }

    #[test]
    fn validate_rejects_empty_names_and_path() {
        let mut req = request(2.0);
        req.output = PathBuf::new();
        assert_eq!(req.validate().unwrap_err(), ConfigError::EmptyOutputPath);

        let mut req = request(2.0);
        req.background = String::new();
        assert_eq!(
            req.validate().unwrap_err(),
            ConfigError::EmptySelector { role: "background" }
        );

        let mut req = request(2.0);
        req.progress_every = 0;
        assert_eq!(req.validate().unwrap_err(), ConfigError::ZeroProgressEvery);

        let mut req = request(2.0);
        req.max_samples = Some(0);
        assert_eq!(req.validate().unwrap_err(), ConfigError::ZeroMaxSamples);
    }
}
