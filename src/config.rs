//! Pipeline configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid:
//!
//! ```toml
//! verbose = true
//! noise_threshold = 0.07
//! volatility_window = 255
//! indicator_period = 20
//! max_scale = 100.0
//! split_ratio = 0.8
//! cache_dir = "cache/indicators"
//! steps = ["close-pct", "direction:Close", "ma:ema:10:ohlc", "macd"]
//! ```

use crate::error::{FeatureError, Result};
use crate::transforms::direction::DEFAULT_NOISE_THRESHOLD;
use crate::transforms::volatility::DEFAULT_VOLATILITY_WINDOW;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings shared by every step of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Report merge sizes, thresholds and split sizes at info level
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_noise_threshold")]
    pub noise_threshold: f64,
    #[serde(default = "default_volatility_window")]
    pub volatility_window: usize,
    /// Time period of the non moving-average indicators
    #[serde(default = "default_indicator_period")]
    pub indicator_period: u32,
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
    #[serde(default = "default_split_ratio")]
    pub split_ratio: f64,
    /// Directory of a CSV indicator cache
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Steps in `name[:arg[:arg]]` form
    #[serde(default)]
    pub steps: Vec<String>,
}

fn default_noise_threshold() -> f64 {
    DEFAULT_NOISE_THRESHOLD
}

fn default_volatility_window() -> usize {
    DEFAULT_VOLATILITY_WINDOW
}

fn default_indicator_period() -> u32 {
    20
}

fn default_max_scale() -> f64 {
    100.0
}

fn default_split_ratio() -> f64 {
    0.8
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            noise_threshold: default_noise_threshold(),
            volatility_window: default_volatility_window(),
            indicator_period: default_indicator_period(),
            max_scale: default_max_scale(),
            split_ratio: default_split_ratio(),
            cache_dir: None,
            steps: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.noise_threshold > 0.0 && self.noise_threshold < 1.0) {
            return Err(FeatureError::ConfigError(format!(
                "noise_threshold must be in (0, 1), got {}",
                self.noise_threshold
            )));
        }
        if !(self.split_ratio > 0.0 && self.split_ratio <= 1.0) {
            return Err(FeatureError::ConfigError(format!(
                "split_ratio must be in (0, 1], got {}",
                self.split_ratio
            )));
        }
        if self.volatility_window == 0 {
            return Err(FeatureError::ConfigError("volatility_window must be positive".into()));
        }
        if self.indicator_period == 0 {
            return Err(FeatureError::ConfigError("indicator_period must be positive".into()));
        }
        if !(self.max_scale > 0.0) {
            return Err(FeatureError::ConfigError(format!(
                "max_scale must be positive, got {}",
                self.max_scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert!(!config.verbose);
        assert_eq!(config.noise_threshold, 0.07);
        assert_eq!(config.volatility_window, 255);
        assert_eq!(config.indicator_period, 20);
        assert_eq!(config.max_scale, 100.0);
        assert_eq!(config.split_ratio, 0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        assert_eq!(PipelineConfig::from_toml_str("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_parse_document() {
        let config = PipelineConfig::from_toml_str(
            r#"
            verbose = true
            noise_threshold = 0.1
            cache_dir = "cache"
            steps = ["adx:change", "direction:Close"]
            "#,
        )
        .unwrap();

        assert!(config.verbose);
        assert_eq!(config.noise_threshold, 0.1);
        assert_eq!(config.cache_dir, Some(PathBuf::from("cache")));
        assert_eq!(config.steps, vec!["adx:change", "direction:Close"]);
        assert_eq!(config.volatility_window, 255);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(matches!(
            PipelineConfig::from_toml_str("noise_threshold = 1.5"),
            Err(FeatureError::ConfigError(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("split_ratio = 0.0"),
            Err(FeatureError::ConfigError(_))
        ));
        assert!(PipelineConfig::from_toml_str("split_ratio = 1.0").is_ok());
        assert!(matches!(
            PipelineConfig::from_toml_str("noise_threshold = \"high\""),
            Err(FeatureError::TomlError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.toml");
        fs::write(&path, "volatility_window = 20\n").unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.volatility_window, 20);
    }
}
