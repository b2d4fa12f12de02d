//! Loading [`SimConfig`] from YAML.

use sim_core::SimConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Parse and validate a config. Missing keys take their defaults.
pub fn parse_config(text: &str) -> Result<SimConfig, ConfigError> {
    let cfg: SimConfig = if text.trim().is_empty() {
        SimConfig::default()
    } else {
        serde_yaml::from_str(text)?
    };
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Read a config file.
pub fn load_config(path: impl AsRef<Path>) -> Result<SimConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

pub fn validate_config(cfg: &SimConfig) -> Result<(), ConfigError> {
    for (name, period) in [
        ("market_period", cfg.market_period),
        ("event_period", cfg.event_period),
        ("save_period", cfg.save_period),
    ] {
        if period == 0 {
            return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
        }
    }
    for (name, p) in [
        ("trend_change_chance", cfg.trend_change_chance),
        ("event_chance", cfg.event_chance),
        ("opportunity_chance", cfg.opportunity_chance),
    ] {
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::Invalid(format!("{name} must be within [0, 1]")));
        }
    }
    Ok(())
}
