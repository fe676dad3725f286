use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/fortuna.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccumulatorConfig {
    /// File carrying entropy between runs. `None` disables persistence.
    pub seed_file: Option<PathBuf>,
    /// Seconds between background rewrites of the seed file.
    pub resave_interval_secs: u64,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            seed_file: None,
            resave_interval_secs: 600,
        }
    }
}

impl AccumulatorConfig {
    /// Clamp fields to valid ranges.
    pub fn validate(&mut self) {
        self.resave_interval_secs = self.resave_interval_secs.clamp(1, 86_400);
    }

    pub fn resave_interval(&self) -> Duration {
        Duration::from_secs(self.resave_interval_secs.clamp(1, 86_400))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub jitter: bool,
    pub procfs: bool,
    pub jitter_samples: usize,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            jitter: true,
            procfs: true,
            jitter_samples: 64,
        }
    }
}

impl SourcesConfig {
    pub fn validate(&mut self) {
        self.jitter_samples = self.jitter_samples.clamp(1, 4096);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub accumulator: AccumulatorConfig,
    pub sources: SourcesConfig,
}

/// Load configuration from a TOML file.
///
/// - If `explicit_path` is `Some` and the file is missing, returns an error.
/// - If `explicit_path` is `None`, tries `/etc/fortuna.toml`; if missing, returns defaults.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Config, Error> {
    let path = match explicit_path {
        Some(p) => {
            if !p.exists() {
                return Err(Error::InvalidArgs(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p.to_path_buf()
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                return Ok(Config::default());
            }
            default.to_path_buf()
        }
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| {
        Error::InvalidArgs(format!("failed to read config {}: {}", path.display(), e))
    })?;

    let mut config: Config = toml::from_str(&contents).map_err(|e| {
        Error::InvalidArgs(format!("failed to parse config {}: {}", path.display(), e))
    })?;
    config.accumulator.validate();
    config.sources.validate();

    Ok(config)
}
