use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use beacon_core::CorrelatorConfig;
use beacon_logging::{beacon_info, beacon_warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Reads a RON correlator config. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<CorrelatorConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            beacon_info!("no config at {:?}, using defaults", path);
            return Ok(CorrelatorConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_config_or_default(path: &Path) -> CorrelatorConfig {
    load_config(path).unwrap_or_else(|err| {
        beacon_warn!("{}; falling back to defaults", err);
        CorrelatorConfig::default()
    })
}
