//! TOML configuration file loading

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::CacheConfig;
use crate::error::{CacheError, CacheResult};

/// Overlay the `[cache]` table of a TOML file onto `config`.
pub fn load_from_file(path: &Path, config: CacheConfig) -> CacheResult<CacheConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CacheError::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        CacheError::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    Ok(apply_file_config(config, file_config))
}

fn apply_file_config(mut config: CacheConfig, file: FileConfig) -> CacheConfig {
    let Some(cache) = file.cache else {
        return config;
    };

    if let Some(secs) = cache.max_conn_idle_secs {
        config.max_conn_idle = Duration::from_secs(secs);
    }

    if let Some(secs) = cache.idle_threshold_secs {
        config.idle_threshold = Duration::from_secs(secs);
    }

    if let Some(secs) = cache.sweep_interval_secs {
        config.sweep_interval = Duration::from_secs(secs);
    }

    if let Some(secs) = cache.shutdown_timeout_secs {
        config.shutdown_timeout = Duration::from_secs(secs);
    }

    config
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    cache: Option<CacheFileConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheFileConfig {
    max_conn_idle_secs: Option<u64>,
    idle_threshold_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    shutdown_timeout_secs: Option<u64>,
}
