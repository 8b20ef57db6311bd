//! Environment variable loading for configuration

use std::env;
use std::time::Duration;

use super::CacheConfig;

/// Environment variable names
mod vars {
    pub const MAX_CONN_IDLE_SECS: &str = "DBCACHE_MAX_CONN_IDLE_SECS";
    pub const IDLE_THRESHOLD_SECS: &str = "DBCACHE_IDLE_THRESHOLD_SECS";
    pub const SWEEP_INTERVAL_SECS: &str = "DBCACHE_SWEEP_INTERVAL_SECS";
    pub const SHUTDOWN_TIMEOUT_SECS: &str = "DBCACHE_SHUTDOWN_TIMEOUT_SECS";
}

/// Overlay environment variables onto `config`.
///
/// Unset or unparsable variables leave the corresponding field untouched.
#[must_use]
pub fn load_from_env(mut config: CacheConfig) -> CacheConfig {
    if let Some(d) = secs_var(vars::MAX_CONN_IDLE_SECS) {
        config.max_conn_idle = d;
    }

    if let Some(d) = secs_var(vars::IDLE_THRESHOLD_SECS) {
        config.idle_threshold = d;
    }

    if let Some(d) = secs_var(vars::SWEEP_INTERVAL_SECS) {
        config.sweep_interval = d;
    }

    if let Some(d) = secs_var(vars::SHUTDOWN_TIMEOUT_SECS) {
        config.shutdown_timeout = d;
    }

    config
}

fn secs_var(name: &str) -> Option<Duration> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            tracing::warn!(var = name, value = %raw, error = %e, "Ignoring invalid duration");
            None
        }
    }
}
