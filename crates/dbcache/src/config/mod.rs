//! Connection cache configuration
//!
//! Values come from [`CacheConfig::default`], optionally overlaid by a TOML
//! file ([`load_from_file`]) and then by environment variables
//! ([`load_from_env`]).

mod env;
mod file;

use std::time::Duration;

pub use env::load_from_env;
pub use file::load_from_file;

use crate::error::{CacheError, CacheResult};

/// Default cap on how long a connection may sit idle inside a handle
pub const DEFAULT_MAX_CONN_IDLE: Duration = Duration::from_secs(5 * 60);

/// Default time after last use before an entry is evicted
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(20 * 60);

/// Default pause between sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Default budget for the sweeper to stop during shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection cache timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Idle cap handed to every new handle via `Handle::set_max_idle_time`
    pub max_conn_idle: Duration,
    /// Entries unused for at least this long are evicted by the sweeper
    pub idle_threshold: Duration,
    /// How often the sweeper runs
    pub sweep_interval: Duration,
    /// How long shutdown waits for the sweeper before giving up
    pub shutdown_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_conn_idle: DEFAULT_MAX_CONN_IDLE,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_max_conn_idle(mut self, idle: Duration) -> Self {
        self.max_conn_idle = idle;
        self
    }

    #[must_use]
    pub const fn with_idle_threshold(mut self, threshold: Duration) -> Self {
        self.idle_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Reject configurations the sweeper cannot run with.
    pub fn validate(&self) -> CacheResult<()> {
        if self.sweep_interval.is_zero() {
            return Err(CacheError::Config(
                "sweep_interval must be greater than zero".into(),
            ));
        }
        if self.idle_threshold.is_zero() {
            return Err(CacheError::Config(
                "idle_threshold must be greater than zero".into(),
            ));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(CacheError::Config(
                "shutdown_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
