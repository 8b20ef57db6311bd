//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dbcache::{BoxError, CacheConfig, ConnectionCache, Handle, HandleFactory};
use tokio::sync::Notify;

pub const DRIVER: &str = "fake-sql";

/// Handle recording how it was configured and closed
#[derive(Debug)]
pub struct FakeConnection {
    pub serial: usize,
    pub data_source: String,
    max_idle: parking_lot::Mutex<Option<Duration>>,
    closes: AtomicUsize,
    close_gate: Option<Arc<Notify>>,
}

impl FakeConnection {
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn max_idle(&self) -> Option<Duration> {
        *self.max_idle.lock()
    }
}

#[async_trait]
impl Handle for FakeConnection {
    fn set_max_idle_time(&self, idle: Duration) {
        *self.max_idle.lock() = Some(idle);
    }

    async fn close(&self) -> Result<(), BoxError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.close_gate {
            gate.notified().await;
        }
        if self.data_source.contains("broken") {
            return Err(format!("{} refused to close", self.data_source).into());
        }
        Ok(())
    }
}

/// Factory counting every open
///
/// Data sources containing `unreachable` fail to open. When a close gate is
/// set, closes of data sources containing `slow` wait on it.
#[derive(Debug, Default)]
pub struct FakeDriver {
    opened: AtomicUsize,
    open_delay: Option<Duration>,
    close_gate: Option<Arc<Notify>>,
}

impl FakeDriver {
    pub fn with_open_delay(delay: Duration) -> Self {
        Self {
            open_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn with_close_gate(gate: Arc<Notify>) -> Self {
        Self {
            close_gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HandleFactory for FakeDriver {
    type Handle = FakeConnection;

    async fn open(&self, driver: &str, key: &str) -> Result<FakeConnection, BoxError> {
        assert_eq!(driver, DRIVER);
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if key.contains("unreachable") {
            return Err("no route to host".into());
        }
        let close_gate = if key.contains("slow") {
            self.close_gate.clone()
        } else {
            None
        };
        Ok(FakeConnection {
            serial: self.opened.fetch_add(1, Ordering::SeqCst) + 1,
            data_source: key.to_string(),
            max_idle: parking_lot::Mutex::new(None),
            closes: AtomicUsize::new(0),
            close_gate,
        })
    }
}

/// Idle threshold 2s, sweep every 1s, 5s shutdown budget.
pub fn short_config() -> CacheConfig {
    CacheConfig::new()
        .with_max_conn_idle(Duration::from_secs(30))
        .with_idle_threshold(Duration::from_secs(2))
        .with_sweep_interval(Duration::from_secs(1))
        .with_shutdown_timeout(Duration::from_secs(5))
}

pub fn short_cache(driver: FakeDriver) -> ConnectionCache<FakeDriver> {
    ConnectionCache::with_config(DRIVER, driver, short_config()).unwrap()
}
