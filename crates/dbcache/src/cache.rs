//! Keyed connection cache with idle sweeping
//!
//! [`ConnectionCache`] hands out one shared handle per key, creating it on
//! first use. A background sweeper closes handles that have not been asked
//! for within the idle threshold, and [`ConnectionCache::shutdown`] stops the
//! sweeper (within a bounded wait) and closes everything that is left.
//!
//! # Locking
//!
//! All entry state sits behind one async mutex. `get` holds it across handle
//! creation, so two callers racing on an unseen key never open two handles;
//! the cost is that creation for one key briefly blocks lookups for all keys.
//! Sweeps, `remove` and shutdown take entries out of the map under the lock
//! and close them after releasing it. A handle is therefore unreachable
//! through the cache before its `close` starts.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::handle::{Handle, HandleFactory};
use crate::key::{RedactedKey, redact};
use crate::stats::{CacheCounters, CacheStats, EvictionReason};
use crate::sweeper;

/// Lifecycle of a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Serving lookups, sweeper active
    Running,
    /// Shutdown started; lookups are rejected
    Draining,
    /// Sweeper stopped (or abandoned) and every tracked handle closed
    Stopped,
}

struct CacheEntry<H> {
    handle: Arc<H>,
    last_used: Instant,
}

impl<H> CacheEntry<H> {
    fn new(handle: Arc<H>, now: Instant) -> Self {
        Self {
            handle,
            last_used: now,
        }
    }

    fn touch(&mut self, now: Instant) {
        self.last_used = self.last_used.max(now);
    }

    fn is_idle(&self, now: Instant, threshold: Duration) -> bool {
        now.saturating_duration_since(self.last_used) >= threshold
    }
}

struct Inner<H> {
    entries: HashMap<String, CacheEntry<H>>,
    state: CacheState,
}

/// State shared between the cache and its sweeper task
pub(crate) struct Shared<F: HandleFactory> {
    pub(crate) driver: String,
    pub(crate) config: CacheConfig,
    factory: F,
    inner: Mutex<Inner<F::Handle>>,
    counters: CacheCounters,
}

type Evicted<H> = Vec<(String, Arc<H>)>;

impl<F: HandleFactory> Shared<F> {
    /// Evict and close every entry idle past the threshold.
    ///
    /// Returns the number of evicted entries. Close failures are logged and
    /// counted, never returned.
    pub(crate) async fn sweep(&self) -> usize {
        let (expired, remaining) = {
            let mut inner = self.inner.lock().await;
            if inner.state != CacheState::Running {
                return 0;
            }

            let now = Instant::now();
            let threshold = self.config.idle_threshold;
            let expired: Evicted<F::Handle> = inner
                .entries
                .extract_if(|_, entry| entry.is_idle(now, threshold))
                .map(|(key, entry)| (key, entry.handle))
                .collect();
            (expired, inner.entries.len())
        };

        let evicted = expired.len();
        if evicted == 0 {
            tracing::trace!(driver = %self.driver, "Sweep found no idle handles");
            return 0;
        }

        self.counters.set_entry_count(remaining);
        tracing::info!(
            driver = %self.driver,
            evicted,
            remaining,
            "Evicting idle handles"
        );

        let _ = self.close_handles(expired, EvictionReason::Idle).await;
        evicted
    }

    async fn close_handles(
        &self,
        handles: Evicted<F::Handle>,
        reason: EvictionReason,
    ) -> Vec<CacheError> {
        if handles.is_empty() {
            return Vec::new();
        }
        self.counters.record_evictions(reason, handles.len());

        let results = join_all(handles.iter().map(|(key, handle)| async move {
            tracing::debug!(
                driver = %self.driver,
                cache.key = %RedactedKey(key),
                reason = reason.as_str(),
                "Closing handle"
            );
            handle.close().await.map_err(|source| CacheError::Close {
                key: redact(key),
                source,
            })
        }))
        .await;

        let errors: Vec<CacheError> = results.into_iter().filter_map(Result::err).collect();
        for err in &errors {
            self.counters.record_close_error();
            tracing::warn!(
                driver = %self.driver,
                reason = reason.as_str(),
                error = %err,
                "Handle close failed"
            );
        }
        errors
    }
}

/// Cache of expensive handles keyed by data source
///
/// Construct one per driver and hand it (usually as `Arc<ConnectionCache<_>>`)
/// to whatever needs handles. The owner must call [`shutdown`] before
/// dropping it; a cache dropped while running stops its sweeper but drops
/// its handles without closing them.
///
/// [`shutdown`]: ConnectionCache::shutdown
pub struct ConnectionCache<F: HandleFactory> {
    shared: Arc<Shared<F>>,
    sweeper: parking_lot::Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
    stopped: CancellationToken,
}

impl<F: HandleFactory> fmt::Debug for ConnectionCache<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.try_lock().ok();
        f.debug_struct("ConnectionCache")
            .field("driver", &self.shared.driver)
            .field("config", &self.shared.config)
            .field("state", &inner.as_ref().map(|i| i.state))
            .field("entry_count", &inner.as_ref().map(|i| i.entries.len()))
            .finish_non_exhaustive()
    }
}

impl<F: HandleFactory> ConnectionCache<F> {
    /// Create a cache with default timings and start its sweeper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(driver: impl Into<String>, factory: F) -> Self {
        Self::start(driver.into(), factory, CacheConfig::default())
    }

    /// Create a cache with explicit timings and start its sweeper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_config(
        driver: impl Into<String>,
        factory: F,
        config: CacheConfig,
    ) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self::start(driver.into(), factory, config))
    }

    fn start(driver: String, factory: F, config: CacheConfig) -> Self {
        let shared = Arc::new(Shared {
            counters: CacheCounters::new(&driver),
            driver,
            config,
            factory,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                state: CacheState::Running,
            }),
        });
        let shutdown = CancellationToken::new();
        let handle = sweeper::spawn(Arc::clone(&shared), shutdown.clone());

        tracing::debug!(
            driver = %shared.driver,
            idle_threshold = ?config.idle_threshold,
            sweep_interval = ?config.sweep_interval,
            "Connection cache started"
        );

        Self {
            shared,
            sweeper: parking_lot::Mutex::new(Some(handle)),
            shutdown,
            stopped: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn driver(&self) -> &str {
        &self.shared.driver
    }

    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn factory(&self) -> &F {
        &self.shared.factory
    }

    /// Return the handle for `key`, opening and storing one if absent.
    ///
    /// Refreshes the entry's idle clock on every successful call. The
    /// returned handle may be closed by a later sweep once it goes idle.
    pub async fn get(&self, key: &str) -> CacheResult<Arc<F::Handle>> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        let mut inner = self.shared.inner.lock().await;
        if inner.state != CacheState::Running {
            return Err(CacheError::Closed);
        }

        if let Some(entry) = inner.entries.get_mut(key) {
            entry.touch(Instant::now());
            let handle = Arc::clone(&entry.handle);
            drop(inner);

            self.shared.counters.record_hit();
            tracing::debug!(driver = %self.shared.driver, cache.key = %RedactedKey(key), cache.result = "hit");
            return Ok(handle);
        }

        let span = tracing::debug_span!(
            "dbcache.open",
            driver = %self.shared.driver,
            cache.key = %RedactedKey(key),
        );
        let opened = self
            .shared
            .factory
            .open(&self.shared.driver, key)
            .instrument(span)
            .await;

        let handle = match opened {
            Ok(handle) => Arc::new(handle),
            Err(source) => {
                drop(inner);
                self.shared.counters.record_creation_error();
                let err = CacheError::Creation {
                    key: redact(key),
                    source,
                };
                tracing::warn!(driver = %self.shared.driver, error = %err, "Handle creation failed");
                return Err(err);
            }
        };
        handle.set_max_idle_time(self.shared.config.max_conn_idle);

        inner.entries.insert(
            key.to_owned(),
            CacheEntry::new(Arc::clone(&handle), Instant::now()),
        );
        let count = inner.entries.len();
        drop(inner);

        self.shared.counters.record_miss();
        self.shared.counters.set_entry_count(count);
        tracing::debug!(
            driver = %self.shared.driver,
            cache.key = %RedactedKey(key),
            cache.result = "miss",
            entries = count,
        );
        Ok(handle)
    }

    /// Evict and close the handle for `key`, if cached.
    ///
    /// Returns whether an entry was present. A close failure is returned as
    /// [`CacheError::Close`]; the entry is gone either way.
    pub async fn remove(&self, key: &str) -> CacheResult<bool> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        let (entry, remaining) = {
            let mut inner = self.shared.inner.lock().await;
            if inner.state != CacheState::Running {
                return Err(CacheError::Closed);
            }
            let entry = inner.entries.remove(key);
            (entry, inner.entries.len())
        };

        let Some(entry) = entry else {
            return Ok(false);
        };
        self.shared.counters.set_entry_count(remaining);

        let errors = self
            .shared
            .close_handles(vec![(key.to_owned(), entry.handle)], EvictionReason::Removed)
            .await;
        match errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(true),
        }
    }

    /// Stop the sweeper and close every cached handle.
    ///
    /// Waits up to `shutdown_timeout` for the sweeper to exit; if it does not,
    /// the task is aborted and a [`CacheError::ShutdownTimeout`] is recorded.
    /// A sweeper that panicked is recorded as [`CacheError::SweeperFailed`].
    /// Remaining handles are closed regardless. All failures come back
    /// together as [`CacheError::Shutdown`].
    ///
    /// Only the first call does any work and sees its errors. Later calls
    /// wait until that shutdown has finished (or been abandoned by dropping
    /// its future) and then return `Ok(())`.
    pub async fn shutdown(&self) -> CacheResult<()> {
        {
            let mut inner = self.shared.inner.lock().await;
            if inner.state != CacheState::Running {
                drop(inner);
                tracing::debug!(driver = %self.shared.driver, "Shutdown already requested");
                self.stopped.cancelled().await;
                return Ok(());
            }
            inner.state = CacheState::Draining;
        }
        let _stopped = self.stopped.clone().drop_guard();
        tracing::info!(driver = %self.shared.driver, "Shutting down connection cache");

        self.shutdown.cancel();
        let mut errors = Vec::new();
        if let Err(err) = self.stop_sweeper().await {
            errors.push(err);
        }

        let drained: Evicted<F::Handle> = {
            let mut inner = self.shared.inner.lock().await;
            inner.state = CacheState::Stopped;
            inner
                .entries
                .drain()
                .map(|(key, entry)| (key, entry.handle))
                .collect()
        };
        self.shared.counters.set_entry_count(0);

        let closed = drained.len();
        errors.extend(
            self.shared
                .close_handles(drained, EvictionReason::Shutdown)
                .await,
        );

        if errors.is_empty() {
            tracing::info!(driver = %self.shared.driver, closed, "Connection cache stopped");
            Ok(())
        } else {
            tracing::warn!(
                driver = %self.shared.driver,
                closed,
                errors = errors.len(),
                "Connection cache stopped with errors"
            );
            Err(CacheError::Shutdown(errors))
        }
    }

    async fn stop_sweeper(&self) -> CacheResult<()> {
        let handle = self.sweeper.lock().take();
        let Some(mut handle) = handle else {
            return Ok(());
        };
        let timeout = self.shared.config.shutdown_timeout;

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::warn!(driver = %self.shared.driver, error = %e, "Sweeper task ended abnormally");
                Err(CacheError::SweeperFailed(e.to_string()))
            }
            Err(_) => {
                handle.abort();
                tracing::warn!(
                    driver = %self.shared.driver,
                    timeout = ?timeout,
                    "Sweeper did not stop in time, aborted"
                );
                Err(CacheError::ShutdownTimeout(timeout))
            }
        }
    }

    pub async fn state(&self) -> CacheState {
        self.shared.inner.lock().await.state
    }

    /// Snapshot of hit/miss/eviction counters and the current entry count.
    pub async fn stats(&self) -> CacheStats {
        let entry_count = self.shared.inner.lock().await.entries.len();
        self.shared.counters.snapshot(entry_count)
    }
}

impl<F: HandleFactory> Drop for ConnectionCache<F> {
    fn drop(&mut self) {
        if !self.shutdown.is_cancelled() {
            self.shutdown.cancel();
            tracing::warn!(
                driver = %self.shared.driver,
                "Connection cache dropped without shutdown, handles were not closed"
            );
        }
    }
}
