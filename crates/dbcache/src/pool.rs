//! Pooled handles built on [`deadpool`]
//!
//! A [`PoolHandle`] is one connection pool per cache key, the usual shape of
//! a database handle: the cache decides which data sources stay open, the
//! pool decides how many physical connections each one keeps.
//!
//! # Idle pruning
//!
//! [`deadpool`]'s managed pool has no idle timeout of its own. The cap set
//! through [`Handle::set_max_idle_time`] is enforced on checkout: objects
//! that sat in the pool longer than the cap are dropped before a fresh one is
//! handed out.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use deadpool::Runtime;
use deadpool::managed::{Manager, Object, Pool, PoolError};

use crate::error::BoxError;
use crate::handle::{Handle, HandleFactory};

/// Pool sizing and timeouts applied to every pool a [`PoolFactory`] builds
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub max_size: usize,
    pub wait_timeout: Option<Duration>,
    pub create_timeout: Option<Duration>,
    pub recycle_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: 4,
            wait_timeout: Some(Duration::from_secs(10)),
            create_timeout: Some(Duration::from_secs(30)),
            recycle_timeout: Some(Duration::from_secs(5)),
        }
    }
}

/// Connection pool for a single data source
pub struct PoolHandle<M: Manager> {
    pool: Pool<M>,
    max_idle: parking_lot::Mutex<Option<Duration>>,
}

impl<M: Manager> fmt::Debug for PoolHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PoolHandle")
            .field("max_size", &status.max_size)
            .field("size", &status.size)
            .field("max_idle", &*self.max_idle.lock())
            .field("closed", &self.pool.is_closed())
            .finish()
    }
}

impl<M: Manager> PoolHandle<M> {
    #[must_use]
    pub fn new(pool: Pool<M>) -> Self {
        Self {
            pool,
            max_idle: parking_lot::Mutex::new(None),
        }
    }

    /// Check out a connection, pruning idle ones first.
    pub async fn get(&self) -> Result<Object<M>, PoolError<M::Error>> {
        self.prune_idle();
        self.pool.get().await
    }

    /// Drop pooled connections unused for longer than the idle cap.
    pub fn prune_idle(&self) {
        let Some(max_idle) = *self.max_idle.lock() else {
            return;
        };
        let _ = self
            .pool
            .retain(|_, metrics| metrics.last_used() < max_idle);
    }

    #[must_use]
    pub fn status(&self) -> deadpool::Status {
        self.pool.status()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[async_trait]
impl<M: Manager + 'static> Handle for PoolHandle<M> {
    fn set_max_idle_time(&self, idle: Duration) {
        *self.max_idle.lock() = Some(idle);
    }

    async fn close(&self) -> Result<(), BoxError> {
        self.pool.close();
        Ok(())
    }
}

/// Builds a [`PoolHandle`] per key from a manager constructor
///
/// `build_manager` receives the cache's driver identity and the key, and
/// returns the [`Manager`] that knows how to open connections for it.
pub struct PoolFactory<M, B> {
    build_manager: B,
    options: PoolOptions,
    _manager: PhantomData<fn() -> M>,
}

impl<M, B> fmt::Debug for PoolFactory<M, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolFactory")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<M, B> PoolFactory<M, B>
where
    B: Fn(&str, &str) -> Result<M, BoxError>,
{
    pub fn new(build_manager: B) -> Self {
        Self {
            build_manager,
            options: PoolOptions::default(),
            _manager: PhantomData,
        }
    }

    #[must_use]
    pub const fn with_options(mut self, options: PoolOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl<M, B> HandleFactory for PoolFactory<M, B>
where
    M: Manager + 'static,
    B: Fn(&str, &str) -> Result<M, BoxError> + Send + Sync + 'static,
{
    type Handle = PoolHandle<M>;

    async fn open(&self, driver: &str, key: &str) -> Result<PoolHandle<M>, BoxError> {
        let manager = (self.build_manager)(driver, key)?;
        let pool = Pool::builder(manager)
            .max_size(self.options.max_size)
            .wait_timeout(self.options.wait_timeout)
            .create_timeout(self.options.create_timeout)
            .recycle_timeout(self.options.recycle_timeout)
            .runtime(Runtime::Tokio1)
            .build()?;
        Ok(PoolHandle::new(pool))
    }
}
