//! Handle and factory traits
//!
//! The cache never looks inside a handle. It needs a way to build one for a
//! key, a way to cap how long the handle's own connections may sit idle, and
//! a way to close it.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BoxError;

/// An expensive, shareable resource owned by the cache
///
/// Callers receive `Arc<Self>` and may hold it past eviction; a handle that
/// has been closed should fail (or reconnect) on use rather than panic.
#[async_trait]
pub trait Handle: Send + Sync + 'static {
    /// Cap how long the handle keeps unused underlying connections.
    ///
    /// Called once, before the handle is stored or returned.
    fn set_max_idle_time(&self, idle: Duration);

    /// Release the underlying resource. Called at most once by the cache.
    async fn close(&self) -> Result<(), BoxError>;
}

/// Builds handles for keys
#[async_trait]
pub trait HandleFactory: Send + Sync + 'static {
    type Handle: Handle;

    /// Open a new handle for `key` using the cache's driver identity.
    async fn open(&self, driver: &str, key: &str) -> Result<Self::Handle, BoxError>;
}
