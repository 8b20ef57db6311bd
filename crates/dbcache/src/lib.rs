//! Keyed cache of expensive connection handles
//!
//! [`ConnectionCache`] maps a logical key (typically a data-source string)
//! to one shared, long-lived handle. Handles are created on first use,
//! evicted by a background sweeper after sitting idle, and closed together
//! on [`ConnectionCache::shutdown`].
//!
//! The cache is agnostic to what a handle is: implement [`HandleFactory`]
//! and [`Handle`], or use [`PoolFactory`] to get one [`deadpool`] pool per
//! key.
//!
//! ```no_run
//! # use dbcache::{ConnectionCache, HandleFactory};
//! # async fn run<F: HandleFactory>(factory: F) -> dbcache::CacheResult<()> {
//! let cache = ConnectionCache::new("postgres", factory);
//! let handle = cache.get("postgres://app@db.internal/orders").await?;
//! // ... use handle ...
//! # drop(handle);
//! cache.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod config;
mod error;
mod handle;
mod key;
pub mod observability;
pub mod pool;
mod stats;
mod sweeper;

pub use cache::{CacheState, ConnectionCache};
pub use config::CacheConfig;
pub use error::{BoxError, CacheError, CacheResult};
pub use handle::{Handle, HandleFactory};
pub use key::RedactedKey;
pub use pool::{PoolFactory, PoolHandle, PoolOptions};
pub use stats::{CacheStats, EvictionReason};
