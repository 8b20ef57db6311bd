//! File and environment configuration feeding a live cache

mod common;

use std::io::Write;
use std::time::Duration;

use common::{DRIVER, FakeDriver};
use dbcache::config::{load_from_env, load_from_file};
use dbcache::{CacheConfig, CacheError, ConnectionCache};
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test(start_paused = true)]
async fn file_config_drives_sweeper() {
    let file = write_config(
        r"
[cache]
idle_threshold_secs = 4
sweep_interval_secs = 2
",
    );
    let config = load_from_file(file.path(), CacheConfig::default()).unwrap();
    let cache = ConnectionCache::with_config(DRIVER, FakeDriver::default(), config).unwrap();

    let first = cache.get("a").await.unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(first.closes(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(first.closes(), 1);

    cache.shutdown().await.unwrap();
}

#[tokio::test]
async fn zero_interval_from_file_is_rejected() {
    let file = write_config(
        r"
[cache]
sweep_interval_secs = 0
",
    );
    let config = load_from_file(file.path(), CacheConfig::default()).unwrap();

    let result = ConnectionCache::with_config(DRIVER, FakeDriver::default(), config);
    assert!(matches!(result, Err(CacheError::Config(_))));
}

#[test]
fn env_overrides_file() {
    let file = write_config(
        r"
[cache]
shutdown_timeout_secs = 9
idle_threshold_secs = 100
",
    );
    let from_file = load_from_file(file.path(), CacheConfig::default()).unwrap();

    // SAFETY: this is the only test in this binary touching the environment
    unsafe { std::env::set_var("DBCACHE_SHUTDOWN_TIMEOUT_SECS", "3") };
    let config = load_from_env(from_file);
    unsafe { std::env::remove_var("DBCACHE_SHUTDOWN_TIMEOUT_SECS") };

    assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
    assert_eq!(config.idle_threshold, Duration::from_secs(100));
}
