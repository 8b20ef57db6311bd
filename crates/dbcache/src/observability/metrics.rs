//! Prometheus metrics for the connection cache

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::{CacheError, CacheResult};
use crate::stats::EvictionReason;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const METRIC_HITS: &str = "dbcache_hits_total";
const METRIC_MISSES: &str = "dbcache_misses_total";
const METRIC_CREATION_ERRORS: &str = "dbcache_creation_errors_total";
const METRIC_EVICTIONS: &str = "dbcache_evictions_total";
const METRIC_CLOSE_ERRORS: &str = "dbcache_close_errors_total";
const METRIC_ENTRIES: &str = "dbcache_entries";

/// Initialize Prometheus metrics recorder.
pub fn init_metrics() -> CacheResult<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| CacheError::Config(format!("Failed to install metrics recorder: {e}")))?;

    PROMETHEUS_HANDLE.set(handle).ok();

    register_metrics();
    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

fn register_metrics() {
    describe_counter!(METRIC_HITS, "Lookups served by an existing handle");
    describe_counter!(METRIC_MISSES, "Lookups that created a new handle");
    describe_counter!(METRIC_CREATION_ERRORS, "Failed handle creations");
    describe_counter!(METRIC_EVICTIONS, "Entries removed from the cache");
    describe_counter!(METRIC_CLOSE_ERRORS, "Failed handle closes");
    describe_gauge!(METRIC_ENTRIES, "Current number of cached handles");
}

/// Render metrics in Prometheus text format.
#[must_use]
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

pub fn record_hit(driver: &str) {
    counter!(METRIC_HITS, "driver" => driver.to_owned()).increment(1);
}

pub fn record_miss(driver: &str) {
    counter!(METRIC_MISSES, "driver" => driver.to_owned()).increment(1);
}

pub fn record_creation_error(driver: &str) {
    counter!(METRIC_CREATION_ERRORS, "driver" => driver.to_owned()).increment(1);
}

pub fn record_evictions(driver: &str, reason: EvictionReason, count: u64) {
    counter!(
        METRIC_EVICTIONS,
        "driver" => driver.to_owned(),
        "reason" => reason.as_str(),
    )
    .increment(count);
}

pub fn record_close_error(driver: &str) {
    counter!(METRIC_CLOSE_ERRORS, "driver" => driver.to_owned()).increment(1);
}

/// Update the entry count gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_entry_count(driver: &str, count: usize) {
    gauge!(METRIC_ENTRIES, "driver" => driver.to_owned()).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_metrics_without_init() {
        let output = render_metrics();
        assert!(output.is_empty());
    }
}
