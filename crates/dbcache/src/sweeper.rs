//! Background idle sweeper

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::cache::Shared;
use crate::handle::HandleFactory;

/// Spawn the sweep loop for `shared`.
///
/// The first sweep fires one interval after spawning. The loop exits when
/// `shutdown` is cancelled; a sweep already in progress runs to completion
/// first.
pub(crate) fn spawn<F: HandleFactory>(
    shared: Arc<Shared<F>>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let period = shared.config.sweep_interval;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    shared.sweep().await;
                }
                () = shutdown.cancelled() => {
                    tracing::debug!(driver = %shared.driver, "Sweeper shutting down");
                    break;
                }
            }
        }
    })
}
