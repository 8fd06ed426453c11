//! Eviction of idle per-IP rate-limit buckets.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::middleware::rate_limit::IpRateLimiter;

const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Buckets idle for longer than this are dropped.
const MAX_IDLE: Duration = Duration::from_secs(60 * 60);

pub async fn run(limiter: Arc<IpRateLimiter>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Rate limiter sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let evicted = limiter.evict_idle(MAX_IDLE);
                tracing::debug!(evicted, tracked = limiter.tracked(), "Rate limiter sweep");
            }
        }
    }
}
