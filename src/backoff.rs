//! Retry delay shared by the API client and the audio downloader.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Most jitter added on top of the exponential delay, in milliseconds.
const JITTER_MS: u64 = 100;

/// `base * 2^attempt` plus a little jitter, never above `max_ms`.
pub(crate) fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exp = base_ms.saturating_mul(2u64.saturating_pow(attempt.min(6)));
    // Jitter from the clock; no RNG dependency.
    let jitter = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
        % (JITTER_MS + 1);
    Duration::from_millis(exp.min(max_ms).saturating_add(jitter).min(max_ms))
}

pub(crate) async fn sleep_backoff(attempt: u32, base_ms: u64, max_ms: u64) {
    tokio::time::sleep(backoff_delay(attempt, base_ms, max_ms)).await;
}
