//! Sliding-window rate limiter shared by the mailbox and wake services
//! (spec.md §4.9.1): a JSON array of wall-clock timestamps kept in a single
//! file per recipient, pruned and rewritten under a lock on every attempt.

use std::path::Path;
use std::time::Duration;

use ah_core::Result;
use chrono::{DateTime, Utc};

const WINDOW_SECS: i64 = 60;

/// Attempt to record one event against `path`'s sliding window. Returns
/// `true` and persists the updated window if the count after pruning stays
/// under `cap`; returns `false` (window left untouched) otherwise.
pub fn acquire(path: &Path, cap: u32, lock_budget: Duration, lock_stale: Duration) -> Result<bool> {
    let lock_path = path.with_extension("json.lock");
    let _guard = crate::lock::acquire(&lock_path, lock_budget, lock_stale, Duration::from_millis(20))?;

    let now = Utc::now();
    let mut timestamps = read_window(path);
    timestamps.retain(|ts| (now - *ts).num_seconds() < WINDOW_SECS);

    if timestamps.len() as u32 >= cap {
        return Ok(false);
    }

    timestamps.push(now);
    let raw = serde_json::to_vec(&timestamps).expect("Vec<DateTime> always serializes");
    crate::atomic_write(path, &raw)?;
    Ok(true)
}

fn read_window(path: &Path) -> Vec<DateTime<Utc>> {
    std::fs::read(path)
        .ok()
        .and_then(|raw| serde_json::from_slice(&raw).ok())
        .unwrap_or_default()
}
