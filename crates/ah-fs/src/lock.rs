//! Cross-platform `O_EXCL` lock-file primitive with staleness recovery and
//! bounded retry (spec.md §4.2).
//!
//! Unlike an `flock(2)`-based guard, an `O_EXCL` create-or-fail lets any
//! process recognize contention purely from the filesystem, which is what
//! lets the heartbeat hook, the rate limiter, and the coordinator agree on
//! lock state despite never sharing memory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use ah_core::{HubError, Result};

/// A held lock. Unlinks its lock file on drop, swallowing not-exist errors
/// (another process may have reclaimed it as stale in a pathological race;
/// that is an accepted, documented risk of advisory file locking).
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock");
            }
        }
    }
}

/// Acquire an exclusive lock at `lock_path`, retrying until `timeout`
/// elapses. A lock older than `stale_ttl` is considered abandoned and is
/// unlinked before the next attempt.
pub fn acquire(
    lock_path: &Path,
    timeout: Duration,
    stale_ttl: Duration,
    retry_delay: Duration,
) -> Result<FileLock> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let deadline = Instant::now() + timeout;
    loop {
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(_file) => {
                crate::perms::harden_file(lock_path).ok();
                return Ok(FileLock {
                    path: lock_path.to_path_buf(),
                });
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                reap_if_stale(lock_path, stale_ttl);
                if Instant::now() >= deadline {
                    return Err(HubError::conflict(format!(
                        "timed out acquiring lock {}",
                        lock_path.display()
                    )));
                }
                std::thread::sleep(retry_delay.min(deadline.saturating_duration_since(Instant::now())));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Best-effort non-blocking attempt: a single `O_EXCL` create, no retry.
/// Used by callers (heartbeat cooldown, rate limiter) that want to degrade
/// gracefully on contention rather than wait.
pub fn try_acquire(lock_path: &Path, stale_ttl: Duration) -> Option<FileLock> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
    {
        Ok(_) => {
            crate::perms::harden_file(lock_path).ok();
            Some(FileLock {
                path: lock_path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            reap_if_stale(lock_path, stale_ttl);
            None
        }
        Err(_) => None,
    }
}

/// Returns whether a lock currently exists and is younger than `stale_ttl`
/// (i.e. is presently held by a live-enough owner). Used by callers such as
/// the heartbeat that want a cheap "cooldown still active" check without
/// taking the lock.
pub fn is_fresh(lock_path: &Path, cooldown: Duration) -> bool {
    match std::fs::metadata(lock_path) {
        Ok(meta) => age_of(&meta).map(|age| age < cooldown).unwrap_or(false),
        Err(_) => false,
    }
}

/// A best-effort cooldown throttle, distinct from mutual-exclusion locking:
/// the file's mtime marks "last time this cooldown fired". Returns `true`
/// (and refreshes the marker) if the cooldown has elapsed or the marker
/// never existed; returns `false` without touching anything if the
/// cooldown is still active. Used by the heartbeat hook's per-session
/// cooldown and the global stale-check cooldown (spec.md §4.2, §4.7).
pub fn cooldown_gate(path: &Path, cooldown: Duration) -> Result<bool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Ok(meta) = std::fs::metadata(path) {
        if let Some(age) = age_of(&meta) {
            if age < cooldown {
                return Ok(false);
            }
        }
    }
    std::fs::write(path, std::process::id().to_string())?;
    crate::perms::harden_file(path).ok();
    Ok(true)
}

fn reap_if_stale(lock_path: &Path, stale_ttl: Duration) {
    if let Ok(meta) = std::fs::metadata(lock_path) {
        if age_of(&meta).map(|age| age > stale_ttl).unwrap_or(false) {
            let _ = std::fs::remove_file(lock_path);
        }
    }
}

fn age_of(meta: &std::fs::Metadata) -> Option<Duration> {
    meta.modified().ok().and_then(|m| SystemTime::now().duration_since(m).ok())
}
