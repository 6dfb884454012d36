//! Session Store (C8): reads/writes `terminals/session-<sid8>.json`,
//! classifies derived status, and appends to the `sessions.jsonl` audit
//! log.

use std::path::{Path, PathBuf};

use ah_core::{Result, SessionStatus};
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::record::SessionRecord;

const ACTIVE_AGE_SECS: i64 = 180;
const IDLE_AGE_SECS: i64 = 600;
const SESSIONS_LOG_TRUNCATE_THRESHOLD: usize = 200;
const SESSIONS_LOG_TRUNCATE_KEEP: usize = 150;

pub fn session_path(root: &Path, short_id: &str) -> PathBuf {
    ah_config::terminals_dir(root).join(format!("session-{short_id}.json"))
}

pub fn sessions_log_path(root: &Path) -> PathBuf {
    ah_config::terminals_dir(root).join("sessions.jsonl")
}

/// Read a single session record. Per spec.md §7, an unreadable/malformed
/// file is treated as "no record", not an error.
pub fn load_session(root: &Path, short_id: &str) -> Option<SessionRecord> {
    let path = session_path(root, short_id);
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Fully rewrite a session record atomically (I7).
pub fn save_session(root: &Path, record: &SessionRecord) -> Result<()> {
    ah_fs::ensure_dir(&ah_config::terminals_dir(root), false).ok();
    let path = session_path(root, &record.session);
    let json = serde_json::to_vec_pretty(record).expect("SessionRecord always serializes");
    ah_fs::atomic_write(&path, &json)
}

/// List every session record under `<root>/terminals/`, skipping any file
/// that fails to parse.
pub fn list_sessions(root: &Path) -> Vec<SessionRecord> {
    let dir = ah_config::terminals_dir(root);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut sessions = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("session-") || !name.ends_with(".json") {
            continue;
        }
        if let Ok(raw) = std::fs::read_to_string(entry.path()) {
            if let Ok(record) = serde_json::from_str::<SessionRecord>(&raw) {
                sessions.push(record);
            }
        }
    }
    sessions
}

/// Derive the authoritative display status from persisted status + clock
/// (spec.md §4.8). `closed`/`stale` are sticky overrides; otherwise status
/// is purely a function of `last_active` age.
pub fn derive_status(record: &SessionRecord, now: DateTime<Utc>) -> SessionStatus {
    if record.status.is_closed() {
        return SessionStatus::Closed;
    }
    if matches!(record.status, SessionStatus::Stale) {
        return SessionStatus::Stale;
    }
    let age = (now - record.last_active).num_seconds();
    if age < ACTIVE_AGE_SECS {
        SessionStatus::Active
    } else if age < IDLE_AGE_SECS {
        SessionStatus::Idle
    } else {
        SessionStatus::Stale
    }
}

/// Append a `{event, session, ts}` line to `sessions.jsonl`, truncating the
/// log to its most recent 150 lines once it exceeds 200 (spec.md §4.7
/// register hook).
pub fn append_session_event(root: &Path, session: &str, event: &str) -> Result<()> {
    let path = sessions_log_path(root);
    ah_jsonl::append_line(
        &path,
        &json!({"event": event, "session": session, "ts": Utc::now()}),
    )?;
    ah_jsonl::truncate_tail(&path, SESSIONS_LOG_TRUNCATE_THRESHOLD, SESSIONS_LOG_TRUNCATE_KEEP)?;
    Ok(())
}
