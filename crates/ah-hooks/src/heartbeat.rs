//! Heartbeat hook: fires once per tool call, after the tool has run
//! (spec.md §4.7).

use std::path::Path;
use std::time::Duration;

use ah_config::AppConfig;
use ah_core::{now, Result};
use ah_session::SessionRecord;
use ah_validate::validate_short_session_id;
use serde_json::json;

use crate::payload::HookPayload;
use crate::{plan, tty};

const ACTIVITY_LOG_TRUNCATE_THRESHOLD: usize = 600;
const ACTIVITY_LOG_TRUNCATE_KEEP: usize = 500;
const STALE_AGE_SECS: i64 = 3600;

fn activity_log_path(root: &Path) -> std::path::PathBuf {
    ah_config::terminals_dir(root).join("activity.jsonl")
}

fn locks_dir(root: &Path) -> std::path::PathBuf {
    ah_config::terminals_dir(root).join(".locks")
}

/// Run the heartbeat for one tool call. Never fails the host tool call:
/// any lock contention degrades to "activity line already written, skip
/// the rest" per spec.md §5.
pub fn heartbeat(payload: &HookPayload, root: &Path, config: &AppConfig) -> Result<()> {
    let short_id = validate_short_session_id(&payload.session_id)?;
    let when = now();

    append_activity_line(root, &short_id, payload, when)?;

    let cooldown_path = locks_dir(root).join(format!("heartbeat-{short_id}.lock"));
    let cooldown = Duration::from_secs(config.heartbeat_cooldown_secs);
    if !ah_fs::cooldown_gate(&cooldown_path, cooldown)? {
        return Ok(());
    }

    update_session_record(root, &short_id, payload, when);
    maybe_run_stale_sweep(root, config, when)?;

    Ok(())
}

fn append_activity_line(
    root: &Path,
    short_id: &str,
    payload: &HookPayload,
    when: chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    let lock_path = locks_dir(root).join("activity.lock");
    let _guard = ah_fs::acquire_lock(
        &lock_path,
        Duration::from_secs(2),
        Duration::from_secs(10),
        Duration::from_millis(20),
    )?;

    let file_path = payload.tool_input.file_path.as_deref();
    let file = file_path.map(ah_session::basename_of);

    ah_jsonl::append_line(
        &activity_log_path(root),
        &json!({
            "t": when,
            "session": short_id,
            "tool": payload.tool_name,
            "file": file,
            "file_path": file_path,
        }),
    )?;
    ah_jsonl::truncate_tail(
        &activity_log_path(root),
        ACTIVITY_LOG_TRUNCATE_THRESHOLD,
        ACTIVITY_LOG_TRUNCATE_KEEP,
    )?;
    Ok(())
}

fn update_session_record(
    root: &Path,
    short_id: &str,
    payload: &HookPayload,
    when: chrono::DateTime<chrono::Utc>,
) {
    let mut record = ah_session::load_session(root, short_id).unwrap_or_else(|| {
        let mut fallback = SessionRecord::new(short_id, "unknown", &payload.cwd);
        fallback.source = Some("heartbeat-fallback".to_string());
        fallback
    });

    record.record_tool_call(
        &payload.tool_name,
        payload.tool_input.file_path.as_deref(),
        when,
    );

    if let Some(detected_tty) = tty::controlling_tty() {
        record.tty = Some(detected_tty);
    }

    if let Some(file_path) = &payload.tool_input.file_path {
        if plan::is_plan_artifact(file_path) {
            record.plan_file = Some(file_path.clone());
        }
    }

    if let Err(e) = ah_session::save_session(root, &record) {
        tracing::warn!(session = %short_id, error = %e, "failed to persist heartbeat update");
    }
}

/// At most every `stale_check_cooldown_secs`, sweep all sessions and demote
/// any `active` record whose `last_active` is older than one hour to
/// `stale`.
fn maybe_run_stale_sweep(
    root: &Path,
    config: &AppConfig,
    when: chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    let lock_path = locks_dir(root).join("stale-check.lock");
    let cooldown = Duration::from_secs(config.stale_check_cooldown_secs);
    if !ah_fs::cooldown_gate(&lock_path, cooldown)? {
        return Ok(());
    }

    for mut record in ah_session::list_sessions(root) {
        if record.status == ah_core::SessionStatus::Active {
            let age = (when - record.last_active).num_seconds();
            if age > STALE_AGE_SECS {
                record.status = ah_core::SessionStatus::Stale;
                let _ = ah_session::save_session(root, &record);
            }
        }
    }
    Ok(())
}
