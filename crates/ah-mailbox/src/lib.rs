//! Inbox / Mailbox Service (C9): spec.md §4.9.

use std::path::Path;
use std::time::Duration;

use ah_config::AppConfig;
use ah_core::{now, HubError, MessagePriority, Result};
use ah_validate::validate_short_session_id;
use serde::Serialize;
use serde_json::Value;

const MAX_CONTENT_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct InboxMessage {
    pub from: String,
    pub priority: MessagePriority,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct CheckInboxResult {
    pub messages: Vec<InboxMessage>,
    pub truncated: bool,
}

fn inbox_path(root: &Path, short_id: &str) -> std::path::PathBuf {
    ah_config::inbox_dir(root).join(format!("{short_id}.jsonl"))
}

fn rate_path(root: &Path, short_id: &str) -> std::path::PathBuf {
    ah_config::terminals_dir(root)
        .join(".locks")
        .join(format!("rate-{short_id}.json"))
}

/// Drain `session_id`'s inbox crash-safely (rename, read, delete; falling
/// back to read-in-place if rename fails), applying the bounded-read caps
/// and clearing `has_messages` on the session record.
pub fn check_inbox(root: &Path, config: &AppConfig, session_id: &str) -> Result<CheckInboxResult> {
    let short_id = validate_short_session_id(session_id)?;
    let path = inbox_path(root, &short_id);
    let draining = path.with_extension("jsonl.draining");

    let bounded = match std::fs::rename(&path, &draining) {
        Ok(()) => {
            let result = ah_jsonl::read_bounded(&draining, config.mailbox_max_bytes, config.mailbox_max_lines);
            let _ = std::fs::remove_file(&draining);
            result
        }
        Err(_) => ah_jsonl::read_bounded(&path, config.mailbox_max_bytes, config.mailbox_max_lines),
    };

    if let Some(mut record) = ah_session::load_session(root, &short_id) {
        record.has_messages = false;
        ah_session::save_session(root, &record)?;
    }

    Ok(CheckInboxResult {
        messages: bounded.items.iter().filter_map(parse_message).collect(),
        truncated: bounded.truncated,
    })
}

fn parse_message(value: &Value) -> Option<InboxMessage> {
    Some(InboxMessage {
        from: value.get("from")?.as_str()?.to_string(),
        priority: if value.get("priority").and_then(Value::as_str) == Some("urgent") {
            MessagePriority::Urgent
        } else {
            MessagePriority::Normal
        },
        content: value.get("content")?.as_str()?.to_string(),
    })
}

/// Send a single message, enforcing the 8 KiB content cap and the §4.9.1
/// rate limit. Fails if the target session doesn't exist unless
/// `allow_offline` is set.
pub fn send_message(
    root: &Path,
    config: &AppConfig,
    from: &str,
    to: &str,
    content: &str,
    priority: MessagePriority,
    allow_offline: bool,
) -> Result<()> {
    let to_short = validate_short_session_id(to)?;
    validate_content(content)?;
    enforce_rate_limit(root, config, &to_short)?;

    let target_exists = ah_session::load_session(root, &to_short).is_some();
    if !target_exists && !allow_offline {
        return Err(HubError::not_found(format!("session {to_short} is not registered")));
    }

    append_message(root, &to_short, from, priority, content)?;
    Ok(())
}

/// Send `content` to every non-closed session, each as an independent
/// append prefixed with `[BROADCAST] `.
pub fn broadcast(root: &Path, config: &AppConfig, from: &str, content: &str, priority: MessagePriority) -> Result<usize> {
    validate_content(content)?;
    let body = format!("[BROADCAST] {content}");

    let mut delivered = 0;
    for session in ah_session::list_sessions(root) {
        if session.status.is_closed() {
            continue;
        }
        if enforce_rate_limit(root, config, &session.session).is_ok() {
            if append_message(root, &session.session, from, priority, &body).is_ok() {
                delivered += 1;
            }
        }
    }
    Ok(delivered)
}

/// As [`send_message`], additionally invoking the Wake Service if the
/// target is stale/idle or its `last_active` is older than 120 s.
pub fn send_directive(
    root: &Path,
    config: &AppConfig,
    from: &str,
    to: &str,
    content: &str,
    priority: MessagePriority,
) -> Result<()> {
    send_message(root, config, from, to, content, priority, false)?;

    let to_short = validate_short_session_id(to)?;
    if let Some(record) = ah_session::load_session(root, &to_short) {
        let status = ah_session::derive_status(&record, now());
        let age = (now() - record.last_active).num_seconds();
        let needs_wake = matches!(status, ah_core::SessionStatus::Stale | ah_core::SessionStatus::Idle) || age > 120;
        if needs_wake {
            ah_wake::wake_session(root, config, &to_short, content)?;
        }
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<()> {
    if content.is_empty() {
        return Err(HubError::validation("message content must not be empty"));
    }
    if content.len() > MAX_CONTENT_BYTES {
        return Err(HubError::validation(format!(
            "message content exceeds {MAX_CONTENT_BYTES} bytes"
        )));
    }
    Ok(())
}

fn enforce_rate_limit(root: &Path, config: &AppConfig, to_short: &str) -> Result<()> {
    let ok = ah_fs::acquire_rate_limit(
        &rate_path(root, to_short),
        config.rate_limit_per_minute,
        Duration::from_secs(config.rate_lock_budget_secs),
        Duration::from_secs(config.rate_lock_stale_secs),
    )?;
    if ok {
        Ok(())
    } else {
        Err(HubError::RateLimited)
    }
}

fn append_message(root: &Path, to_short: &str, from: &str, priority: MessagePriority, content: &str) -> Result<()> {
    let line = serde_json::json!({
        "ts": now(),
        "from": from,
        "priority": priority,
        "content": content,
    });
    ah_jsonl::append_line(&inbox_path(root, to_short), &line)?;

    if let Some(mut record) = ah_session::load_session(root, to_short) {
        record.has_messages = true;
        ah_session::save_session(root, &record)?;
    }
    Ok(())
}
