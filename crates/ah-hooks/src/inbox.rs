//! Inbox surfacing hook (pre tool use) — spec.md §4.7's "hardest hook".
//!
//! Two jobs, in order: (1) deliver any worker-completion notifications that
//! have not yet been routed, (2) crash-safely drain this session's own
//! inbox and return its content for display.

use std::path::Path;
use std::time::Duration;

use ah_core::Result;
use ah_validate::validate_short_session_id;
use serde::Deserialize;
use serde_json::Value;

use crate::payload::HookPayload;

const RESULT_TAIL_BYTES: usize = 2000;
const ROUTE_LOCK_STALE: Duration = Duration::from_secs(300);

#[derive(Debug, Default, Deserialize)]
struct WorkerMeta {
    #[serde(default)]
    notify_session_id: Option<String>,
    #[serde(default)]
    task_id: Option<String>,
}

/// Run both phases and return the lines that should be printed to the
/// host agent (already stripped of control characters).
pub fn surface_inbox(payload: &HookPayload, root: &Path) -> Result<Vec<String>> {
    let short_id = validate_short_session_id(&payload.session_id)?;

    deliver_worker_completions(root);
    Ok(drain_inbox(root, &short_id))
}

/// Step 1: for each completed, unreported worker, append a notification to
/// its target session's inbox, guarded by a per-task route lock so two
/// concurrent hook invocations don't double-deliver.
fn deliver_worker_completions(root: &Path) {
    let results_dir = ah_config::results_dir(root);
    let Ok(entries) = std::fs::read_dir(&results_dir) else {
        return;
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(task) = name.strip_suffix(".meta.json.done") else {
            continue;
        };
        let task = task.to_string();

        let reported_path = results_dir.join(format!("{task}.reported"));
        if reported_path.exists() {
            continue;
        }

        let lock_path = results_dir.join(".locks").join(format!("{task}.route"));
        let Some(_lock) = ah_fs::try_acquire_lock(&lock_path, ROUTE_LOCK_STALE) else {
            continue;
        };
        // Re-check under the lock: another invocation may have just reported it.
        if reported_path.exists() {
            continue;
        }

        if let Err(e) = route_one_completion(root, &results_dir, &task) {
            tracing::warn!(task = %task, error = %e, "failed to route worker completion");
            continue;
        }
        let _ = std::fs::write(&reported_path, b"1");
    }
}

fn route_one_completion(root: &Path, results_dir: &Path, task: &str) -> Result<()> {
    let meta_path = results_dir.join(format!("{task}.meta.json.done"));
    let raw = std::fs::read_to_string(&meta_path)?;
    let meta: WorkerMeta = serde_json::from_str(&raw).unwrap_or_default();

    let Some(target) = meta.notify_session_id else {
        return Ok(());
    };

    let output_path = results_dir.join(format!("{task}.txt"));
    let tail = tail_of_file(&output_path, RESULT_TAIL_BYTES);
    let content = format!(
        "[WORKER COMPLETED] {} {}",
        meta.task_id.as_deref().unwrap_or(task),
        strip_control_chars(&tail)
    );

    let line = serde_json::json!({
        "ts": ah_core::now(),
        "from": "worker-supervisor",
        "priority": "normal",
        "content": content,
    });
    let inbox_path = ah_config::inbox_dir(root).join(format!("{target}.jsonl"));
    ah_jsonl::append_line(&inbox_path, &line)?;

    if let Some(mut record) = ah_session::load_session(root, &target) {
        record.has_messages = true;
        ah_session::save_session(root, &record)?;
    }
    Ok(())
}

fn tail_of_file(path: &Path, max_bytes: usize) -> String {
    let Ok(bytes) = std::fs::read(path) else {
        return String::new();
    };
    let start = bytes.len().saturating_sub(max_bytes);
    String::from_utf8_lossy(&bytes[start..]).to_string()
}

/// Step 2: rename the inbox aside, read it, delete the temp file. If the
/// rename fails (e.g. file absent), fall back to reading in place.
fn drain_inbox(root: &Path, short_id: &str) -> Vec<String> {
    let inbox_path = ah_config::inbox_dir(root).join(format!("{short_id}.jsonl"));
    let drain_path = inbox_path.with_extension("jsonl.draining");

    let raw = match std::fs::rename(&inbox_path, &drain_path) {
        Ok(()) => {
            let content = std::fs::read_to_string(&drain_path).unwrap_or_default();
            let _ = std::fs::remove_file(&drain_path);
            content
        }
        Err(_) => std::fs::read_to_string(&inbox_path).unwrap_or_default(),
    };

    if raw.is_empty() {
        return Vec::new();
    }

    if let Some(mut record) = ah_session::load_session(root, short_id) {
        record.has_messages = false;
        let _ = ah_session::save_session(root, &record);
    }

    raw.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .map(|v| {
            let content = v.get("content").and_then(Value::as_str).unwrap_or("");
            strip_control_chars(content)
        })
        .collect()
}

/// Strip C0 (0x00-0x1F, excluding `\n`/`\t`) and C1 (0x7F, 0x80-0x9F)
/// control characters so a malicious inbox message can't rewrite the
/// host terminal.
fn strip_control_chars(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            let code = c as u32;
            let is_c0 = code < 0x20 && c != '\n' && c != '\t';
            let is_c1 = code == 0x7F || (0x80..=0x9F).contains(&code);
            !is_c0 && !is_c1
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ToolInput;
    use serde_json::json;

    fn payload(session_id: &str) -> HookPayload {
        HookPayload {
            session_id: session_id.to_string(),
            cwd: "/tmp/proj".to_string(),
            tool_name: "Edit".to_string(),
            tool_input: ToolInput::default(),
            source: None,
            transcript_path: None,
        }
    }

    #[test]
    fn strip_control_chars_keeps_newlines_drops_escapes() {
        let dirty = "hello\x1b[31mworld\x07\n";
        assert_eq!(strip_control_chars(dirty), "hello[31mworld\n");
    }

    #[test]
    fn surface_inbox_returns_empty_when_no_messages() {
        let tmp = tempfile::tempdir().unwrap();
        let messages = surface_inbox(&payload("abcd1234longid"), tmp.path()).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn surface_inbox_drains_existing_messages() {
        let tmp = tempfile::tempdir().unwrap();
        let inbox_path = ah_config::inbox_dir(tmp.path()).join("abcd1234.jsonl");
        ah_jsonl::append_line(
            &inbox_path,
            &json!({"ts": "2026-01-01T00:00:00Z", "from": "other", "priority": "normal", "content": "hi there"}),
        )
        .unwrap();

        let messages = surface_inbox(&payload("abcd1234longid"), tmp.path()).unwrap();
        assert_eq!(messages, vec!["hi there".to_string()]);
        assert!(!inbox_path.exists());
    }

    #[test]
    fn surface_inbox_is_idempotent_across_two_calls() {
        let tmp = tempfile::tempdir().unwrap();
        let inbox_path = ah_config::inbox_dir(tmp.path()).join("abcd1234.jsonl");
        ah_jsonl::append_line(
            &inbox_path,
            &json!({"ts": "2026-01-01T00:00:00Z", "from": "other", "priority": "normal", "content": "hi"}),
        )
        .unwrap();

        let first = surface_inbox(&payload("abcd1234longid"), tmp.path()).unwrap();
        let second = surface_inbox(&payload("abcd1234longid"), tmp.path()).unwrap();
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn deliver_worker_completions_routes_and_marks_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let results_dir = ah_config::results_dir(tmp.path());
        std::fs::create_dir_all(&results_dir).unwrap();
        std::fs::write(
            results_dir.join("task-1.meta.json.done"),
            serde_json::to_vec(&json!({"notify_session_id": "abcd1234", "task_id": "task-1"})).unwrap(),
        )
        .unwrap();
        std::fs::write(results_dir.join("task-1.txt"), b"worker finished successfully").unwrap();

        surface_inbox(&payload("zzzz9999longid"), tmp.path()).unwrap();

        assert!(results_dir.join("task-1.reported").exists());
        let messages = surface_inbox(&payload("abcd1234longid"), tmp.path()).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("WORKER COMPLETED"));
    }
}
