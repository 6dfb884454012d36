//! Register hook: session start (spec.md §4.7).

use std::path::Path;

use ah_core::Result;
use ah_session::SessionRecord;
use ah_validate::validate_short_session_id;

use crate::payload::HookPayload;
use crate::{git, tty};

/// Write a brand-new session record, append a `start` event, and return the
/// terminal title escape sequence the caller should write to its own TTY
/// (spec.md §6.5): `ESC]0;agent-<sid8>BEL`.
pub fn register(payload: &HookPayload, root: &Path) -> Result<String> {
    let short_id = validate_short_session_id(&payload.session_id)?;
    let cwd = Path::new(&payload.cwd);
    let project = cwd
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| payload.cwd.clone());

    let mut record = SessionRecord::new(short_id.as_str(), project, payload.cwd.as_str());
    record.branch = git::current_branch(cwd);
    record.tty = tty::controlling_tty();
    record.transcript = payload.transcript_path.clone();

    ah_session::save_session(root, &record)?;
    ah_session::append_session_event(root, &short_id, "start")?;

    Ok(format!("\x1b]0;agent-{short_id}\x07"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ToolInput;

    fn payload(session_id: &str, cwd: &str) -> HookPayload {
        HookPayload {
            session_id: session_id.to_string(),
            cwd: cwd.to_string(),
            tool_name: "Write".to_string(),
            tool_input: ToolInput::default(),
            source: None,
            transcript_path: None,
        }
    }

    #[test]
    fn register_writes_session_and_returns_title_escape() {
        let tmp = tempfile::tempdir().unwrap();
        let title = register(&payload("abcd1234longid", "/tmp/myproject"), tmp.path()).unwrap();
        assert_eq!(title, "\x1b]0;agent-abcd1234\x07");

        let record = ah_session::load_session(tmp.path(), "abcd1234").unwrap();
        assert_eq!(record.project, "myproject");
        assert_eq!(record.session, "abcd1234");
    }

    #[test]
    fn register_rejects_invalid_session_id() {
        let tmp = tempfile::tempdir().unwrap();
        let result = register(&payload("short", "/tmp"), tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn register_appends_start_event() {
        let tmp = tempfile::tempdir().unwrap();
        register(&payload("abcd1234longid", "/tmp/myproject"), tmp.path()).unwrap();
        let log = std::fs::read_to_string(ah_session::sessions_log_path(tmp.path())).unwrap();
        assert!(log.contains("\"event\":\"start\""));
    }
}
