//! Session end hook (spec.md §4.7).

use std::path::Path;

use ah_core::{now, Result, SessionStatus};
use ah_validate::validate_short_session_id;

use crate::payload::HookPayload;

/// Mark a session closed, preserving every other field, and drop its
/// per-session guard state (the heartbeat cooldown marker).
pub fn end(payload: &HookPayload, root: &Path) -> Result<()> {
    let short_id = validate_short_session_id(&payload.session_id)?;

    if let Some(mut record) = ah_session::load_session(root, &short_id) {
        record.status = SessionStatus::Closed;
        record.ended = Some(now());
        ah_session::save_session(root, &record)?;
    }

    let cooldown_path = ah_config::terminals_dir(root)
        .join(".locks")
        .join(format!("heartbeat-{short_id}.lock"));
    let _ = std::fs::remove_file(cooldown_path);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ToolInput;
    use ah_session::SessionRecord;

    fn payload(session_id: &str) -> HookPayload {
        HookPayload {
            session_id: session_id.to_string(),
            cwd: "/tmp/proj".to_string(),
            tool_name: "Stop".to_string(),
            tool_input: ToolInput::default(),
            source: None,
            transcript_path: None,
        }
    }

    #[test]
    fn end_closes_existing_session_and_preserves_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let mut record = SessionRecord::new("abcd1234", "proj", "/tmp/proj");
        record.branch = Some("main".to_string());
        ah_session::save_session(tmp.path(), &record).unwrap();

        end(&payload("abcd1234longid"), tmp.path()).unwrap();

        let updated = ah_session::load_session(tmp.path(), "abcd1234").unwrap();
        assert_eq!(updated.status, SessionStatus::Closed);
        assert!(updated.ended.is_some());
        assert_eq!(updated.branch.as_deref(), Some("main"));
    }

    #[test]
    fn end_is_a_no_op_when_session_missing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(end(&payload("abcd1234longid"), tmp.path()).is_ok());
    }

    #[test]
    fn end_removes_heartbeat_cooldown_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let record = SessionRecord::new("abcd1234", "proj", "/tmp/proj");
        ah_session::save_session(tmp.path(), &record).unwrap();

        let cooldown_path = ah_config::terminals_dir(tmp.path())
            .join(".locks")
            .join("heartbeat-abcd1234.lock");
        std::fs::create_dir_all(cooldown_path.parent().unwrap()).unwrap();
        std::fs::write(&cooldown_path, b"1").unwrap();

        end(&payload("abcd1234longid"), tmp.path()).unwrap();
        assert!(!cooldown_path.exists());
    }
}
