//! Conflict advisor hook: the fast pre-Edit/Write path (spec.md §4.7). Never
//! blocks — it only warns to stderr. The full detector (C10) runs on
//! explicit request.

use std::path::Path;

use ah_core::{Result, SessionStatus};
use ah_validate::validate_short_session_id;

use crate::payload::HookPayload;

pub fn conflict_advisor(payload: &HookPayload, root: &Path) -> Result<()> {
    let short_id = validate_short_session_id(&payload.session_id)?;
    let Some(file_path) = &payload.tool_input.file_path else {
        return Ok(());
    };

    for other in ah_session::list_sessions(root) {
        if other.session == short_id || other.status == SessionStatus::Closed {
            continue;
        }
        if other.files_touched.iter().any(|f| f == file_path) {
            eprintln!(
                "warning: {file_path} was also touched by session {} ({})",
                other.session, other.project
            );
        }
    }

    Ok(())
}
