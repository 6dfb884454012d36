//! Conflict Detector (C10): the full, on-demand overlap/recent-edit report
//! (spec.md §4.10). Distinct from the fast advisory path in `ah-hooks`.

use std::collections::HashSet;
use std::path::Path;

use ah_core::{now, HubError, Result};
use ah_validate::normalize_file_path;
use serde::Serialize;

const ACTIVITY_WINDOW_ENTRIES: usize = 100;
const ACTIVITY_WINDOW_MINUTES: i64 = 5;
const RECENT_EDIT_TOOLS: [&str; 2] = ["Edit", "Write"];

#[derive(Debug, Clone, Serialize)]
pub struct SessionOverlap {
    pub session: String,
    pub project: String,
    pub task: Option<String>,
    pub overlapping_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentEdit {
    pub session: String,
    pub tool: String,
    pub file: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConflictReport {
    pub overlaps: Vec<SessionOverlap>,
    pub recent_edits: Vec<RecentEdit>,
}

impl ConflictReport {
    pub fn is_clean(&self) -> bool {
        self.overlaps.is_empty() && self.recent_edits.is_empty()
    }
}

/// Detect conflicts between `files` (as the requesting session intends to
/// edit them) and every other non-closed session's known files and recent
/// activity. Always appends an audit line to `conflicts.jsonl`, even when
/// the result is clean.
pub fn detect_conflicts(root: &Path, session_id: &str, files: &[String]) -> Result<ConflictReport> {
    let short_id = ah_validate::validate_short_session_id(session_id)?;
    let requester = ah_session::load_session(root, &short_id)
        .ok_or_else(|| HubError::not_found(format!("no such session: {short_id}")))?;
    let requester_cwd = Path::new(&requester.cwd);

    let requested_norm: HashSet<String> = files
        .iter()
        .filter_map(|f| normalize_file_path(f, requester_cwd))
        .collect();

    let mut report = ConflictReport::default();

    for other in ah_session::list_sessions(root) {
        if other.session == short_id || other.status.is_closed() {
            continue;
        }
        let other_cwd = Path::new(&other.cwd);
        let mut candidates: Vec<&String> = other.files_touched.iter().collect();
        if let Some(current) = &other.current_files {
            candidates.extend(current.iter());
        }

        let overlapping: Vec<String> = candidates
            .into_iter()
            .filter_map(|f| normalize_file_path(f, other_cwd))
            .filter(|norm| requested_norm.contains(norm))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        if !overlapping.is_empty() {
            report.overlaps.push(SessionOverlap {
                session: other.session.clone(),
                project: other.project.clone(),
                task: other.current_task.clone(),
                overlapping_files: overlapping,
            });
        }
    }

    report.recent_edits = scan_recent_edits(root, &short_id, &requested_norm);

    append_audit(root, files, &report)?;
    Ok(report)
}

fn scan_recent_edits(root: &Path, requester: &str, requested_norm: &HashSet<String>) -> Vec<RecentEdit> {
    let activity_path = ah_config::terminals_dir(root).join("activity.jsonl");
    let now = now();

    ah_jsonl::read_tail(&activity_path, ACTIVITY_WINDOW_ENTRIES)
        .into_iter()
        .filter_map(|entry| {
            let session = entry.get("session")?.as_str()?;
            if session == requester {
                return None;
            }
            let tool = entry.get("tool")?.as_str()?;
            if !RECENT_EDIT_TOOLS.contains(&tool) {
                return None;
            }
            let t: chrono::DateTime<chrono::Utc> =
                serde_json::from_value(entry.get("t")?.clone()).ok()?;
            if (now - t).num_minutes() > ACTIVITY_WINDOW_MINUTES {
                return None;
            }
            let file_path = entry.get("file_path")?.as_str()?;
            let session_record = ah_session::load_session(root, session)?;
            let normalized = normalize_file_path(file_path, Path::new(&session_record.cwd))?;
            if !requested_norm.contains(&normalized) {
                return None;
            }
            Some(RecentEdit {
                session: session.to_string(),
                tool: tool.to_string(),
                file: normalized,
            })
        })
        .collect()
}

fn append_audit(root: &Path, files: &[String], report: &ConflictReport) -> Result<()> {
    let conflicts: Vec<&str> = report
        .overlaps
        .iter()
        .map(|o| o.session.as_str())
        .chain(report.recent_edits.iter().map(|e| e.session.as_str()))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let path = ah_config::terminals_dir(root).join("conflicts.jsonl");
    ah_jsonl::append_line(
        &path,
        &serde_json::json!({
            "ts": now(),
            "detector": "conflict-detector",
            "files": files,
            "conflicts": conflicts,
        }),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ah_session::SessionRecord;

    fn save(root: &Path, record: &SessionRecord) {
        ah_session::save_session(root, record).unwrap();
    }

    #[test]
    fn reports_no_conflicts_when_clean() {
        let tmp = tempfile::tempdir().unwrap();
        let requester = SessionRecord::new("abcd1234", "proj", "/tmp/proj");
        save(tmp.path(), &requester);

        let report = detect_conflicts(tmp.path(), "abcd1234longid", &["/tmp/proj/a.rs".to_string()]).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn detects_file_overlap_with_other_session() {
        let tmp = tempfile::tempdir().unwrap();
        let requester = SessionRecord::new("abcd1234", "proj", "/tmp/proj");
        save(tmp.path(), &requester);

        let mut other = SessionRecord::new("other001", "proj", "/tmp/proj");
        other.files_touched.push("/tmp/proj/shared.rs".to_string());
        save(tmp.path(), &other);

        let report = detect_conflicts(tmp.path(), "abcd1234longid", &["/tmp/proj/shared.rs".to_string()]).unwrap();
        assert_eq!(report.overlaps.len(), 1);
        assert_eq!(report.overlaps[0].session, "other001");
    }

    #[test]
    fn ignores_closed_sessions() {
        let tmp = tempfile::tempdir().unwrap();
        let requester = SessionRecord::new("abcd1234", "proj", "/tmp/proj");
        save(tmp.path(), &requester);

        let mut closed = SessionRecord::new("other001", "proj", "/tmp/proj");
        closed.status = ah_core::SessionStatus::Closed;
        closed.files_touched.push("/tmp/proj/shared.rs".to_string());
        save(tmp.path(), &closed);

        let report = detect_conflicts(tmp.path(), "abcd1234longid", &["/tmp/proj/shared.rs".to_string()]).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn detects_recent_edit_in_activity_window() {
        let tmp = tempfile::tempdir().unwrap();
        let requester = SessionRecord::new("abcd1234", "proj", "/tmp/proj");
        save(tmp.path(), &requester);
        let other = SessionRecord::new("other001", "proj", "/tmp/proj");
        save(tmp.path(), &other);

        let activity_path = ah_config::terminals_dir(tmp.path()).join("activity.jsonl");
        ah_jsonl::append_line(
            &activity_path,
            &serde_json::json!({
                "t": now(),
                "session": "other001",
                "tool": "Edit",
                "file": "shared.rs",
                "file_path": "/tmp/proj/shared.rs",
            }),
        )
        .unwrap();

        let report = detect_conflicts(tmp.path(), "abcd1234longid", &["/tmp/proj/shared.rs".to_string()]).unwrap();
        assert_eq!(report.recent_edits.len(), 1);
        assert_eq!(report.recent_edits[0].session, "other001");
    }

    #[test]
    fn rejects_unknown_session() {
        let tmp = tempfile::tempdir().unwrap();
        let result = detect_conflicts(tmp.path(), "abcd1234longid", &[]);
        assert!(result.is_err());
    }

    #[test]
    fn appends_audit_line_even_when_clean() {
        let tmp = tempfile::tempdir().unwrap();
        let requester = SessionRecord::new("abcd1234", "proj", "/tmp/proj");
        save(tmp.path(), &requester);

        detect_conflicts(tmp.path(), "abcd1234longid", &["/tmp/proj/a.rs".to_string()]).unwrap();

        let audit_path = ah_config::terminals_dir(tmp.path()).join("conflicts.jsonl");
        let content = std::fs::read_to_string(audit_path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
