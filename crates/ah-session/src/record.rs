//! The per-session record (spec.md §3 "Session Record") and its bounded
//! mutation helpers (invariants I1–I3).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ah_core::SessionStatus;

pub const SCHEMA_VERSION: u32 = 2;
const MAX_FILES_TOUCHED: usize = 30;
const MAX_RECENT_OPS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentOp {
    pub t: DateTime<Utc>,
    pub tool: String,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session: String,
    pub status: SessionStatus,
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub cwd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tty: Option<String>,
    pub started: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(default = "schema_version_default")]
    pub schema_version: u32,

    #[serde(default)]
    pub tool_counts: HashMap<String, u64>,
    #[serde(default)]
    pub files_touched: Vec<String>,
    #[serde(default)]
    pub recent_ops: Vec<RecentOp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_files: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_registered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_file: Option<String>,
    #[serde(default)]
    pub has_messages: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

fn schema_version_default() -> u32 {
    SCHEMA_VERSION
}

impl SessionRecord {
    pub fn new(session: impl Into<String>, project: impl Into<String>, cwd: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session: session.into(),
            status: SessionStatus::Active,
            project: project.into(),
            branch: None,
            cwd: cwd.into(),
            tty: None,
            started: now,
            last_active: now,
            schema_version: SCHEMA_VERSION,
            tool_counts: HashMap::new(),
            files_touched: Vec::new(),
            recent_ops: Vec::new(),
            current_task: None,
            current_files: None,
            work_registered: None,
            plan_file: None,
            has_messages: false,
            last_tool: None,
            last_file: None,
            ended: None,
            source: None,
            transcript: None,
        }
    }

    /// Record a tool call: bumps `tool_counts`, and for `Write`/`Edit`,
    /// dedups+appends `file_path` to `files_touched` (I2) and appends a
    /// bounded `recent_ops` entry (I3).
    pub fn record_tool_call(&mut self, tool: &str, file_path: Option<&str>, now: DateTime<Utc>) {
        self.last_active = now;
        self.schema_version = SCHEMA_VERSION;
        self.last_tool = Some(tool.to_string());
        *self.tool_counts.entry(tool.to_string()).or_insert(0) += 1;

        if let Some(path) = file_path {
            let basename = basename_of(path);
            self.last_file = Some(basename.clone());

            if matches!(tool, "Write" | "Edit") {
                self.touch_file(path);
            }

            self.push_recent_op(tool, &basename, now);
        }
    }

    /// Remove `path` if present, append it, and keep only the most recent
    /// 30 entries (I2: unique, bounded, absolute paths — the caller is
    /// responsible for passing an absolute path).
    pub fn touch_file(&mut self, path: &str) {
        self.files_touched.retain(|p| p != path);
        self.files_touched.push(path.to_string());
        if self.files_touched.len() > MAX_FILES_TOUCHED {
            let excess = self.files_touched.len() - MAX_FILES_TOUCHED;
            self.files_touched.drain(0..excess);
        }
    }

    /// Append a recent-op entry, keeping only the most recent 10 (I3).
    pub fn push_recent_op(&mut self, tool: &str, file_basename: &str, t: DateTime<Utc>) {
        self.recent_ops.push(RecentOp {
            t,
            tool: tool.to_string(),
            file: file_basename.to_string(),
        });
        if self.recent_ops.len() > MAX_RECENT_OPS {
            let excess = self.recent_ops.len() - MAX_RECENT_OPS;
            self.recent_ops.drain(0..excess);
        }
    }
}

pub fn basename_of(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_touched_deduplicates_and_moves_to_tail() {
        let mut rec = SessionRecord::new("abcd1234", "proj", "/tmp");
        rec.touch_file("/a.rs");
        rec.touch_file("/b.rs");
        rec.touch_file("/a.rs");
        assert_eq!(rec.files_touched, vec!["/b.rs", "/a.rs"]);
    }

    #[test]
    fn files_touched_bounded_to_thirty() {
        let mut rec = SessionRecord::new("abcd1234", "proj", "/tmp");
        for i in 0..40 {
            rec.touch_file(&format!("/f{i}.rs"));
        }
        assert_eq!(rec.files_touched.len(), 30);
        assert_eq!(rec.files_touched.last().unwrap(), "/f39.rs");
        assert_eq!(rec.files_touched.first().unwrap(), "/f10.rs");
    }

    #[test]
    fn recent_ops_bounded_to_ten_in_order() {
        let mut rec = SessionRecord::new("abcd1234", "proj", "/tmp");
        let base = Utc::now();
        for i in 0..15 {
            rec.push_recent_op("Edit", "f.rs", base + chrono::Duration::seconds(i));
        }
        assert_eq!(rec.recent_ops.len(), 10);
        // chronological, non-decreasing t
        for w in rec.recent_ops.windows(2) {
            assert!(w[0].t <= w[1].t);
        }
    }

    #[test]
    fn record_tool_call_only_touches_files_for_write_and_edit() {
        let mut rec = SessionRecord::new("abcd1234", "proj", "/tmp");
        rec.record_tool_call("Bash", Some("/tmp/x"), Utc::now());
        assert!(rec.files_touched.is_empty());
        rec.record_tool_call("Write", Some("/tmp/x"), Utc::now());
        assert_eq!(rec.files_touched, vec!["/tmp/x"]);
    }

    #[test]
    fn basename_of_strips_directories() {
        assert_eq!(basename_of("/a/b/c.rs"), "c.rs");
        assert_eq!(basename_of("bare.rs"), "bare.rs");
    }
}
