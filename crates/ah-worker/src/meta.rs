//! Worker Meta (spec.md §3) and its path conventions under `results/`.

use std::path::{Path, PathBuf};

use ah_core::{now, WorkerMode, WorkerStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const PROMPT_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerMeta {
    pub task_id: String,
    pub directory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_directory: Option<String>,
    pub prompt: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_session_id: Option<String>,
    pub isolated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worktree_branch: Option<String>,
    pub mode: WorkerMode,
    pub files: Vec<String>,
    pub spawned: DateTime<Utc>,
    pub status: WorkerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerMeta {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_id: impl Into<String>,
        directory: impl Into<String>,
        prompt_preview: &str,
        model: impl Into<String>,
        agent: Option<String>,
        notify_session_id: Option<String>,
        mode: WorkerMode,
        files: Vec<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            directory: directory.into(),
            original_directory: None,
            prompt: prompt_preview.chars().take(PROMPT_PREVIEW_CHARS).collect(),
            model: model.into(),
            agent,
            notify_session_id,
            isolated: false,
            worktree_branch: None,
            mode,
            files,
            spawned: now(),
            status: WorkerStatus::Running,
            finished: None,
            cancelled: None,
            error: None,
        }
    }
}

pub fn results_dir(root: &Path) -> PathBuf {
    ah_config::results_dir(root)
}

pub fn meta_path(root: &Path, task_id: &str) -> PathBuf {
    results_dir(root).join(format!("{task_id}.meta.json"))
}

pub fn done_path(root: &Path, task_id: &str) -> PathBuf {
    results_dir(root).join(format!("{task_id}.meta.json.done"))
}

pub fn pid_path(root: &Path, task_id: &str) -> PathBuf {
    results_dir(root).join(format!("{task_id}.pid"))
}

pub fn output_path(root: &Path, task_id: &str) -> PathBuf {
    results_dir(root).join(format!("{task_id}.txt"))
}

pub fn prompt_path(root: &Path, task_id: &str) -> PathBuf {
    results_dir(root).join(format!("{task_id}.prompt"))
}

#[cfg(unix)]
pub fn script_path(root: &Path, task_id: &str) -> PathBuf {
    results_dir(root).join(format!("{task_id}.worker.sh"))
}

#[cfg(windows)]
pub fn script_path(root: &Path, task_id: &str) -> PathBuf {
    results_dir(root).join(format!("{task_id}.worker.ps1"))
}

pub fn load_meta(root: &Path, task_id: &str) -> Option<WorkerMeta> {
    let raw = std::fs::read_to_string(meta_path(root, task_id)).ok()?;
    serde_json::from_str(&raw).ok()
}

pub fn save_meta(root: &Path, meta: &WorkerMeta) -> ah_core::Result<()> {
    let json = serde_json::to_vec_pretty(meta).expect("WorkerMeta always serializes");
    ah_fs::atomic_write(&meta_path(root, &meta.task_id), &json)
}

pub fn mark_done(root: &Path, task_id: &str) -> ah_core::Result<()> {
    ah_fs::atomic_write(&done_path(root, task_id), b"{}")
}

pub fn new_task_id() -> String {
    format!("W{}", now().timestamp_millis())
}
