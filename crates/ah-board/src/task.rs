//! Task Record (spec.md §3) and its path conventions under `tasks/`.

use std::path::{Path, PathBuf};

use ah_core::{now, Priority, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(task_id: impl Into<String>, subject: impl Into<String>) -> Self {
        let t = now();
        Self {
            task_id: task_id.into(),
            subject: subject.into(),
            description: None,
            status: TaskStatus::Pending,
            assignee: None,
            priority: Priority::Normal,
            files: Vec::new(),
            blocked_by: Vec::new(),
            blocks: Vec::new(),
            created: t,
            updated: t,
        }
    }
}

pub fn new_task_id() -> String {
    format!("T{}", now().timestamp_millis())
}

pub fn task_path(root: &Path, task_id: &str) -> PathBuf {
    ah_config::tasks_dir(root).join(format!("{task_id}.json"))
}

pub fn load_task(root: &Path, task_id: &str) -> Option<TaskRecord> {
    let raw = std::fs::read_to_string(task_path(root, task_id)).ok()?;
    serde_json::from_str(&raw).ok()
}

pub fn save_task(root: &Path, task: &TaskRecord) -> ah_core::Result<()> {
    ah_fs::ensure_dir(&ah_config::tasks_dir(root), true).ok();
    let json = serde_json::to_vec_pretty(task).expect("TaskRecord always serializes");
    ah_fs::atomic_write(&task_path(root, &task.task_id), &json)
}

/// List every task record under `tasks/`, skipping any file that fails to
/// parse (consistent with the session store's treatment of malformed
/// records).
pub fn list_tasks_raw(root: &Path) -> Vec<TaskRecord> {
    let dir = ah_config::tasks_dir(root);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut tasks = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.ends_with(".json") {
            continue;
        }
        if let Ok(raw) = std::fs::read_to_string(entry.path()) {
            if let Ok(task) = serde_json::from_str::<TaskRecord>(&raw) {
                tasks.push(task);
            }
        }
    }
    tasks
}
