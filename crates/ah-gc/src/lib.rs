//! Garbage Collector (C16): runs once per coordinator boot, removing
//! stale/closed sessions, completed worker artifacts, and finished
//! pipeline directories older than a TTL (spec.md §4.16).

use std::path::Path;
use std::time::{Duration, SystemTime};

use ah_config::AppConfig;
use ah_core::SessionStatus;

#[derive(Debug, Default, Clone, Copy)]
pub struct GcCounts {
    pub sessions_removed: usize,
    pub worker_artifacts_removed: usize,
    pub pipelines_removed: usize,
}

const WORKER_ARTIFACT_SUFFIXES: &[&str] =
    &[".meta.json", ".meta.json.done", ".txt", ".prompt", ".pid", ".worker.sh", ".worker.ps1"];

pub fn run(root: &Path, config: &AppConfig) -> GcCounts {
    let ttl = Duration::from_secs((config.gc_ttl_hours.max(0) as u64) * 3600);
    GcCounts {
        sessions_removed: collect_sessions(root, ttl),
        worker_artifacts_removed: collect_worker_artifacts(root, ttl),
        pipelines_removed: collect_pipelines(root, ttl),
    }
}

fn age_of(meta: &std::fs::Metadata) -> Option<Duration> {
    meta.modified().ok().and_then(|m| SystemTime::now().duration_since(m).ok())
}

fn is_older_than(path: &Path, ttl: Duration) -> bool {
    std::fs::metadata(path).ok().and_then(|m| age_of(&m)).map(|age| age > ttl).unwrap_or(false)
}

fn collect_sessions(root: &Path, ttl: Duration) -> usize {
    let dir = ah_config::terminals_dir(root);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("session-") || !name.ends_with(".json") {
            continue;
        }
        let path = entry.path();
        let Ok(raw) = std::fs::read_to_string(&path) else {
            continue;
        };
        let Ok(record) = serde_json::from_str::<ah_session::SessionRecord>(&raw) else {
            continue;
        };
        if !matches!(record.status, SessionStatus::Stale | SessionStatus::Closed) {
            continue;
        }
        if is_older_than(&path, ttl) && std::fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    removed
}

fn collect_worker_artifacts(root: &Path, ttl: Duration) -> usize {
    let dir = ah_config::results_dir(root);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.ends_with(".meta.json.done") {
            continue;
        }
        if !is_older_than(&path, ttl) {
            continue;
        }

        let task_id = name.trim_end_matches(".meta.json.done");
        for suffix in WORKER_ARTIFACT_SUFFIXES {
            let artifact = dir.join(format!("{task_id}{suffix}"));
            if std::fs::remove_file(&artifact).is_ok() {
                removed += 1;
            }
        }
    }
    removed
}

fn collect_pipelines(root: &Path, ttl: Duration) -> usize {
    let dir = ah_config::results_dir(root);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let done_marker = path.join("pipeline.done");
        if !done_marker.exists() || !is_older_than(&done_marker, ttl) {
            continue;
        }
        if std::fs::remove_dir_all(&path).is_ok() {
            removed += 1;
        }
    }
    removed
}
