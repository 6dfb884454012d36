//! Pipeline Meta (spec.md §4.12) and its path conventions under
//! `results/<pipeline_id>/`.

use std::path::{Path, PathBuf};

use ah_core::now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    pub name: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMeta {
    pub pipeline_id: String,
    pub directory: String,
    pub steps: Vec<PipelineStep>,
    pub spawned: DateTime<Utc>,
}

impl PipelineMeta {
    pub fn new(pipeline_id: impl Into<String>, directory: impl Into<String>, steps: Vec<PipelineStep>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            directory: directory.into(),
            steps,
            spawned: now(),
        }
    }
}

pub fn pipeline_dir(root: &Path, pipeline_id: &str) -> PathBuf {
    ah_config::results_dir(root).join(pipeline_id)
}

pub fn meta_path(root: &Path, pipeline_id: &str) -> PathBuf {
    pipeline_dir(root, pipeline_id).join("pipeline.meta.json")
}

pub fn log_path(root: &Path, pipeline_id: &str) -> PathBuf {
    pipeline_dir(root, pipeline_id).join("pipeline.log")
}

pub fn done_path(root: &Path, pipeline_id: &str) -> PathBuf {
    pipeline_dir(root, pipeline_id).join("pipeline.done")
}

pub fn step_prompt_path(root: &Path, pipeline_id: &str, index: usize, name: &str) -> PathBuf {
    pipeline_dir(root, pipeline_id).join(format!("{index}-{name}.prompt"))
}

pub fn step_output_path(root: &Path, pipeline_id: &str, index: usize, name: &str) -> PathBuf {
    pipeline_dir(root, pipeline_id).join(format!("{index}-{name}.txt"))
}

#[cfg(unix)]
pub fn runner_script_path(root: &Path, pipeline_id: &str) -> PathBuf {
    pipeline_dir(root, pipeline_id).join("run.sh")
}

#[cfg(windows)]
pub fn runner_script_path(root: &Path, pipeline_id: &str) -> PathBuf {
    pipeline_dir(root, pipeline_id).join("run.ps1")
}

pub fn new_pipeline_id() -> String {
    format!("P{}", now().timestamp_millis())
}

pub fn load_meta(root: &Path, pipeline_id: &str) -> Option<PipelineMeta> {
    let raw = std::fs::read_to_string(meta_path(root, pipeline_id)).ok()?;
    serde_json::from_str(&raw).ok()
}

pub fn save_meta(root: &Path, meta: &PipelineMeta) -> ah_core::Result<()> {
    let json = serde_json::to_vec_pretty(meta).expect("PipelineMeta always serializes");
    ah_fs::atomic_write(&meta_path(root, &meta.pipeline_id), &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let steps = vec![PipelineStep { name: "build".into(), model: "m".into(), agent: None }];
        let meta = PipelineMeta::new("P1", "/tmp/proj", steps);
        save_meta(tmp.path(), &meta).unwrap();

        let loaded = load_meta(tmp.path(), "P1").unwrap();
        assert_eq!(loaded.steps.len(), 1);
        assert_eq!(loaded.steps[0].name, "build");
    }
}
