//! Pipeline Executor (C12): a sequence of agent invocations run one after
//! another by a single generated runner script (spec.md §4.12).

mod meta;
mod prompt;
mod script;

use std::collections::HashSet;
use std::path::Path;

use ah_config::AppConfig;
use ah_core::{HubError, Layout, Platform, Result};

pub use meta::PipelineStep;

pub struct TaskSpec {
    pub name: String,
    pub prompt: String,
    pub model: String,
    pub agent: Option<String>,
}

pub struct StepStatus {
    pub index: usize,
    pub name: String,
    pub status: String,
}

pub struct PipelineView {
    pub pipeline_id: String,
    pub done: bool,
    pub steps: Vec<StepStatus>,
    pub current_output_tail: Option<String>,
}

pub fn run_pipeline(
    root: &Path,
    config: &AppConfig,
    directory: &str,
    tasks: &[TaskSpec],
    pipeline_id: Option<&str>,
    layout: Layout,
) -> Result<String> {
    ah_validate::validate_directory(directory)?;
    if !Path::new(directory).is_dir() {
        return Err(HubError::validation(format!("directory does not exist: {directory}")));
    }
    if tasks.is_empty() {
        return Err(HubError::validation("pipeline must have at least one task"));
    }

    let pipeline_id = match pipeline_id {
        Some(p) => ah_validate::sanitize_name(p)?,
        None => meta::new_pipeline_id(),
    };
    if meta::pipeline_dir(root, &pipeline_id).exists() {
        return Err(HubError::conflict(format!("pipeline '{pipeline_id}' already exists")));
    }

    let mut steps = Vec::with_capacity(tasks.len());
    for task in tasks {
        let name = ah_validate::sanitize_name(&task.name)?;
        if task.prompt.trim().is_empty() {
            return Err(HubError::validation(format!("step '{name}' has an empty prompt")));
        }
        ah_validate::validate_model(&task.model)?;
        if let Some(agent) = &task.agent {
            ah_validate::validate_agent(agent)?;
        }
        steps.push(PipelineStep { name, model: task.model.clone(), agent: task.agent.clone() });
    }

    ah_fs::ensure_dir(&meta::pipeline_dir(root, &pipeline_id), config.test_mode)?;

    for (i, (task, step)) in tasks.iter().zip(steps.iter()).enumerate() {
        let assembled = prompt::with_prior_context(root, &task.prompt);
        ah_fs::atomic_write(
            &meta::step_prompt_path(root, &pipeline_id, i, &step.name),
            assembled.as_bytes(),
        )?;
    }

    let script_path = meta::runner_script_path(root, &pipeline_id);
    let log_path = meta::log_path(root, &pipeline_id);
    let done_path = meta::done_path(root, &pipeline_id);

    let root_buf = root.to_path_buf();
    let pid_for_prompt = pipeline_id.clone();
    let prompt_fn = |i: usize, name: &str| meta::step_prompt_path(&root_buf, &pid_for_prompt, i, name);
    let root_buf2 = root.to_path_buf();
    let pid_for_output = pipeline_id.clone();
    let output_fn = |i: usize, name: &str| meta::step_output_path(&root_buf2, &pid_for_output, i, name);

    let runner_args = script::RunnerArgs {
        directory,
        agent_binary: &config.agent_binary,
        steps: &steps,
        log_path: &log_path,
        done_path: &done_path,
        prompt_path: &prompt_fn,
        output_path: &output_fn,
    };

    #[cfg(unix)]
    script::write_script(&script_path, &runner_args)?;
    #[cfg(windows)]
    script::write_windows_script(&script_path, &runner_args)?;

    let meta_record = meta::PipelineMeta::new(pipeline_id.as_str(), directory, steps);
    meta::save_meta(root, &meta_record)?;

    let command = launch_command(&script_path);
    let app = ah_platform::detect_current_terminal_app();
    let spec = ah_platform::plan_launch(Platform::detect(), app, &command, layout)?;
    ah_platform::execute(&spec)?;

    Ok(format!("started pipeline {pipeline_id}"))
}

#[cfg(unix)]
fn launch_command(script_path: &Path) -> String {
    script_path.to_string_lossy().to_string()
}

#[cfg(windows)]
fn launch_command(script_path: &Path) -> String {
    format!(
        "powershell -NoProfile -ExecutionPolicy Bypass -File {}",
        script_path.to_string_lossy()
    )
}

pub fn get_pipeline(root: &Path, pipeline_id: &str) -> Result<PipelineView> {
    let pipeline_id = ah_validate::sanitize_name(pipeline_id)?;
    let meta_record = meta::load_meta(root, &pipeline_id)
        .ok_or_else(|| HubError::not_found(format!("no such pipeline: {pipeline_id}")))?;

    let log = ah_jsonl::read_bounded(
        &meta::log_path(root, &pipeline_id),
        ah_jsonl::DEFAULT_MAX_BYTES,
        ah_jsonl::DEFAULT_MAX_LINES,
    );
    let done = meta::done_path(root, &pipeline_id).exists();

    let mut completed_steps: HashSet<usize> = HashSet::new();
    let mut running_step: Option<usize> = None;
    for entry in &log.items {
        let Some(step) = entry.get("step").and_then(|v| v.as_u64()).map(|v| v as usize) else {
            continue;
        };
        match entry.get("status").and_then(|v| v.as_str()) {
            Some("completed") => {
                completed_steps.insert(step);
                running_step = None;
            }
            Some("running") => running_step = Some(step),
            _ => {}
        }
    }

    let mut steps = Vec::with_capacity(meta_record.steps.len());
    let mut current_index = None;
    for (i, step) in meta_record.steps.iter().enumerate() {
        let status = if completed_steps.contains(&i) {
            "completed"
        } else if running_step == Some(i) {
            current_index = Some(i);
            "running"
        } else {
            "pending"
        };
        steps.push(StepStatus { index: i, name: step.name.clone(), status: status.to_string() });
    }

    let tail_index = current_index.or_else(|| completed_steps.iter().max().copied());
    let current_output_tail = tail_index.map(|i| {
        let name = &meta_record.steps[i].name;
        tail_last_lines(&meta::step_output_path(root, &pipeline_id, i, name), 15)
    });

    Ok(PipelineView { pipeline_id, done, steps, current_output_tail })
}

fn tail_last_lines(path: &Path, n: usize) -> String {
    let Ok(content) = std::fs::read_to_string(path) else {
        return String::new();
    };
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.test_mode = true;
        cfg.agent_binary = "true".to_string();
        cfg
    }

    fn task(name: &str) -> TaskSpec {
        TaskSpec { name: name.to_string(), prompt: "do it".to_string(), model: "claude-3".to_string(), agent: None }
    }

    #[test]
    fn rejects_empty_task_list() {
        let tmp = tempfile::tempdir().unwrap();
        let workdir = tempfile::tempdir().unwrap();
        let result = run_pipeline(tmp.path(), &config(), workdir.path().to_str().unwrap(), &[], None, Layout::Tab);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let result = run_pipeline(tmp.path(), &config(), "/no/such/dir", &[task("build")], None, Layout::Tab);
        assert!(result.is_err());
    }

    #[test]
    fn run_pipeline_writes_step_prompts_and_meta() {
        let tmp = tempfile::tempdir().unwrap();
        let workdir = tempfile::tempdir().unwrap();

        unsafe { std::env::set_var("AGENT_HUB_PLATFORM", "linux") };
        let text = run_pipeline(
            tmp.path(),
            &config(),
            workdir.path().to_str().unwrap(),
            &[task("build"), task("test")],
            Some("P1"),
            Layout::Tab,
        )
        .unwrap();
        unsafe { std::env::remove_var("AGENT_HUB_PLATFORM") };

        assert_eq!(text, "started pipeline P1");
        assert!(meta::step_prompt_path(tmp.path(), "P1", 0, "build").exists());
        assert!(meta::step_prompt_path(tmp.path(), "P1", 1, "test").exists());
        let loaded = meta::load_meta(tmp.path(), "P1").unwrap();
        assert_eq!(loaded.steps.len(), 2);
    }

    #[test]
    fn rejects_duplicate_pipeline_id() {
        let tmp = tempfile::tempdir().unwrap();
        let workdir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(meta::pipeline_dir(tmp.path(), "P1")).unwrap();

        let result = run_pipeline(
            tmp.path(),
            &config(),
            workdir.path().to_str().unwrap(),
            &[task("build")],
            Some("P1"),
            Layout::Tab,
        );
        assert!(matches!(result, Err(HubError::Conflict(_))));
    }

    #[test]
    fn get_pipeline_reports_step_progression_from_log() {
        let tmp = tempfile::tempdir().unwrap();
        let steps = vec![
            PipelineStep { name: "build".into(), model: "m".into(), agent: None },
            PipelineStep { name: "test".into(), model: "m".into(), agent: None },
        ];
        let meta_record = meta::PipelineMeta::new("P1", "/tmp/proj", steps);
        std::fs::create_dir_all(meta::pipeline_dir(tmp.path(), "P1")).unwrap();
        meta::save_meta(tmp.path(), &meta_record).unwrap();

        ah_jsonl::append_line(
            &meta::log_path(tmp.path(), "P1"),
            &serde_json::json!({"step": 0, "name": "build", "status": "running", "started": "now"}),
        )
        .unwrap();
        ah_jsonl::append_line(
            &meta::log_path(tmp.path(), "P1"),
            &serde_json::json!({"step": 0, "name": "build", "status": "completed", "finished": "now"}),
        )
        .unwrap();
        ah_jsonl::append_line(
            &meta::log_path(tmp.path(), "P1"),
            &serde_json::json!({"step": 1, "name": "test", "status": "running", "started": "now"}),
        )
        .unwrap();
        std::fs::write(meta::step_output_path(tmp.path(), "P1", 1, "test"), "running tests\n").unwrap();

        let view = get_pipeline(tmp.path(), "P1").unwrap();
        assert!(!view.done);
        assert_eq!(view.steps[0].status, "completed");
        assert_eq!(view.steps[1].status, "running");
        assert!(view.current_output_tail.unwrap().contains("running tests"));
    }

    #[test]
    fn get_pipeline_reports_done_when_marker_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let meta_record = meta::PipelineMeta::new("P1", "/tmp/proj", vec![PipelineStep { name: "build".into(), model: "m".into(), agent: None }]);
        std::fs::create_dir_all(meta::pipeline_dir(tmp.path(), "P1")).unwrap();
        meta::save_meta(tmp.path(), &meta_record).unwrap();
        std::fs::write(meta::done_path(tmp.path(), "P1"), br#"{"status":"completed"}"#).unwrap();

        let view = get_pipeline(tmp.path(), "P1").unwrap();
        assert!(view.done);
    }
}
