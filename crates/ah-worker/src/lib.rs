//! Worker Supervisor (C11): spawns an interactive or pipe-mode child agent
//! in a new terminal (spec.md §4.11), tracking it through a meta/pid/result
//! file set under `results/`.

mod meta;
mod prompt;
mod script;
mod worktree;

use std::collections::HashSet;
use std::path::Path;

use ah_config::AppConfig;
use ah_core::{now, HubError, Layout, Platform, Result, WorkerMode, WorkerStatus};

pub use meta::WorkerMeta;
use script::WorkerScriptArgs;

const DEFAULT_TAIL_LINES: usize = 100;
const MAX_TAIL_LINES: usize = 500;

pub struct WorkerResult {
    pub task_id: String,
    pub status: String,
    pub output: String,
    pub truncated: bool,
}

/// Spawn a worker. Returns a human-readable confirmation string on both
/// success and on a post-meta-write failure (step 8): once the meta file
/// exists, a launch failure is recorded there rather than surfaced as an
/// error to the caller.
#[allow(clippy::too_many_arguments)]
pub fn spawn_worker(
    root: &Path,
    config: &AppConfig,
    directory: &str,
    prompt: &str,
    model: &str,
    agent: Option<&str>,
    task_id: Option<&str>,
    notify_session_id: Option<&str>,
    files: &[String],
    layout: Layout,
    mode: WorkerMode,
    isolate: bool,
) -> Result<String> {
    if prompt.trim().is_empty() {
        return Err(HubError::validation("prompt must not be empty"));
    }
    ah_validate::validate_directory(directory)?;
    if !Path::new(directory).is_dir() {
        return Err(HubError::validation(format!("directory does not exist: {directory}")));
    }
    if let Some(agent) = agent {
        ah_validate::validate_agent(agent)?;
    }
    ah_validate::validate_model(model)?;
    if let Some(sid) = notify_session_id {
        ah_validate::validate_short_session_id(sid)?;
    }

    let task_id = match task_id {
        Some(t) => ah_validate::sanitize_name(t)?,
        None => meta::new_task_id(),
    };
    if meta::meta_path(root, &task_id).exists() || meta::output_path(root, &task_id).exists() {
        return Err(HubError::conflict(format!("task '{task_id}' already exists")));
    }

    let normalized_files: Vec<String> = files
        .iter()
        .filter_map(|f| ah_validate::normalize_file_path(f, Path::new(directory)))
        .collect();

    check_running_conflicts(root, &normalized_files)?;

    ah_fs::ensure_dir(&meta::results_dir(root), config.test_mode)?;

    let mut effective_directory = directory.to_string();
    let mut worktree_branch = None;
    if isolate {
        effective_directory = worktree::create_worktree(directory, &task_id)?;
        worktree_branch = Some(worktree::branch_name(&task_id));
    }

    let mut worker_meta = WorkerMeta::new(
        task_id.as_str(),
        effective_directory.clone(),
        prompt,
        model,
        agent.map(String::from),
        notify_session_id.map(String::from),
        mode,
        normalized_files,
    );
    worker_meta.isolated = isolate;
    worker_meta.worktree_branch = worktree_branch;
    if effective_directory != directory {
        worker_meta.original_directory = Some(directory.to_string());
    }
    meta::save_meta(root, &worker_meta)?;

    match launch(root, config, &task_id, &effective_directory, prompt, model, agent, mode, layout) {
        Ok(()) => Ok(format!("spawned worker {task_id}")),
        Err(e) => {
            worker_meta.status = WorkerStatus::Failed;
            worker_meta.error = Some(e.to_string());
            meta::save_meta(root, &worker_meta).ok();
            if e.marks_meta_failed() {
                Ok(format!("worker {task_id} failed to launch: {e}"))
            } else {
                Err(e)
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn launch(
    root: &Path,
    config: &AppConfig,
    task_id: &str,
    directory: &str,
    prompt_text: &str,
    model: &str,
    agent: Option<&str>,
    mode: WorkerMode,
    layout: Layout,
) -> Result<()> {
    let assembled_prompt = prompt::assemble(root, prompt_text, mode);
    let prompt_path = meta::prompt_path(root, task_id);
    ah_fs::atomic_write(&prompt_path, assembled_prompt.as_bytes())?;

    let script_path = meta::script_path(root, task_id);
    let output_path = meta::output_path(root, task_id);
    let pid_path = meta::pid_path(root, task_id);
    let done_path = meta::done_path(root, task_id);

    let script_args = WorkerScriptArgs {
        task_id,
        directory,
        agent_binary: &config.agent_binary,
        model,
        agent,
        prompt_path: &prompt_path,
        output_path: &output_path,
        pid_path: &pid_path,
        done_path: &done_path,
    };

    #[cfg(unix)]
    script::write_script(&script_path, &script_args)?;
    #[cfg(windows)]
    script::write_windows_script(&script_path, &script_args)?;

    let command = launch_command(&script_path);
    let app = ah_platform::detect_current_terminal_app();
    let spec = ah_platform::plan_launch(Platform::detect(), app, &command, layout)?;
    ah_platform::execute(&spec)?;
    Ok(())
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

fn check_running_conflicts(root: &Path, normalized_files: &[String]) -> Result<()> {
    let dir = meta::results_dir(root);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Ok(());
    };
    let requested: HashSet<&str> = normalized_files.iter().map(|s| s.as_str()).collect();
    if requested.is_empty() {
        return Ok(());
    }

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.ends_with(".meta.json") {
            continue;
        }
        let task_id = name.trim_end_matches(".meta.json");
        if dir.join(format!("{task_id}.meta.json.done")).exists() {
            continue;
        }
        let Some(other) = meta::load_meta(root, task_id) else {
            continue;
        };
        if other.status != WorkerStatus::Running {
            continue;
        }
        let Ok(pid) = std::fs::read_to_string(meta::pid_path(root, task_id)) else {
            continue;
        };
        if !ah_platform::is_alive(pid.trim()) {
            continue;
        }

        let overlap: Vec<&String> = other.files.iter().filter(|f| requested.contains(f.as_str())).collect();
        if !overlap.is_empty() {
            return Err(HubError::conflict(format!(
                "task '{task_id}' is running and touches overlapping files: {overlap:?}"
            )));
        }
    }
    Ok(())
}

pub fn get_result(root: &Path, task_id: &str, tail_lines: Option<usize>) -> Result<WorkerResult> {
    let task_id = ah_validate::sanitize_name(task_id)?;
    let worker_meta = meta::load_meta(root, &task_id)
        .ok_or_else(|| HubError::not_found(format!("no such worker: {task_id}")))?;

    let status = if worker_meta.status.is_terminal() {
        worker_meta.status.to_string()
    } else if meta::done_path(root, &task_id).exists() {
        "completed".to_string()
    } else {
        let alive = std::fs::read_to_string(meta::pid_path(root, &task_id))
            .ok()
            .map(|pid| ah_platform::is_alive(pid.trim()))
            .unwrap_or(false);
        if alive { "running".to_string() } else { "unknown".to_string() }
    };

    let max_lines = tail_lines.unwrap_or(DEFAULT_TAIL_LINES).min(MAX_TAIL_LINES);
    let (output, truncated) = tail_file(&meta::output_path(root, &task_id), max_lines);

    Ok(WorkerResult { task_id, status, output, truncated })
}

fn tail_file(path: &Path, max_lines: usize) -> (String, bool) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return (String::new(), false);
    };
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= max_lines {
        return (content, false);
    }
    let dropped = lines.len() - max_lines;
    let tail = lines[dropped..].join("\n");
    (format!("[... {dropped} earlier lines truncated ...]\n{tail}"), true)
}

pub fn kill_worker(root: &Path, task_id: &str) -> Result<String> {
    let task_id = ah_validate::sanitize_name(task_id)?;
    let pid_path = meta::pid_path(root, &task_id);
    let done_path = meta::done_path(root, &task_id);

    if !pid_path.exists() && done_path.exists() {
        return Ok(format!("worker {task_id} already completed"));
    }

    if let Ok(pid) = std::fs::read_to_string(&pid_path) {
        if ah_platform::is_alive(pid.trim()) {
            ah_platform::kill(pid.trim());
        }
    }

    ah_fs::atomic_write(&done_path, br#"{"status":"cancelled"}"#)?;
    if let Some(mut worker_meta) = meta::load_meta(root, &task_id) {
        worker_meta.status = WorkerStatus::Cancelled;
        worker_meta.cancelled = Some(now());
        meta::save_meta(root, &worker_meta)?;
    }
    std::fs::remove_file(&pid_path).ok();

    Ok(format!("worker {task_id} cancelled"))
}
