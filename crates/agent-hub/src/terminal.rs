//! `spawn_terminal`: open a new terminal tab/split running the agent binary.
//!
//! Unlike the Worker Supervisor and Pipeline Executor, there is no meta/pid/
//! output/done tracking here — this is a fire-and-forget interactive tab,
//! not a supervised background task. The wrapper-script shape mirrors
//! `ah-worker`'s launch script closely, minus the bookkeeping.

use std::path::{Path, PathBuf};

use ah_config::AppConfig;
use ah_core::{HubError, Layout, Platform, Result};
use ah_platform::quote::{bat_quote, posix_quote};

const NESTING_ENV_VAR: &str = "CLAUDECODE";

pub fn spawn_terminal(
    root: &Path,
    config: &AppConfig,
    directory: &str,
    initial_prompt: Option<&str>,
    layout: Layout,
) -> Result<String> {
    ah_validate::validate_directory(directory)?;
    if !Path::new(directory).is_dir() {
        return Err(HubError::validation(format!("directory does not exist: {directory}")));
    }

    let script_path = new_script_path(root);

    #[cfg(unix)]
    write_script(&script_path, directory, &config.agent_binary, initial_prompt)?;
    #[cfg(windows)]
    write_windows_script(&script_path, directory, &config.agent_binary, initial_prompt)?;

    let command = launch_command(&script_path);
    let app = ah_platform::detect_current_terminal_app();
    let spec = ah_platform::plan_launch(Platform::detect(), app, &command, layout)?;
    ah_platform::execute(&spec)?;

    Ok(format!("opened terminal in {directory}"))
}

fn new_script_path(root: &Path) -> PathBuf {
    let dir = ah_config::terminals_dir(root).join(".spawned");
    let _ = std::fs::create_dir_all(&dir);
    let name = if cfg!(windows) {
        format!("spawn-{}.ps1", ah_core::now().timestamp_millis())
    } else {
        format!("spawn-{}.sh", ah_core::now().timestamp_millis())
    };
    dir.join(name)
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

#[cfg(unix)]
fn write_script(path: &Path, directory: &str, agent_binary: &str, initial_prompt: Option<&str>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let feed = match initial_prompt {
        Some(p) => format!("printf '%s' {} | {}\n", posix_quote(p), posix_quote(agent_binary)),
        None => format!("{}\n", posix_quote(agent_binary)),
    };
    let body = format!(
        "#!/bin/sh\nset -u\ncd {dir}\nunset {var}\n{feed}",
        dir = posix_quote(directory),
        var = NESTING_ENV_VAR,
    );

    std::fs::write(path, body).map_err(HubError::Io)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).map_err(HubError::Io)?;
    Ok(())
}

#[cfg(windows)]
fn write_windows_script(
    path: &Path,
    directory: &str,
    agent_binary: &str,
    initial_prompt: Option<&str>,
) -> Result<()> {
    let feed = match initial_prompt {
        Some(p) => format!("Write-Output {} | & {}\n", bat_quote(p), bat_quote(agent_binary)),
        None => format!("& {}\n", bat_quote(agent_binary)),
    };
    let body = format!(
        "Set-Location -Path {dir}\nRemove-Item Env:{var} -ErrorAction SilentlyContinue\n{feed}",
        dir = bat_quote(directory),
        var = NESTING_ENV_VAR,
    );
    std::fs::write(path, body).map_err(HubError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let result = spawn_terminal(tmp.path(), &AppConfig::default(), "/no/such/dir", None, Layout::Tab);
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn write_script_unsets_nesting_var_and_quotes_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("spawn.sh");
        write_script(&path, "/tmp/my project", "claude", None).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("unset CLAUDECODE"));
        assert!(content.contains("cd '/tmp/my project'"));
    }
}
