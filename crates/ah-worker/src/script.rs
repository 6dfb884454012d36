//! Wrapper script synthesis (spec.md §4.11 step 6): a generated, per-task
//! script that `cd`s to the working directory, records its PID, execs the
//! agent binary against the assembled prompt, and marks completion on exit.
//! The environment variable a nested agent uses to detect its own host is
//! unset before the agent binary runs.

use std::path::Path;

use ah_platform::quote::{bat_quote, posix_quote};

const NESTING_ENV_VAR: &str = "CLAUDECODE";

pub struct WorkerScriptArgs<'a> {
    pub task_id: &'a str,
    pub directory: &'a str,
    pub agent_binary: &'a str,
    pub model: &'a str,
    pub agent: Option<&'a str>,
    pub prompt_path: &'a Path,
    pub output_path: &'a Path,
    pub pid_path: &'a Path,
    pub done_path: &'a Path,
}

#[cfg(unix)]
pub fn write_script(path: &Path, args: &WorkerScriptArgs) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut flags = format!("--model {}", posix_quote(args.model));
    if let Some(agent) = args.agent {
        flags.push_str(&format!(" --agent {}", posix_quote(agent)));
    }

    let body = format!(
        "#!/bin/sh\nset -u\ncd {dir}\necho \"=== agent-hub worker {task} starting ===\" >> {output}\necho $$ > {pid}\nunset {nesting}\n{agent_bin} {flags} < {prompt} >> {output} 2>&1\nrm -f {pid}\nfinished=$(date -u +%Y-%m-%dT%H:%M:%SZ)\nprintf '{{\"status\":\"completed\",\"finished\":\"%s\"}}' \"$finished\" > {done}\n",
        dir = posix_quote(args.directory),
        task = args.task_id,
        output = posix_quote(&args.output_path.to_string_lossy()),
        pid = posix_quote(&args.pid_path.to_string_lossy()),
        nesting = NESTING_ENV_VAR,
        agent_bin = posix_quote(args.agent_binary),
        flags = flags,
        prompt = posix_quote(&args.prompt_path.to_string_lossy()),
        done = posix_quote(&args.done_path.to_string_lossy()),
    );

    std::fs::write(path, body)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
pub fn write_script(path: &Path, args: &WorkerScriptArgs) -> std::io::Result<()> {
    let _ = (path, args);
    Ok(())
}

pub fn write_windows_script(path: &Path, args: &WorkerScriptArgs) -> std::io::Result<()> {
    let mut flags = format!("--model {}", bat_quote(args.model));
    if let Some(agent) = args.agent {
        flags.push_str(&format!(" --agent {}", bat_quote(agent)));
    }

    let body = format!(
        "Set-Location -Path {dir}\nAdd-Content -Path {output} -Value \"=== agent-hub worker {task} starting ===\"\n$PID | Out-File -FilePath {pid} -Encoding ascii\nRemove-Item Env:{nesting} -ErrorAction SilentlyContinue\nGet-Content {prompt} | & {agent_bin} {flags} *>> {output}\nRemove-Item -Path {pid} -ErrorAction SilentlyContinue\n$finished = (Get-Date).ToUniversalTime().ToString(\"yyyy-MM-ddTHH:mm:ssZ\")\nSet-Content -Path {done} -Value \"{{`\"status`\":`\"completed`\",`\"finished`\":`\"$finished`\"}}\"\n",
        dir = bat_quote(args.directory),
        task = args.task_id,
        output = bat_quote(&args.output_path.to_string_lossy()),
        pid = bat_quote(&args.pid_path.to_string_lossy()),
        nesting = NESTING_ENV_VAR,
        prompt = bat_quote(&args.prompt_path.to_string_lossy()),
        agent_bin = bat_quote(args.agent_binary),
        flags = flags,
        done = bat_quote(&args.done_path.to_string_lossy()),
    );

    std::fs::write(path, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args<'a>(task: &'a str, prompt: &'a Path, output: &'a Path, pid: &'a Path, done: &'a Path) -> WorkerScriptArgs<'a> {
        WorkerScriptArgs {
            task_id: task,
            directory: "/tmp/project",
            agent_binary: "claude",
            model: "claude-3",
            agent: None,
            prompt_path: prompt,
            output_path: output,
            pid_path: pid,
            done_path: done,
        }
    }

    #[test]
    #[cfg(unix)]
    fn posix_script_is_executable_and_unsets_nesting_var() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("W1.worker.sh");
        let prompt = tmp.path().join("W1.prompt");
        let output = tmp.path().join("W1.txt");
        let pid = tmp.path().join("W1.pid");
        let done = tmp.path().join("W1.meta.json.done");

        write_script(&script, &args("W1", &prompt, &output, &pid, &done)).unwrap();

        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&script).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);

        let content = std::fs::read_to_string(&script).unwrap();
        assert!(content.contains("unset CLAUDECODE"));
        assert!(content.contains("rm -f"));
    }

    #[test]
    fn windows_script_quotes_paths_and_unsets_nesting_var() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("W1.worker.ps1");
        let prompt = tmp.path().join("W1.prompt");
        let output = tmp.path().join("W1.txt");
        let pid = tmp.path().join("W1.pid");
        let done = tmp.path().join("W1.meta.json.done");

        write_windows_script(&script, &args("W1", &prompt, &output, &pid, &done)).unwrap();

        let content = std::fs::read_to_string(&script).unwrap();
        assert!(content.contains("Remove-Item Env:CLAUDECODE"));
        assert!(content.contains("Set-Location"));
    }
}
