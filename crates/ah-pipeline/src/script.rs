//! Runner script synthesis for a multi-step pipeline (spec.md §4.12 step
//! 3): one shell invocation per step, each appending its progress to
//! `pipeline.log` as a banner line followed by a JSON line.

use std::path::Path;

use ah_platform::quote::{bat_quote, posix_quote};

use crate::meta::PipelineStep;

const NESTING_ENV_VAR: &str = "CLAUDECODE";

pub struct RunnerArgs<'a> {
    pub directory: &'a str,
    pub agent_binary: &'a str,
    pub steps: &'a [PipelineStep],
    pub log_path: &'a Path,
    pub done_path: &'a Path,
    pub prompt_path: &'a dyn Fn(usize, &str) -> std::path::PathBuf,
    pub output_path: &'a dyn Fn(usize, &str) -> std::path::PathBuf,
}

#[cfg(unix)]
pub fn write_script(path: &Path, args: &RunnerArgs) -> std::io::Result<()> {
    use std::fmt::Write as _;
    use std::os::unix::fs::PermissionsExt;

    let log = posix_quote(&args.log_path.to_string_lossy());
    let mut body = format!(
        "#!/bin/sh\nset -e\ncd {dir}\nunset {nesting}\n",
        dir = posix_quote(args.directory),
        nesting = NESTING_ENV_VAR,
    );

    for (i, step) in args.steps.iter().enumerate() {
        let prompt = posix_quote(&(args.prompt_path)(i, &step.name).to_string_lossy());
        let output = posix_quote(&(args.output_path)(i, &step.name).to_string_lossy());
        let mut flags = format!("--model {}", posix_quote(&step.model));
        if let Some(agent) = &step.agent {
            flags.push_str(&format!(" --agent {}", posix_quote(agent)));
        }
        let _ = write!(
            body,
            "echo \"=== Step {i}: {name} ===\" >> {log}\nprintf '{{\"step\":{i},\"name\":\"{name}\",\"status\":\"running\",\"started\":\"%s\"}}\\n' \"$(date -u +%Y-%m-%dT%H:%M:%SZ)\" >> {log}\n{agent_bin} {flags} < {prompt} >> {output} 2>&1\nprintf '{{\"step\":{i},\"name\":\"{name}\",\"status\":\"completed\",\"finished\":\"%s\"}}\\n' \"$(date -u +%Y-%m-%dT%H:%M:%SZ)\" >> {log}\n",
            name = step.name,
            agent_bin = posix_quote(args.agent_binary),
        );
    }

    let done = posix_quote(&args.done_path.to_string_lossy());
    let _ = write!(
        body,
        "finished=$(date -u +%Y-%m-%dT%H:%M:%SZ)\nprintf '{{\"status\":\"completed\",\"finished\":\"%s\"}}' \"$finished\" > {done}\n"
    );

    std::fs::write(path, body)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
pub fn write_script(path: &Path, args: &RunnerArgs) -> std::io::Result<()> {
    let _ = (path, args);
    Ok(())
}

pub fn write_windows_script(path: &Path, args: &RunnerArgs) -> std::io::Result<()> {
    use std::fmt::Write as _;

    let log = bat_quote(&args.log_path.to_string_lossy());
    let mut body = format!(
        "$ErrorActionPreference = \"Stop\"\nSet-Location -Path {dir}\nRemove-Item Env:{nesting} -ErrorAction SilentlyContinue\n",
        dir = bat_quote(args.directory),
        nesting = NESTING_ENV_VAR,
    );

    for (i, step) in args.steps.iter().enumerate() {
        let prompt = bat_quote(&(args.prompt_path)(i, &step.name).to_string_lossy());
        let output = bat_quote(&(args.output_path)(i, &step.name).to_string_lossy());
        let mut flags = format!("--model {}", bat_quote(&step.model));
        if let Some(agent) = &step.agent {
            flags.push_str(&format!(" --agent {}", bat_quote(agent)));
        }
        let _ = write!(
            body,
            "Add-Content -Path {log} -Value \"=== Step {i}: {name} ===\"\n$started = (Get-Date).ToUniversalTime().ToString(\"yyyy-MM-ddTHH:mm:ssZ\")\nAdd-Content -Path {log} -Value \"{{`\"step`\":{i},`\"name`\":`\"{name}`\",`\"status`\":`\"running`\",`\"started`\":`\"$started`\"}}\"\nGet-Content {prompt} | & {agent_bin} {flags} *>> {output}\n$finished = (Get-Date).ToUniversalTime().ToString(\"yyyy-MM-ddTHH:mm:ssZ\")\nAdd-Content -Path {log} -Value \"{{`\"step`\":{i},`\"name`\":`\"{name}`\",`\"status`\":`\"completed`\",`\"finished`\":`\"$finished`\"}}\"\n",
            name = step.name,
            agent_bin = bat_quote(args.agent_binary),
        );
    }

    let done = bat_quote(&args.done_path.to_string_lossy());
    let _ = write!(
        body,
        "$finished = (Get-Date).ToUniversalTime().ToString(\"yyyy-MM-ddTHH:mm:ssZ\")\nSet-Content -Path {done} -Value \"{{`\"status`\":`\"completed`\",`\"finished`\":`\"$finished`\"}}\"\n"
    );

    std::fs::write(path, body)
}
