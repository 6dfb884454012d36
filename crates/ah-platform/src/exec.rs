//! Executes a [`crate::launcher::LaunchSpec`] with no shell interpreter in
//! the middle — `Command::new(program).args(argv)` only.

use ah_core::{HubError, Result};

use crate::launcher::LaunchSpec;

/// Spawn `spec`. Detached launches are spawned and immediately released
/// (caller does not wait); terminal-emulator launches are spawned the same
/// way since the emulator itself backgrounds the requested tab/split.
/// Returns the spawned process's PID.
pub fn execute(spec: &LaunchSpec) -> Result<u32> {
    let mut cmd = std::process::Command::new(&spec.program);
    cmd.args(&spec.argv);
    cmd.stdin(std::process::Stdio::null());
    cmd.stdout(std::process::Stdio::null());
    cmd.stderr(std::process::Stdio::null());

    let child = cmd
        .spawn()
        .map_err(|e| HubError::platform_launch(format!("failed to launch {}: {e}", spec.program)))?;
    Ok(child.id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_runs_a_real_program() {
        let spec = LaunchSpec {
            program: "true".to_string(),
            argv: vec![],
            detached: true,
        };
        let pid = execute(&spec);
        assert!(pid.is_ok());
    }

    #[test]
    fn execute_surfaces_platform_launch_error_for_missing_program() {
        let spec = LaunchSpec {
            program: "definitely-not-a-real-binary-xyz".to_string(),
            argv: vec![],
            detached: true,
        };
        let result = execute(&spec);
        assert!(matches!(result, Err(HubError::PlatformLaunch(_))));
    }
}
