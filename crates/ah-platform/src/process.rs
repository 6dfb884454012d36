//! Process Supervisor (C6): PID liveness probe and termination across
//! Unix/Windows. Both operations validate the PID string is a positive
//! integer before touching the OS.

/// Parse a PID string, accepting only positive integers (spec.md §4.6).
pub fn parse_pid(raw: &str) -> Option<u32> {
    let n: i64 = raw.trim().parse().ok()?;
    if n > 0 { u32::try_from(n).ok() } else { None }
}

/// Is the process with this PID alive? Non-integer/non-positive PID
/// strings are `false`, not an error.
pub fn is_alive(raw_pid: &str) -> bool {
    let Some(pid) = parse_pid(raw_pid) else {
        return false;
    };
    is_alive_pid(pid)
}

#[cfg(unix)]
pub fn is_alive_pid(pid: u32) -> bool {
    // SAFETY: signal 0 performs no action beyond existence/permission checks.
    let ret = unsafe { libc::kill(pid as libc::pid_t, 0) };
    ret == 0
}

#[cfg(windows)]
pub fn is_alive_pid(pid: u32) -> bool {
    let output = std::process::Command::new("tasklist")
        .args(["/FI", &format!("PID eq {pid}"), "/NH"])
        .output();
    match output {
        Ok(out) => String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()),
        Err(_) => false,
    }
}

/// Terminate the process. On Unix, sends `SIGTERM` to the process group
/// first, then falls back to the process itself. On Windows, forcibly
/// terminates the whole tree via `taskkill /T /F`.
pub fn kill(raw_pid: &str) -> bool {
    let Some(pid) = parse_pid(raw_pid) else {
        return false;
    };
    kill_pid(pid)
}

#[cfg(unix)]
pub fn kill_pid(pid: u32) -> bool {
    // SAFETY: kill(2) with a negative pid targets the process group; both
    // calls are best-effort and their return codes are only used for
    // logging, never propagated as a hard failure (kill_worker is a soft
    // cancel per spec.md §5).
    unsafe {
        let group_ret = libc::kill(-(pid as libc::pid_t), libc::SIGTERM);
        if group_ret == 0 {
            return true;
        }
        libc::kill(pid as libc::pid_t, libc::SIGTERM) == 0
    }
}

#[cfg(windows)]
pub fn kill_pid(pid: u32) -> bool {
    std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
