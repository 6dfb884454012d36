//! Windows attention signal: a one-shot PowerShell script that activates the
//! tab whose title contains `agent-<sid>` and sends a single Enter keystroke
//! (spec.md §4.15). The script is deleted immediately after it runs.

use ah_session::SessionRecord;

#[cfg(windows)]
pub fn ring(record: &SessionRecord) -> bool {
    let short_id = &record.session;
    let script = format!(
        "$w = New-Object -ComObject WScript.Shell\n\
         if ($w.AppActivate('agent-{short_id}')) {{ $w.SendKeys('~') }}\n"
    );

    let script_path = std::env::temp_dir().join(format!("agent-hub-wake-{short_id}.ps1"));
    if std::fs::write(&script_path, script).is_err() {
        return false;
    }

    let result = std::process::Command::new("powershell.exe")
        .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-File"])
        .arg(&script_path)
        .status()
        .map(|s| s.success())
        .unwrap_or(false);

    let _ = std::fs::remove_file(&script_path);
    result
}

#[cfg(not(windows))]
pub fn ring(_record: &SessionRecord) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(windows))]
    fn ring_is_a_no_op_off_windows() {
        let record = SessionRecord::new("abcd1234", "proj", "/tmp");
        assert!(!ring(&record));
    }
}
