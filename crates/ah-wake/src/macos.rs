//! macOS attention signal: an AppleScript that locates the matching iTerm2
//! session by TTY (preferred) or tab name, or a Terminal.app tab by name,
//! and issues a single Enter keystroke — never message content (spec.md
//! §4.15).

use ah_session::SessionRecord;

#[cfg(target_os = "macos")]
pub fn ring(record: &SessionRecord) -> bool {
    let short_id = &record.session;
    let tab_name = format!("agent-{short_id}");
    let tty = record.tty.clone().unwrap_or_default();

    let script = format!(
        r#"
        tell application "iTerm2"
            repeat with w in windows
                repeat with t in tabs of w
                    repeat with s in sessions of t
                        if (tty of s is "{tty}") or (name of t contains "{tab_name}") then
                            tell s to write text "" newline NO
                            return "ok"
                        end if
                    end repeat
                end repeat
            end repeat
        end tell
        tell application "Terminal"
            repeat with w in windows
                repeat with t in tabs of w
                    if custom title of t contains "{tab_name}" then
                        do script "" in t
                        return "ok"
                    end if
                end repeat
            end repeat
        end tell
        return "miss"
        "#
    );

    std::process::Command::new("osascript")
        .arg("-e")
        .arg(&script)
        .output()
        .map(|out| out.status.success() && String::from_utf8_lossy(&out.stdout).trim() == "ok")
        .unwrap_or(false)
}

#[cfg(not(target_os = "macos"))]
pub fn ring(_record: &SessionRecord) -> bool {
    false
}
