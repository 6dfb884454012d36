//! Platform Launcher (C5): a pure mapping from `(platform, terminal-app,
//! command, layout)` to an argv. Never executes anything itself — see
//! [`crate::exec`] for that — so it can be unit-tested exhaustively without
//! touching real terminals.

use ah_core::{HubError, Layout, Platform, Result};

use crate::quote::{bat_quote, posix_quote};

/// Terminal application detected or requested for the launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalApp {
    ITerm2,
    AppleTerminal,
    WindowsTerminal,
    Cmd,
    GnomeTerminal,
    Konsole,
    Alacritty,
    Kitty,
    None,
}

/// A fully-resolved launch: program + argv, and whether the caller should
/// spawn it detached (no terminal emulator available, falling back to a
/// background shell).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub argv: Vec<String>,
    pub detached: bool,
}

fn apple_script_write_text(command: &str) -> String {
    // `write text` sends the whole command as one line, terminated by the
    // terminal emulator's own Return; the command string itself must not
    // contain embedded shell interpolation beyond what the generated
    // wrapper script already quoted.
    command.to_string()
}

/// Resolve `(platform, app, command, layout)` into a `LaunchSpec`.
/// `command` is expected to already be a path to a generated wrapper
/// script (hook scripts never interpolate raw user text into a shell).
pub fn plan_launch(
    platform: Platform,
    app: TerminalApp,
    command: &str,
    layout: Layout,
) -> Result<LaunchSpec> {
    match (platform, app) {
        (Platform::Darwin, TerminalApp::ITerm2) => {
            let script = match layout {
                Layout::Tab => format!(
                    "tell application \"iTerm2\"\n  tell current window\n    create tab with default profile\n    tell current session to write text {}\n  end tell\nend tell",
                    quoted_applescript_string(&apple_script_write_text(command))
                ),
                Layout::Split => format!(
                    "tell application \"iTerm2\"\n  tell current session of current window\n    split vertically with default profile\n    tell current session of current tab to write text {}\n  end tell\nend tell",
                    quoted_applescript_string(&apple_script_write_text(command))
                ),
            };
            Ok(LaunchSpec {
                program: "osascript".to_string(),
                argv: vec!["-e".to_string(), script],
                detached: false,
            })
        }
        (Platform::Darwin, TerminalApp::AppleTerminal) => {
            let script = format!(
                "tell application \"Terminal\" to do script {}",
                quoted_applescript_string(command)
            );
            Ok(LaunchSpec {
                program: "osascript".to_string(),
                argv: vec!["-e".to_string(), script],
                detached: false,
            })
        }
        (Platform::Darwin, TerminalApp::None) => Ok(LaunchSpec {
            program: "bash".to_string(),
            argv: vec!["-lc".to_string(), command.to_string()],
            detached: true,
        }),
        (Platform::Windows, TerminalApp::WindowsTerminal) => {
            let sub = match layout {
                Layout::Tab => "nt",
                Layout::Split => "sp",
            };
            let mut argv = vec!["-w".to_string(), "0".to_string(), sub.to_string()];
            if layout == Layout::Split {
                argv.push("-V".to_string());
            }
            argv.push("cmd".to_string());
            argv.push("/c".to_string());
            argv.push(bat_quote(command));
            Ok(LaunchSpec {
                program: "wt".to_string(),
                argv,
                detached: false,
            })
        }
        (Platform::Windows, TerminalApp::Cmd) => Ok(LaunchSpec {
            program: "cmd".to_string(),
            argv: vec![
                "/c".to_string(),
                "start".to_string(),
                "".to_string(),
                "cmd".to_string(),
                "/c".to_string(),
                bat_quote(command),
            ],
            detached: false,
        }),
        (Platform::Windows, TerminalApp::None) => Ok(LaunchSpec {
            program: "cmd".to_string(),
            argv: vec!["/c".to_string(), bat_quote(command)],
            detached: true,
        }),
        (Platform::Linux, TerminalApp::GnomeTerminal) => Ok(LaunchSpec {
            program: "gnome-terminal".to_string(),
            argv: vec![
                "--".to_string(),
                "bash".to_string(),
                "-c".to_string(),
                posix_quote(command),
            ],
            detached: false,
        }),
        (Platform::Linux, TerminalApp::Konsole) => Ok(LaunchSpec {
            program: "konsole".to_string(),
            argv: vec![
                "-e".to_string(),
                "bash".to_string(),
                "-c".to_string(),
                posix_quote(command),
            ],
            detached: false,
        }),
        (Platform::Linux, TerminalApp::Alacritty) => Ok(LaunchSpec {
            program: "alacritty".to_string(),
            argv: vec![
                "-e".to_string(),
                "bash".to_string(),
                "-c".to_string(),
                posix_quote(command),
            ],
            detached: false,
        }),
        (Platform::Linux, TerminalApp::Kitty) => {
            let launch_type = match layout {
                Layout::Tab => "tab",
                Layout::Split => "window",
            };
            Ok(LaunchSpec {
                program: "kitty".to_string(),
                argv: vec![
                    "@".to_string(),
                    "launch".to_string(),
                    format!("--type={launch_type}"),
                    "bash".to_string(),
                    "-c".to_string(),
                    posix_quote(command),
                ],
                detached: false,
            })
        }
        (Platform::Linux, TerminalApp::None) => Ok(LaunchSpec {
            program: "bash".to_string(),
            argv: vec!["-lc".to_string(), command.to_string()],
            detached: true,
        }),
        (platform, app) => Err(HubError::platform_launch(format!(
            "no launch mapping for platform {platform:?} / app {app:?}"
        ))),
    }
}

fn quoted_applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
