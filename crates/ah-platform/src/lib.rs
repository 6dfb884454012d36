//! Platform Launcher (C5) and Process Supervisor (C6).

pub mod detect;
pub mod exec;
pub mod launcher;
pub mod process;
pub mod quote;

pub use detect::detect_current_terminal_app;
pub use exec::execute;
pub use launcher::{plan_launch, LaunchSpec, TerminalApp};
pub use process::{is_alive, kill, parse_pid};
