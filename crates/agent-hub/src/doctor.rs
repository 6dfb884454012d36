//! `agent-hub doctor`: a read-only report on state-root health. Touches
//! nothing on disk.

use std::path::Path;

use ah_config::AppConfig;

pub fn run(root: &Path, config: &AppConfig) -> anyhow::Result<()> {
    println!("state root: {}", root.display());
    println!("agent binary: {}", config.agent_binary);
    println!("test mode: {}", config.test_mode);
    println!();

    for (label, dir) in [
        ("terminals", ah_config::terminals_dir(root)),
        ("session-cache", ah_config::session_cache_dir(root)),
        ("inbox", ah_config::inbox_dir(root)),
        ("results", ah_config::results_dir(root)),
        ("tasks", ah_config::tasks_dir(root)),
        ("teams", ah_config::teams_dir(root)),
    ] {
        let exists = dir.is_dir();
        println!("{label:<14} {:<5} {}", exists, dir.display());
    }

    let now = ah_core::now();
    let sessions = ah_session::list_sessions(root);
    let mut active = 0;
    let mut idle = 0;
    let mut stale = 0;
    let mut closed = 0;
    for session in &sessions {
        match ah_session::derive_status(session, now) {
            ah_core::SessionStatus::Active => active += 1,
            ah_core::SessionStatus::Idle => idle += 1,
            ah_core::SessionStatus::Stale => stale += 1,
            ah_core::SessionStatus::Closed => closed += 1,
        }
    }

    println!();
    println!(
        "sessions: {} total (active={active} idle={idle} stale={stale} closed={closed})",
        sessions.len()
    );

    Ok(())
}
