//! State root resolution and coordinator configuration.
//!
//! The on-disk layout is rooted at a single state directory, by default
//! `<home>/.claude/` (spec.md §3), owner-restricted by `ah-fs`. Everything
//! an operator can tune lives in one optional `config.toml` at the root of
//! that directory; absence means every default below applies.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Resolve the state root: `AGENT_HUB_STATE_ROOT` env override, else
/// `<home>/.claude`.
pub fn state_root() -> PathBuf {
    if let Ok(over) = std::env::var("AGENT_HUB_STATE_ROOT") {
        return PathBuf::from(over);
    }
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".claude"))
        .unwrap_or_else(|| std::env::temp_dir().join(".claude"))
}

pub fn terminals_dir(root: &Path) -> PathBuf {
    root.join("terminals")
}

pub fn session_cache_dir(root: &Path) -> PathBuf {
    root.join("session-cache")
}

pub fn inbox_dir(root: &Path) -> PathBuf {
    terminals_dir(root).join("inbox")
}

pub fn results_dir(root: &Path) -> PathBuf {
    terminals_dir(root).join("results")
}

pub fn tasks_dir(root: &Path) -> PathBuf {
    terminals_dir(root).join("tasks")
}

pub fn teams_dir(root: &Path) -> PathBuf {
    terminals_dir(root).join("teams")
}

/// Coordinator/hook tunables. Everything here has a spec-mandated default
/// (spec.md §4.2, §4.4, §4.9.1, §4.16).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent_binary: String,
    pub rate_limit_per_minute: u32,
    pub heartbeat_cooldown_secs: u64,
    pub stale_check_cooldown_secs: u64,
    pub rate_lock_budget_secs: u64,
    pub rate_lock_stale_secs: u64,
    pub gc_ttl_hours: i64,
    pub mailbox_max_bytes: usize,
    pub mailbox_max_lines: usize,
    /// Suppresses hardening failures in `ah-fs` (sandboxed CI). Mirrors
    /// `AGENT_HUB_TEST_MODE`.
    pub test_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agent_binary: "claude".to_string(),
            rate_limit_per_minute: 120,
            heartbeat_cooldown_secs: 5,
            stale_check_cooldown_secs: 60,
            rate_lock_budget_secs: 2,
            rate_lock_stale_secs: 15,
            gc_ttl_hours: 24,
            mailbox_max_bytes: 256 * 1024,
            mailbox_max_lines: 500,
            test_mode: false,
        }
    }
}

impl AppConfig {
    /// Load `<state_root>/config.toml`, falling back to defaults when
    /// missing. `AGENT_HUB_TEST_MODE=1` always forces `test_mode = true`
    /// regardless of what the file says.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.toml");
        let mut cfg = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        if std::env::var("AGENT_HUB_TEST_MODE").is_ok_and(|v| v == "1" || v == "true") {
            cfg.test_mode = true;
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent_binary, "claude");
        assert_eq!(cfg.rate_limit_per_minute, 120);
        assert_eq!(cfg.heartbeat_cooldown_secs, 5);
        assert_eq!(cfg.stale_check_cooldown_secs, 60);
        assert_eq!(cfg.mailbox_max_bytes, 262_144);
        assert_eq!(cfg.mailbox_max_lines, 500);
        assert_eq!(cfg.gc_ttl_hours, 24);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.rate_limit_per_minute, 120);
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "rate_limit_per_minute = 30\nagent_binary = \"codex\"\n",
        )
        .unwrap();
        let cfg = AppConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.rate_limit_per_minute, 30);
        assert_eq!(cfg.agent_binary, "codex");
        // Untouched fields keep their defaults.
        assert_eq!(cfg.gc_ttl_hours, 24);
    }

    #[test]
    fn state_root_honors_env_override() {
        // SAFETY: test is single-threaded for this env var's lifetime within this process;
        // the harness runs each test in its own thread but this var is unique to this test.
        unsafe { std::env::set_var("AGENT_HUB_STATE_ROOT", "/tmp/agent-hub-test-root") };
        assert_eq!(state_root(), PathBuf::from("/tmp/agent-hub-test-root"));
        unsafe { std::env::remove_var("AGENT_HUB_STATE_ROOT") };
    }
}
