//! Bounded regex-based sanitizers for IDs, names, models, agent names,
//! directory paths, and TTY device paths (spec.md §4.3).
//!
//! Every validator here is total and side-effect-free; the dispatcher is
//! expected to catch their `Err` and render a validation-error response
//! without touching any state (spec.md §7).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ah_core::{HubError, Result};
use regex::Regex;

fn id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap())
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]{1,64}$").unwrap())
}

fn model_agent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._:-]{1,64}$").unwrap())
}

fn tty_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^/dev/(ttys?\d+|pts/\d+)$").unwrap())
}

/// `[A-Za-z0-9_-]{1,64}`, additionally rejecting `..` substrings.
pub fn validate_id(s: &str) -> Result<&str> {
    if s.contains("..") || !id_re().is_match(s) {
        return Err(HubError::validation(format!("invalid id: '{s}'")));
    }
    Ok(s)
}

/// Like [`validate_id`] but requires length >= 8 and returns the first 8
/// characters (the canonical "short session id" used in file names).
pub fn validate_short_session_id(s: &str) -> Result<String> {
    validate_id(s)?;
    if s.len() < 8 {
        return Err(HubError::validation(format!(
            "session id '{s}' is shorter than 8 characters"
        )));
    }
    Ok(s.chars().take(8).collect())
}

/// `[A-Za-z0-9._-]{1,64}`, with normalization: runs of disallowed characters
/// become a single `-`, leading dots/hyphens and trailing hyphens/dots are
/// trimmed. The normalized form always matches `name_re` (or is rejected if
/// normalization leaves nothing).
pub fn sanitize_name(s: &str) -> Result<String> {
    if s.is_empty() {
        return Err(HubError::validation("name must not be empty"));
    }
    if name_re().is_match(s) {
        return Ok(s.to_string());
    }

    static DISALLOWED: OnceLock<Regex> = OnceLock::new();
    let disallowed = DISALLOWED.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());
    let collapsed = disallowed.replace_all(s, "-");
    let trimmed = collapsed
        .trim_start_matches(['.', '-'])
        .trim_end_matches(['-', '.']);

    if trimmed.is_empty() {
        return Err(HubError::validation(format!(
            "name '{s}' has no valid characters after normalization"
        )));
    }
    let truncated: String = trimmed.chars().take(64).collect();
    Ok(truncated)
}

/// `[A-Za-z0-9._:-]{1,64}`; used for model identifiers, which may not be
/// empty.
pub fn validate_model(s: &str) -> Result<&str> {
    if !model_agent_re().is_match(s) {
        return Err(HubError::validation(format!("invalid model: '{s}'")));
    }
    Ok(s)
}

/// As [`validate_model`], but an empty string is allowed (agent is
/// optional).
pub fn validate_agent(s: &str) -> Result<&str> {
    if s.is_empty() {
        return Ok(s);
    }
    if !model_agent_re().is_match(s) {
        return Err(HubError::validation(format!("invalid agent: '{s}'")));
    }
    Ok(s)
}

/// Non-empty, contains no `NUL`, `CR`, `LF`, or `"`.
pub fn validate_directory(s: &str) -> Result<&str> {
    if s.is_empty() {
        return Err(HubError::validation("directory must not be empty"));
    }
    if s.contains(['\0', '\r', '\n', '"']) {
        return Err(HubError::validation(format!(
            "directory contains a forbidden character: '{s}'"
        )));
    }
    Ok(s)
}

/// Exactly matches `/dev/ttys?\d+` or `/dev/pts/\d+`.
pub fn validate_safe_tty_path(s: &str) -> Option<&str> {
    if tty_re().is_match(s) { Some(s) } else { None }
}

/// Resolve `path` against `cwd` if relative; if the resulting path exists,
/// resolve symlinks; canonicalize separators to `/`; lowercase on Windows.
/// Returns `None` for empty input.
pub fn normalize_file_path(path: &str, cwd: &Path) -> Option<String> {
    if path.is_empty() {
        return None;
    }

    let candidate = PathBuf::from(path);
    let absolute = if candidate.is_absolute() {
        candidate
    } else {
        cwd.join(candidate)
    };

    let resolved = if absolute.exists() {
        std::fs::canonicalize(&absolute).unwrap_or(absolute)
    } else {
        absolute
    };

    let mut s = resolved.to_string_lossy().replace('\\', "/");
    if cfg!(windows) {
        s = s.to_lowercase();
    }
    Some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_id_accepts_well_formed() {
        assert!(validate_id("abcd1234").is_ok());
        assert!(validate_id("W1700000000000").is_ok());
    }

    #[test]
    fn validate_id_rejects_dotdot_and_bad_chars() {
        assert!(validate_id("../etc/passwd").is_err());
        assert!(validate_id("has space").is_err());
        assert!(validate_id("").is_err());
        assert!(validate_id(&"a".repeat(65)).is_err());
    }

    #[test]
    fn short_session_id_takes_first_eight() {
        assert_eq!(
            validate_short_session_id("abcdEFGH1234").unwrap(),
            "abcdEFGH"
        );
    }

    #[test]
    fn short_session_id_rejects_too_short() {
        assert!(validate_short_session_id("abc").is_err());
    }

    #[test]
    fn sanitize_name_passes_through_valid() {
        assert_eq!(sanitize_name("my.name-1").unwrap(), "my.name-1");
    }

    #[test]
    fn sanitize_name_collapses_and_trims() {
        assert_eq!(sanitize_name("  weird/name!!").unwrap(), "weird-name");
        assert_eq!(sanitize_name("--leading").unwrap(), "leading");
        assert_eq!(sanitize_name("trailing--").unwrap(), "trailing");
        assert_eq!(sanitize_name("...only-dots...").unwrap(), "only-dots");
    }

    #[test]
    fn sanitize_name_rejects_all_disallowed() {
        assert!(sanitize_name("!!!").is_err());
    }

    #[test]
    fn validate_model_rejects_empty() {
        assert!(validate_model("").is_err());
        assert!(validate_model("claude-3:opus").is_ok());
    }

    #[test]
    fn validate_agent_allows_empty() {
        assert_eq!(validate_agent("").unwrap(), "");
        assert!(validate_agent("bad agent").is_err());
    }

    #[test]
    fn validate_directory_rejects_control_chars() {
        assert!(validate_directory("").is_err());
        assert!(validate_directory("/tmp/has\nnewline").is_err());
        assert!(validate_directory("/tmp/has\"quote").is_err());
        assert!(validate_directory("/tmp/fine").is_ok());
    }

    #[test]
    fn safe_tty_path_matches_known_forms() {
        assert!(validate_safe_tty_path("/dev/ttys003").is_some());
        assert!(validate_safe_tty_path("/dev/pts/4").is_some());
        assert!(validate_safe_tty_path("/dev/null").is_none());
        assert!(validate_safe_tty_path("/dev/ttys003; rm -rf").is_none());
    }

    #[test]
    fn normalize_file_path_returns_none_for_empty() {
        let cwd = PathBuf::from("/tmp");
        assert_eq!(normalize_file_path("", &cwd), None);
    }

    #[test]
    fn normalize_file_path_resolves_relative_against_cwd() {
        let cwd = PathBuf::from("/tmp/project");
        let result = normalize_file_path("src/main.rs", &cwd).unwrap();
        assert!(result.ends_with("/tmp/project/src/main.rs") || result.contains("project/src/main.rs"));
    }

    #[test]
    fn normalize_file_path_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("x.ts");
        std::fs::write(&file, b"").unwrap();
        let cwd = tmp.path().to_path_buf();

        let once = normalize_file_path(file.to_str().unwrap(), &cwd).unwrap();
        let twice = normalize_file_path(&once, &cwd).unwrap();
        assert_eq!(once, twice);
    }
}
