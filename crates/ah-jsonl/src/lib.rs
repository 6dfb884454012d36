//! Bounded JSONL reading, shared by the inbox/mailbox service and the
//! activity-log readers (spec.md §4.4).

use std::path::Path;

use serde_json::Value;

pub const DEFAULT_MAX_BYTES: usize = 256 * 1024;
pub const DEFAULT_MAX_LINES: usize = 500;

/// Result of a bounded JSONL read.
#[derive(Debug, Clone, Default)]
pub struct BoundedRead {
    pub items: Vec<Value>,
    pub truncated: bool,
    pub total_lines: usize,
}

/// Read `path`, enforcing `max_bytes` (truncating the tail if exceeded),
/// split on newlines, enforce `max_lines` (keep the first `max_lines`),
/// parse each line as JSON, skipping unparseable lines. `truncated` is set
/// if either cap fired. Missing files read as empty, not an error.
pub fn read_bounded(path: &Path, max_bytes: usize, max_lines: usize) -> BoundedRead {
    let raw = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => return BoundedRead::default(),
    };

    let byte_truncated = raw.len() > max_bytes;
    let slice = if byte_truncated { &raw[..max_bytes] } else { &raw[..] };
    let text = String::from_utf8_lossy(slice);

    let all_lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let total_lines = all_lines.len();
    let line_truncated = total_lines > max_lines;
    let kept = if line_truncated { &all_lines[..max_lines] } else { &all_lines[..] };

    let items = kept
        .iter()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .collect();

    BoundedRead {
        items,
        truncated: byte_truncated || line_truncated,
        total_lines,
    }
}

/// Read the last `n` JSON lines of `path` (used by the conflict detector's
/// 100-entry activity window). Unparseable lines are skipped; this never
/// errors, per spec.md §7's "internal I/O failures are swallowed at read
/// sites" rule.
pub fn read_tail(path: &Path, n: usize) -> Vec<Value> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(_) => return Vec::new(),
    };
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..]
        .iter()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .collect()
}

/// Append a single line (a JSON value, serialized compactly, plus `\n`) to
/// `path`, creating it if absent. Callers are expected to hold whatever
/// lock protects concurrent appenders (activity log, rate window).
pub fn append_line(path: &Path, value: &Value) -> std::io::Result<()> {
    use std::io::Write;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let line = serde_json::to_string(value).unwrap_or_default();
    writeln!(file, "{line}")?;
    Ok(())
}

/// Truncate `path` to its last `keep` lines if it currently has more than
/// `threshold` lines (used by `sessions.jsonl` and `activity.jsonl`
/// rotation in spec.md §4.7).
pub fn truncate_tail(path: &Path, threshold: usize, keep: usize) -> std::io::Result<()> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= threshold {
        return Ok(());
    }
    let start = lines.len().saturating_sub(keep);
    let new_content = lines[start..].join("\n") + "\n";
    std::fs::write(path, new_content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_bounded_skips_unparseable_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("x.jsonl");
        std::fs::write(&path, "{\"a\":1}\nnot json\n{\"a\":2}\n").unwrap();

        let result = read_bounded(&path, DEFAULT_MAX_BYTES, DEFAULT_MAX_LINES);
        assert_eq!(result.items.len(), 2);
        assert!(!result.truncated);
    }

    #[test]
    fn read_bounded_flags_line_truncation() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("x.jsonl");
        let content: String = (0..10).map(|i| format!("{{\"i\":{i}}}\n")).collect();
        std::fs::write(&path, content).unwrap();

        let result = read_bounded(&path, DEFAULT_MAX_BYTES, 5);
        assert_eq!(result.items.len(), 5);
        assert!(result.truncated);
        assert_eq!(result.total_lines, 10);
    }

    #[test]
    fn read_bounded_flags_byte_truncation() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("x.jsonl");
        let content: String = (0..1000).map(|i| format!("{{\"i\":{i}}}\n")).collect();
        std::fs::write(&path, content).unwrap();

        let result = read_bounded(&path, 100, DEFAULT_MAX_LINES);
        assert!(result.truncated);
    }

    #[test]
    fn read_bounded_missing_file_is_empty_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing.jsonl");
        let result = read_bounded(&path, DEFAULT_MAX_BYTES, DEFAULT_MAX_LINES);
        assert!(result.items.is_empty());
        assert!(!result.truncated);
    }

    #[test]
    fn append_and_tail_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("activity.jsonl");
        for i in 0..5 {
            append_line(&path, &json!({"i": i})).unwrap();
        }
        let tail = read_tail(&path, 2);
        assert_eq!(tail, vec![json!({"i": 3}), json!({"i": 4})]);
    }

    #[test]
    fn truncate_tail_keeps_most_recent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sessions.jsonl");
        for i in 0..250 {
            append_line(&path, &json!({"i": i})).unwrap();
        }
        truncate_tail(&path, 200, 150).unwrap();
        let remaining = std::fs::read_to_string(&path).unwrap();
        let count = remaining.lines().count();
        assert_eq!(count, 150);
        assert!(remaining.contains("\"i\":249"));
        assert!(!remaining.contains("\"i\":0}"));
    }
}
