//! Linux attention signal: a single newline write to the session's
//! controlling TTY (spec.md §4.15). Never writes message content to the
//! terminal — only an attention keystroke.

use std::io::Write;

use ah_session::SessionRecord;

pub fn ring(record: &SessionRecord) -> bool {
    let Some(tty) = &record.tty else { return false };
    let Some(tty) = ah_validate::validate_safe_tty_path(tty) else {
        return false;
    };

    std::fs::OpenOptions::new()
        .write(true)
        .open(tty)
        .and_then(|mut f| f.write_all(b"\n"))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_fails_closed_without_a_tty() {
        let record = SessionRecord::new("abcd1234", "proj", "/tmp");
        assert!(!ring(&record));
    }

    #[test]
    fn ring_rejects_unsafe_tty_path() {
        let mut record = SessionRecord::new("abcd1234", "proj", "/tmp");
        record.tty = Some("/etc/passwd".to_string());
        assert!(!ring(&record));
    }
}
