//! Shell-metacharacter escaping for the two script dialects the launcher
//! emits into (spec.md §4.5, §9 "Shell command construction"). Neither
//! helper is used to build a string handed to a shell interpreter directly
//! from user input — they quote text that is embedded inside a *generated
//! script file*, which is itself invoked via argv, never `sh -c "$str"`.

/// POSIX single-quote escaping: wrap in `'...'`, escaping any embedded
/// single quote as `'\''`.
pub fn posix_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Windows `.bat` quoting: wrap in `"..."` and escape cmd.exe metacharacters
/// `& | > < ^ ! %` (and escape the caret itself, which is cmd's own escape
/// character).
pub fn bat_quote(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len() + 2);
    for ch in s.chars() {
        if matches!(ch, '&' | '|' | '>' | '<' | '^' | '!' | '%') {
            escaped.push('^');
        }
        escaped.push(ch);
    }
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posix_quote_escapes_embedded_quote() {
        assert_eq!(posix_quote("it's fine"), r"'it'\''s fine'");
    }

    #[test]
    fn posix_quote_wraps_plain_text() {
        assert_eq!(posix_quote("hello world"), "'hello world'");
    }

    #[test]
    fn bat_quote_escapes_metacharacters() {
        assert_eq!(bat_quote("a & b"), "\"a ^& b\"");
        assert_eq!(bat_quote("100% done"), "\"100^% done\"");
    }

    #[test]
    fn bat_quote_wraps_plain_text() {
        assert_eq!(bat_quote("hello"), "\"hello\"");
    }
}
