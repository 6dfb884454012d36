//! Best-effort controlling-TTY detection for the register/heartbeat hooks.

#[cfg(unix)]
pub fn controlling_tty() -> Option<String> {
    use std::ffi::CStr;

    // SAFETY: ttyname(3) on a valid fd either returns a pointer to a static
    // buffer or null; both cases are checked before any further use.
    unsafe {
        let ptr = libc::ttyname(libc::STDIN_FILENO);
        if ptr.is_null() {
            return None;
        }
        CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
    }
}

#[cfg(not(unix))]
pub fn controlling_tty() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controlling_tty_does_not_panic() {
        let _ = controlling_tty();
    }
}
