//! Owner-only directory/file creation, with defensive re-hardening on every
//! open-for-write (spec.md §4.1).

use std::path::Path;

use ah_core::{HubError, Result};
use tracing::warn;

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Create `path` as a directory (recursively) with mode 0700, verifying on
/// every segment that already existed that it is not a symlink and is owned
/// by the current effective user. In `test_mode`, violations are logged as
/// warnings instead of raising a hardening error.
pub fn ensure_dir(path: &Path, test_mode: bool) -> Result<()> {
    if path.exists() {
        return verify_existing_dir(path, test_mode);
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            ensure_dir(parent, test_mode)?;
        }
    }
    std::fs::create_dir(path)?;
    set_dir_mode(path)?;
    harden_windows_acl(path, test_mode)?;
    Ok(())
}

fn verify_existing_dir(path: &Path, test_mode: bool) -> Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() {
        return hardening_violation(
            test_mode,
            format!("{} is a symlink; refusing to use as a state directory", path.display()),
        );
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let euid = current_euid();
        if meta.uid() != euid {
            return hardening_violation(
                test_mode,
                format!("{} is not owned by the current user", path.display()),
            );
        }
    }
    set_dir_mode(path)?;
    Ok(())
}

fn hardening_violation(test_mode: bool, message: String) -> Result<()> {
    if test_mode {
        warn!("{message} (suppressed: test mode)");
        Ok(())
    } else {
        Err(HubError::hardening(message))
    }
}

#[cfg(unix)]
fn current_euid() -> u32 {
    // SAFETY: geteuid has no preconditions.
    unsafe { libc::geteuid() }
}

#[cfg(unix)]
fn set_dir_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(DIR_MODE))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_mode(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_file_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(FILE_MODE))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path) -> Result<()> {
    Ok(())
}

/// Re-chmod a file to 0600 right before/after a write, defensively. Callers
/// hold a `File` open for write; this targets the path on disk.
pub fn harden_file(path: &Path) -> Result<()> {
    set_file_mode(path)
}

/// On Windows, strip inherited ACEs and broad principals ("Everyone",
/// "Users", "Authenticated Users") via `icacls`, then read the ACL back and
/// fail closed if the current user's ACE is missing, inheritance remains,
/// or a broad principal survives. No-op on non-Windows targets.
#[cfg(windows)]
pub fn harden_windows_acl(path: &Path, test_mode: bool) -> Result<()> {
    use std::process::Command;

    let path_str = path.to_string_lossy().to_string();

    // Disable inheritance and strip existing ACEs, then grant the current
    // user full control. Never executed through a shell.
    let status = Command::new("icacls")
        .arg(&path_str)
        .arg("/inheritance:r")
        .arg("/grant:r")
        .arg(format!("{}:(OI)(CI)F", whoami_user()))
        .status();

    let status = match status {
        Ok(s) => s,
        Err(e) => {
            return hardening_violation(test_mode, format!("icacls spawn failed: {e}"));
        }
    };
    if !status.success() {
        return hardening_violation(test_mode, format!("icacls exited with {status}"));
    }

    let output = Command::new("icacls").arg(&path_str).output();
    let output = match output {
        Ok(o) => o,
        Err(e) => return hardening_violation(test_mode, format!("icacls read-back failed: {e}")),
    };
    let listing = String::from_utf8_lossy(&output.stdout);
    for broad in ["Everyone", "BUILTIN\\Users", "Authenticated Users"] {
        if listing.contains(broad) {
            return hardening_violation(
                test_mode,
                format!("{} still grants broad principal {broad}", path.display()),
            );
        }
    }
    if !listing.to_lowercase().contains(&whoami_user().to_lowercase()) {
        return hardening_violation(
            test_mode,
            format!("{} is missing the current user's ACE", path.display()),
        );
    }

    Ok(())
}

#[cfg(windows)]
fn whoami_user() -> String {
    std::env::var("USERNAME").unwrap_or_else(|_| "CURRENT_USER".to_string())
}

#[cfg(not(windows))]
pub fn harden_windows_acl(_path: &Path, _test_mode: bool) -> Result<()> {
    Ok(())
}
