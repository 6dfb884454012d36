//! Path & Permission Library (C1) and Exclusive File Lock (C2).
//!
//! Independent crate with no internal `ah-*` dependencies beyond `ah-core`'s
//! error type.

pub mod lock;
pub mod perms;
pub mod rate_limit;

pub use lock::{
    acquire as acquire_lock, cooldown_gate, is_fresh as lock_is_fresh, try_acquire as try_acquire_lock,
    FileLock,
};
pub use perms::{ensure_dir, harden_file, harden_windows_acl};
pub use rate_limit::acquire as acquire_rate_limit;

use std::path::Path;

use ah_core::Result;

/// Write `contents` to `path` atomically: write to a sibling temp file,
/// harden its mode, then rename into place. Rename is atomic on the same
/// filesystem, satisfying invariant I7 (every write fully rewrites a
/// record).
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let tmp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("record"),
        std::process::id()
    ));
    std::fs::write(&tmp_path, contents)?;
    harden_file(&tmp_path)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
