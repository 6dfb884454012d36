//! Optional git-worktree isolation (spec.md §4.11 step 3). A hard failure
//! here fails the whole spawn — there is no silent fallback to the shared
//! working directory.

use std::path::Path;

use ah_core::{HubError, Result};

pub fn branch_name(task_id: &str) -> String {
    format!("worker/{task_id}")
}

/// Create `<directory>/.claude/worktrees/<task_id>` on a new branch
/// `worker/<task_id>`. Returns the worktree's absolute path.
pub fn create_worktree(directory: &str, task_id: &str) -> Result<String> {
    let worktree_path = Path::new(directory).join(".claude").join("worktrees").join(task_id);
    let branch = branch_name(task_id);

    let output = std::process::Command::new("git")
        .arg("worktree")
        .arg("add")
        .arg(&worktree_path)
        .arg("-b")
        .arg(&branch)
        .current_dir(directory)
        .output()
        .map_err(|e| HubError::conflict(format!("failed to run git worktree add: {e}")))?;

    if !output.status.success() {
        return Err(HubError::conflict(format!(
            "git worktree add failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    Ok(worktree_path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_name_is_namespaced_under_worker() {
        assert_eq!(branch_name("W123"), "worker/W123");
    }

    #[test]
    fn create_worktree_fails_hard_outside_a_git_repo() {
        let tmp = tempfile::tempdir().unwrap();
        let result = create_worktree(tmp.path().to_str().unwrap(), "W1");
        assert!(result.is_err());
    }
}
