//! Best-effort current-branch detection, walking up from `cwd` to find a
//! `.git` directory and reading its `HEAD` ref — no `git` subprocess spawn
//! needed for the common case.

use std::path::Path;

pub fn current_branch(cwd: &Path) -> Option<String> {
    let git_dir = find_git_dir(cwd)?;
    let head = std::fs::read_to_string(git_dir.join("HEAD")).ok()?;
    parse_head(&head)
}

fn find_git_dir(start: &Path) -> Option<std::path::PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(".git");
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

fn parse_head(head: &str) -> Option<String> {
    let head = head.trim();
    head.strip_prefix("ref: refs/heads/").map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_head_extracts_branch_name() {
        assert_eq!(
            parse_head("ref: refs/heads/main\n"),
            Some("main".to_string())
        );
        assert_eq!(
            parse_head("ref: refs/heads/feature/x\n"),
            Some("feature/x".to_string())
        );
    }

    #[test]
    fn parse_head_none_for_detached_head() {
        assert_eq!(parse_head("a1b2c3d4\n"), None);
    }

    #[test]
    fn current_branch_reads_from_git_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let git_dir = tmp.path().join(".git");
        std::fs::create_dir(&git_dir).unwrap();
        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/develop\n").unwrap();

        let nested = tmp.path().join("src").join("sub");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(current_branch(&nested), Some("develop".to_string()));
    }

    #[test]
    fn current_branch_none_without_git_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(current_branch(tmp.path()), None);
    }
}
