//! Prompt assembly for a spawned worker (spec.md §4.11 step 5).

use std::path::Path;

use ah_core::WorkerMode;

const CONTEXT_PREAMBLE_MAX_BYTES: usize = 3 * 1024;

const INTERACTIVE_HEADER: &str = "You may receive follow-up messages from the coordinating session during \
this task; treat any `--- INCOMING MESSAGES FROM COORDINATOR ---` block in your input as directives to \
act on immediately.\n\n";

const REPORT_POSTSCRIPT: &str = "\n\nWhen you finish, report concretely what you changed and why; do not end \
without a summary.\n";

/// Build the final prompt written to `<task>.prompt`: an optional
/// interactive-mode header, up to 3 KiB of prior coder context if present,
/// the task prompt itself, and a closing instruction to report findings.
pub fn assemble(root: &Path, prompt: &str, mode: WorkerMode) -> String {
    let mut out = String::new();

    if mode == WorkerMode::Interactive {
        out.push_str(INTERACTIVE_HEADER);
    }

    if let Some(context) = prior_context(root) {
        out.push_str(&context);
        out.push_str("\n\n---\n\n");
    }

    out.push_str(prompt);
    out.push_str(REPORT_POSTSCRIPT);
    out
}

fn prior_context(root: &Path) -> Option<String> {
    let path = ah_config::session_cache_dir(root).join("coder-context.md");
    let raw = std::fs::read(path).ok()?;
    let truncated = &raw[..raw.len().min(CONTEXT_PREAMBLE_MAX_BYTES)];
    Some(String::from_utf8_lossy(truncated).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_appends_report_postscript() {
        let tmp = tempfile::tempdir().unwrap();
        let prompt = assemble(tmp.path(), "fix the bug", WorkerMode::Pipe);
        assert!(prompt.starts_with("fix the bug"));
        assert!(prompt.contains("report concretely"));
    }

    #[test]
    fn assemble_prepends_interactive_header_only_in_interactive_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let pipe = assemble(tmp.path(), "task", WorkerMode::Pipe);
        let interactive = assemble(tmp.path(), "task", WorkerMode::Interactive);
        assert!(!pipe.contains("INCOMING MESSAGES"));
        assert!(interactive.contains("INCOMING MESSAGES"));
    }

    #[test]
    fn assemble_prepends_truncated_prior_context_when_present() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_dir = ah_config::session_cache_dir(tmp.path());
        std::fs::create_dir_all(&cache_dir).unwrap();
        let long_context = "y".repeat(5000);
        std::fs::write(cache_dir.join("coder-context.md"), &long_context).unwrap();

        let prompt = assemble(tmp.path(), "task", WorkerMode::Pipe);
        assert!(prompt.contains("yyy"));
        assert!(prompt.len() < 5000 + 200);
    }
}
