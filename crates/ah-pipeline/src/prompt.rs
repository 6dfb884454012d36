//! Prior-context preamble shared with the Worker Supervisor's prompt
//! assembly (spec.md §4.12 step 2: "preambled with the same prior-context
//! block as workers"). Duplicated rather than imported to avoid a
//! dependency on `ah-worker`, which this crate has no other reason to need.

use std::path::Path;

const CONTEXT_PREAMBLE_MAX_BYTES: usize = 3 * 1024;

pub fn with_prior_context(root: &Path, prompt: &str) -> String {
    match prior_context(root) {
        Some(context) => format!("{context}\n\n---\n\n{prompt}"),
        None => prompt.to_string(),
    }
}

fn prior_context(root: &Path) -> Option<String> {
    let path = ah_config::session_cache_dir(root).join("coder-context.md");
    let raw = std::fs::read(path).ok()?;
    let truncated = &raw[..raw.len().min(CONTEXT_PREAMBLE_MAX_BYTES)];
    Some(String::from_utf8_lossy(truncated).to_string())
}
