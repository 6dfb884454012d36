//! Lazy state-root preparation: ensure every subdirectory exists and is
//! hardened, then run the Garbage Collector exactly once per process
//! (spec.md §9 "global state" — the GC-ran-this-boot flag is the only
//! justified process-global beyond the directory set).

use std::path::Path;
use std::sync::Once;

use ah_config::AppConfig;

static GC_ONCE: Once = Once::new();

pub fn ensure_ready(root: &Path, config: &AppConfig) -> anyhow::Result<()> {
    for dir in [
        ah_config::terminals_dir(root),
        ah_config::session_cache_dir(root),
        ah_config::inbox_dir(root),
        ah_config::results_dir(root),
        ah_config::tasks_dir(root),
        ah_config::teams_dir(root),
    ] {
        ah_fs::ensure_dir(&dir, config.test_mode)?;
    }

    GC_ONCE.call_once(|| {
        let counts = ah_gc::run(root, config);
        tracing::info!(
            sessions_removed = counts.sessions_removed,
            worker_artifacts_removed = counts.worker_artifacts_removed,
            pipelines_removed = counts.pipelines_removed,
            "garbage collection completed"
        );
    });

    Ok(())
}
