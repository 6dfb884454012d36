//! Hook Runtime entry points (C7 glue): read a `HookPayload` from stdin,
//! dispatch to the matching `ah-hooks` function, print whatever it returns
//! to stdout, and apply the one BLOCKED contract (spec.md §5): exit 2 only
//! when the session id itself fails validation, never for any other
//! failure.

use std::io::Read;
use std::path::Path;

use ah_config::AppConfig;
use ah_core::HubError;
use ah_hooks::HookPayload;

use crate::cli::HookRole;

const EXIT_BLOCKED: i32 = 2;

pub fn run(root: &Path, config: &AppConfig, role: HookRole) -> anyhow::Result<()> {
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;
    let payload: HookPayload = match serde_json::from_str(&raw) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "hook payload did not parse, skipping");
            return Ok(());
        }
    };

    match role {
        HookRole::Register => handle(ah_hooks::register(&payload, root), |title| println!("{title}")),
        HookRole::Heartbeat => handle(ah_hooks::heartbeat(&payload, root, config), |()| {}),
        HookRole::End => handle(ah_hooks::end(&payload, root), |()| {}),
        HookRole::ConflictAdvisor => handle(ah_hooks::conflict_advisor(&payload, root), |()| {}),
        HookRole::Inbox => handle(ah_hooks::surface_inbox(&payload, root), |lines| {
            for line in lines {
                println!("{line}");
            }
        }),
    }

    Ok(())
}

fn handle<T>(result: ah_core::Result<T>, on_success: impl FnOnce(T)) {
    match result {
        Ok(value) => on_success(value),
        Err(HubError::Validation(msg)) => {
            eprintln!("BLOCKED: {msg}");
            std::process::exit(EXIT_BLOCKED);
        }
        Err(e) => {
            tracing::warn!(error = %e, "hook failed, continuing without blocking");
        }
    }
}
