//! `agent-hub`: the coordinator binary (spec.md §1). Three subcommands
//! share one lazily-prepared state root: `serve` runs the JSON-RPC loop a
//! host agent talks to via MCP, `hook` is invoked synchronously around
//! every tool call, and `doctor` reports state-root health.

mod cli;
mod dispatch;
mod doctor;
mod hooks;
mod state;
mod terminal;

use std::io::{self, BufRead, Write};

use clap::Parser;

use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let root = ah_config::state_root();
    let config = ah_config::AppConfig::load(&root)?;
    state::ensure_ready(&root, &config)?;

    match cli.command {
        Commands::Serve => serve(&root, &config),
        Commands::Hook { role } => hooks::run(&root, &config, role),
        Commands::Doctor => doctor::run(&root, &config),
    }
}

/// The JSON-RPC stdio loop: one request per line, one response per line,
/// flushed immediately so the host agent sees it without buffering delay.
fn serve(root: &std::path::Path, config: &ah_config::AppConfig) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = dispatch::handle_line(root, config, &line);
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }

    Ok(())
}
