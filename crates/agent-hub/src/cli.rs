//! CLI Surface (C21): argument parsing for the `agent-hub` binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agent-hub", version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the line-delimited JSON-RPC request/response loop over stdio.
    Serve,
    /// Hook Runtime entry points. Each reads a `HookPayload` JSON object
    /// from stdin and exits 2 (BLOCKED) only if the session id fails
    /// validation; every other failure is logged and swallowed.
    Hook {
        #[command(subcommand)]
        role: HookRole,
    },
    /// Report state-root health without mutating anything.
    Doctor,
}

#[derive(Subcommand, Clone, Copy)]
pub enum HookRole {
    Register,
    Heartbeat,
    End,
    Inbox,
    ConflictAdvisor,
}
