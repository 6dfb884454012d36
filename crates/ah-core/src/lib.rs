//! Shared types and error taxonomy for the agent-hub workspace.
//!
//! Independent crate with no internal `ah-*` dependencies.

pub mod error;
pub mod types;

pub use error::{HubError, Result};
pub use types::{
    Layout, MessagePriority, Platform, Priority, SessionStatus, TaskStatus, WorkerMode,
    WorkerStatus,
};

use chrono::{DateTime, Utc};

/// Current wall-clock time. Centralized so tests can swap it if ever needed.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
