//! Hook Runtime (C7): the five hook roles a host agent invokes synchronously
//! around every tool call (spec.md §4.7).

mod conflict_advisor;
mod end;
mod git;
mod heartbeat;
mod inbox;
mod payload;
mod plan;
mod register;
mod tty;

pub use conflict_advisor::conflict_advisor;
pub use end::end;
pub use heartbeat::heartbeat;
pub use inbox::surface_inbox;
pub use payload::{HookPayload, ToolInput};
pub use register::register;
