//! Session Store (C8): the per-session enriched record, its bounded
//! mutation rules, and derived status classification.

pub mod record;
pub mod store;

pub use record::{basename_of, RecentOp, SessionRecord, SCHEMA_VERSION};
pub use store::{
    append_session_event, derive_status, list_sessions, load_session, save_session, session_path,
    sessions_log_path,
};
