use serde::{Deserialize, Serialize};

/// Persisted session status. `Active`/`Idle`/`Stale` are derived from
/// `last_active` age by the session store; `Closed` is sticky and only set
/// by the session-end hook (spec.md §4.8).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Idle,
    Stale,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Stale => "stale",
            Self::Closed => "closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Worker lifecycle state (spec.md §3 Worker Meta).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl WorkerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Worker spawn mode: fire-and-forget or steerable via the inbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerMode {
    Pipe,
    Interactive,
}

/// Terminal layout requested for a new tab/split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Tab,
    Split,
}

/// Task board status (spec.md §3 Task Record / §4.13).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Sort ordinal used by `list_tasks` (spec.md §4.13).
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::InProgress => 0,
            Self::Pending => 1,
            Self::Completed => 2,
            Self::Cancelled => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task/message priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Mailbox message urgency (spec.md §4.9), distinct from task `Priority`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    #[default]
    Normal,
    Urgent,
}

/// The host platform the coordinator/launcher is running on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Darwin,
    Linux,
    Windows,
}

impl Platform {
    /// Current platform, overridable via `AGENT_HUB_PLATFORM` for tests
    /// (spec.md §6.4).
    pub fn detect() -> Self {
        if let Ok(over) = std::env::var("AGENT_HUB_PLATFORM") {
            return match over.as_str() {
                "darwin" => Self::Darwin,
                "win32" | "windows" => Self::Windows,
                _ => Self::Linux,
            };
        }
        if cfg!(target_os = "macos") {
            Self::Darwin
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_ordinal_orders_in_progress_first() {
        assert!(TaskStatus::InProgress.ordinal() < TaskStatus::Pending.ordinal());
        assert!(TaskStatus::Pending.ordinal() < TaskStatus::Completed.ordinal());
        assert!(TaskStatus::Completed.ordinal() < TaskStatus::Cancelled.ordinal());
    }

    #[test]
    fn task_status_roundtrip() {
        for s in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
        ] {
            assert_eq!(TaskStatus::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn worker_status_terminal() {
        assert!(!WorkerStatus::Running.is_terminal());
        assert!(WorkerStatus::Completed.is_terminal());
        assert!(WorkerStatus::Cancelled.is_terminal());
        assert!(WorkerStatus::Failed.is_terminal());
    }
}
