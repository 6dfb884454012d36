//! Crate-wide error taxonomy shared by every `ah-*` crate and the
//! coordinator dispatcher. Mirrors the severities the coordinator must
//! distinguish when rendering a response and, for worker/pipeline spawns,
//! when deciding whether to mark a meta file `failed`.

#[derive(thiserror::Error, Debug)]
pub enum HubError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("{0}")]
    PlatformLaunch(String),

    #[error("{0}")]
    Hardening(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HubError>;

impl HubError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn platform_launch(msg: impl Into<String>) -> Self {
        Self::PlatformLaunch(msg.into())
    }

    pub fn hardening(msg: impl Into<String>) -> Self {
        Self::Hardening(msg.into())
    }

    /// True only for the one error kind that must also mark a worker/pipeline
    /// meta file `failed` rather than simply returning a text response (§7).
    pub fn marks_meta_failed(&self) -> bool {
        matches!(self, Self::PlatformLaunch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_launch_marks_meta_failed() {
        assert!(HubError::platform_launch("no terminal").marks_meta_failed());
        assert!(!HubError::validation("bad id").marks_meta_failed());
    }
}
