//! The JSON payload every hook reads from stdin (spec.md §6.2).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookPayload {
    pub session_id: String,
    pub cwd: String,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: ToolInput,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_payload() {
        let raw = r#"{"session_id":"abcd1234xyz","cwd":"/tmp","tool_name":"Write","tool_input":{"file_path":"/tmp/a.rs"}}"#;
        let payload: HookPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.session_id, "abcd1234xyz");
        assert_eq!(payload.tool_input.file_path.as_deref(), Some("/tmp/a.rs"));
        assert!(payload.tool_input.command.is_none());
    }

    #[test]
    fn tool_input_defaults_when_absent() {
        let raw = r#"{"session_id":"abcd1234xyz","cwd":"/tmp","tool_name":"Bash"}"#;
        let payload: HookPayload = serde_json::from_str(raw).unwrap();
        assert!(payload.tool_input.file_path.is_none());
    }
}
