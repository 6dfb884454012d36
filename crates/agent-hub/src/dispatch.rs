//! Coordinator Server (C17): a line-delimited JSON-RPC 2.0 request/response
//! loop over stdio. Every operation is exposed as a `tools/call` whose
//! `name` selects the handler (spec.md §6.1).
//!
//! Every handler always returns a successful JSON-RPC result carrying a text
//! response — argument-extraction failures render as
//! `Invalid arguments for <op>: <message>`, domain failures render via their
//! own `Display`, and an unrecognized tool name renders as
//! `Unknown tool: <name>`. Only a malformed request line or an unknown
//! top-level JSON-RPC method produces a protocol-level error.

use std::path::Path;

use ah_config::AppConfig;
use ah_core::{HubError, Layout, MessagePriority, Priority, WorkerMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_MODEL: &str = "default";

type OpResult = std::result::Result<String, String>;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    method: String,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

/// Parse one line of input, route it, and serialize the response line.
pub fn handle_line(root: &Path, config: &AppConfig, line: &str) -> String {
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            return serde_json::to_string(&JsonRpcResponse {
                jsonrpc: "2.0",
                result: None,
                error: Some(JsonRpcError { code: -32700, message: format!("Parse error: {e}") }),
                id: None,
            })
            .unwrap_or_default();
        }
    };

    let id = request.id.clone();
    let response = match request.method.as_str() {
        "initialize" | "notifications/initialized" => {
            JsonRpcResponse { jsonrpc: "2.0", result: Some(Value::Null), error: None, id }
        }
        "tools/call" => {
            let params = request.params.unwrap_or(Value::Null);
            let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
            let args = params.get("arguments").cloned().unwrap_or(Value::Null);
            let text = call_tool(root, config, name, &args);
            JsonRpcResponse {
                jsonrpc: "2.0",
                result: Some(serde_json::json!({"content": [{"type": "text", "text": text}]})),
                error: None,
                id,
            }
        }
        other => JsonRpcResponse {
            jsonrpc: "2.0",
            result: None,
            error: Some(JsonRpcError { code: -32601, message: format!("Method not found: {other}") }),
            id,
        },
    };

    serde_json::to_string(&response).unwrap_or_default()
}

fn call_tool(root: &Path, config: &AppConfig, name: &str, args: &Value) -> String {
    let outcome: OpResult = match name {
        "list_sessions" => op_list_sessions(root, args),
        "get_session" => op_get_session(root, args),
        "check_inbox" => op_check_inbox(root, config, args),
        "send_message" => op_send_message(root, config, args),
        "broadcast" => op_broadcast(root, config, args),
        "send_directive" => op_send_directive(root, config, args),
        "detect_conflicts" => op_detect_conflicts(root, args),
        "spawn_terminal" => op_spawn_terminal(root, config, args),
        "spawn_worker" => op_spawn_worker(root, config, args),
        "get_result" => op_get_result(root, args),
        "wake_session" => op_wake_session(root, config, args),
        "kill_worker" => op_kill_worker(root, args),
        "run_pipeline" => op_run_pipeline(root, config, args),
        "get_pipeline" => op_get_pipeline(root, args),
        "create_task" => op_create_task(root, args),
        "update_task" => op_update_task(root, args),
        "list_tasks" => op_list_tasks(root, args),
        "get_task" => op_get_task(root, args),
        "create_team" => op_create_team(root, args),
        "get_team" => op_get_team(root, args),
        "list_teams" => op_list_teams(root),
        _ => return format!("Unknown tool: {name}"),
    };

    match outcome {
        Ok(text) => text,
        Err(msg) => format!("Invalid arguments for {name}: {msg}"),
    }
}

fn to_text(result: ah_core::Result<String>) -> String {
    result.map_or_else(|e| e.to_string(), |s| s)
}

fn req_str(args: &Value, field: &str) -> OpResult {
    match args.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(format!("field '{field}' must be a string")),
        None => Err(format!("missing required field '{field}'")),
    }
}

fn opt_str(args: &Value, field: &str) -> Option<String> {
    args.get(field).and_then(Value::as_str).map(str::to_string)
}

fn opt_bool(args: &Value, field: &str, default: bool) -> bool {
    args.get(field).and_then(Value::as_bool).unwrap_or(default)
}

fn req_str_vec(args: &Value, field: &str) -> std::result::Result<Vec<String>, String> {
    match args.get(field) {
        Some(Value::Array(items)) => Ok(items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()),
        Some(_) => Err(format!("field '{field}' must be an array of strings")),
        None => Err(format!("missing required field '{field}'")),
    }
}

fn opt_str_vec(args: &Value, field: &str) -> Vec<String> {
    args.get(field)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn message_priority(args: &Value) -> MessagePriority {
    match args.get("priority").and_then(Value::as_str) {
        Some("urgent") => MessagePriority::Urgent,
        _ => MessagePriority::Normal,
    }
}

fn task_priority(args: &Value) -> std::result::Result<Option<Priority>, String> {
    match args.get("priority").and_then(Value::as_str) {
        None => Ok(None),
        Some("low") => Ok(Some(Priority::Low)),
        Some("normal") => Ok(Some(Priority::Normal)),
        Some("high") => Ok(Some(Priority::High)),
        Some(other) => Err(format!("invalid priority: '{other}'")),
    }
}

fn layout_of(args: &Value) -> std::result::Result<Layout, String> {
    match args.get("layout").and_then(Value::as_str) {
        None => Ok(Layout::Tab),
        Some("tab") => Ok(Layout::Tab),
        Some("split") => Ok(Layout::Split),
        Some(other) => Err(format!("invalid layout: '{other}'")),
    }
}

fn worker_mode(args: &Value) -> std::result::Result<WorkerMode, String> {
    match args.get("mode").and_then(Value::as_str) {
        None => Ok(WorkerMode::Pipe),
        Some("pipe") => Ok(WorkerMode::Pipe),
        Some("interactive") => Ok(WorkerMode::Interactive),
        Some(other) => Err(format!("invalid mode: '{other}'")),
    }
}

fn op_list_sessions(root: &Path, args: &Value) -> OpResult {
    let include_closed = opt_bool(args, "include_closed", false);
    let project = opt_str(args, "project");
    let now = ah_core::now();

    let mut sessions: Vec<_> = ah_session::list_sessions(root)
        .into_iter()
        .filter(|s| project.as_deref().map(|p| p == s.project).unwrap_or(true))
        .map(|s| {
            let status = ah_session::derive_status(&s, now);
            (s, status)
        })
        .filter(|(_, status)| include_closed || !status.is_closed())
        .collect();
    sessions.sort_by(|(a, _), (b, _)| b.last_active.cmp(&a.last_active));

    if sessions.is_empty() {
        return Ok("No sessions found.".to_string());
    }

    let mut text = String::new();
    for (s, status) in &sessions {
        text.push_str(&format!("{}  {:<7} {:<20} {}\n", s.session, status, s.project, s.last_active.to_rfc3339()));
    }
    Ok(text)
}

fn op_get_session(root: &Path, args: &Value) -> OpResult {
    let session_id = req_str(args, "session_id")?;
    Ok(to_text(get_session_logic(root, &session_id)))
}

fn get_session_logic(root: &Path, session_id: &str) -> ah_core::Result<String> {
    let short = ah_validate::validate_short_session_id(session_id)?;
    let record = ah_session::load_session(root, &short)
        .ok_or_else(|| HubError::not_found(format!("no such session: {short}")))?;
    let status = ah_session::derive_status(&record, ah_core::now());
    let json = serde_json::json!({
        "session": record.session,
        "status": status.as_str(),
        "project": record.project,
        "cwd": record.cwd,
        "branch": record.branch,
        "started": record.started,
        "last_active": record.last_active,
        "files_touched": record.files_touched,
        "current_task": record.current_task,
        "has_messages": record.has_messages,
    });
    Ok(serde_json::to_string_pretty(&json).unwrap_or_default())
}

fn op_check_inbox(root: &Path, config: &AppConfig, args: &Value) -> OpResult {
    let session_id = req_str(args, "session_id")?;
    Ok(to_text(check_inbox_logic(root, config, &session_id)))
}

fn check_inbox_logic(root: &Path, config: &AppConfig, session_id: &str) -> ah_core::Result<String> {
    let result = ah_mailbox::check_inbox(root, config, session_id)?;
    if result.messages.is_empty() {
        return Ok("No messages.".to_string());
    }
    let mut text = String::new();
    for m in &result.messages {
        let label = match &m.priority {
            MessagePriority::Urgent => "urgent",
            MessagePriority::Normal => "normal",
        };
        text.push_str(&format!("[{label}] {}: {}\n", m.from, m.content));
    }
    if result.truncated {
        text.push_str("(older messages were truncated)\n");
    }
    Ok(text)
}

fn op_send_message(root: &Path, config: &AppConfig, args: &Value) -> OpResult {
    let from = req_str(args, "from")?;
    let to = req_str(args, "to")?;
    let content = req_str(args, "content")?;
    let priority = message_priority(args);
    let allow_offline = opt_bool(args, "allow_offline", false);
    Ok(to_text(
        ah_mailbox::send_message(root, config, &from, &to, &content, priority, allow_offline)
            .map(|()| format!("message sent to {to}")),
    ))
}

fn op_broadcast(root: &Path, config: &AppConfig, args: &Value) -> OpResult {
    let from = req_str(args, "from")?;
    let content = req_str(args, "content")?;
    let priority = message_priority(args);
    Ok(to_text(
        ah_mailbox::broadcast(root, config, &from, &content, priority)
            .map(|delivered| format!("broadcast delivered to {delivered} session(s)")),
    ))
}

fn op_send_directive(root: &Path, config: &AppConfig, args: &Value) -> OpResult {
    let from = req_str(args, "from")?;
    let to = req_str(args, "to")?;
    let content = req_str(args, "content")?;
    let priority = message_priority(args);
    Ok(to_text(
        ah_mailbox::send_directive(root, config, &from, &to, &content, priority).map(|()| format!("directive sent to {to}")),
    ))
}

fn op_detect_conflicts(root: &Path, args: &Value) -> OpResult {
    let session_id = req_str(args, "session_id")?;
    let files = req_str_vec(args, "files")?;
    Ok(to_text(detect_conflicts_logic(root, &session_id, &files)))
}

fn detect_conflicts_logic(root: &Path, session_id: &str, files: &[String]) -> ah_core::Result<String> {
    let report = ah_conflict::detect_conflicts(root, session_id, files)?;
    if report.is_clean() {
        return Ok("No conflicts detected.".to_string());
    }
    let mut text = String::from("CONFLICTS DETECTED\n");
    for overlap in &report.overlaps {
        text.push_str(&format!(
            "  session {} ({}) also has: {}\n",
            overlap.session,
            overlap.project,
            overlap.overlapping_files.join(", ")
        ));
    }
    for edit in &report.recent_edits {
        text.push_str(&format!("  session {} recently {} {}\n", edit.session, edit.tool, edit.file));
    }
    Ok(text)
}

fn op_spawn_terminal(root: &Path, config: &AppConfig, args: &Value) -> OpResult {
    let directory = req_str(args, "directory")?;
    let initial_prompt = opt_str(args, "initial_prompt");
    let layout = layout_of(args)?;
    Ok(to_text(crate::terminal::spawn_terminal(root, config, &directory, initial_prompt.as_deref(), layout)))
}

fn op_spawn_worker(root: &Path, config: &AppConfig, args: &Value) -> OpResult {
    let directory = req_str(args, "directory")?;
    let prompt = req_str(args, "prompt")?;
    let model = opt_str(args, "model").unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let agent = opt_str(args, "agent");
    let task_id = opt_str(args, "task_id");
    let notify_session_id = opt_str(args, "notify_session_id").or_else(|| opt_str(args, "session_id"));
    let files = opt_str_vec(args, "files");
    let layout = layout_of(args)?;
    let mode = worker_mode(args)?;
    let isolate = opt_bool(args, "isolate", false);

    Ok(to_text(ah_worker::spawn_worker(
        root,
        config,
        &directory,
        &prompt,
        &model,
        agent.as_deref(),
        task_id.as_deref(),
        notify_session_id.as_deref(),
        &files,
        layout,
        mode,
        isolate,
    )))
}

fn op_get_result(root: &Path, args: &Value) -> OpResult {
    let task_id = req_str(args, "task_id")?;
    let tail_lines = args.get("tail_lines").and_then(Value::as_u64).map(|v| v as usize);
    Ok(to_text(get_result_logic(root, &task_id, tail_lines)))
}

fn get_result_logic(root: &Path, task_id: &str, tail_lines: Option<usize>) -> ah_core::Result<String> {
    let result = ah_worker::get_result(root, task_id, tail_lines)?;
    let suffix = if result.truncated { " (truncated)" } else { "" };
    Ok(format!("task {} status={}{}\n{}", result.task_id, result.status, suffix, result.output))
}

fn op_wake_session(root: &Path, config: &AppConfig, args: &Value) -> OpResult {
    let session_id = req_str(args, "session_id")?;
    let message = req_str(args, "message")?;
    Ok(to_text(
        ah_wake::wake_session(root, config, &session_id, &message).map(|()| format!("woke session {session_id}")),
    ))
}

fn op_kill_worker(root: &Path, args: &Value) -> OpResult {
    let task_id = req_str(args, "task_id")?;
    Ok(to_text(ah_worker::kill_worker(root, &task_id)))
}

fn op_run_pipeline(root: &Path, config: &AppConfig, args: &Value) -> OpResult {
    let directory = req_str(args, "directory")?;
    let pipeline_id = opt_str(args, "pipeline_id");
    let layout = layout_of(args)?;

    let tasks_value = args
        .get("tasks")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing required field 'tasks'".to_string())?;
    let mut tasks = Vec::with_capacity(tasks_value.len());
    for (i, t) in tasks_value.iter().enumerate() {
        let name = t.get("name").and_then(Value::as_str).ok_or_else(|| format!("tasks[{i}] missing 'name'"))?.to_string();
        let prompt = t
            .get("prompt")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("tasks[{i}] missing 'prompt'"))?
            .to_string();
        let model = t.get("model").and_then(Value::as_str).unwrap_or(DEFAULT_MODEL).to_string();
        let agent = t.get("agent").and_then(Value::as_str).map(str::to_string);
        tasks.push(ah_pipeline::TaskSpec { name, prompt, model, agent });
    }

    Ok(to_text(ah_pipeline::run_pipeline(root, config, &directory, &tasks, pipeline_id.as_deref(), layout)))
}

fn op_get_pipeline(root: &Path, args: &Value) -> OpResult {
    let pipeline_id = req_str(args, "pipeline_id")?;
    Ok(to_text(get_pipeline_logic(root, &pipeline_id)))
}

fn get_pipeline_logic(root: &Path, pipeline_id: &str) -> ah_core::Result<String> {
    let view = ah_pipeline::get_pipeline(root, pipeline_id)?;
    let mut text = format!("pipeline {} done={}\n", view.pipeline_id, view.done);
    for step in &view.steps {
        text.push_str(&format!("  [{}] {} - {}\n", step.index, step.name, step.status));
    }
    if let Some(tail) = &view.current_output_tail {
        text.push_str(&format!("---\n{tail}\n"));
    }
    Ok(text)
}

fn op_create_task(root: &Path, args: &Value) -> OpResult {
    let subject = req_str(args, "subject")?;
    let priority = task_priority(args)?;
    let input = ah_board::CreateTaskInput {
        subject,
        description: opt_str(args, "description"),
        task_id: opt_str(args, "task_id"),
        assignee: opt_str(args, "assignee"),
        priority,
        files: Some(opt_str_vec(args, "files")),
        blocked_by: Some(opt_str_vec(args, "blocked_by")),
    };
    Ok(to_text(ah_board::create_task(root, input).map(|t| format!("created task {}", t.task_id))))
}

fn op_update_task(root: &Path, args: &Value) -> OpResult {
    let task_id = req_str(args, "task_id")?;
    let priority = task_priority(args)?;
    let input = ah_board::UpdateTaskInput {
        task_id,
        status: opt_str(args, "status"),
        assignee: opt_str(args, "assignee"),
        subject: opt_str(args, "subject"),
        description: opt_str(args, "description"),
        priority,
        add_blocked_by: args.get("add_blocked_by").map(|_| opt_str_vec(args, "add_blocked_by")),
        add_blocks: args.get("add_blocks").map(|_| opt_str_vec(args, "add_blocks")),
    };
    Ok(to_text(update_task_logic(root, input)))
}

fn update_task_logic(root: &Path, input: ah_board::UpdateTaskInput) -> ah_core::Result<String> {
    match ah_board::update_task(root, input)? {
        ah_board::UpdateOutcome::Updated(t) => Ok(format!("updated task {}", t.task_id)),
        ah_board::UpdateOutcome::NoChanges => Ok("no changes specified".to_string()),
    }
}

fn op_list_tasks(root: &Path, args: &Value) -> OpResult {
    let status = match opt_str(args, "status") {
        Some(s) => Some(ah_core::TaskStatus::parse(&s).ok_or_else(|| format!("invalid status: '{s}'"))?),
        None => None,
    };
    let assignee = opt_str(args, "assignee");
    let views = ah_board::list_tasks(root, status, assignee.as_deref());
    if views.is_empty() {
        return Ok("No tasks found.".to_string());
    }
    let mut text = String::new();
    for v in &views {
        text.push_str(&format!(
            "{}  {:<11} {:<20} blockers={}\n",
            v.task_id,
            v.status,
            v.assignee.as_deref().unwrap_or("-"),
            v.open_blockers.len()
        ));
    }
    Ok(text)
}

fn op_get_task(root: &Path, args: &Value) -> OpResult {
    let task_id = req_str(args, "task_id")?;
    Ok(to_text(get_task_logic(root, &task_id)))
}

fn get_task_logic(root: &Path, task_id: &str) -> ah_core::Result<String> {
    let task = ah_board::get_task(root, task_id)?;
    let json = serde_json::to_value(&task).unwrap_or_default();
    Ok(serde_json::to_string_pretty(&json).unwrap_or_default())
}

fn op_create_team(root: &Path, args: &Value) -> OpResult {
    let team_name = req_str(args, "team_name")?;
    let members = match args.get("members") {
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, m) in items.iter().enumerate() {
                let name = m.get("name").and_then(Value::as_str).ok_or_else(|| format!("members[{i}] missing 'name'"))?.to_string();
                out.push(ah_team::MemberInput {
                    name,
                    role: m.get("role").and_then(Value::as_str).map(str::to_string),
                    session_id: m.get("session_id").and_then(Value::as_str).map(str::to_string),
                    task_id: m.get("task_id").and_then(Value::as_str).map(str::to_string),
                });
            }
            Some(out)
        }
        _ => None,
    };

    let input = ah_team::CreateTeamInput {
        team_name,
        project: opt_str(args, "project"),
        description: opt_str(args, "description"),
        members,
    };
    Ok(to_text(
        ah_team::create_team(root, input).map(|t| format!("team {} has {} member(s)", t.team_name, t.members.len())),
    ))
}

fn op_get_team(root: &Path, args: &Value) -> OpResult {
    let team_name = req_str(args, "team_name")?;
    Ok(to_text(get_team_logic(root, &team_name)))
}

fn get_team_logic(root: &Path, team_name: &str) -> ah_core::Result<String> {
    let team = ah_team::get_team(root, team_name)?;
    let json = serde_json::to_value(&team).unwrap_or_default();
    Ok(serde_json::to_string_pretty(&json).unwrap_or_default())
}

fn op_list_teams(root: &Path) -> OpResult {
    let teams = ah_team::list_teams(root);
    if teams.is_empty() {
        return Ok("No teams found.".to_string());
    }
    let mut text = String::new();
    for t in &teams {
        text.push_str(&format!(
            "{:<16} {:<12} members={} updated={}\n",
            t.team_name,
            t.project.as_deref().unwrap_or("-"),
            t.members_count,
            t.updated.to_rfc3339()
        ));
    }
    Ok(text)
}
