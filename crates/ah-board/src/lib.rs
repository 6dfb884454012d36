//! Task Board (C13): persistent tasks with a bidirectional dependency
//! graph (spec.md §4.13, invariant I6).

mod task;

use std::path::Path;

use ah_core::{now, HubError, Priority, Result, TaskStatus};

pub use task::TaskRecord;

#[derive(Default)]
pub struct CreateTaskInput {
    pub subject: String,
    pub description: Option<String>,
    pub task_id: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
    pub files: Option<Vec<String>>,
    pub blocked_by: Option<Vec<String>>,
}

pub fn create_task(root: &Path, input: CreateTaskInput) -> Result<TaskRecord> {
    if input.subject.trim().is_empty() {
        return Err(HubError::validation("subject must not be empty"));
    }
    let task_id = match input.task_id {
        Some(id) => ah_validate::sanitize_name(&id)?,
        None => task::new_task_id(),
    };
    if task::task_path(root, &task_id).exists() {
        return Err(HubError::conflict(format!("task '{task_id}' already exists")));
    }

    let mut record = TaskRecord::new(task_id.as_str(), input.subject);
    record.description = input.description;
    record.assignee = input.assignee;
    if let Some(priority) = input.priority {
        record.priority = priority;
    }
    record.files = input.files.unwrap_or_default();

    let blocked_by = input.blocked_by.unwrap_or_default();
    for dep_id in &blocked_by {
        let mut dep = task::load_task(root, dep_id)
            .ok_or_else(|| HubError::not_found(format!("blocked_by dependency not found: {dep_id}")))?;
        if !dep.blocks.contains(&task_id) {
            dep.blocks.push(task_id.clone());
            dep.updated = now();
            task::save_task(root, &dep)?;
        }
    }
    record.blocked_by = blocked_by;

    task::save_task(root, &record)?;
    Ok(record)
}

#[derive(Default)]
pub struct UpdateTaskInput {
    pub task_id: String,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub add_blocked_by: Option<Vec<String>>,
    pub add_blocks: Option<Vec<String>>,
}

pub enum UpdateOutcome {
    Updated(TaskRecord),
    NoChanges,
}

pub fn update_task(root: &Path, input: UpdateTaskInput) -> Result<UpdateOutcome> {
    let mut record = task::load_task(root, &input.task_id)
        .ok_or_else(|| HubError::not_found(format!("no such task: {}", input.task_id)))?;

    let mut changed = false;

    if let Some(status) = &input.status {
        let parsed = TaskStatus::parse(status)
            .ok_or_else(|| HubError::validation(format!("invalid status: '{status}'")))?;
        record.status = parsed;
        changed = true;
    }
    if let Some(assignee) = input.assignee {
        record.assignee = Some(assignee);
        changed = true;
    }
    if let Some(subject) = input.subject {
        record.subject = subject;
        changed = true;
    }
    if let Some(description) = input.description {
        record.description = Some(description);
        changed = true;
    }
    if let Some(priority) = input.priority {
        record.priority = priority;
        changed = true;
    }

    for dep_id in input.add_blocked_by.unwrap_or_default() {
        let mut dep = task::load_task(root, &dep_id)
            .ok_or_else(|| HubError::not_found(format!("blocked_by dependency not found: {dep_id}")))?;
        if !record.blocked_by.contains(&dep_id) {
            record.blocked_by.push(dep_id.clone());
            changed = true;
        }
        if !dep.blocks.contains(&record.task_id) {
            dep.blocks.push(record.task_id.clone());
            dep.updated = now();
            task::save_task(root, &dep)?;
        }
    }

    for blocked_id in input.add_blocks.unwrap_or_default() {
        let mut blocked = task::load_task(root, &blocked_id)
            .ok_or_else(|| HubError::not_found(format!("task not found: {blocked_id}")))?;
        if !record.blocks.contains(&blocked_id) {
            record.blocks.push(blocked_id.clone());
            changed = true;
        }
        if !blocked.blocked_by.contains(&record.task_id) {
            blocked.blocked_by.push(record.task_id.clone());
            blocked.updated = now();
            task::save_task(root, &blocked)?;
        }
    }

    if !changed {
        return Ok(UpdateOutcome::NoChanges);
    }

    record.updated = now();
    task::save_task(root, &record)?;
    Ok(UpdateOutcome::Updated(record))
}

pub struct TaskView {
    pub task_id: String,
    pub subject: String,
    pub status: TaskStatus,
    pub assignee: Option<String>,
    pub priority: Priority,
    pub open_blockers: Vec<String>,
}

pub fn list_tasks(root: &Path, status: Option<TaskStatus>, assignee: Option<&str>) -> Vec<TaskView> {
    let mut tasks = task::list_tasks_raw(root);
    if let Some(status) = status {
        tasks.retain(|t| t.status == status);
    }
    if let Some(assignee) = assignee {
        tasks.retain(|t| t.assignee.as_deref() == Some(assignee));
    }
    tasks.sort_by_key(|t| t.status.ordinal());

    tasks
        .into_iter()
        .map(|t| {
            let open_blockers: Vec<String> = t
                .blocked_by
                .iter()
                .filter(|dep_id| {
                    task::load_task(root, dep_id)
                        .map(|dep| !matches!(dep.status, TaskStatus::Completed | TaskStatus::Cancelled))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            TaskView {
                task_id: t.task_id,
                subject: t.subject,
                status: t.status,
                assignee: t.assignee,
                priority: t.priority,
                open_blockers,
            }
        })
        .collect()
}

pub fn get_task(root: &Path, task_id: &str) -> Result<TaskRecord> {
    task::load_task(root, task_id).ok_or_else(|| HubError::not_found(format!("no such task: {task_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_task_generates_id_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let record = create_task(tmp.path(), CreateTaskInput { subject: "fix it".to_string(), ..Default::default() }).unwrap();
        assert!(record.task_id.starts_with('T'));
    }

    #[test]
    fn create_task_rejects_collision() {
        let tmp = tempfile::tempdir().unwrap();
        create_task(tmp.path(), CreateTaskInput { subject: "a".to_string(), task_id: Some("T1".to_string()), ..Default::default() }).unwrap();
        let result = create_task(tmp.path(), CreateTaskInput { subject: "b".to_string(), task_id: Some("T1".to_string()), ..Default::default() });
        assert!(matches!(result, Err(HubError::Conflict(_))));
    }

    #[test]
    fn create_task_with_blocked_by_updates_dependency_blocks() {
        let tmp = tempfile::tempdir().unwrap();
        create_task(tmp.path(), CreateTaskInput { subject: "A".to_string(), task_id: Some("T1".to_string()), ..Default::default() }).unwrap();
        create_task(
            tmp.path(),
            CreateTaskInput {
                subject: "B".to_string(),
                task_id: Some("T2".to_string()),
                blocked_by: Some(vec!["T1".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();

        let t1 = get_task(tmp.path(), "T1").unwrap();
        let t2 = get_task(tmp.path(), "T2").unwrap();
        assert_eq!(t1.blocks, vec!["T2"]);
        assert_eq!(t2.blocked_by, vec!["T1"]);
    }

    #[test]
    fn update_task_reports_no_changes_when_nothing_specified() {
        let tmp = tempfile::tempdir().unwrap();
        create_task(tmp.path(), CreateTaskInput { subject: "a".to_string(), task_id: Some("T1".to_string()), ..Default::default() }).unwrap();
        let outcome = update_task(tmp.path(), UpdateTaskInput { task_id: "T1".to_string(), ..Default::default() }).unwrap();
        assert!(matches!(outcome, UpdateOutcome::NoChanges));
    }

    #[test]
    fn update_task_add_blocked_by_keeps_both_endpoints_consistent() {
        let tmp = tempfile::tempdir().unwrap();
        create_task(tmp.path(), CreateTaskInput { subject: "A".to_string(), task_id: Some("T1".to_string()), ..Default::default() }).unwrap();
        create_task(tmp.path(), CreateTaskInput { subject: "B".to_string(), task_id: Some("T2".to_string()), ..Default::default() }).unwrap();

        update_task(
            tmp.path(),
            UpdateTaskInput { task_id: "T2".to_string(), add_blocked_by: Some(vec!["T1".to_string()]), ..Default::default() },
        )
        .unwrap();

        let t1 = get_task(tmp.path(), "T1").unwrap();
        assert_eq!(t1.blocks, vec!["T2"]);
    }

    #[test]
    fn update_task_rejects_invalid_status() {
        let tmp = tempfile::tempdir().unwrap();
        create_task(tmp.path(), CreateTaskInput { subject: "a".to_string(), task_id: Some("T1".to_string()), ..Default::default() }).unwrap();
        let result = update_task(
            tmp.path(),
            UpdateTaskInput { task_id: "T1".to_string(), status: Some("bogus".to_string()), ..Default::default() },
        );
        assert!(result.is_err());
    }

    #[test]
    fn list_tasks_sorts_by_status_ordinal() {
        let tmp = tempfile::tempdir().unwrap();
        create_task(tmp.path(), CreateTaskInput { subject: "pending".to_string(), task_id: Some("T1".to_string()), ..Default::default() }).unwrap();
        create_task(tmp.path(), CreateTaskInput { subject: "in-progress".to_string(), task_id: Some("T2".to_string()), ..Default::default() }).unwrap();
        update_task(tmp.path(), UpdateTaskInput { task_id: "T2".to_string(), status: Some("in_progress".to_string()), ..Default::default() }).unwrap();

        let listed = list_tasks(tmp.path(), None, None);
        assert_eq!(listed[0].task_id, "T2");
        assert_eq!(listed[1].task_id, "T1");
    }

    #[test]
    fn list_tasks_annotates_open_blockers() {
        let tmp = tempfile::tempdir().unwrap();
        create_task(tmp.path(), CreateTaskInput { subject: "A".to_string(), task_id: Some("T1".to_string()), ..Default::default() }).unwrap();
        create_task(
            tmp.path(),
            CreateTaskInput {
                subject: "B".to_string(),
                task_id: Some("T2".to_string()),
                blocked_by: Some(vec!["T1".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();

        let listed = list_tasks(tmp.path(), None, None);
        let t2 = listed.iter().find(|t| t.task_id == "T2").unwrap();
        assert_eq!(t2.open_blockers, vec!["T1"]);
    }
}
