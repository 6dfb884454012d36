//! Team Registry (C14): named teams with members, roles, and assigned
//! task/session references (spec.md §4.14).

mod team;

use std::path::Path;

use ah_core::{now, HubError, Result};

pub use team::TeamRecord;

pub struct MemberInput {
    pub name: String,
    pub role: Option<String>,
    pub session_id: Option<String>,
    pub task_id: Option<String>,
}

#[derive(Default)]
pub struct CreateTeamInput {
    pub team_name: String,
    pub project: Option<String>,
    pub description: Option<String>,
    pub members: Option<Vec<MemberInput>>,
}

impl Default for MemberInput {
    fn default() -> Self {
        Self { name: String::new(), role: None, session_id: None, task_id: None }
    }
}

/// Upserts a team record. For each member by `name`, either creates it
/// (with `joined = now`) or updates `{role, session_id, task_id, updated}`.
pub fn create_team(root: &Path, input: CreateTeamInput) -> Result<TeamRecord> {
    let team_name = ah_validate::sanitize_name(&input.team_name)?;

    let mut record = team::load_team(root, &team_name).unwrap_or_else(|| TeamRecord::new(team_name.as_str()));
    if input.project.is_some() {
        record.project = input.project;
    }
    if input.description.is_some() {
        record.description = input.description;
    }

    for member in input.members.unwrap_or_default() {
        let now_ts = now();
        match record.members.iter_mut().find(|m| m.name == member.name) {
            Some(existing) => {
                if member.role.is_some() {
                    existing.role = member.role;
                }
                if member.session_id.is_some() {
                    existing.session_id = member.session_id;
                }
                if member.task_id.is_some() {
                    existing.task_id = member.task_id;
                }
                existing.updated = now_ts;
            }
            None => {
                record.members.push(team::Member {
                    name: member.name,
                    role: member.role,
                    session_id: member.session_id,
                    task_id: member.task_id,
                    joined: now_ts,
                    updated: now_ts,
                });
            }
        }
    }

    record.updated = now();
    team::save_team(root, &record)?;
    Ok(record)
}

pub fn get_team(root: &Path, team_name: &str) -> Result<TeamRecord> {
    team::load_team(root, team_name).ok_or_else(|| HubError::not_found(format!("no such team: {team_name}")))
}

pub struct TeamSummary {
    pub team_name: String,
    pub project: Option<String>,
    pub members_count: usize,
    pub updated: chrono::DateTime<chrono::Utc>,
}

pub fn list_teams(root: &Path) -> Vec<TeamSummary> {
    let mut teams = team::list_teams_raw(root);
    teams.sort_by(|a, b| b.updated.cmp(&a.updated));
    teams
        .into_iter()
        .map(|t| TeamSummary {
            team_name: t.team_name,
            project: t.project,
            members_count: t.members.len(),
            updated: t.updated,
        })
        .collect()
}
