//! Team Record (spec.md §3) and its path conventions under `teams/`.

use std::path::{Path, PathBuf};

use ah_core::now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    pub joined: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team_name: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl TeamRecord {
    pub fn new(team_name: impl Into<String>) -> Self {
        let t = now();
        Self {
            team_name: team_name.into(),
            project: None,
            description: None,
            members: Vec::new(),
            created: t,
            updated: t,
        }
    }
}

pub fn team_path(root: &Path, team_name: &str) -> PathBuf {
    ah_config::teams_dir(root).join(format!("{team_name}.json"))
}

pub fn load_team(root: &Path, team_name: &str) -> Option<TeamRecord> {
    let raw = std::fs::read_to_string(team_path(root, team_name)).ok()?;
    serde_json::from_str(&raw).ok()
}

pub fn save_team(root: &Path, team: &TeamRecord) -> ah_core::Result<()> {
    ah_fs::ensure_dir(&ah_config::teams_dir(root), true).ok();
    let json = serde_json::to_vec_pretty(team).expect("TeamRecord always serializes");
    ah_fs::atomic_write(&team_path(root, &team.team_name), &json)
}

pub fn list_teams_raw(root: &Path) -> Vec<TeamRecord> {
    let dir = ah_config::teams_dir(root);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut teams = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.ends_with(".json") {
            continue;
        }
        if let Ok(raw) = std::fs::read_to_string(entry.path()) {
            if let Ok(team) = serde_json::from_str::<TeamRecord>(&raw) {
                teams.push(team);
            }
        }
    }
    teams
}
