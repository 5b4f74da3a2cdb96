#![forbid(unsafe_code)]

use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Static, human-edited team descriptor (`config.json` in the team
/// directory). The ledger reads it to seed display metadata and never
/// writes it back.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub team_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl TeamConfig {
    pub fn for_team(team_name: impl Into<String>) -> Self {
        Self {
            team_name: team_name.into(),
            ..Self::default()
        }
    }
}

pub(crate) fn load_team_config(team_dir: &Path, team_name: &str) -> Result<TeamConfig, StoreError> {
    let path = team_dir.join("config.json");
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(TeamConfig::for_team(team_name));
        }
        Err(err) => return Err(err.into()),
    };
    serde_json::from_str(&raw).map_err(|_| StoreError::InvalidInput("invalid team config json"))
}
