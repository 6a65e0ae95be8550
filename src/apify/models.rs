//! Response bodies of the remote run API

use serde::{Deserialize, Serialize};

use super::job::RunStatus;

/// Every run endpoint wraps its payload in `data`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEnvelope {
    pub data: RunInfo,
}

/// Run object returned by submit and poll
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub id: String,
    #[serde(default)]
    pub act_id: Option<String>,
    #[serde(default)]
    pub actor_task_id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub default_dataset_id: Option<String>,
}

impl RunInfo {
    pub fn run_status(&self) -> RunStatus {
        RunStatus::from_remote(&self.status)
    }
}
