//! Running task snapshot as observed from the orchestrator.
//!
//! The reaper never owns or mutates these; it only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-container status inside a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub name: Option<String>,
    pub last_status: Option<String>,
}

impl ContainerStatus {
    pub fn new(name: impl Into<String>, last_status: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            last_status: Some(last_status.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningTaskSnapshot {
    pub task_arn: String,
    /// `None` when the orchestrator did not report a creation time.
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub containers: Vec<ContainerStatus>,
}

impl RunningTaskSnapshot {
    /// Short task id: the last `/`-separated segment of the ARN.
    pub fn task_id(&self) -> &str {
        self.task_arn.rsplit('/').next().unwrap_or(&self.task_arn)
    }

    /// `name:lastStatus` pairs for diagnostics, e.g. `agent:RUNNING, sidecar:STOPPED`.
    pub fn container_summary(&self) -> String {
        self.containers
            .iter()
            .map(|c| {
                format!(
                    "{}:{}",
                    c.name.as_deref().unwrap_or("unknown"),
                    c.last_status.as_deref().unwrap_or("unknown")
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_is_last_arn_segment() {
        let snapshot = RunningTaskSnapshot {
            task_arn: "arn:aws:ecs:ap-northeast-1:123456789012:task/agents/0f1e2d".into(),
            created_at: None,
            containers: vec![],
        };
        assert_eq!(snapshot.task_id(), "0f1e2d");
    }

    #[test]
    fn container_summary_fills_unknowns() {
        let snapshot = RunningTaskSnapshot {
            task_arn: "t".into(),
            created_at: None,
            containers: vec![
                ContainerStatus::new("agent", "RUNNING"),
                ContainerStatus {
                    name: None,
                    last_status: None,
                },
            ],
        };
        assert_eq!(snapshot.container_summary(), "agent:RUNNING, unknown:unknown");
    }
}
