//! Session-scoped deployment events for real-time updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DeploymentStatus;

/// Orchestrator stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    ExportStarted,
    Exported,
    Provisioned,
    ProvisioningFailed,
    DeployTriggered,
    DeployFallbackExhausted,
    Persisted,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ExportStarted => "export_started",
            Self::Exported => "exported",
            Self::Provisioned => "provisioned",
            Self::ProvisioningFailed => "provisioning_failed",
            Self::DeployTriggered => "deploy_triggered",
            Self::DeployFallbackExhausted => "deploy_fallback_exhausted",
            Self::Persisted => "persisted",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event published to subscribers of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case")]
pub enum DeploymentEvent {
    /// The pipeline for a session moved to a new stage.
    StageChanged(StageChangedPayload),
    /// The session and its ledger row were deleted.
    SessionDeleted(SessionDeletedPayload),
}

/// Payload for stage_changed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageChangedPayload {
    pub session_id: String,
    pub stage: PipelineStage,
    pub status: DeploymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosting_project_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_url: Option<String>,
    pub at: DateTime<Utc>,
}

/// Payload for session_deleted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDeletedPayload {
    pub session_id: String,
    pub at: DateTime<Utc>,
}

impl DeploymentEvent {
    /// Stage change with no links attached.
    pub fn stage(session_id: &str, stage: PipelineStage, status: DeploymentStatus) -> Self {
        DeploymentEvent::StageChanged(StageChangedPayload {
            session_id: session_id.to_string(),
            stage,
            status,
            repository_url: None,
            hosting_project_url: None,
            deployment_url: None,
            at: Utc::now(),
        })
    }

    pub fn deleted(session_id: &str) -> Self {
        DeploymentEvent::SessionDeleted(SessionDeletedPayload {
            session_id: session_id.to_string(),
            at: Utc::now(),
        })
    }

    pub fn session_id(&self) -> &str {
        match self {
            DeploymentEvent::StageChanged(p) => &p.session_id,
            DeploymentEvent::SessionDeleted(p) => &p.session_id,
        }
    }

    pub fn with_repository_url(mut self, url: &str) -> Self {
        if let DeploymentEvent::StageChanged(ref mut p) = self {
            p.repository_url = Some(url.to_string());
        }
        self
    }

    pub fn with_hosting_project_url(mut self, url: &str) -> Self {
        if let DeploymentEvent::StageChanged(ref mut p) = self {
            p.hosting_project_url = Some(url.to_string());
        }
        self
    }

    pub fn with_deployment_url(mut self, url: &str) -> Self {
        if let DeploymentEvent::StageChanged(ref mut p) = self {
            p.deployment_url = Some(url.to_string());
        }
        self
    }
}
