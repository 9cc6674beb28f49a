//! Deployment ledger domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Deployment status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Nothing has been deployed yet.
    #[default]
    Unset,
    /// Hosting project exists but no deployment was triggered.
    Pending,
    /// A deployment was triggered and its URL recorded.
    Deployed,
    /// A stage after export failed.
    Failed,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Pending => "pending",
            Self::Deployed => "deployed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unset" => Some(Self::Unset),
            "pending" => Some(Self::Pending),
            "deployed" => Some(Self::Deployed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ledger row: a session and everything the pipeline produced for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub session_id: String,
    pub owner_id: Option<String>,
    pub repository_name: Option<String>,
    pub repository_url: Option<String>,
    pub hosting_project_id: Option<String>,
    pub hosting_project_url: Option<String>,
    pub deployment_url: Option<String>,
    pub deployment_status: DeploymentStatus,
    pub deployed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DeploymentRecord {
    pub fn from_entity(m: crate::entity::deployment::Model) -> Self {
        DeploymentRecord {
            deployment_status: DeploymentStatus::parse(&m.deployment_status).unwrap_or_default(),
            session_id: m.session_id,
            owner_id: m.owner_id,
            repository_name: m.repository_name,
            repository_url: m.repository_url,
            hosting_project_id: m.hosting_project_id,
            hosting_project_url: m.hosting_project_url,
            deployment_url: m.deployment_url,
            deployed_at: m.deployed_at,
            created_at: m.created_at,
        }
    }
}

/// Partial ledger update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentUpdate {
    pub repository_name: Option<String>,
    pub repository_url: Option<String>,
    pub hosting_project_id: Option<String>,
    pub hosting_project_url: Option<String>,
    pub deployment_url: Option<String>,
    pub deployment_status: Option<DeploymentStatus>,
}

impl DeploymentUpdate {
    /// Repository fields recorded once export completes.
    pub fn exported(name: &str, url: &str) -> Self {
        Self {
            repository_name: Some(name.to_string()),
            repository_url: Some(url.to_string()),
            ..Default::default()
        }
    }

    /// Hosting project fields recorded once provisioning completes.
    pub fn provisioned(project_id: &str, dashboard_url: &str) -> Self {
        Self {
            hosting_project_id: Some(project_id.to_string()),
            hosting_project_url: Some(dashboard_url.to_string()),
            ..Default::default()
        }
    }

    pub fn status(status: DeploymentStatus) -> Self {
        Self {
            deployment_status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_deployment_url(mut self, url: &str) -> Self {
        self.deployment_url = Some(url.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
