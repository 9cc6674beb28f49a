//! Request and response DTOs for the deployment endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::DeploymentRecord;

fn default_private() -> bool {
    true
}

/// Request to export a session's files to a new GitHub repository.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub session_id: String,
    pub repo_name: String,
    #[serde(default = "default_private")]
    pub is_private: bool,
}

/// Request to run the full pipeline: export, provision, trigger.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionAndTriggerRequest {
    pub session_id: String,
    pub repo_name: String,
    /// Hosting project name. Defaults to the repository name.
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default = "default_private")]
    pub is_private: bool,
}

/// Request to export a session's files to a Bitbucket workspace.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketExportRequest {
    pub session_id: String,
    pub repo_name: String,
    pub workspace: String,
}

/// Request to register a generation session with the ledger.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSessionRequest {
    pub session_id: String,
}

/// Repository block shared by every pipeline response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub name: String,
    pub url: String,
    pub clone_url: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Head commit of the export. Absent for per-file commit hosts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
}

/// Which external hosts have credentials configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationStatus {
    pub generation: bool,
    pub github: bool,
    pub vercel: bool,
    pub bitbucket: bool,
}

impl IntegrationStatus {
    /// Everything `provision-and-trigger` needs is configured.
    pub fn can_deploy(&self) -> bool {
        self.generation && self.github && self.vercel
    }
}

/// Hosting project block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostingProjectInfo {
    pub id: String,
    pub name: String,
    pub dashboard_url: String,
}

/// Triggered deployment block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    pub id: String,
    pub url: String,
    pub state: String,
    /// Name of the trigger strategy that succeeded.
    pub strategy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub success: bool,
    pub repository: RepositoryInfo,
    pub files_created: usize,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploySuccessResponse {
    pub success: bool,
    pub repository: RepositoryInfo,
    pub hosting_project: HostingProjectInfo,
    pub deployment: DeploymentInfo,
    pub deployment_url: String,
}

/// Export and provisioning succeeded but no trigger strategy did.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartialDeployResponse {
    pub success: bool,
    pub partial_success: bool,
    pub github_success: bool,
    pub hosting_project_success: bool,
    pub deployment_success: bool,
    pub repository: RepositoryInfo,
    pub hosting_project: HostingProjectInfo,
    pub deployment_error: String,
    pub instructions: Vec<String>,
}

impl PartialDeployResponse {
    pub fn new(
        repository: RepositoryInfo,
        hosting_project: HostingProjectInfo,
        deployment_error: String,
    ) -> Self {
        PartialDeployResponse {
            success: false,
            partial_success: true,
            github_success: true,
            hosting_project_success: true,
            deployment_success: false,
            repository,
            hosting_project,
            deployment_error,
            instructions: manual_deploy_instructions(),
        }
    }
}

/// Next steps shown when a deployment has to be started by hand.
pub fn manual_deploy_instructions() -> Vec<String> {
    vec![
        "1. Go to Vercel dashboard".to_string(),
        "2. Click on your project".to_string(),
        "3. Click \"Deploy\" button".to_string(),
        "4. Your site will be live in ~2 minutes!".to_string(),
    ]
}

/// Export succeeded but the hosting project could not be created.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningFailedResponse {
    pub success: bool,
    pub github_success: bool,
    pub hosting_project_success: bool,
    pub repository: RepositoryInfo,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSessionResponse {
    pub success: bool,
    pub deleted_repository: bool,
    pub deleted_hosting_project: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSessionResponse {
    pub success: bool,
    /// False when the session was already registered.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentListResponse {
    pub deployments: Vec<DeploymentRecord>,
    pub total: usize,
}
