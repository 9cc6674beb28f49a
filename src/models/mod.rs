//! Domain models for the deployment server.

pub mod caller;
pub mod deploy;
pub mod deployment;
pub mod event;
pub mod generated_file;

// Re-export commonly used types
pub use caller::AuthenticatedCaller;
pub use deploy::{
    BitbucketExportRequest, DeleteSessionResponse, DeploySuccessResponse, DeploymentInfo,
    DeploymentListResponse, ExportRequest, ExportResponse, HostingProjectInfo, IntegrationStatus,
    PartialDeployResponse, ProvisionAndTriggerRequest, ProvisioningFailedResponse,
    RegisterSessionRequest, RegisterSessionResponse, RepositoryInfo,
};
pub use deployment::{DeploymentRecord, DeploymentStatus, DeploymentUpdate};
pub use event::{DeploymentEvent, PipelineStage};
pub use generated_file::GeneratedFile;
