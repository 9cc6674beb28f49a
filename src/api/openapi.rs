//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Site Deployer Server",
        version = "0.1.0",
        description = "Exports generated sites to source control, provisions hosting projects and triggers their first deployment"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Deploy endpoints
        api::deploy::export,
        api::deploy::export_bitbucket,
        api::deploy::provision_and_trigger,
        // Session endpoints
        api::deploy::get_session,
        api::deploy::delete_session,
        api::deploy::list_sessions,
        api::deploy::register_session,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            models::IntegrationStatus,
            // Deploy
            models::ExportRequest,
            models::BitbucketExportRequest,
            models::ProvisionAndTriggerRequest,
            models::RepositoryInfo,
            models::HostingProjectInfo,
            models::DeploymentInfo,
            models::ExportResponse,
            models::DeploySuccessResponse,
            models::PartialDeployResponse,
            models::ProvisioningFailedResponse,
            // Sessions
            models::DeploymentStatus,
            models::DeploymentRecord,
            models::DeploymentListResponse,
            models::DeleteSessionResponse,
            models::RegisterSessionRequest,
            models::RegisterSessionResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Deploy", description = "Export, provisioning and deployment"),
        (name = "Sessions", description = "Deployment ledger lookups and teardown")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add the session token security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_token",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
