//! Deployment pipeline API handlers.

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::auth::{OptionalCaller, RequiredCaller};
use crate::error::AppResult;
use crate::middleware::OutcomeTag;
use crate::models::{
    BitbucketExportRequest, DeleteSessionResponse, DeploySuccessResponse, DeploymentListResponse,
    DeploymentRecord, ExportRequest, ExportResponse,
    ProvisionAndTriggerRequest, ProvisioningFailedResponse, RegisterSessionRequest,
    RegisterSessionResponse,
};
use crate::services::pipeline::{DeploymentPipeline, PipelineOutcome};

/// Export a session's generated files to a new GitHub repository.
#[utoipa::path(
    post,
    path = "/api/v1/deploy/export",
    tag = "Deploy",
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Files committed", body = ExportResponse),
        (status = 400, description = "Repository already exists or invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid session token", body = crate::error::ErrorResponse),
        (status = 403, description = "Session belongs to another user", body = crate::error::ErrorResponse),
        (status = 500, description = "Credentials missing or upstream failure", body = crate::error::ErrorResponse),
    ),
    security(
        (),
        ("session_token" = [])
    )
)]
pub async fn export(
    caller: OptionalCaller,
    pipeline: web::Data<DeploymentPipeline>,
    body: web::Json<ExportRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    info!(session_id = %req.session_id, repo = %req.repo_name, "Export requested");

    let response = pipeline.export(&req, caller.caller()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Export a session's generated files to a new Bitbucket repository.
#[utoipa::path(
    post,
    path = "/api/v1/deploy/export/bitbucket",
    tag = "Deploy",
    request_body = BitbucketExportRequest,
    responses(
        (status = 200, description = "Files committed", body = ExportResponse),
        (status = 400, description = "Repository already exists or invalid request", body = crate::error::ErrorResponse),
        (status = 500, description = "Credentials missing or upstream failure", body = crate::error::ErrorResponse),
    )
)]
pub async fn export_bitbucket(
    caller: OptionalCaller,
    pipeline: web::Data<DeploymentPipeline>,
    body: web::Json<BitbucketExportRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    info!(session_id = %req.session_id, workspace = %req.workspace, repo = %req.repo_name, "Bitbucket export requested");

    let response = pipeline.export_bitbucket(&req, caller.caller()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Export, provision a hosting project and trigger its first deployment.
///
/// When every trigger strategy fails the response is still 200 with
/// `partialSuccess: true`. When provisioning fails after a successful export
/// the response is 500 and still carries the repository.
#[utoipa::path(
    post,
    path = "/api/v1/deploy/provision-and-trigger",
    tag = "Deploy",
    request_body = ProvisionAndTriggerRequest,
    responses(
        (status = 200, description = "Deployment triggered, or project ready with `partialSuccess: true`", body = DeploySuccessResponse),
        (status = 400, description = "Repository already exists or invalid request", body = crate::error::ErrorResponse),
        (status = 403, description = "Session belongs to another user", body = crate::error::ErrorResponse),
        (status = 500, description = "Exported, but hosting project creation failed", body = ProvisioningFailedResponse),
    )
)]
pub async fn provision_and_trigger(
    caller: OptionalCaller,
    pipeline: web::Data<DeploymentPipeline>,
    body: web::Json<ProvisionAndTriggerRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    info!(session_id = %req.session_id, repo = %req.repo_name, "Deployment requested");

    let outcome = pipeline.provision_and_trigger(&req, caller.caller()).await?;
    let tag = OutcomeTag(outcome.label());
    let mut response = match outcome {
        PipelineOutcome::Deployed(body) => HttpResponse::Ok().json(body),
        PipelineOutcome::Partial(body) => HttpResponse::Ok().json(body),
        PipelineOutcome::ProvisioningFailed(body) => {
            HttpResponse::InternalServerError().json(body)
        }
    };
    response.extensions_mut().insert(tag);
    Ok(response)
}

/// Get a session's deployment record.
#[utoipa::path(
    get,
    path = "/api/v1/deploy/session/{session_id}",
    tag = "Deploy",
    params(
        ("session_id" = String, Path, description = "Generation session ID")
    ),
    responses(
        (status = 200, description = "Deployment record", body = DeploymentRecord),
        (status = 403, description = "Session belongs to another user", body = crate::error::ErrorResponse),
        (status = 404, description = "Session not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_session(
    caller: OptionalCaller,
    pipeline: web::Data<DeploymentPipeline>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let record = pipeline.get_deployment(&path, caller.caller()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Delete a session with its hosting project and repository.
#[utoipa::path(
    delete,
    path = "/api/v1/deploy/session/{session_id}",
    tag = "Deploy",
    params(
        ("session_id" = String, Path, description = "Generation session ID")
    ),
    responses(
        (status = 200, description = "Session deleted", body = DeleteSessionResponse),
        (status = 401, description = "Missing or invalid session token", body = crate::error::ErrorResponse),
        (status = 403, description = "Session belongs to another user", body = crate::error::ErrorResponse),
        (status = 404, description = "Session not found", body = crate::error::ErrorResponse),
    ),
    security(
        ("session_token" = [])
    )
)]
pub async fn delete_session(
    caller: RequiredCaller,
    pipeline: web::Data<DeploymentPipeline>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let session_id = path.into_inner();
    info!(session_id = %session_id, caller = %caller.0.id, "Session deletion requested");

    let response = pipeline.delete_session(&session_id, &caller.0).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// List the caller's sessions.
#[utoipa::path(
    get,
    path = "/api/v1/deploy/sessions",
    tag = "Deploy",
    responses(
        (status = 200, description = "Caller's deployment records", body = DeploymentListResponse),
        (status = 401, description = "Missing or invalid session token", body = crate::error::ErrorResponse),
    ),
    security(
        ("session_token" = [])
    )
)]
pub async fn list_sessions(
    caller: RequiredCaller,
    pipeline: web::Data<DeploymentPipeline>,
) -> AppResult<HttpResponse> {
    let deployments = pipeline.list_for_owner(&caller.0).await?;
    Ok(HttpResponse::Ok().json(DeploymentListResponse {
        total: deployments.len(),
        deployments,
    }))
}

/// Register a generation session for the caller.
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "Sessions",
    request_body = RegisterSessionRequest,
    responses(
        (status = 200, description = "Session registered (or already known)", body = RegisterSessionResponse),
        (status = 403, description = "Session belongs to another user", body = crate::error::ErrorResponse),
    )
)]
pub async fn register_session(
    caller: OptionalCaller,
    pipeline: web::Data<DeploymentPipeline>,
    body: web::Json<RegisterSessionRequest>,
) -> AppResult<HttpResponse> {
    let response = pipeline
        .register_session(&body.session_id, caller.caller())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Configure deployment routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/deploy/export").route(web::post().to(export)))
        .service(web::resource("/deploy/export/bitbucket").route(web::post().to(export_bitbucket)))
        .service(
            web::resource("/deploy/provision-and-trigger")
                .route(web::post().to(provision_and_trigger)),
        )
        .service(web::resource("/deploy/sessions").route(web::get().to(list_sessions)))
        .service(
            web::resource("/deploy/session/{session_id}")
                .route(web::get().to(get_session))
                .route(web::delete().to(delete_session)),
        )
        .service(web::resource("/sessions").route(web::post().to(register_session)));
}
