//! Liveness and readiness checks.
//!
//! `/health` never touches the ledger; it reports which external hosts the
//! pipeline can reach with credentials. `/ready` gates traffic on the ledger.

use actix_web::{HttpResponse, get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::models::IntegrationStatus;
use crate::services::DeploymentPipeline;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when deployments cannot run for lack of credentials.
    status: &'static str,
    version: &'static str,
    integrations: IntegrationStatus,
}

#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    status: &'static str,
    ledger: &'static str,
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Process is up; integration credentials listed", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health(pipeline: web::Data<DeploymentPipeline>) -> HttpResponse {
    let integrations = pipeline.integrations();
    HttpResponse::Ok().json(HealthResponse {
        status: if integrations.can_deploy() { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        integrations,
    })
}

/// Ready once the deployment ledger answers.
#[utoipa::path(
    get,
    path = "/api/v1/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ledger reachable", body = ReadyResponse),
        (status = 503, description = "Ledger unreachable", body = crate::error::ErrorResponse)
    )
)]
#[get("/ready")]
pub async fn ready(pool: web::Data<DbPool>) -> HttpResponse {
    if let Err(e) = pool.ping().await {
        tracing::warn!(error = %e, "Ledger unreachable, not ready");
        return HttpResponse::ServiceUnavailable().json(crate::error::ErrorResponse {
            code: "NOT_READY".to_string(),
            error: "Deployment ledger unreachable".to_string(),
            details: None,
        });
    }
    HttpResponse::Ok().json(ReadyResponse {
        status: "ready",
        ledger: "connected",
    })
}

pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready);
}
