//! Per-request logging for the deployment API.
//!
//! Each request gets one line when it arrives and one when it finishes. Lines
//! carry the API operation, the session it targets when the path names one,
//! and where the caller's token came from. Pipeline handlers tag their
//! response with an [`OutcomeTag`] so a 200 that was only a partial deployment
//! is visible in the logs.

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::StatusCode;
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::{AUTHORIZATION_HEADER, SESSION_COOKIE};

/// Pipeline outcome attached to a response's extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeTag(pub &'static str);

/// API operation a path belongs to, and the session it names, if any.
fn classify(path: &str) -> (&'static str, Option<&str>) {
    let route = path.strip_prefix("/api/v1").unwrap_or(path);
    let segments: Vec<&str> = route.trim_matches('/').split('/').collect();

    match segments.as_slice() {
        ["deploy", "export"] => ("export", None),
        ["deploy", "export", "bitbucket"] => ("export_bitbucket", None),
        ["deploy", "provision-and-trigger"] => ("provision_and_trigger", None),
        ["deploy", "sessions"] => ("list_sessions", None),
        ["sessions"] => ("register_session", None),
        ["deploy", "session", id] => ("session", Some(*id)),
        ["deploy", "session", id, "events"] => ("session_events", Some(*id)),
        ["health"] | ["ready"] => ("health_check", None),
        _ => ("other", None),
    }
}

fn token_source(req: &ServiceRequest) -> &'static str {
    let bearer = req
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "));
    if bearer {
        "bearer"
    } else if req.cookie(SESSION_COOKIE).is_some() {
        "cookie"
    } else {
        "anonymous"
    }
}

pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

pub struct RequestLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().clone();
        let (operation, session) = classify(req.path());
        let session_id = session.unwrap_or("-").to_string();
        let caller = token_source(&req);

        // Health checks log at trace level only
        if operation == "health_check" {
            tracing::trace!(target: "api", path = %req.path(), "Health check");
        } else {
            info!(
                target: "api",
                %method,
                operation,
                session_id = %session_id,
                caller,
                "Request started"
            );
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            if operation == "health_check" {
                return Ok(res);
            }

            let status = res.status();
            let outcome = res
                .response()
                .extensions()
                .get::<OutcomeTag>()
                .map(|t| t.0)
                .unwrap_or("-");
            let duration_ms = start.elapsed().as_millis() as u64;

            match status_class(status) {
                StatusClass::Ok => info!(
                    target: "api",
                    %method, operation, session_id = %session_id,
                    status = status.as_u16(), outcome, duration_ms,
                    "Request finished"
                ),
                StatusClass::Rejected => warn!(
                    target: "api",
                    %method, operation, session_id = %session_id,
                    status = status.as_u16(), outcome, duration_ms,
                    "Request rejected"
                ),
                StatusClass::Failed => error!(
                    target: "api",
                    %method, operation, session_id = %session_id,
                    status = status.as_u16(), outcome, duration_ms,
                    "Request failed"
                ),
            }

            Ok(res)
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum StatusClass {
    Ok,
    Rejected,
    Failed,
}

fn status_class(status: StatusCode) -> StatusClass {
    if status.is_server_error() {
        StatusClass::Failed
    } else if status.is_client_error() {
        StatusClass::Rejected
    } else {
        StatusClass::Ok
    }
}
