//! Actix-web extractors resolving the calling identity.
//!
//! The raw token is wrapped in `SecretString` as soon as it is read and never logged.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, web};
use secrecy::{ExposeSecret, SecretString};
use std::future::{Ready, ready};

use super::SessionVerifier;
use crate::config::{AUTHORIZATION_HEADER, SESSION_COOKIE};
use crate::error::AppError;
use crate::models::AuthenticatedCaller;

/// Read the session token from the bearer header, then the session cookie.
pub(crate) fn extract_token(req: &HttpRequest) -> Option<SecretString> {
    let bearer = req
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| SecretString::from(v.to_string()));

    bearer.or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .map(SecretString::from)
    })
}

fn resolve(req: &HttpRequest) -> Result<Option<AuthenticatedCaller>, AppError> {
    let Some(token) = extract_token(req) else {
        return Ok(None);
    };

    let verifier = req
        .app_data::<web::Data<SessionVerifier>>()
        .ok_or_else(|| AppError::Unauthorized("Internal configuration error".to_string()))?;

    verifier
        .verify(token.expose_secret())
        .map(Some)
        .map_err(AppError::Unauthorized)
}

/// Caller that may be anonymous. An invalid token is still rejected.
///
/// ```ignore
/// async fn handler(caller: OptionalCaller) -> impl Responder {
///     let owner = caller.caller().map(|c| c.id.clone());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct OptionalCaller(pub Option<AuthenticatedCaller>);

impl OptionalCaller {
    pub fn caller(&self) -> Option<&AuthenticatedCaller> {
        self.0.as_ref()
    }
}

impl FromRequest for OptionalCaller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(resolve(req).map(OptionalCaller))
    }
}

/// Caller that must present a valid session token.
#[derive(Debug, Clone)]
pub struct RequiredCaller(pub AuthenticatedCaller);

impl FromRequest for RequiredCaller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(match resolve(req) {
            Ok(Some(caller)) => Ok(RequiredCaller(caller)),
            Ok(None) => Err(AppError::Unauthorized(
                "Missing session token. Provide a Bearer token or session cookie.".to_string(),
            )),
            Err(e) => Err(e),
        })
    }
}
