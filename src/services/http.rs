//! Shared outbound HTTP plumbing for external hosts.

use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::error::AppError;

/// HTTP connect timeout for external API calls.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// HTTP total timeout for external API calls.
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// User agent sent to every external host.
pub const USER_AGENT: &str = concat!("site-deployer/", env!("CARGO_PKG_VERSION"));

/// Build an HTTP client with timeouts.
pub fn build_http_client() -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::upstream("HTTP", format!("Failed to build HTTP client: {}", e)))
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"message": ..}`, `{"error": {"message": ..}}` and
/// `{"error": ".."}`; falls back to the raw text.
pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.get("message")
            .and_then(JsonValue::as_str)
            .or_else(|| v.pointer("/error/message").and_then(JsonValue::as_str))
            .or_else(|| v.get("error").and_then(JsonValue::as_str))
            .map(str::to_string)
    });

    match message {
        Some(m) => m,
        None if body.trim().is_empty() => format!("HTTP {}", status.as_u16()),
        None => body.trim().to_string(),
    }
}

/// Turn a non-success response into an `Upstream` error.
pub async fn upstream_error(service: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    AppError::upstream(service, error_message(status, &body))
}
