//! WebSocket handler for session-scoped deployment updates.
//!
//! `GET /deploy/session/{session_id}/events` upgrades to a WebSocket that
//! streams every `DeploymentEvent` of that session. The caller must be allowed
//! to read the session; the check runs before the upgrade so rejected requests
//! get a normal JSON error.

use actix_web::{HttpRequest, HttpResponse, web};
use actix_ws::Message;
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::auth::OptionalCaller;
use crate::services::event_broadcaster::SessionSubscription;
use crate::services::pipeline::DeploymentPipeline;

/// Ping interval for keeping connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for receiving pong response.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Authorize, then upgrade the HTTP connection to a WebSocket.
pub async fn session_events(
    req: HttpRequest,
    stream: web::Payload,
    caller: OptionalCaller,
    pipeline: web::Data<DeploymentPipeline>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let session_id = path.into_inner();

    if let Err(e) = pipeline.get_deployment(&session_id, caller.caller()).await {
        warn!(session_id = %session_id, error = %e, "WebSocket subscription rejected");
        return Err(e.into());
    }

    let client_addr = req
        .connection_info()
        .realip_remote_addr()
        .map(String::from)
        .unwrap_or_else(|| "unknown".to_string());

    // Subscribe before upgrading so no event published in between is lost.
    let subscription = pipeline.events().subscribe_session(&session_id);
    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;

    info!(client = %client_addr, session_id = %session_id, "WebSocket connection established");

    actix_web::rt::spawn(handle_connection(
        session,
        msg_stream,
        subscription,
        client_addr,
    ));

    Ok(response)
}

/// Handles an individual WebSocket connection.
async fn handle_connection(
    mut session: actix_ws::Session,
    mut msg_stream: actix_ws::MessageStream,
    mut subscription: SessionSubscription,
    client_addr: String,
) {
    let mut last_pong = Instant::now();
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);

    loop {
        tokio::select! {
            Some(msg_result) = msg_stream.next() => {
                match msg_result {
                    Ok(Message::Ping(bytes)) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Pong(_)) => {
                        debug!(client = %client_addr, "Received pong");
                        last_pong = Instant::now();
                    }
                    Ok(Message::Close(reason)) => {
                        info!(client = %client_addr, reason = ?reason, "Client requested close");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(client = %client_addr, error = %e, "WebSocket message error");
                        break;
                    }
                }
            }

            event = subscription.recv() => {
                let Some(event) = event else {
                    info!(client = %client_addr, "Event channel closed");
                    break;
                };
                let deleted = matches!(event, crate::models::DeploymentEvent::SessionDeleted(_));
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if session.text(json).await.is_err() {
                            warn!(client = %client_addr, "Failed to send event, closing connection");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to serialize event"),
                }
                // Nothing more will happen to a deleted session.
                if deleted {
                    break;
                }
            }

            _ = ping_interval.tick() => {
                if last_pong.elapsed() > PING_INTERVAL + PONG_TIMEOUT {
                    warn!(client = %client_addr, "Pong timeout, closing connection");
                    break;
                }
                if session.ping(b"").await.is_err() {
                    warn!(client = %client_addr, "Failed to send ping, closing connection");
                    break;
                }
            }
        }
    }

    let _ = session.close(None).await;
    info!(
        client = %client_addr,
        session_id = %subscription.session_id(),
        "WebSocket connection closed"
    );
}

/// Configure WebSocket routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/deploy/session/{session_id}/events").route(web::get().to(session_events)),
    );
}
