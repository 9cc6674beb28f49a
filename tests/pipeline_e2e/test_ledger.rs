//! E2E tests: session registration, lookup and listing.

use actix_web::test;
use serde_json::json;
use site_deployer_lib::config::AuthorizationMode;

use super::mock_hosts::MockHosts;
use super::test_helpers::*;

async fn register<S>(app: &S, session_id: &str, token: Option<&str>) -> (u16, serde_json::Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    send_json(
        app,
        test::TestRequest::post()
            .uri("/api/v1/sessions")
            .set_json(json!({ "sessionId": session_id })),
        token,
    )
    .await
}

/// (1) Registration is idempotent for the owner and closed to others.
#[actix_rt::test]
async fn test_register_session() {
    let mock = MockHosts::start().await;
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;
    let session = unique_session("reg");
    let alice = token_for("alice");

    let (status, body) = register(&app, &session, Some(&alice)).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["created"], true);

    let (status, body) = register(&app, &session, Some(&alice)).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["created"], false);

    let (status, _) = register(&app, &session, Some(&token_for("bob"))).await;
    assert_eq!(status, 403);

    let record = pool.find_deployment(&session).await.unwrap().unwrap();
    assert_eq!(record.owner_id.as_deref(), Some("alice"));
}

/// (2) Lookup follows the ownership rules.
#[actix_rt::test]
async fn test_get_session_authorization() {
    let mock = MockHosts::start().await;
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;

    let owned = unique_session("owned");
    pool.insert_deployment_if_absent(&owned, Some("alice"))
        .await
        .unwrap();
    let anonymous = unique_session("anon");
    pool.insert_deployment_if_absent(&anonymous, None)
        .await
        .unwrap();

    let (status, body) = get_session(&app, &owned, Some(&token_for("alice"))).await;
    assert_eq!(status, 200);
    assert_eq!(body["sessionId"], owned.as_str());
    assert_eq!(body["deploymentStatus"], "unset");

    let (status, _) = get_session(&app, &owned, Some(&token_for("bob"))).await;
    assert_eq!(status, 403);

    let (status, _) = get_session(&app, &owned, None).await;
    assert_eq!(status, 401);

    // Anonymous rows stay open
    let (status, _) = get_session(&app, &anonymous, Some(&token_for("bob"))).await;
    assert_eq!(status, 200);

    let (status, _) = get_session(&app, "no-such-session", None).await;
    assert_eq!(status, 404);
}

/// (3) Listing returns only the caller's sessions.
#[actix_rt::test]
async fn test_list_sessions() {
    let mock = MockHosts::start().await;
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;

    for id in ["alice-1", "alice-2"] {
        pool.insert_deployment_if_absent(id, Some("alice"))
            .await
            .unwrap();
    }
    pool.insert_deployment_if_absent("bob-1", Some("bob"))
        .await
        .unwrap();

    let (status, _) = send_json(
        &app,
        test::TestRequest::get().uri("/api/v1/deploy/sessions"),
        None,
    )
    .await;
    assert_eq!(status, 401);

    let (status, body) = send_json(
        &app,
        test::TestRequest::get().uri("/api/v1/deploy/sessions"),
        Some(&token_for("alice")),
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["total"], 2);
    let ids: Vec<&str> = body["deployments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["sessionId"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"alice-1"));
    assert!(ids.contains(&"alice-2"));
    assert!(!ids.contains(&"bob-1"));
}

/// (4) Health and readiness.
#[actix_rt::test]
async fn test_health_and_ready() {
    let mock = MockHosts::start().await;
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;

    let (status, body) = send_json(&app, test::TestRequest::get().uri("/api/v1/health"), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["integrations"]["github"], true);
    assert_eq!(body["integrations"]["vercel"], true);
    assert_eq!(body["integrations"]["bitbucket"], false);

    let (status, body) = send_json(&app, test::TestRequest::get().uri("/api/v1/ready"), None).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["ledger"], "connected");
}

/// Missing deployment credentials show up as a degraded service.
#[actix_rt::test]
async fn test_health_degraded_without_vercel_token() {
    let mock = MockHosts::start().await;
    let mut config = test_config(&mock, AuthorizationMode::StrictOwner);
    config.vercel.token = None;
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;

    let (status, body) = send_json(&app, test::TestRequest::get().uri("/api/v1/health"), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["integrations"]["vercel"], false);
    assert!(mock.state.lock().unwrap().calls.is_empty());
}

/// (5) Event subscriptions are authorized before the WebSocket upgrade.
#[actix_rt::test]
async fn test_event_stream_rejects_before_upgrade() {
    let mock = MockHosts::start().await;
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;

    let owned = unique_session("ws");
    pool.insert_deployment_if_absent(&owned, Some("alice"))
        .await
        .unwrap();

    let (status, body) = send_json(
        &app,
        test::TestRequest::get().uri("/api/v1/deploy/session/no-such-session/events"),
        None,
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send_json(
        &app,
        test::TestRequest::get().uri(&format!("/api/v1/deploy/session/{}/events", owned)),
        Some(&token_for("bob")),
    )
    .await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "FORBIDDEN");
}
