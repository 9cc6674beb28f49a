//! E2E tests: export, provision and trigger in one call.

use actix_web::test;
use serde_json::json;
use site_deployer_lib::config::AuthorizationMode;
use site_deployer_lib::middleware::OutcomeTag;

use super::mock_hosts::MockHosts;
use super::test_helpers::*;

/// (1) Everything succeeds on the first strategy.
#[actix_rt::test]
async fn test_full_pipeline_success() {
    let mock = MockHosts::start().await;
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;
    let session = unique_session("full");
    let token = token_for("user-a");

    let (status, body) = provision_and_trigger(&app, &session, "bakery-full", Some(&token)).await;

    assert_eq!(status, 200, "Pipeline should succeed: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["repository"]["branch"], "trunk");
    assert_eq!(body["hostingProject"]["id"], "prj_123");
    assert_eq!(
        body["hostingProject"]["dashboardUrl"],
        "https://vercel.com/team_acme/bakery-site"
    );
    assert_eq!(body["deployment"]["strategy"], "git-source");
    assert_eq!(body["deployment"]["id"], "dpl_git");
    assert_eq!(body["deploymentUrl"], "https://bakery-site-git.vercel.app");

    // Project named after the sanitized project name, then reread once
    assert_eq!(mock.calls_matching("POST /vercel/v9/projects").len(), 1);
    assert_eq!(mock.calls_matching("GET /vercel/v9/projects/prj_123").len(), 1);
    assert!(mock.calls_matching("/integrations/deploy").is_empty());

    let (status, record) = get_session(&app, &session, Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(record["ownerId"], "user-a");
    assert_eq!(record["deploymentStatus"], "deployed");
    assert_eq!(record["deploymentUrl"], "https://bakery-site-git.vercel.app");
    assert_eq!(record["hostingProjectId"], "prj_123");
    assert!(record["deployedAt"].is_string());
}

/// (2) A rejected git-source deployment falls through to the deploy hook.
#[actix_rt::test]
async fn test_fallback_to_deploy_hook() {
    let mock = MockHosts::start().await;
    mock.set(|s| {
        s.failing_strategies.insert("git-source");
    });
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;

    let (status, body) =
        provision_and_trigger(&app, &unique_session("hook"), "bakery-hook", None).await;

    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["deployment"]["strategy"], "deploy-hook");
    assert_eq!(body["deployment"]["id"], "job_hook");
    assert_eq!(body["deployment"]["state"], "PENDING");
    // The hook returns no URL; the dashboard stands in
    assert_eq!(
        body["deploymentUrl"],
        "https://vercel.com/team_acme/bakery-site"
    );
    assert_eq!(mock.calls_matching("/integrations/deploy/prj_123/trunk").len(), 1);
    assert!(mock.calls_matching("/redeploy").is_empty());
}

/// (3) Every strategy fails: partial success with manual instructions.
#[actix_rt::test]
async fn test_partial_success_when_all_strategies_fail() {
    let mock = MockHosts::start().await;
    mock.set(|s| {
        s.failing_strategies
            .extend(["git-source", "deploy-hook", "redeploy"]);
    });
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;
    let session = unique_session("partial");

    let (status, body) = provision_and_trigger(&app, &session, "bakery-partial", None).await;

    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["success"], false);
    assert_eq!(body["partialSuccess"], true);
    assert_eq!(body["githubSuccess"], true);
    assert_eq!(body["hostingProjectSuccess"], true);
    assert_eq!(body["deploymentSuccess"], false);
    assert_eq!(body["repository"]["url"], "https://github.com/acme/bakery-partial");
    assert_eq!(body["hostingProject"]["id"], "prj_123");
    assert!(
        body["deploymentError"]
            .as_str()
            .unwrap()
            .contains("No previous deployment")
    );
    assert_eq!(body["instructions"].as_array().unwrap().len(), 4);

    let (_, record) = get_session(&app, &session, None).await;
    assert_eq!(record["deploymentStatus"], "pending");
    assert!(record["deploymentUrl"].is_null());
    assert_eq!(record["hostingProjectId"], "prj_123");
}

/// The response carries the pipeline outcome for the request log.
#[actix_rt::test]
async fn test_outcome_tagged_on_response() {
    let mock = MockHosts::start().await;
    mock.set(|s| {
        s.failing_strategies
            .extend(["git-source", "deploy-hook", "redeploy"]);
    });
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/deploy/provision-and-trigger")
        .set_json(json!({ "sessionId": unique_session("tagged"), "repoName": "bakery-tagged" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.response().extensions().get::<OutcomeTag>().copied(),
        Some(OutcomeTag("partial"))
    );
}

/// (4) Provisioning fails after export: 500 that still carries the repository.
#[actix_rt::test]
async fn test_provisioning_failure_after_export() {
    let mock = MockHosts::start().await;
    mock.set(|s| s.fail_provision = true);
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;
    let session = unique_session("noproject");

    let (status, body) = provision_and_trigger(&app, &session, "bakery-noproject", None).await;

    assert_eq!(status, 500, "{}", body);
    assert_eq!(body["success"], false);
    assert_eq!(body["githubSuccess"], true);
    assert_eq!(body["hostingProjectSuccess"], false);
    assert_eq!(body["repository"]["url"], "https://github.com/acme/bakery-noproject");
    assert!(body["details"].as_str().unwrap().contains("Project name is invalid"));
    assert!(mock.calls_matching("/v13/deployments").is_empty());

    let (_, record) = get_session(&app, &session, None).await;
    assert_eq!(record["deploymentStatus"], "failed");
    assert_eq!(record["repositoryUrl"], "https://github.com/acme/bakery-noproject");
    assert!(record["hostingProjectId"].is_null());
}

/// (5) Missing hosting token: nothing is exported.
#[actix_rt::test]
async fn test_missing_vercel_token_stops_before_export() {
    let mock = MockHosts::start().await;
    let mut config = test_config(&mock, AuthorizationMode::StrictOwner);
    config.vercel.token = None;
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;

    let (status, body) =
        provision_and_trigger(&app, &unique_session("novercel"), "bakery-x", None).await;

    assert_eq!(status, 500, "{}", body);
    assert_eq!(body["code"], "CREDENTIALS_MISSING");
    assert!(body["details"].as_str().unwrap().contains("VERCEL_TOKEN"));
    assert!(mock.calls_matching("/github/").is_empty());
}

/// (6) Another user cannot run the pipeline on an owned session.
#[actix_rt::test]
async fn test_pipeline_on_foreign_session_is_forbidden() {
    let mock = MockHosts::start().await;
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;
    let session = unique_session("foreign");

    pool.insert_deployment_if_absent(&session, Some("user-a"))
        .await
        .unwrap();

    let token = token_for("user-b");
    let (status, body) = provision_and_trigger(&app, &session, "bakery-foreign", Some(&token)).await;

    assert_eq!(status, 403, "{}", body);
    assert!(mock.calls_matching("/github/").is_empty());
    assert!(mock.calls_matching("/v0/").is_empty());
}
