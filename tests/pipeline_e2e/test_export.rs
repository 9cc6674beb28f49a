//! E2E tests: export to GitHub.

use actix_web::test;
use serde_json::{Value, json};
use site_deployer_lib::config::AuthorizationMode;

use super::mock_hosts::{EMPTY_SESSION, MISSING_SESSION, MockHosts};
use super::test_helpers::*;

fn tree_entry<'a>(tree: &'a [Value], path: &str) -> Option<&'a Value> {
    tree.iter().find(|e| e["path"] == path)
}

/// (1) Export commits one normalized, completed tree on the host's default branch.
#[actix_rt::test]
async fn test_export_commits_completed_tree() {
    let mock = MockHosts::start().await;
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;
    let session = unique_session("export");

    let (status, body) = send_json(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/deploy/export")
            .set_json(json!({ "sessionId": session, "repoName": "bakery-export" })),
        None,
    )
    .await;

    assert_eq!(status, 200, "Export should succeed: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["repository"]["branch"], "trunk");
    assert_eq!(body["repository"]["url"], "https://github.com/acme/bakery-export");
    assert_eq!(body["repository"]["fullName"], "acme/bakery-export");
    assert_eq!(body["repository"]["commitSha"], "commit-sha");
    assert_eq!(
        body["filesCreated"].as_u64().unwrap() as usize,
        body["files"].as_array().unwrap().len()
    );

    let tree = mock.committed_tree();
    assert!(!tree.is_empty());
    assert!(
        tree.iter()
            .all(|e| !e["path"].as_str().unwrap().contains("ui/ui/")),
        "paths must be normalized"
    );

    // Fonts rewritten to the framework's font loader
    let layout = tree_entry(&tree, "app/layout.tsx").expect("layout committed");
    let layout_src = layout["content"].as_str().unwrap();
    assert!(layout_src.contains("next/font/google"));
    assert!(!layout_src.contains("geist/font"));

    // Registry component, fallback component and the generated one kept as-is
    let button = tree_entry(&tree, "components/ui/button.tsx").expect("button added");
    assert!(button["content"].as_str().unwrap().contains("// registry"));
    assert!(tree_entry(&tree, "components/ui/badge.tsx").is_some());
    let card = tree_entry(&tree, "components/ui/card.tsx").expect("card kept");
    assert_eq!(card["content"], "export function Card() { return null }");

    // Scaffold
    for path in ["package.json", "tsconfig.json", "lib/utils.ts", "app/globals.css"] {
        assert!(tree_entry(&tree, path).is_some(), "{} missing", path);
    }

    // One tree, one commit, one ref move
    assert_eq!(mock.calls_matching("POST /github/repos/acme/bakery-export/git/trees").len(), 1);
    assert_eq!(mock.calls_matching("PATCH /github/repos/acme/bakery-export/git/refs/heads/trunk").len(), 1);

    let (status, record) = get_session(&app, &session, None).await;
    assert_eq!(status, 200);
    assert_eq!(record["repositoryName"], "bakery-export");
    assert_eq!(record["repositoryUrl"], "https://github.com/acme/bakery-export");
    assert_eq!(record["deploymentStatus"], "unset");
    assert!(record["hostingProjectId"].is_null());
}

/// (2) A taken repository name is a 400 and nothing is committed.
#[actix_rt::test]
async fn test_export_repo_exists() {
    let mock = MockHosts::start().await;
    mock.set(|s| {
        s.existing_repos.insert("taken-name".to_string());
    });
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;

    let (status, body) = send_json(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/deploy/export")
            .set_json(json!({ "sessionId": unique_session("taken"), "repoName": "taken-name" })),
        None,
    )
    .await;

    assert_eq!(status, 400, "{}", body);
    assert_eq!(body["code"], "REPO_ALREADY_EXISTS");
    assert!(body["details"].as_str().unwrap().contains("different name"));
    assert!(mock.calls_matching("/git/trees").is_empty());
    assert!(mock.calls_matching("/git/commits").is_empty());
}

/// (3) Unknown session: 404 before any repository is created.
#[actix_rt::test]
async fn test_export_unknown_session() {
    let mock = MockHosts::start().await;
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;

    let (status, body) = send_json(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/deploy/export")
            .set_json(json!({ "sessionId": MISSING_SESSION, "repoName": "site-x" })),
        None,
    )
    .await;

    assert_eq!(status, 404, "{}", body);
    assert!(mock.calls_matching("/github/").is_empty());
}

/// (4) A session without files is rejected.
#[actix_rt::test]
async fn test_export_empty_session() {
    let mock = MockHosts::start().await;
    let config = test_config(&mock, AuthorizationMode::StrictOwner);
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;

    let (status, body) = send_json(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/deploy/export")
            .set_json(json!({ "sessionId": EMPTY_SESSION, "repoName": "site-y" })),
        None,
    )
    .await;

    assert_eq!(status, 400, "{}", body);
    assert!(body["error"].as_str().unwrap().contains("No files found"));
    assert!(mock.calls_matching("/github/").is_empty());
}

/// (5) Missing GitHub token: 500 with setup instructions, nothing called.
#[actix_rt::test]
async fn test_export_without_github_token() {
    let mock = MockHosts::start().await;
    let mut config = test_config(&mock, AuthorizationMode::StrictOwner);
    config.github.token = None;
    let pool = create_test_pool(&config).await;
    let app = create_test_app(&config, &pool).await;

    let (status, body) = send_json(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/deploy/export")
            .set_json(json!({ "sessionId": unique_session("notoken"), "repoName": "site-z" })),
        None,
    )
    .await;

    assert_eq!(status, 500, "{}", body);
    assert_eq!(body["code"], "CREDENTIALS_MISSING");
    assert!(body["details"].as_str().unwrap().contains("GITHUB_TOKEN"));
    assert!(mock.state.lock().unwrap().calls.is_empty());
}
