//! Shared test helpers for pipeline E2E tests.

use actix_web::{App, dev::ServiceResponse, test, web};
use secrecy::SecretString;
use serde_json::Value;
use site_deployer_lib::auth::SessionVerifier;
use site_deployer_lib::config::{
    AuthorizationMode, BitbucketSettings, Config, DatabaseSettings, Environment,
    GenerationSettings, GitHubSettings, PipelineSettings, SessionSettings, VercelSettings,
};
use site_deployer_lib::db::DbPool;
use site_deployer_lib::models::AuthenticatedCaller;
use site_deployer_lib::services::{DeploymentPipeline, EventBroadcaster};
use std::time::Duration;
use uuid::Uuid;

use super::mock_hosts::MockHosts;

pub const TEST_SESSION_SECRET: &str = "pipeline-e2e-session-secret";
pub const TEST_ISSUER: &str = "site-deployer-tests";

/// Configuration pointing every external host at the mock.
pub fn test_config(mock: &MockHosts, auth_mode: AuthorizationMode) -> Config {
    Config {
        environment: Environment::Development,
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        auth_mode,
        session: SessionSettings {
            secret: SecretString::from(TEST_SESSION_SECRET.to_string()),
            issuer: TEST_ISSUER.to_string(),
        },
        github: GitHubSettings {
            api_url: mock.url("github"),
            token: Some(SecretString::from("ghp_test".to_string())),
        },
        vercel: VercelSettings {
            api_url: mock.url("vercel"),
            dashboard_url: "https://vercel.com".to_string(),
            token: Some(SecretString::from("vercel_test".to_string())),
            team_id: None,
        },
        bitbucket: BitbucketSettings {
            api_url: mock.url("bitbucket"),
            username: None,
            app_password: None,
        },
        generation: GenerationSettings {
            api_url: mock.url("v0"),
            api_key: Some(SecretString::from("v0_test".to_string())),
        },
        pipeline: PipelineSettings {
            registry_url: mock.url("registry"),
            settle_delay: Duration::ZERO,
        },
    }
}

/// Fresh in-memory ledger with the schema applied.
pub async fn create_test_pool(config: &Config) -> DbPool {
    let pool = DbPool::new(config)
        .await
        .expect("Failed to open in-memory database");
    pool.run_migrations()
        .await
        .expect("Failed to run migrations");
    pool
}

/// Unique session ID for test isolation.
pub fn unique_session(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        Uuid::new_v4().to_string().split('-').next().unwrap()
    )
}

/// Session token for `user_id`, signed with the test secret.
pub fn token_for(user_id: &str) -> String {
    let verifier = SessionVerifier::new(&SessionSettings {
        secret: SecretString::from(TEST_SESSION_SECRET.to_string()),
        issuer: TEST_ISSUER.to_string(),
    });
    verifier
        .issue(
            &AuthenticatedCaller {
                id: user_id.to_string(),
                email: Some(format!("{}@example.com", user_id)),
            },
            600,
        )
        .expect("failed to issue token")
}

/// Create a test app wired to the mock hosts.
pub async fn create_test_app(
    config: &Config,
    pool: &DbPool,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    let broadcaster = EventBroadcaster::new();
    let pipeline = DeploymentPipeline::new(config, pool.clone(), broadcaster.clone())
        .expect("Failed to build pipeline");
    let verifier = SessionVerifier::new(&config.session);

    test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(verifier))
            .app_data(web::Data::new(broadcaster))
            .app_data(web::Data::new(pipeline))
            .service(
                web::scope("/api/v1")
                    .configure(site_deployer_lib::api::configure_health_routes)
                    .configure(site_deployer_lib::api::configure_deploy_routes)
                    .configure(site_deployer_lib::api::configure_websocket_routes),
            ),
    )
    .await
}

/// Send a JSON request and return status plus parsed body.
pub async fn send_json<S>(
    app: &S,
    req: test::TestRequest,
    token: Option<&str>,
) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = match token {
        Some(t) => req.insert_header(("Authorization", format!("Bearer {}", t))),
        None => req,
    };
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// POST /deploy/provision-and-trigger.
pub async fn provision_and_trigger<S>(
    app: &S,
    session_id: &str,
    repo_name: &str,
    token: Option<&str>,
) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    send_json(
        app,
        test::TestRequest::post()
            .uri("/api/v1/deploy/provision-and-trigger")
            .set_json(serde_json::json!({
                "sessionId": session_id,
                "repoName": repo_name,
                "projectName": "Bakery Site",
            })),
        token,
    )
    .await
}

/// GET /deploy/session/{id}.
pub async fn get_session<S>(app: &S, session_id: &str, token: Option<&str>) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    send_json(
        app,
        test::TestRequest::get().uri(&format!("/api/v1/deploy/session/{}", session_id)),
        token,
    )
    .await
}
