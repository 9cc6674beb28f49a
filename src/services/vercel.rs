//! Vercel hosting adapter: project provisioning, deployment calls and deletion.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use crate::config::VercelSettings;
use crate::error::{AppError, AppResult};
use crate::services::http::upstream_error;

const SERVICE: &str = "Vercel";
/// Longest project name the platform accepts.
const MAX_PROJECT_NAME: usize = 100;

static INVALID_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9._-]").unwrap());
static DASH_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{3,}").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Turn an arbitrary name into a valid project name.
pub fn sanitize_project_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let dashed = WHITESPACE.replace_all(lower.trim(), "-");
    let cleaned = INVALID_NAME_CHARS.replace_all(&dashed, "");
    let collapsed = DASH_RUN.replace_all(&cleaned, "--");
    let trimmed = collapsed.trim_matches(|c| c == '-' || c == '.' || c == '_');
    let truncated: String = trimmed.chars().take(MAX_PROJECT_NAME).collect();
    truncated
        .trim_end_matches(|c| c == '-' || c == '.' || c == '_')
        .to_string()
}

/// Framework presets. Only Next.js is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    NextJs,
}

impl Framework {
    pub fn slug(&self) -> &'static str {
        match self {
            Framework::NextJs => "nextjs",
        }
    }

    fn build_settings(&self) -> JsonValue {
        match self {
            Framework::NextJs => json!({
                "buildCommand": "npm run build",
                "devCommand": "npm run dev",
                "installCommand": "npm install",
                "outputDirectory": ".next",
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    id: String,
    name: String,
    account_id: Option<String>,
    link: Option<ProjectLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectLink {
    repo_id: Option<JsonValue>,
}

/// A provisioned hosting project.
#[derive(Debug, Clone, PartialEq)]
pub struct HostingProject {
    pub id: String,
    pub name: String,
    pub account_id: Option<String>,
    pub dashboard_url: String,
    /// Internal id of the linked repository, once the platform has linked it.
    pub repo_id: Option<JsonValue>,
}

/// A deployment the platform accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentHandle {
    pub id: String,
    /// Host name without scheme, when the platform reported one.
    pub url: Option<String>,
    pub state: String,
}

impl DeploymentHandle {
    /// Read the loosely-shaped deployment payloads the platform returns.
    pub fn from_payload(payload: &JsonValue) -> Self {
        let str_at = |ptr: &str| payload.pointer(ptr).and_then(JsonValue::as_str);

        let id = str_at("/id")
            .or_else(|| str_at("/uid"))
            .or_else(|| str_at("/job/id"))
            .unwrap_or_default()
            .to_string();
        let url = str_at("/url")
            .or_else(|| str_at("/alias/0"))
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        let state = str_at("/readyState")
            .or_else(|| str_at("/state"))
            .or_else(|| str_at("/job/state"))
            .unwrap_or("BUILDING")
            .to_string();

        DeploymentHandle { id, url, state }
    }

    /// Public URL of this deployment, or `fallback` when none was reported.
    pub fn public_url(&self, fallback: &str) -> String {
        match &self.url {
            Some(u) if u.starts_with("http://") || u.starts_with("https://") => u.clone(),
            Some(u) => format!("https://{}", u),
            None => fallback.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct VercelClient {
    http: reqwest::Client,
    api_url: String,
    dashboard_url: String,
    token: Option<SecretString>,
    team_id: Option<String>,
}

impl VercelClient {
    pub fn new(http: reqwest::Client, settings: &VercelSettings) -> Self {
        VercelClient {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            dashboard_url: settings.dashboard_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            team_id: settings.team_id.clone(),
        }
    }

    pub fn ensure_configured(&self) -> AppResult<()> {
        self.token().map(|_| ())
    }

    fn token(&self) -> AppResult<&SecretString> {
        self.token.as_ref().ok_or(AppError::CredentialsMissing {
            service: SERVICE,
            env_var: "VERCEL_TOKEN",
        })
    }

    fn request(&self, method: Method, path: &str) -> AppResult<RequestBuilder> {
        let token = self.token()?;
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.api_url, path))
            .bearer_auth(token.expose_secret());
        if let Some(team) = &self.team_id {
            builder = builder.query(&[("teamId", team)]);
        }
        Ok(builder)
    }

    /// Dashboard link for a project.
    pub fn dashboard_url(&self, account_id: Option<&str>, project_name: &str) -> String {
        match account_id {
            Some(account) => format!("{}/{}/{}", self.dashboard_url, account, project_name),
            None => format!("{}/{}", self.dashboard_url, project_name),
        }
    }

    fn to_project(&self, p: ProjectResponse) -> HostingProject {
        HostingProject {
            dashboard_url: self.dashboard_url(p.account_id.as_deref(), &p.name),
            repo_id: p.link.and_then(|l| l.repo_id).filter(|v| !v.is_null()),
            id: p.id,
            name: p.name,
            account_id: p.account_id,
        }
    }

    /// Create a project bound to `repo_full_name` with the framework's build defaults.
    pub async fn provision_project(
        &self,
        name: &str,
        repo_full_name: &str,
        framework: Framework,
        public_source: bool,
    ) -> AppResult<HostingProject> {
        let mut body = json!({
            "name": sanitize_project_name(name),
            "gitRepository": { "type": "github", "repo": repo_full_name },
            "framework": framework.slug(),
            "publicSource": public_source,
        });
        if let (Some(obj), JsonValue::Object(settings)) =
            (body.as_object_mut(), framework.build_settings())
        {
            obj.extend(settings);
        }

        let response = self
            .request(Method::POST, "/v9/projects")?
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }

        let project: ProjectResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("invalid project: {}", e)))?;
        let project = self.to_project(project);
        tracing::info!(project_id = %project.id, name = %project.name, "Hosting project created");
        Ok(project)
    }

    /// Read a project's current state.
    pub async fn get_project(&self, project_id: &str) -> AppResult<HostingProject> {
        let response = self
            .request(Method::GET, &format!("/v9/projects/{}", project_id))?
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }
        let project: ProjectResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("invalid project: {}", e)))?;
        Ok(self.to_project(project))
    }

    /// Delete a project. A project that is already gone counts as deleted.
    pub async fn delete_project(&self, project_id: &str) -> AppResult<()> {
        let response = self
            .request(Method::DELETE, &format!("/v9/projects/{}", project_id))?
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(upstream_error(SERVICE, response).await)
    }

    async fn post_deployment(
        &self,
        path: &str,
        body: Option<JsonValue>,
    ) -> AppResult<DeploymentHandle> {
        let mut builder = self.request(Method::POST, path)?;
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }
        let payload: JsonValue = response.json().await.unwrap_or(JsonValue::Null);
        Ok(DeploymentHandle::from_payload(&payload))
    }

    /// Production deployment from a git source.
    pub async fn create_git_deployment(
        &self,
        project: &HostingProject,
        repo_full_name: &str,
        branch: &str,
    ) -> AppResult<DeploymentHandle> {
        let mut git_source = json!({
            "type": "github",
            "repo": repo_full_name,
            "ref": branch,
        });
        if let (Some(src), Some(repo_id)) = (git_source.as_object_mut(), &project.repo_id) {
            src.insert("repoId".to_string(), repo_id.clone());
        }

        self.post_deployment(
            "/v13/deployments",
            Some(json!({
                "name": project.name,
                "project": project.id,
                "gitSource": git_source,
                "target": "production",
            })),
        )
        .await
    }

    /// Deployment through the project's branch deploy hook.
    pub async fn trigger_deploy_hook(
        &self,
        project_id: &str,
        branch: &str,
    ) -> AppResult<DeploymentHandle> {
        self.post_deployment(
            &format!(
                "/v1/integrations/deploy/{}/{}",
                project_id,
                urlencoding::encode(branch)
            ),
            None,
        )
        .await
    }

    /// Production redeploy of an existing project.
    pub async fn redeploy(&self, project_id: &str) -> AppResult<DeploymentHandle> {
        self.post_deployment(
            &format!("/v9/projects/{}/redeploy", project_id),
            Some(json!({ "target": "production" })),
        )
        .await
    }
}
