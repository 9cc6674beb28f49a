//! GitHub export adapter: creates a repository and commits a file set as one tree.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::config::GitHubSettings;
use crate::error::{AppError, AppResult};
use crate::models::GeneratedFile;
use crate::services::http::upstream_error;
use crate::services::paths::normalize_path;

const SERVICE: &str = "GitHub";
const API_VERSION: &str = "2022-11-28";
/// Git mode for a regular file blob.
const FILE_MODE: &str = "100644";

static REPO_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"github\.com/([^/]+)/([^/?#]+)").unwrap());

/// Parse `(owner, repo)` out of a GitHub repository URL.
pub fn parse_repository_url(url: &str) -> Option<(String, String)> {
    let caps = REPO_URL.captures(url)?;
    let owner = caps[1].to_string();
    let repo = caps[2].trim_end_matches(".git").to_string();
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner, repo))
}

/// Parameters for a new repository.
#[derive(Debug, Clone)]
pub struct NewRepository<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub is_private: bool,
    pub commit_message: &'a str,
}

/// Result of a successful export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedRepository {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    pub default_branch: String,
    pub commit_sha: String,
    /// Committed paths, after normalization.
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    full_name: String,
    html_url: String,
    clone_url: String,
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: ShaObject,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    tree: ShaObject,
}

#[derive(Debug, Deserialize)]
struct ShaObject {
    sha: String,
}

#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<SecretString>,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, settings: &GitHubSettings) -> Self {
        GitHubClient {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        }
    }

    /// Fail with `CredentialsMissing` when no token is configured.
    pub fn ensure_configured(&self) -> AppResult<()> {
        self.token().map(|_| ())
    }

    fn token(&self) -> AppResult<&SecretString> {
        self.token.as_ref().ok_or(AppError::CredentialsMissing {
            service: SERVICE,
            env_var: "GITHUB_TOKEN",
        })
    }

    fn request(&self, method: Method, path: &str) -> AppResult<RequestBuilder> {
        let token = self.token()?;
        Ok(self
            .http
            .request(method, format!("{}{}", self.api_url, path))
            .bearer_auth(token.expose_secret())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION))
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        step: &str,
    ) -> AppResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("{}: {}", step, e)))?;
        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("{}: invalid response: {}", step, e)))
    }

    /// Create a repository and commit every file in a single tree.
    ///
    /// A name conflict fails with `RepoAlreadyExists` before any git data is
    /// written. A failure after creation leaves the repository in place.
    pub async fn export_files(
        &self,
        repo: &NewRepository<'_>,
        files: &[GeneratedFile],
    ) -> AppResult<ExportedRepository> {
        self.ensure_configured()?;

        // 1. Create repository
        let response = self
            .request(Method::POST, "/user/repos")?
            .json(&json!({
                "name": repo.name,
                "description": repo.description,
                "private": repo.is_private,
                "auto_init": true,
            }))
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            tracing::warn!(repo = %repo.name, "Repository name already taken");
            return Err(AppError::RepoAlreadyExists(repo.name.to_string()));
        }
        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }
        let created: RepoResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("invalid repository: {}", e)))?;
        let branch = created
            .default_branch
            .clone()
            .unwrap_or_else(|| "main".to_string());
        tracing::info!(repo = %created.full_name, branch = %branch, "Repository created");

        // 2. Resolve head commit and its tree
        let head: RefResponse = self
            .send_json(
                self.request(
                    Method::GET,
                    &format!("/repos/{}/git/refs/heads/{}", created.full_name, branch),
                )?,
                "resolve branch",
            )
            .await?;
        let base: CommitResponse = self
            .send_json(
                self.request(
                    Method::GET,
                    &format!("/repos/{}/git/commits/{}", created.full_name, head.object.sha),
                )?,
                "resolve base tree",
            )
            .await?;

        // 3. Flat, normalized entry list
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(files.len());
        let mut paths = Vec::with_capacity(files.len());
        for file in files {
            let path = normalize_path(&file.path);
            if path.is_empty() || !seen.insert(path.clone()) {
                tracing::warn!(path = %file.path, "Skipping empty or duplicate path");
                continue;
            }
            tracing::debug!(path = %path, "Adding file to tree");
            entries.push(json!({
                "path": path,
                "mode": FILE_MODE,
                "type": "blob",
                "content": file.content,
            }));
            paths.push(path);
        }

        // 4. One tree for everything
        let tree: ShaObject = self
            .send_json(
                self.request(
                    Method::POST,
                    &format!("/repos/{}/git/trees", created.full_name),
                )?
                .json(&json!({ "base_tree": base.tree.sha, "tree": entries })),
                "create tree",
            )
            .await?;

        // 5. Commit on top of the head
        let commit: ShaObject = self
            .send_json(
                self.request(
                    Method::POST,
                    &format!("/repos/{}/git/commits", created.full_name),
                )?
                .json(&json!({
                    "message": repo.commit_message,
                    "tree": tree.sha,
                    "parents": [base.sha],
                })),
                "create commit",
            )
            .await?;

        // 6. Move the branch
        let _: serde_json::Value = self
            .send_json(
                self.request(
                    Method::PATCH,
                    &format!("/repos/{}/git/refs/heads/{}", created.full_name, branch),
                )?
                .json(&json!({ "sha": commit.sha })),
                "update branch",
            )
            .await?;

        tracing::info!(
            repo = %created.full_name,
            files = paths.len(),
            commit = %commit.sha,
            "Files committed"
        );

        Ok(ExportedRepository {
            name: repo.name.to_string(),
            full_name: created.full_name,
            html_url: created.html_url,
            clone_url: created.clone_url,
            default_branch: branch,
            commit_sha: commit.sha,
            files: paths,
        })
    }

    /// Delete a repository. A repository that is already gone counts as deleted.
    pub async fn delete_repository(&self, owner: &str, repo: &str) -> AppResult<()> {
        let response = self
            .request(Method::DELETE, &format!("/repos/{}/{}", owner, repo))?
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(upstream_error(SERVICE, response).await)
    }
}
