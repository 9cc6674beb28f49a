//! Bitbucket export adapter: creates a repository and commits files one request each.

use std::collections::HashSet;

use futures_util::future::join_all;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::config::BitbucketSettings;
use crate::error::{AppError, AppResult};
use crate::models::GeneratedFile;
use crate::services::http::upstream_error;
use crate::services::paths::normalize_path;

const SERVICE: &str = "Bitbucket";
const BRANCH: &str = "main";

#[derive(Debug, Deserialize)]
struct RepoResponse {
    full_name: Option<String>,
    links: RepoLinks,
}

#[derive(Debug, Deserialize)]
struct RepoLinks {
    html: Link,
    #[serde(default)]
    clone: Vec<NamedLink>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[derive(Debug, Deserialize)]
struct NamedLink {
    name: String,
    href: String,
}

/// Result of a Bitbucket export. `files` lists only the commits that succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct BitbucketExport {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    pub branch: String,
    pub files: Vec<String>,
}

#[derive(Clone)]
pub struct BitbucketClient {
    http: reqwest::Client,
    api_url: String,
    username: Option<String>,
    app_password: Option<SecretString>,
}

impl BitbucketClient {
    pub fn new(http: reqwest::Client, settings: &BitbucketSettings) -> Self {
        BitbucketClient {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            username: settings.username.clone(),
            app_password: settings.app_password.clone(),
        }
    }

    pub fn ensure_configured(&self) -> AppResult<()> {
        self.credentials().map(|_| ())
    }

    fn credentials(&self) -> AppResult<(&str, &SecretString)> {
        let username = self.username.as_deref().ok_or(AppError::CredentialsMissing {
            service: SERVICE,
            env_var: "BITBUCKET_USERNAME",
        })?;
        let password = self.app_password.as_ref().ok_or(AppError::CredentialsMissing {
            service: SERVICE,
            env_var: "BITBUCKET_APP_PASSWORD",
        })?;
        Ok((username, password))
    }

    fn post(&self, path: &str) -> AppResult<RequestBuilder> {
        let (username, password) = self.credentials()?;
        Ok(self
            .http
            .post(format!("{}{}", self.api_url, path))
            .basic_auth(username, Some(password.expose_secret())))
    }

    /// Create `workspace/repo_name` and commit each file with its own request.
    ///
    /// File commits run concurrently; a failed commit is logged and left out
    /// of the returned file list.
    pub async fn export_files(
        &self,
        workspace: &str,
        repo_name: &str,
        description: &str,
        files: &[GeneratedFile],
    ) -> AppResult<BitbucketExport> {
        self.ensure_configured()?;

        let repo_path = format!(
            "/repositories/{}/{}",
            urlencoding::encode(workspace),
            urlencoding::encode(repo_name)
        );

        let response = self
            .post(&repo_path)?
            .json(&json!({
                "scm": "git",
                "is_private": true,
                "description": description,
            }))
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        if response.status() == StatusCode::BAD_REQUEST {
            tracing::warn!(workspace = %workspace, repo = %repo_name, "Bitbucket repository exists");
            return Err(AppError::RepoAlreadyExists(repo_name.to_string()));
        }
        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }
        let created: RepoResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("invalid repository: {}", e)))?;

        let html_url = created.links.html.href;
        let clone_url = created
            .links
            .clone
            .into_iter()
            .find(|l| l.name == "https")
            .map(|l| l.href)
            .unwrap_or_else(|| format!("{}.git", html_url));
        let full_name = created
            .full_name
            .unwrap_or_else(|| format!("{}/{}", workspace, repo_name));

        let mut seen = HashSet::new();
        let unique: Vec<(String, &str)> = files
            .iter()
            .filter_map(|f| {
                let path = normalize_path(&f.path);
                (!path.is_empty() && seen.insert(path.clone())).then_some((path, f.content.as_str()))
            })
            .collect();

        let src_path = format!("{}/src", repo_path);
        let commits = unique.iter().map(|(path, content)| {
            let src_path = src_path.as_str();
            async move {
                let result = self.commit_file(src_path, path, content).await;
                (path.clone(), result)
            }
        });

        let mut committed = Vec::with_capacity(unique.len());
        for (path, result) in join_all(commits).await {
            match result {
                Ok(()) => committed.push(path),
                Err(e) => tracing::warn!(path = %path, error = %e, "Bitbucket file commit failed"),
            }
        }

        tracing::info!(
            repo = %full_name,
            committed = committed.len(),
            total = unique.len(),
            "Bitbucket export finished"
        );

        Ok(BitbucketExport {
            name: repo_name.to_string(),
            full_name,
            html_url,
            clone_url,
            branch: BRANCH.to_string(),
            files: committed,
        })
    }

    async fn commit_file(&self, src_path: &str, path: &str, content: &str) -> AppResult<()> {
        let message = format!("Add {}", path);
        let form = [
            (path, content),
            ("message", message.as_str()),
            ("branch", BRANCH),
        ];
        let response = self
            .post(src_path)?
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }
        Ok(())
    }
}
