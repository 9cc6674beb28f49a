//! Client for the code-generation API that owns sessions and their files.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::GenerationSettings;
use crate::error::{AppError, AppResult};
use crate::models::GeneratedFile;
use crate::services::http::upstream_error;

const SERVICE: &str = "Generation API";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    title: Option<String>,
    #[serde(default)]
    files: Vec<ChatFile>,
}

#[derive(Debug, Deserialize)]
struct ChatFile {
    lang: Option<String>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    meta: Option<ChatFileMeta>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatFileMeta {
    file: Option<String>,
}

/// A generation session's title and files.
#[derive(Debug, Clone)]
pub struct GeneratedSession {
    pub session_id: String,
    pub title: Option<String>,
    pub files: Vec<GeneratedFile>,
}

impl GeneratedSession {
    /// Repository description naming where the code came from.
    pub fn description(&self) -> String {
        format!(
            "Generated from session: {}",
            self.title.as_deref().unwrap_or(&self.session_id)
        )
    }
}

#[derive(Clone)]
pub struct GenerationClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<SecretString>,
}

impl GenerationClient {
    pub fn new(http: reqwest::Client, settings: &GenerationSettings) -> Self {
        GenerationClient {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        }
    }

    pub fn ensure_configured(&self) -> AppResult<()> {
        self.api_key().map(|_| ())
    }

    fn api_key(&self) -> AppResult<&SecretString> {
        self.api_key.as_ref().ok_or(AppError::CredentialsMissing {
            service: SERVICE,
            env_var: "V0_API_KEY",
        })
    }

    /// Fetch a session's files. A session without files is invalid input.
    pub async fn fetch_session(&self, session_id: &str) -> AppResult<GeneratedSession> {
        let key = self.api_key()?;
        let url = format!(
            "{}/chats/{}",
            self.api_url,
            urlencoding::encode(session_id)
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(key.expose_secret())
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Session {}", session_id)));
        }
        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("Invalid session payload: {}", e)))?;

        let files = to_generated_files(chat.files);
        if files.is_empty() {
            return Err(AppError::InvalidInput(
                "No files found in this session".to_string(),
            ));
        }

        tracing::info!(session_id = %session_id, files = files.len(), "Fetched generated files");

        Ok(GeneratedSession {
            session_id: session_id.to_string(),
            title: chat.title.filter(|t| !t.trim().is_empty()),
            files,
        })
    }
}

fn to_generated_files(files: Vec<ChatFile>) -> Vec<GeneratedFile> {
    files
        .into_iter()
        .enumerate()
        .map(|(index, file)| {
            let path = file
                .meta
                .and_then(|m| m.file)
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| {
                    format!("file-{}.{}", index, file.lang.as_deref().unwrap_or("txt"))
                });
            GeneratedFile::new(path, file.source)
        })
        .collect()
}
