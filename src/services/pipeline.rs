//! Deployment orchestrator.
//!
//! Sequences export, provisioning and triggering for one session and keeps the
//! ledger in step. Once a repository exists, later failures never hide it from
//! the caller.

use std::time::Duration;

use crate::auth::{authorize, authorize_delete};
use crate::config::{AuthorizationMode, Config};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthenticatedCaller, BitbucketExportRequest, DeleteSessionResponse, DeploySuccessResponse,
    DeploymentEvent, DeploymentInfo, DeploymentRecord, DeploymentStatus, DeploymentUpdate,
    ExportRequest, ExportResponse, GeneratedFile, HostingProjectInfo, IntegrationStatus,
    PartialDeployResponse, PipelineStage, ProvisionAndTriggerRequest, ProvisioningFailedResponse,
    RegisterSessionResponse, RepositoryInfo,
};
use crate::services::bitbucket::BitbucketClient;
use crate::services::event_broadcaster::EventBroadcaster;
use crate::services::fonts::{is_layout_file, normalize_fonts};
use crate::services::generation::{GeneratedSession, GenerationClient};
use crate::services::github::{ExportedRepository, GitHubClient, NewRepository, parse_repository_url};
use crate::services::http::build_http_client;
use crate::services::paths::normalize_path;
use crate::services::templates::{RegistryClient, TemplateFiller};
use crate::services::trigger::{DeploymentTrigger, TriggerContext};
use crate::services::vercel::{Framework, HostingProject, VercelClient};

/// Terminal outcome of `provision_and_trigger`.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Exported, provisioned and a deployment is building.
    Deployed(DeploySuccessResponse),
    /// Exported and provisioned, but no trigger strategy succeeded.
    Partial(PartialDeployResponse),
    /// Exported, but the hosting project could not be created.
    ProvisioningFailed(ProvisioningFailedResponse),
}

impl PipelineOutcome {
    /// Short name used in request logs.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::Deployed(_) => "deployed",
            PipelineOutcome::Partial(_) => "partial",
            PipelineOutcome::ProvisioningFailed(_) => "provisioning_failed",
        }
    }
}

pub struct DeploymentPipeline {
    db: DbPool,
    auth_mode: AuthorizationMode,
    generation: GenerationClient,
    github: GitHubClient,
    bitbucket: BitbucketClient,
    vercel: VercelClient,
    trigger: DeploymentTrigger,
    filler: TemplateFiller,
    events: EventBroadcaster,
    settle_delay: Duration,
}

impl DeploymentPipeline {
    pub fn new(config: &Config, db: DbPool, events: EventBroadcaster) -> AppResult<Self> {
        let http = build_http_client()?;
        let vercel = VercelClient::new(http.clone(), &config.vercel);

        Ok(DeploymentPipeline {
            db,
            auth_mode: config.auth_mode,
            generation: GenerationClient::new(http.clone(), &config.generation),
            github: GitHubClient::new(http.clone(), &config.github),
            bitbucket: BitbucketClient::new(http.clone(), &config.bitbucket),
            trigger: DeploymentTrigger::for_vercel(vercel.clone()),
            vercel,
            filler: TemplateFiller::new(RegistryClient::new(http, &config.pipeline.registry_url)),
            events,
            settle_delay: config.pipeline.settle_delay,
        })
    }

    pub fn integrations(&self) -> IntegrationStatus {
        IntegrationStatus {
            generation: self.generation.ensure_configured().is_ok(),
            github: self.github.ensure_configured().is_ok(),
            vercel: self.vercel.ensure_configured().is_ok(),
            bitbucket: self.bitbucket.ensure_configured().is_ok(),
        }
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    fn publish(&self, event: DeploymentEvent) {
        if let DeploymentEvent::StageChanged(ref p) = event {
            tracing::info!(session_id = %p.session_id, stage = %p.stage, status = %p.status, "Pipeline stage");
        }
        self.events.send(event);
    }

    /// Write a ledger update after export. Failures are logged, never returned.
    async fn record(&self, session_id: &str, update: DeploymentUpdate) {
        match self.db.update_deployment(session_id, update).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::error!(session_id = %session_id, "Ledger row vanished during pipeline")
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Failed to record pipeline result")
            }
        }
    }

    /// Authorize against an existing row, if any.
    async fn authorize_existing(
        &self,
        session_id: &str,
        caller: Option<&AuthenticatedCaller>,
    ) -> AppResult<()> {
        if let Some(record) = self.db.find_deployment(session_id).await? {
            authorize(self.auth_mode, &record, caller)?;
        }
        Ok(())
    }

    /// Make sure the session has a ledger row the caller may act on.
    async fn ensure_session(
        &self,
        session_id: &str,
        caller: Option<&AuthenticatedCaller>,
    ) -> AppResult<DeploymentRecord> {
        let owner = caller.map(|c| c.id.as_str());
        if self.db.insert_deployment_if_absent(session_id, owner).await? {
            tracing::info!(session_id = %session_id, owner = ?owner, "Session registered");
        }

        let record = self
            .db
            .find_deployment(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {}", session_id)))?;
        authorize(self.auth_mode, &record, caller)?;
        Ok(record)
    }

    /// Fetch the session and complete it into a buildable file set.
    async fn load_files(
        &self,
        session_id: &str,
        project_name: &str,
    ) -> AppResult<(GeneratedSession, Vec<GeneratedFile>)> {
        let session = self.generation.fetch_session(session_id).await?;
        let files = self.prepare_files(&session.files, project_name).await;
        Ok((session, files))
    }

    /// Normalize layout fonts and append the missing scaffold.
    pub async fn prepare_files(
        &self,
        generated: &[GeneratedFile],
        project_name: &str,
    ) -> Vec<GeneratedFile> {
        let mut files: Vec<GeneratedFile> = generated
            .iter()
            .map(|f| {
                if is_layout_file(&f.path) {
                    GeneratedFile::new(f.path.clone(), normalize_fonts(&f.content))
                } else {
                    f.clone()
                }
            })
            .collect();

        let existing: Vec<String> = files.iter().map(|f| f.path.clone()).collect();
        let added = self
            .filler
            .fill_missing(project_name, &existing, &files)
            .await;
        tracing::info!(generated = files.len(), added = added.len(), "Prepared export file set");

        for (path, content) in added {
            match files.iter_mut().find(|f| normalize_path(&f.path) == path) {
                Some(file) => file.content = content,
                None => files.push(GeneratedFile::new(path, content)),
            }
        }
        files
    }

    async fn export_to_github(
        &self,
        session_id: &str,
        repo_name: &str,
        is_private: bool,
        caller: Option<&AuthenticatedCaller>,
    ) -> AppResult<ExportedRepository> {
        if repo_name.trim().is_empty() {
            return Err(AppError::InvalidInput("Repository name is required".to_string()));
        }

        self.authorize_existing(session_id, caller).await?;
        let (session, files) = self.load_files(session_id, repo_name).await?;
        self.ensure_session(session_id, caller).await?;

        self.publish(DeploymentEvent::stage(
            session_id,
            PipelineStage::ExportStarted,
            DeploymentStatus::Unset,
        ));

        let commit_message = format!("Add generated files from session {}", session_id);
        let description = session.description();
        let exported = self
            .github
            .export_files(
                &NewRepository {
                    name: repo_name,
                    description: &description,
                    is_private,
                    commit_message: &commit_message,
                },
                &files,
            )
            .await?;

        let record = DeploymentUpdate::exported(&exported.name, &exported.html_url);
        self.record(session_id, record).await;
        self.publish(
            DeploymentEvent::stage(session_id, PipelineStage::Exported, DeploymentStatus::Unset)
                .with_repository_url(&exported.html_url),
        );

        Ok(exported)
    }

    /// Export a session to a new GitHub repository.
    pub async fn export(
        &self,
        req: &ExportRequest,
        caller: Option<&AuthenticatedCaller>,
    ) -> AppResult<ExportResponse> {
        self.github.ensure_configured()?;
        self.generation.ensure_configured()?;

        let exported = self
            .export_to_github(&req.session_id, &req.repo_name, req.is_private, caller)
            .await?;

        Ok(ExportResponse {
            success: true,
            files_created: exported.files.len(),
            repository: repository_info(&exported),
            files: exported.files,
        })
    }

    /// Export a session to Bitbucket, one commit per file.
    pub async fn export_bitbucket(
        &self,
        req: &BitbucketExportRequest,
        caller: Option<&AuthenticatedCaller>,
    ) -> AppResult<ExportResponse> {
        self.bitbucket.ensure_configured()?;
        self.generation.ensure_configured()?;
        if req.repo_name.trim().is_empty() || req.workspace.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Repository name and workspace are required".to_string(),
            ));
        }

        self.authorize_existing(&req.session_id, caller).await?;
        let (session, files) = self.load_files(&req.session_id, &req.repo_name).await?;
        self.ensure_session(&req.session_id, caller).await?;

        self.publish(DeploymentEvent::stage(
            &req.session_id,
            PipelineStage::ExportStarted,
            DeploymentStatus::Unset,
        ));

        let exported = self
            .bitbucket
            .export_files(&req.workspace, &req.repo_name, &session.description(), &files)
            .await?;

        self.record(
            &req.session_id,
            DeploymentUpdate::exported(&exported.name, &exported.html_url),
        )
        .await;
        self.publish(
            DeploymentEvent::stage(&req.session_id, PipelineStage::Exported, DeploymentStatus::Unset)
                .with_repository_url(&exported.html_url),
        );

        Ok(ExportResponse {
            success: true,
            repository: RepositoryInfo {
                name: exported.name,
                url: exported.html_url,
                clone_url: exported.clone_url,
                branch: exported.branch,
                full_name: Some(exported.full_name),
                commit_sha: None,
            },
            files_created: exported.files.len(),
            files: exported.files,
        })
    }

    /// Run the whole pipeline: export, provision, wait, trigger.
    pub async fn provision_and_trigger(
        &self,
        req: &ProvisionAndTriggerRequest,
        caller: Option<&AuthenticatedCaller>,
    ) -> AppResult<PipelineOutcome> {
        self.github.ensure_configured()?;
        self.vercel.ensure_configured()?;
        self.generation.ensure_configured()?;

        let session_id = req.session_id.as_str();
        let exported = self
            .export_to_github(session_id, &req.repo_name, req.is_private, caller)
            .await?;
        let repository = repository_info(&exported);

        // Provision
        let project_name = req
            .project_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&req.repo_name);
        let project = match self
            .vercel
            .provision_project(project_name, &exported.full_name, Framework::NextJs, !req.is_private)
            .await
        {
            Ok(project) => project,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Provisioning failed after export");
                self.record(session_id, DeploymentUpdate::status(DeploymentStatus::Failed))
                    .await;
                self.publish(
                    DeploymentEvent::stage(
                        session_id,
                        PipelineStage::ProvisioningFailed,
                        DeploymentStatus::Failed,
                    )
                    .with_repository_url(&repository.url),
                );
                let body = e.to_error_response();
                return Ok(PipelineOutcome::ProvisioningFailed(ProvisioningFailedResponse {
                    success: false,
                    github_success: true,
                    hosting_project_success: false,
                    repository,
                    error: "Repository export succeeded, but hosting project creation failed"
                        .to_string(),
                    details: body.details.or(Some(body.error)),
                }));
            }
        };

        self.record(
            session_id,
            DeploymentUpdate::provisioned(&project.id, &project.dashboard_url),
        )
        .await;
        self.publish(
            DeploymentEvent::stage(session_id, PipelineStage::Provisioned, DeploymentStatus::Unset)
                .with_repository_url(&repository.url)
                .with_hosting_project_url(&project.dashboard_url),
        );

        let project = self.settle(project).await;
        let hosting_project = HostingProjectInfo {
            id: project.id.clone(),
            name: project.name.clone(),
            dashboard_url: project.dashboard_url.clone(),
        };

        // Trigger
        let ctx = TriggerContext {
            project,
            repo_full_name: exported.full_name.clone(),
            branch: exported.default_branch.clone(),
        };

        let outcome = match self.trigger.trigger(&ctx).await {
            Ok(triggered) => {
                let deployment_url = triggered.handle.public_url(&hosting_project.dashboard_url);
                self.record(
                    session_id,
                    DeploymentUpdate::status(DeploymentStatus::Deployed)
                        .with_deployment_url(&deployment_url),
                )
                .await;
                self.publish(
                    DeploymentEvent::stage(
                        session_id,
                        PipelineStage::DeployTriggered,
                        DeploymentStatus::Deployed,
                    )
                    .with_repository_url(&repository.url)
                    .with_hosting_project_url(&hosting_project.dashboard_url)
                    .with_deployment_url(&deployment_url),
                );

                PipelineOutcome::Deployed(DeploySuccessResponse {
                    success: true,
                    repository,
                    hosting_project,
                    deployment: DeploymentInfo {
                        id: triggered.handle.id.clone(),
                        url: deployment_url.clone(),
                        state: triggered.handle.state.clone(),
                        strategy: triggered.strategy.to_string(),
                    },
                    deployment_url,
                })
            }
            Err(exhausted) => {
                tracing::warn!(
                    session_id = %session_id,
                    last_error = %exhausted.last_error,
                    "All deployment strategies failed"
                );
                self.record(session_id, DeploymentUpdate::status(DeploymentStatus::Pending))
                    .await;
                self.publish(
                    DeploymentEvent::stage(
                        session_id,
                        PipelineStage::DeployFallbackExhausted,
                        DeploymentStatus::Pending,
                    )
                    .with_repository_url(&repository.url)
                    .with_hosting_project_url(&hosting_project.dashboard_url),
                );

                PipelineOutcome::Partial(PartialDeployResponse::new(
                    repository,
                    hosting_project,
                    exhausted.last_error,
                ))
            }
        };

        let status = match &outcome {
            PipelineOutcome::Deployed(_) => DeploymentStatus::Deployed,
            _ => DeploymentStatus::Pending,
        };
        self.publish(DeploymentEvent::stage(session_id, PipelineStage::Persisted, status));

        Ok(outcome)
    }

    /// Wait for the platform to link the repository, then reread the project.
    async fn settle(&self, project: HostingProject) -> HostingProject {
        if !self.settle_delay.is_zero() {
            tracing::info!(
                project_id = %project.id,
                delay_secs = self.settle_delay.as_secs(),
                "Waiting for hosting project to settle"
            );
            tokio::time::sleep(self.settle_delay).await;
        }

        match self.vercel.get_project(&project.id).await {
            Ok(reread) => {
                tracing::debug!(project_id = %reread.id, linked = reread.repo_id.is_some(), "Project reread");
                reread
            }
            Err(e) => {
                tracing::warn!(project_id = %project.id, error = %e, "Project reread failed, using create response");
                project
            }
        }
    }

    /// Delete a session's hosting project, repository and ledger row.
    ///
    /// External deletions are best-effort: each is attempted independently and
    /// its failure only shows up as `false` in the response.
    pub async fn delete_session(
        &self,
        session_id: &str,
        caller: &AuthenticatedCaller,
    ) -> AppResult<DeleteSessionResponse> {
        let record = self
            .db
            .find_deployment(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {}", session_id)))?;
        authorize_delete(self.auth_mode, &record, caller)?;

        let deleted_hosting_project = match record.hosting_project_id.as_deref() {
            Some(project_id) => match self.vercel.delete_project(project_id).await {
                Ok(()) => {
                    tracing::info!(session_id = %session_id, project_id = %project_id, "Hosting project deleted");
                    true
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id, project_id = %project_id, error = %e, "Hosting project deletion failed");
                    false
                }
            },
            None => false,
        };

        let deleted_repository = match record.repository_url.as_deref().and_then(parse_repository_url) {
            Some((owner, repo)) => match self.github.delete_repository(&owner, &repo).await {
                Ok(()) => {
                    tracing::info!(session_id = %session_id, owner = %owner, repo = %repo, "Repository deleted");
                    true
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "Repository deletion failed");
                    false
                }
            },
            None => {
                if let Some(url) = &record.repository_url {
                    tracing::warn!(session_id = %session_id, url = %url, "Repository URL not deletable");
                }
                false
            }
        };

        self.db.delete_deployment(session_id).await?;
        self.publish(DeploymentEvent::deleted(session_id));
        tracing::info!(session_id = %session_id, "Session deleted");

        Ok(DeleteSessionResponse {
            success: true,
            deleted_repository,
            deleted_hosting_project,
        })
    }

    /// Record a new session for the caller.
    pub async fn register_session(
        &self,
        session_id: &str,
        caller: Option<&AuthenticatedCaller>,
    ) -> AppResult<RegisterSessionResponse> {
        if session_id.trim().is_empty() {
            return Err(AppError::InvalidInput("Session ID is required".to_string()));
        }
        let owner = caller.map(|c| c.id.as_str());
        let created = self.db.insert_deployment_if_absent(session_id, owner).await?;
        if !created {
            self.authorize_existing(session_id, caller).await?;
        }
        Ok(RegisterSessionResponse {
            success: true,
            created,
        })
    }

    /// Deployment record of a session.
    pub async fn get_deployment(
        &self,
        session_id: &str,
        caller: Option<&AuthenticatedCaller>,
    ) -> AppResult<DeploymentRecord> {
        let record = self
            .db
            .find_deployment(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {}", session_id)))?;
        authorize(self.auth_mode, &record, caller)?;
        Ok(record)
    }

    /// Every session owned by the caller.
    pub async fn list_for_owner(
        &self,
        caller: &AuthenticatedCaller,
    ) -> AppResult<Vec<DeploymentRecord>> {
        self.db.list_deployments_for_owner(&caller.id).await
    }
}

fn repository_info(exported: &ExportedRepository) -> RepositoryInfo {
    RepositoryInfo {
        name: exported.name.clone(),
        url: exported.html_url.clone(),
        clone_url: exported.clone_url.clone(),
        branch: exported.default_branch.clone(),
        full_name: Some(exported.full_name.clone()),
        commit_sha: Some(exported.commit_sha.clone()),
    }
}
