//! Deployment trigger: an ordered chain of strategies, first success wins.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::services::vercel::{DeploymentHandle, HostingProject, VercelClient};

/// Everything a strategy needs to start a deployment.
#[derive(Debug, Clone)]
pub struct TriggerContext {
    pub project: HostingProject,
    pub repo_full_name: String,
    pub branch: String,
}

/// A deployment accepted by one of the strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredDeployment {
    pub handle: DeploymentHandle,
    pub strategy: &'static str,
}

/// Every strategy failed. Not fatal: the project exists but nothing is building.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackExhausted {
    /// Message of the last failure, for diagnostics.
    pub last_error: String,
    /// `(strategy, error)` for every attempt, in order.
    pub attempts: Vec<(&'static str, String)>,
}

/// One way of starting a deployment.
#[async_trait]
pub trait DeployStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, ctx: &TriggerContext) -> AppResult<DeploymentHandle>;
}

/// Deployment from a git source descriptor, with the linked repo id when known.
pub struct GitSourceStrategy {
    client: VercelClient,
}

#[async_trait]
impl DeployStrategy for GitSourceStrategy {
    fn name(&self) -> &'static str {
        "git-source"
    }

    async fn attempt(&self, ctx: &TriggerContext) -> AppResult<DeploymentHandle> {
        self.client
            .create_git_deployment(&ctx.project, &ctx.repo_full_name, &ctx.branch)
            .await
    }
}

/// Deployment through the project+branch deploy hook.
pub struct HookStrategy {
    client: VercelClient,
}

#[async_trait]
impl DeployStrategy for HookStrategy {
    fn name(&self) -> &'static str {
        "deploy-hook"
    }

    async fn attempt(&self, ctx: &TriggerContext) -> AppResult<DeploymentHandle> {
        self.client
            .trigger_deploy_hook(&ctx.project.id, &ctx.branch)
            .await
    }
}

/// Production redeploy of the project.
pub struct RedeployStrategy {
    client: VercelClient,
}

#[async_trait]
impl DeployStrategy for RedeployStrategy {
    fn name(&self) -> &'static str {
        "redeploy"
    }

    async fn attempt(&self, ctx: &TriggerContext) -> AppResult<DeploymentHandle> {
        self.client.redeploy(&ctx.project.id).await
    }
}

pub struct DeploymentTrigger {
    strategies: Vec<Box<dyn DeployStrategy>>,
}

impl DeploymentTrigger {
    pub fn new(strategies: Vec<Box<dyn DeployStrategy>>) -> Self {
        DeploymentTrigger { strategies }
    }

    /// Git source, then deploy hook, then redeploy.
    pub fn for_vercel(client: VercelClient) -> Self {
        Self::new(vec![
            Box::new(GitSourceStrategy {
                client: client.clone(),
            }),
            Box::new(HookStrategy {
                client: client.clone(),
            }),
            Box::new(RedeployStrategy { client }),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order and stop at the first that succeeds.
    pub async fn trigger(
        &self,
        ctx: &TriggerContext,
    ) -> Result<TriggeredDeployment, FallbackExhausted> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            match strategy.attempt(ctx).await {
                Ok(handle) => {
                    tracing::info!(
                        project_id = %ctx.project.id,
                        strategy = strategy.name(),
                        deployment_id = %handle.id,
                        "Deployment triggered"
                    );
                    return Ok(TriggeredDeployment {
                        handle,
                        strategy: strategy.name(),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        project_id = %ctx.project.id,
                        strategy = strategy.name(),
                        error = %e,
                        "Deployment strategy failed"
                    );
                    attempts.push((strategy.name(), e.to_string()));
                }
            }
        }

        let last_error = attempts
            .last()
            .map(|(_, e)| e.clone())
            .unwrap_or_else(|| "Could not auto-trigger deployment".to_string());
        Err(FallbackExhausted {
            last_error,
            attempts,
        })
    }
}
