//! Deployment ledger queries.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::deployment::{self as deployment, ActiveModel, Entity as Deployment};
use crate::error::{AppError, AppResult};
use crate::models::{DeploymentRecord, DeploymentStatus, DeploymentUpdate};

use super::DbPool;

impl DbPool {
    /// Insert an empty ledger row for a session unless one already exists.
    ///
    /// Returns `false` when the session was already recorded. Concurrent
    /// inserts for the same session leave exactly one row.
    pub async fn insert_deployment_if_absent(
        &self,
        session_id: &str,
        owner_id: Option<&str>,
    ) -> AppResult<bool> {
        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            session_id: Set(session_id.to_string()),
            owner_id: Set(owner_id.map(str::to_string)),
            repository_name: Set(None),
            repository_url: Set(None),
            hosting_project_id: Set(None),
            hosting_project_url: Set(None),
            deployment_url: Set(None),
            deployment_status: Set(DeploymentStatus::Unset.as_str().to_string()),
            deployed_at: Set(None),
            created_at: Set(Utc::now()),
        };

        let result = Deployment::insert(model)
            .on_conflict(
                OnConflict::column(deployment::Column::SessionId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.connection())
            .await;

        match result {
            Ok(rows) => Ok(rows > 0),
            Err(DbErr::RecordNotInserted) => Ok(false),
            Err(e) => Err(AppError::Database(format!(
                "Failed to insert deployment: {}",
                e
            ))),
        }
    }

    /// Get the raw ledger row for a session.
    async fn get_deployment_model(&self, session_id: &str) -> AppResult<Option<deployment::Model>> {
        Deployment::find()
            .filter(deployment::Column::SessionId.eq(session_id))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get deployment: {}", e)))
    }

    /// Look up a session's deployment record.
    pub async fn find_deployment(&self, session_id: &str) -> AppResult<Option<DeploymentRecord>> {
        Ok(self
            .get_deployment_model(session_id)
            .await?
            .map(DeploymentRecord::from_entity))
    }

    /// Apply a partial update to a session's record.
    ///
    /// Only fields present in `update` are written; `deployed_at` is stamped on
    /// every call. Returns `None` when the session has no record.
    pub async fn update_deployment(
        &self,
        session_id: &str,
        update: DeploymentUpdate,
    ) -> AppResult<Option<DeploymentRecord>> {
        let Some(existing) = self.get_deployment_model(session_id).await? else {
            return Ok(None);
        };

        if update.hosting_project_id.is_some()
            && update.repository_url.is_none()
            && existing.repository_url.is_none()
        {
            return Err(AppError::InvalidInput(
                "Hosting project cannot be recorded before the repository".to_string(),
            ));
        }

        if update.deployment_status == Some(DeploymentStatus::Deployed)
            && update.deployment_url.is_none()
            && existing.deployment_url.is_none()
        {
            return Err(AppError::InvalidInput(
                "Deployed status requires a deployment URL".to_string(),
            ));
        }

        let mut active: ActiveModel = existing.into();
        if let Some(name) = update.repository_name {
            active.repository_name = Set(Some(name));
        }
        if let Some(url) = update.repository_url {
            active.repository_url = Set(Some(url));
        }
        if let Some(id) = update.hosting_project_id {
            active.hosting_project_id = Set(Some(id));
        }
        if let Some(url) = update.hosting_project_url {
            active.hosting_project_url = Set(Some(url));
        }
        if let Some(url) = update.deployment_url {
            active.deployment_url = Set(Some(url));
        }
        if let Some(status) = update.deployment_status {
            active.deployment_status = Set(status.as_str().to_string());
        }
        active.deployed_at = Set(Some(Utc::now()));

        let result = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update deployment: {}", e)))?;

        Ok(Some(DeploymentRecord::from_entity(result)))
    }

    /// Delete a session's record. Returns `false` if there was none.
    pub async fn delete_deployment(&self, session_id: &str) -> AppResult<bool> {
        let result = Deployment::delete_many()
            .filter(deployment::Column::SessionId.eq(session_id))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete deployment: {}", e)))?;

        Ok(result.rows_affected > 0)
    }

    /// List every record owned by `owner_id`, newest first.
    pub async fn list_deployments_for_owner(
        &self,
        owner_id: &str,
    ) -> AppResult<Vec<DeploymentRecord>> {
        let rows = Deployment::find()
            .filter(deployment::Column::OwnerId.eq(owner_id))
            .order_by_desc(deployment::Column::CreatedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list deployments: {}", e)))?;

        Ok(rows.into_iter().map(DeploymentRecord::from_entity).collect())
    }
}
