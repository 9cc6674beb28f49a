//! Deployment ledger entity: one row per generation session.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "deployments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub session_id: String,
    pub owner_id: Option<String>,
    pub repository_name: Option<String>,
    pub repository_url: Option<String>,
    pub hosting_project_id: Option<String>,
    pub hosting_project_url: Option<String>,
    pub deployment_url: Option<String>,
    pub deployment_status: String,
    pub deployed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
