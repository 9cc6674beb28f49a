//! Migration: Create deployments table.
//!
//! Maps a generation session to its exported repository, hosting project and
//! deployment status.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Deployments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Deployments::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Deployments::SessionId)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Deployments::OwnerId).string_len(255))
                    .col(ColumnDef::new(Deployments::RepositoryName).string_len(255))
                    .col(ColumnDef::new(Deployments::RepositoryUrl).text())
                    .col(ColumnDef::new(Deployments::HostingProjectId).string_len(255))
                    .col(ColumnDef::new(Deployments::HostingProjectUrl).text())
                    .col(ColumnDef::new(Deployments::DeploymentUrl).text())
                    .col(
                        ColumnDef::new(Deployments::DeploymentStatus)
                            .string_len(20)
                            .not_null()
                            .default("unset"),
                    )
                    .col(ColumnDef::new(Deployments::DeployedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Deployments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Owner listing
        manager
            .create_index(
                Index::create()
                    .name("idx_deployments_owner_id")
                    .table(Deployments::Table)
                    .col(Deployments::OwnerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Deployments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Deployments {
    Table,
    Id,
    SessionId,
    OwnerId,
    RepositoryName,
    RepositoryUrl,
    HostingProjectId,
    HostingProjectUrl,
    DeploymentUrl,
    DeploymentStatus,
    DeployedAt,
    CreatedAt,
}
