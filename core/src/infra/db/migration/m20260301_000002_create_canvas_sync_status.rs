//! Create the canvas_sync_status table
//!
//! Uniqueness of `scope_key` is enforced here rather than in application code
//! so it holds under concurrent lazy creation.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.create_table(
				Table::create()
					.table(CanvasSyncStatus::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(CanvasSyncStatus::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(CanvasSyncStatus::ScopeKey)
							.string()
							.not_null(),
					)
					.col(
						ColumnDef::new(CanvasSyncStatus::Status)
							.string()
							.not_null()
							.default("idle"),
					)
					.col(ColumnDef::new(CanvasSyncStatus::StartedBy).string())
					.col(ColumnDef::new(CanvasSyncStatus::StartedAt).timestamp_with_time_zone())
					.col(ColumnDef::new(CanvasSyncStatus::CompletedAt).timestamp_with_time_zone())
					.col(ColumnDef::new(CanvasSyncStatus::LastHeartbeat).timestamp_with_time_zone())
					.col(
						ColumnDef::new(CanvasSyncStatus::EntitiesProcessed)
							.big_integer()
							.not_null()
							.default(0),
					)
					.col(
						ColumnDef::new(CanvasSyncStatus::Scale)
							.double()
							.not_null()
							.default(1.0),
					)
					.col(ColumnDef::new(CanvasSyncStatus::CenterX).double())
					.col(ColumnDef::new(CanvasSyncStatus::CenterY).double())
					.col(ColumnDef::new(CanvasSyncStatus::ErrorMessage).string())
					.col(
						ColumnDef::new(CanvasSyncStatus::RunGeneration)
							.big_integer()
							.not_null()
							.default(0),
					)
					.col(
						ColumnDef::new(CanvasSyncStatus::CreatedAt)
							.timestamp_with_time_zone()
							.not_null()
							.default(Expr::current_timestamp()),
					)
					.col(
						ColumnDef::new(CanvasSyncStatus::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null()
							.default(Expr::current_timestamp()),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_canvas_sync_status_scope_key")
					.table(CanvasSyncStatus::Table)
					.col(CanvasSyncStatus::ScopeKey)
					.unique()
					.to_owned(),
			)
			.await?;

		// The reaper scans by status
		manager
			.create_index(
				Index::create()
					.name("idx_canvas_sync_status_status")
					.table(CanvasSyncStatus::Table)
					.col(CanvasSyncStatus::Status)
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.drop_table(Table::drop().table(CanvasSyncStatus::Table).to_owned())
			.await?;

		Ok(())
	}
}

#[derive(DeriveIden)]
enum CanvasSyncStatus {
	Table,
	Id,
	ScopeKey,
	Status,
	StartedBy,
	StartedAt,
	CompletedAt,
	LastHeartbeat,
	EntitiesProcessed,
	Scale,
	CenterX,
	CenterY,
	ErrorMessage,
	RunGeneration,
	CreatedAt,
	UpdatedAt,
}
