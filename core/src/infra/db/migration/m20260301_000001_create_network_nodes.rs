//! Create the network_node table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.create_table(
				Table::create()
					.table(NetworkNode::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(NetworkNode::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(NetworkNode::ProjectId).integer().not_null())
					.col(ColumnDef::new(NetworkNode::FlagId).integer())
					.col(
						ColumnDef::new(NetworkNode::Name)
							.string()
							.not_null()
							.default(""),
					)
					.col(ColumnDef::new(NetworkNode::GeoX).double())
					.col(ColumnDef::new(NetworkNode::GeoY).double())
					.col(ColumnDef::new(NetworkNode::CanvasX).double())
					.col(ColumnDef::new(NetworkNode::CanvasY).double())
					.col(
						ColumnDef::new(NetworkNode::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null()
							.default(Expr::current_timestamp()),
					)
					.to_owned(),
			)
			.await?;

		// Scope filters always lead with project, optionally flag
		manager
			.create_index(
				Index::create()
					.name("idx_network_node_project_flag")
					.table(NetworkNode::Table)
					.col(NetworkNode::ProjectId)
					.col(NetworkNode::FlagId)
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.drop_table(Table::drop().table(NetworkNode::Table).to_owned())
			.await?;

		Ok(())
	}
}

#[derive(DeriveIden)]
enum NetworkNode {
	Table,
	Id,
	ProjectId,
	FlagId,
	Name,
	GeoX,
	GeoY,
	CanvasX,
	CanvasY,
	UpdatedAt,
}
