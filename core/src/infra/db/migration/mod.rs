//! Database migrations

use sea_orm_migration::prelude::*;

mod m20260301_000001_create_network_nodes;
mod m20260301_000002_create_canvas_sync_status;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
	fn migrations() -> Vec<Box<dyn MigrationTrait>> {
		vec![
			Box::new(m20260301_000001_create_network_nodes::Migration),
			Box::new(m20260301_000002_create_canvas_sync_status::Migration),
		]
	}
}
