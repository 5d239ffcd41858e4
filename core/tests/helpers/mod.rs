//! Test helper modules for integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use cs_core::{
	config::SyncConfig,
	infra::{
		db::{
			entities::{canvas_sync_status, network_node},
			Database,
		},
		logging::init_test_tracing,
	},
	ops::canvas_sync::{store, CanvasSync},
};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait};
use tempfile::TempDir;

/// A migrated SQLite database living in its own temp directory
pub struct TestDb {
	pub db: Database,
	_dir: TempDir,
}

impl TestDb {
	pub async fn new() -> Self {
		init_test_tracing();

		let dir = TempDir::new().expect("temp dir");
		let db = Database::create(&dir.path().join("canvas-sync.db"))
			.await
			.expect("create database");
		db.migrate().await.expect("migrate database");

		Self { db, _dir: dir }
	}

	pub fn conn(&self) -> &DatabaseConnection {
		self.db.conn()
	}

	pub fn canvas_sync(&self, batch_size: usize) -> CanvasSync {
		CanvasSync::new(
			self.conn().clone(),
			SyncConfig {
				batch_size,
				..SyncConfig::default()
			},
		)
	}

	/// Insert positioned nodes, returning them in insertion order
	pub async fn seed_nodes(
		&self,
		project_id: i32,
		flag_id: Option<i32>,
		positions: &[(f64, f64)],
	) -> Vec<network_node::Model> {
		let mut nodes = Vec::with_capacity(positions.len());
		for (i, (x, y)) in positions.iter().enumerate() {
			nodes.push(
				self.insert_node(project_id, flag_id, &format!("node-{i}"), Some((*x, *y)))
					.await,
			);
		}
		nodes
	}

	pub async fn insert_node(
		&self,
		project_id: i32,
		flag_id: Option<i32>,
		name: &str,
		position: Option<(f64, f64)>,
	) -> network_node::Model {
		network_node::ActiveModel {
			project_id: Set(project_id),
			flag_id: Set(flag_id),
			name: Set(name.to_string()),
			geo_x: Set(position.map(|p| p.0)),
			geo_y: Set(position.map(|p| p.1)),
			canvas_x: Set(None),
			canvas_y: Set(None),
			updated_at: Set(Utc::now()),
			..Default::default()
		}
		.insert(self.conn())
		.await
		.expect("insert node")
	}

	pub async fn node(&self, id: i32) -> network_node::Model {
		network_node::Entity::find_by_id(id)
			.one(self.conn())
			.await
			.expect("query node")
			.expect("node exists")
	}

	pub async fn record(&self, scope_key: &str) -> canvas_sync_status::Model {
		store::find_record(self.conn(), scope_key)
			.await
			.expect("query record")
			.expect("record exists")
	}

	/// Overwrite a record as if a run had been left in the given state
	pub async fn force_record(
		&self,
		scope_key: &str,
		status: canvas_sync_status::SyncStatus,
		started_by: &str,
		last_heartbeat: Option<DateTime<Utc>>,
	) -> canvas_sync_status::Model {
		let record = store::get_or_create(self.conn(), scope_key)
			.await
			.expect("create record");

		let finished = matches!(
			status,
			canvas_sync_status::SyncStatus::Completed | canvas_sync_status::SyncStatus::Failed
		);
		let generation = record.run_generation + 1;
		let mut active: canvas_sync_status::ActiveModel = record.into();
		active.status = Set(status.to_string());
		active.started_by = Set(Some(started_by.to_string()));
		active.started_at = Set(last_heartbeat);
		active.last_heartbeat = Set(last_heartbeat);
		active.completed_at = Set(finished.then(Utc::now));
		active.error_message = Set(
			(status == canvas_sync_status::SyncStatus::Failed).then(|| "boom".to_string()),
		);
		active.run_generation = Set(generation);
		active.update(self.conn()).await.expect("update record")
	}

	/// Age the heartbeat of whatever run currently owns `scope_key`
	pub async fn age_heartbeat(&self, scope_key: &str, heartbeat: DateTime<Utc>) {
		let record = self.record(scope_key).await;
		let mut active: canvas_sync_status::ActiveModel = record.into();
		active.last_heartbeat = Set(Some(heartbeat));
		active.update(self.conn()).await.expect("age heartbeat");
	}
}
