//! Canvas sync core
//!
//! Keeps the diagram (canvas) coordinates of network nodes in step with their
//! geographic positions, with at most one synchronization per scope running at
//! a time across all processes sharing the database.

use std::path::Path;
use tracing::info;

pub mod common;
pub mod config;
pub mod infra;
pub mod ops;

pub use common::errors::{CoreError, Result};
pub use config::AppConfig;
pub use infra::db::Database;
pub use ops::canvas_sync::CanvasSync;

/// Loaded configuration plus the services built on it
pub struct Core {
	pub config: AppConfig,
	db: Database,
	canvas_sync: CanvasSync,
}

impl Core {
	/// Load (or create) the config in `data_dir` and open its database
	pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
		let config = AppConfig::load_from(data_dir.as_ref())?;
		Self::with_config(config).await
	}

	pub async fn with_config(config: AppConfig) -> Result<Self> {
		config.validate()?;

		let db = Database::connect(&config.database_url()).await?;
		db.migrate().await?;

		let canvas_sync = CanvasSync::new(db.conn().clone(), config.sync.clone());
		info!(data_dir = %config.data_dir.display(), "Core initialized");

		Ok(Self {
			config,
			db,
			canvas_sync,
		})
	}

	pub fn db(&self) -> &Database {
		&self.db
	}

	pub fn canvas_sync(&self) -> &CanvasSync {
		&self.canvas_sync
	}
}
