//! Database infrastructure using SeaORM

use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod entities;
pub mod migration;

/// Database wrapper for the sync store and the node collection
#[derive(Clone)]
pub struct Database {
	conn: DatabaseConnection,
}

impl Database {
	/// Create a new SQLite database at the specified path
	pub async fn create(path: &Path) -> Result<Self, DbErr> {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)
				.map_err(|e| DbErr::Custom(format!("Failed to create directory: {}", e)))?;
		}

		let db = Self::connect(&format!("sqlite://{}?mode=rwc", path.display())).await?;
		info!("Created new database at {:?}", path);
		Ok(db)
	}

	/// Open an existing SQLite database
	pub async fn open(path: &Path) -> Result<Self, DbErr> {
		if !path.exists() {
			return Err(DbErr::Custom(format!(
				"Database does not exist: {}",
				path.display()
			)));
		}

		let db = Self::connect(&format!("sqlite://{}", path.display())).await?;
		info!("Opened database at {:?}", path);
		Ok(db)
	}

	/// Connect to any supported backend by URL
	pub async fn connect(url: &str) -> Result<Self, DbErr> {
		let mut opt = ConnectOptions::new(url.to_owned());
		opt.max_connections(10)
			.min_connections(1)
			.connect_timeout(Duration::from_secs(8))
			.acquire_timeout(Duration::from_secs(30))
			.sqlx_logging(false); // We'll use tracing instead

		let conn = SeaDatabase::connect(opt).await?;
		Ok(Self { conn })
	}

	/// Run migrations
	pub async fn migrate(&self) -> Result<(), DbErr> {
		migration::Migrator::up(&self.conn, None).await?;
		info!("Database migrations completed successfully");
		Ok(())
	}

	/// Get the database connection
	pub fn conn(&self) -> &DatabaseConnection {
		&self.conn
	}
}
