//! Application configuration

use super::{Migrate, ServerConfig, SyncConfig};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_FILE: &str = "canvas-sync.json";
const DATABASE_FILE: &str = "canvas-sync.db";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
	/// Config schema version
	pub version: u32,

	/// Data directory path
	pub data_dir: PathBuf,

	/// Logging level
	pub log_level: String,

	/// Connection URL; defaults to a SQLite file in `data_dir`
	#[serde(default)]
	pub database_url: Option<String>,

	#[serde(default)]
	pub sync: SyncConfig,

	#[serde(default)]
	pub server: ServerConfig,
}

impl AppConfig {
	/// Load configuration from a specific data directory, creating it if absent
	pub fn load_from(data_dir: &Path) -> Result<Self> {
		let config_path = data_dir.join(CONFIG_FILE);

		if config_path.exists() {
			info!("Loading config from {:?}", config_path);
			let json = fs::read_to_string(&config_path)?;
			let mut config: AppConfig = serde_json::from_str(&json)?;

			if config.needs_migration() {
				info!(
					"Migrating config from v{} to v{}",
					config.version,
					Self::target_version()
				);
				config.migrate()?;
				config.save()?;
			}

			Ok(config)
		} else {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			Ok(config)
		}
	}

	/// Create default configuration with specific data directory
	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: Self::target_version(),
			data_dir,
			log_level: "info".to_string(),
			database_url: None,
			sync: SyncConfig::default(),
			server: ServerConfig::default(),
		}
	}

	/// Save configuration to disk
	pub fn save(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;

		let config_path = self.data_dir.join(CONFIG_FILE);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("Saved config to {:?}", config_path);
		Ok(())
	}

	/// Get the path for logs directory
	pub fn logs_dir(&self) -> PathBuf {
		self.data_dir.join("logs")
	}

	pub fn database_url(&self) -> String {
		match &self.database_url {
			Some(url) => url.clone(),
			None => format!(
				"sqlite://{}?mode=rwc",
				self.data_dir.join(DATABASE_FILE).display()
			),
		}
	}

	/// Validate values that serde cannot
	pub fn validate(&self) -> Result<()> {
		if self.sync.batch_size == 0 {
			return Err(anyhow!("sync.batch_size must be at least 1"));
		}
		if !(self.sync.default_scale.is_finite() && self.sync.default_scale > 0.0) {
			return Err(anyhow!(
				"sync.default_scale must be positive, got {}",
				self.sync.default_scale
			));
		}
		if self.sync.stale_timeout_secs == 0 {
			return Err(anyhow!("sync.stale_timeout_secs must be at least 1"));
		}
		if self.sync.reap_interval_secs == 0 {
			return Err(anyhow!("sync.reap_interval_secs must be at least 1"));
		}
		Ok(())
	}
}

impl Migrate for AppConfig {
	fn current_version(&self) -> u32 {
		self.version
	}

	fn target_version() -> u32 {
		2
	}

	fn migrate(&mut self) -> Result<()> {
		match self.version {
			0 => {
				self.version = 1;
				self.migrate()
			}
			1 => {
				// v2 introduced the server section
				self.server = ServerConfig::default();
				self.version = 2;
				Ok(())
			}
			2 => Ok(()),
			v => Err(anyhow!("Unknown config version: {}", v)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn creates_default_config_when_missing() {
		let dir = TempDir::new().unwrap();
		let config = AppConfig::load_from(dir.path()).unwrap();

		assert_eq!(config.version, 2);
		assert_eq!(config.sync, SyncConfig::default());
		assert!(dir.path().join(CONFIG_FILE).exists());
	}

	#[test]
	fn migrates_old_config() {
		let dir = TempDir::new().unwrap();
		let json = serde_json::json!({
			"version": 1,
			"data_dir": dir.path(),
			"log_level": "debug",
		});
		fs::write(dir.path().join(CONFIG_FILE), json.to_string()).unwrap();

		let config = AppConfig::load_from(dir.path()).unwrap();
		assert_eq!(config.version, 2);
		assert_eq!(config.log_level, "debug");
		assert_eq!(config.server.port, 8080);
	}

	#[test]
	fn default_database_url_points_into_data_dir() {
		let config = AppConfig::default_with_dir(PathBuf::from("/tmp/cs"));
		assert_eq!(config.database_url(), "sqlite:///tmp/cs/canvas-sync.db?mode=rwc");
	}

	#[test]
	fn rejects_zero_batch_size() {
		let mut config = AppConfig::default_with_dir(PathBuf::from("/tmp/cs"));
		config.sync.batch_size = 0;
		assert!(config.validate().is_err());
	}
}
