//! Application configuration management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub mod app_config;
pub mod migration;

pub use app_config::AppConfig;
pub use migration::Migrate;

/// Tuning for the canvas sync coordinator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
	/// A run whose last heartbeat is older than this is considered abandoned
	pub stale_timeout_secs: u64,

	/// Entities written between two heartbeats
	pub batch_size: usize,

	/// Scale applied when the caller does not provide one
	pub default_scale: f64,

	/// How often the server sweeps for abandoned runs
	pub reap_interval_secs: u64,
}

impl SyncConfig {
	pub fn stale_timeout(&self) -> chrono::Duration {
		chrono::Duration::seconds(self.stale_timeout_secs.min(i32::MAX as u64) as i64)
	}

	pub fn reap_interval(&self) -> Duration {
		Duration::from_secs(self.reap_interval_secs)
	}
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			stale_timeout_secs: 10 * 60,
			batch_size: 100,
			default_scale: 1.0,
			reap_interval_secs: 60,
		}
	}
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
	pub port: u16,

	/// Bearer token -> actor name recorded as `started_by`
	#[serde(default)]
	pub api_tokens: HashMap<String, String>,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			port: 8080,
			api_tokens: HashMap::new(),
		}
	}
}
