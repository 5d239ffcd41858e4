//! Unified error handling for the core

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for core operations
#[derive(Error, Debug)]
pub enum CoreError {
	/// The backing store could not be reached or rejected a statement.
	#[error("Database error: {0}")]
	Database(#[from] sea_orm::DbErr),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Configuration error: {0}")]
	Config(String),

	/// Another run owns the scope and is still heartbeating.
	#[error("Canvas sync already in progress for {scope_key}")]
	LockConflict {
		scope_key: String,
		started_by: Option<String>,
		started_at: Option<DateTime<Utc>>,
	},

	#[error("No positioned entities in scope {scope_key}")]
	EmptyScope { scope_key: String },

	#[error("Scale must be a positive finite number, got {0}")]
	InvalidScale(f64),

	/// A run failed after it was granted; the record has been marked failed.
	#[error("Canvas sync for {scope_key} failed: {message}")]
	Execution { scope_key: String, message: String },

	/// The run lost ownership of its record to a newer generation.
	#[error("Canvas sync run {generation} for {scope_key} was superseded")]
	Superseded { scope_key: String, generation: i64 },

	#[error("Invalid geographic position for node {node_id}: ({x}, {y})")]
	InvalidPosition { node_id: i32, x: f64, y: f64 },

	#[error("Other error: {0}")]
	Other(#[from] anyhow::Error),
}

impl CoreError {
	/// Whether the caller can fix the request and retry.
	pub fn is_client_error(&self) -> bool {
		matches!(
			self,
			Self::LockConflict { .. } | Self::EmptyScope { .. } | Self::InvalidScale(_)
		)
	}
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
