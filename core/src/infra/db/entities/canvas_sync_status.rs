//! Canvas sync status entity
//!
//! One row per sync scope (`project_1`, `project_1_flag_5`, ...). The row is
//! created lazily and reused by every run of the same scope; it is never
//! deleted by normal operation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Lifecycle of a sync scope
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncStatus {
	Idle,
	InProgress,
	Completed,
	Failed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "canvas_sync_status")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,

	#[sea_orm(unique)]
	pub scope_key: String,

	pub status: String, // SyncStatus as string

	/// Actor that started the current or last run
	pub started_by: Option<String>,
	pub started_at: Option<DateTimeUtc>,
	pub completed_at: Option<DateTimeUtc>,
	pub last_heartbeat: Option<DateTimeUtc>,

	/// Reset to 0 at run start, advanced on every heartbeat
	pub entities_processed: i64,

	pub scale: f64,
	pub center_x: Option<f64>,
	pub center_y: Option<f64>,

	/// Set only when status is "failed"
	pub error_message: Option<String>,

	/// Fencing token, bumped by one on every granted acquisition
	pub run_generation: i64,

	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
	/// Get the status as enum
	pub fn sync_status(&self) -> SyncStatus {
		self.status.parse().unwrap_or(SyncStatus::Failed)
	}

	pub fn is_in_progress(&self) -> bool {
		self.sync_status() == SyncStatus::InProgress
	}

	/// Share of `total` already processed, as a percentage
	pub fn progress_percent(&self, total: u64) -> f64 {
		if !self.is_in_progress() || total == 0 {
			return 0.0;
		}
		(self.entities_processed as f64 / total as f64 * 100.0).min(100.0)
	}
}
