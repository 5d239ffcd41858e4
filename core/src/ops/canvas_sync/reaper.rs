//! Staleness reaper
//!
//! A run that stops heartbeating (crash, hang) would lock its scope forever.
//! The reaper fails such runs so the next `acquire` can take the scope over.

use crate::{
	common::errors::Result,
	infra::db::entities::canvas_sync_status::{self, SyncStatus},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
	sea_query::Expr, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
};
use tracing::{debug, error, warn};

/// Runs silent for longer than this are considered abandoned
pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::minutes(10);

pub const TIMEOUT_MESSAGE: &str = "Sync operation timed out";

/// Whether an in-progress record has missed its heartbeat deadline.
///
/// Records in any other state are never stale.
pub fn is_stale(record: &canvas_sync_status::Model, timeout: Duration) -> bool {
	is_stale_at(record, timeout, Utc::now())
}

pub fn is_stale_at(
	record: &canvas_sync_status::Model,
	timeout: Duration,
	now: DateTime<Utc>,
) -> bool {
	if !record.is_in_progress() {
		return false;
	}

	match record.last_heartbeat {
		None => true,
		Some(heartbeat) => now - heartbeat > timeout,
	}
}

/// Fail every stale in-progress record, returning how many were reaped.
///
/// Each row is transitioned by its own conditional update, so a row that was
/// re-acquired or heartbeated after the scan is left alone, and one failing
/// row does not stop the others.
pub async fn reap_all<C: ConnectionTrait>(db: &C, timeout: Duration) -> Result<u64> {
	let now = Utc::now();

	let candidates = canvas_sync_status::Entity::find()
		.filter(canvas_sync_status::Column::Status.eq(SyncStatus::InProgress.to_string()))
		.all(db)
		.await?;

	let mut reaped = 0;
	for record in candidates
		.iter()
		.filter(|record| is_stale_at(record, timeout, now))
	{
		match reap_one(db, record, timeout, now).await {
			Ok(true) => {
				reaped += 1;
				warn!(
					scope_key = %record.scope_key,
					generation = record.run_generation,
					started_by = ?record.started_by,
					last_heartbeat = ?record.last_heartbeat,
					"Reaped stale canvas sync run"
				);
			}
			Ok(false) => {
				debug!(
					scope_key = %record.scope_key,
					"Canvas sync run was refreshed before it could be reaped"
				);
			}
			Err(e) => {
				error!(
					scope_key = %record.scope_key,
					error = %e,
					"Failed to reap stale canvas sync run"
				);
			}
		}
	}

	Ok(reaped)
}

async fn reap_one<C: ConnectionTrait>(
	db: &C,
	record: &canvas_sync_status::Model,
	timeout: Duration,
	now: DateTime<Utc>,
) -> std::result::Result<bool, DbErr> {
	let cutoff = now - timeout;

	let result = canvas_sync_status::Entity::update_many()
		.col_expr(
			canvas_sync_status::Column::Status,
			Expr::value(SyncStatus::Failed.to_string()),
		)
		.col_expr(canvas_sync_status::Column::CompletedAt, Expr::value(now))
		.col_expr(
			canvas_sync_status::Column::ErrorMessage,
			Expr::value(TIMEOUT_MESSAGE),
		)
		.col_expr(canvas_sync_status::Column::UpdatedAt, Expr::value(now))
		.filter(canvas_sync_status::Column::Id.eq(record.id))
		.filter(canvas_sync_status::Column::Status.eq(SyncStatus::InProgress.to_string()))
		.filter(canvas_sync_status::Column::RunGeneration.eq(record.run_generation))
		.filter(
			Condition::any()
				.add(canvas_sync_status::Column::LastHeartbeat.is_null())
				.add(canvas_sync_status::Column::LastHeartbeat.lt(cutoff)),
		)
		.exec(db)
		.await?;

	Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn in_progress(heartbeat: Option<DateTime<Utc>>) -> canvas_sync_status::Model {
		let now = Utc::now();
		canvas_sync_status::Model {
			id: 1,
			scope_key: "project_1".to_string(),
			status: SyncStatus::InProgress.to_string(),
			started_by: Some("alice".to_string()),
			started_at: Some(now),
			completed_at: None,
			last_heartbeat: heartbeat,
			entities_processed: 0,
			scale: 1.0,
			center_x: None,
			center_y: None,
			error_message: None,
			run_generation: 1,
			created_at: now,
			updated_at: now,
		}
	}

	#[test]
	fn test_missing_heartbeat_is_stale() {
		assert!(is_stale(&in_progress(None), DEFAULT_STALE_TIMEOUT));
	}

	#[test]
	fn test_staleness_thresholds() {
		let now = Utc::now();
		let fifteen_min_old = in_progress(Some(now - Duration::minutes(15)));
		let five_min_old = in_progress(Some(now - Duration::minutes(5)));

		assert!(is_stale_at(&fifteen_min_old, Duration::minutes(10), now));
		assert!(is_stale_at(&five_min_old, Duration::minutes(2), now));
		assert!(!is_stale_at(&five_min_old, Duration::minutes(10), now));
	}

	#[test]
	fn test_finished_records_are_never_stale() {
		let now = Utc::now();
		for status in [SyncStatus::Idle, SyncStatus::Completed, SyncStatus::Failed] {
			let mut record = in_progress(None);
			record.status = status.to_string();
			assert!(!is_stale_at(&record, Duration::minutes(10), now));
		}
	}
}
