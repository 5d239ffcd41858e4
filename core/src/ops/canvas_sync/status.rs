//! Status reporter
//!
//! Answers "is a sync needed, running or done" for a scope. Counts are taken
//! live and may briefly disagree with the record's progress counter.

use super::{reaper::reap_all, scope::ScopeFilter, store::get_or_create};
use crate::{
	common::errors::Result,
	infra::db::entities::{canvas_sync_status::SyncStatus, network_node},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
	pub scope_key: String,
	pub total: u64,
	pub with_canvas: u64,
	pub missing_canvas: u64,
	pub sync_needed: bool,
	pub sync_in_progress: bool,
	pub sync_status: SyncStatus,
	pub sync_started_by: Option<String>,
	pub sync_started_at: Option<DateTime<Utc>>,
	pub sync_completed_at: Option<DateTime<Utc>>,
	/// Percentage of the live total processed by the running sync
	pub sync_progress: f64,
	pub error_message: Option<String>,
}

/// Report the sync state of `filter`, reaping abandoned runs first
pub async fn status<C: ConnectionTrait>(
	db: &C,
	filter: &ScopeFilter,
	stale_after: Duration,
) -> Result<StatusView> {
	// Best effort: a failed sweep must not hide the status
	if let Err(e) = reap_all(db, stale_after).await {
		warn!(error = %e, "Stale canvas sync sweep failed");
	}

	let scope_key = filter.scope_key();
	let record = get_or_create(db, &scope_key).await?;

	let total = network_node::Entity::find()
		.filter(filter.positioned())
		.count(db)
		.await?;
	let with_canvas = network_node::Entity::find()
		.filter(filter.with_canvas())
		.count(db)
		.await?;
	let missing_canvas = total.saturating_sub(with_canvas);

	let sync_status = record.sync_status();
	let error_message = match sync_status {
		SyncStatus::Failed => record.error_message.clone(),
		_ => None,
	};

	Ok(StatusView {
		scope_key,
		total,
		with_canvas,
		missing_canvas,
		sync_needed: missing_canvas > 0,
		sync_in_progress: sync_status == SyncStatus::InProgress,
		sync_status,
		sync_started_by: record.started_by.clone(),
		sync_started_at: record.started_at,
		sync_completed_at: record.completed_at,
		sync_progress: record.progress_percent(total),
		error_message,
	})
}
