//! Lock coordinator
//!
//! Grants at most one live run per scope key. All coordination goes through
//! the database so independent server processes agree on the owner:
//!
//! - `acquire` is a single transaction: ensure the row exists, read it under a
//!   row-exclusive lock, then compare-and-swap it to `in_progress`.
//! - Each grant bumps `run_generation`. Every later write by the run is
//!   conditional on that generation, so a run that was reaped and taken over
//!   cannot clobber its successor.

use super::{
	projection::Point,
	reaper::is_stale_at,
	store::ensure_record,
};
use crate::{
	common::errors::{CoreError, Result},
	infra::db::entities::canvas_sync_status::{self, SyncStatus},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
	sea_query::{Expr, Query, SelectStatement},
	ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect, TransactionTrait,
	UpdateMany,
};
use serde::Serialize;
use tracing::{info, warn};

/// Proof that the holder owns the current run of a scope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lease {
	pub scope_key: String,
	pub generation: i64,
	pub actor: String,
	pub scale: f64,
	pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AcquireResult {
	Granted(Lease),
	/// A live run already owns the scope
	Conflict {
		started_by: Option<String>,
		started_at: Option<DateTime<Utc>>,
	},
}

impl AcquireResult {
	pub fn is_granted(&self) -> bool {
		matches!(self, Self::Granted(_))
	}

	pub fn lease(&self) -> Option<&Lease> {
		match self {
			Self::Granted(lease) => Some(lease),
			Self::Conflict { .. } => None,
		}
	}
}

/// Try to become the owner of `scope_key`'s next run.
///
/// Blocks only while a concurrent acquirer of the same key holds its
/// transaction open. A non-stale in-progress run yields `Conflict`; a stale
/// one is taken over in place.
pub async fn acquire<C>(
	db: &C,
	scope_key: &str,
	actor: &str,
	scale: f64,
	stale_after: Duration,
) -> Result<AcquireResult>
where
	C: ConnectionTrait + TransactionTrait,
{
	if scope_key.is_empty() {
		return Err(CoreError::Config("scope key must not be empty".to_string()));
	}
	if !(scale.is_finite() && scale > 0.0) {
		return Err(CoreError::InvalidScale(scale));
	}

	let txn = db.begin().await?;
	let now = Utc::now();

	// A write first: on SQLite this takes the database write lock, which is
	// what serialises acquirers there.
	ensure_record(&txn, scope_key, now).await?;

	let record = canvas_sync_status::Entity::find()
		.filter(canvas_sync_status::Column::ScopeKey.eq(scope_key))
		.lock_exclusive()
		.one(&txn)
		.await?
		.ok_or_else(|| DbErr::RecordNotFound(format!("canvas sync record {scope_key}")))?;

	if record.is_in_progress() && !is_stale_at(&record, stale_after, now) {
		txn.rollback().await?;
		info!(
			scope_key,
			actor,
			held_by = ?record.started_by,
			generation = record.run_generation,
			"Canvas sync already running"
		);
		return Ok(AcquireResult::Conflict {
			started_by: record.started_by,
			started_at: record.started_at,
		});
	}

	let generation = record.run_generation + 1;
	let updated = canvas_sync_status::Entity::update_many()
		.col_expr(
			canvas_sync_status::Column::Status,
			Expr::value(SyncStatus::InProgress.to_string()),
		)
		.col_expr(canvas_sync_status::Column::StartedBy, Expr::value(actor))
		.col_expr(canvas_sync_status::Column::StartedAt, Expr::value(now))
		.col_expr(canvas_sync_status::Column::LastHeartbeat, Expr::value(now))
		.col_expr(
			canvas_sync_status::Column::CompletedAt,
			Expr::value(Option::<DateTime<Utc>>::None),
		)
		.col_expr(canvas_sync_status::Column::EntitiesProcessed, Expr::value(0i64))
		.col_expr(
			canvas_sync_status::Column::ErrorMessage,
			Expr::value(Option::<String>::None),
		)
		.col_expr(canvas_sync_status::Column::Scale, Expr::value(scale))
		.col_expr(canvas_sync_status::Column::RunGeneration, Expr::value(generation))
		.col_expr(canvas_sync_status::Column::UpdatedAt, Expr::value(now))
		.filter(canvas_sync_status::Column::Id.eq(record.id))
		.filter(canvas_sync_status::Column::RunGeneration.eq(record.run_generation))
		.exec(&txn)
		.await?;

	if updated.rows_affected != 1 {
		// Only reachable on backends without row locks; someone else won.
		txn.rollback().await?;
		warn!(scope_key, actor, "Lost canvas sync acquisition race");
		let current = super::store::find_record(db, scope_key).await?;
		return Ok(AcquireResult::Conflict {
			started_by: current.as_ref().and_then(|r| r.started_by.clone()),
			started_at: current.and_then(|r| r.started_at),
		});
	}

	txn.commit().await?;

	if record.is_in_progress() {
		warn!(
			scope_key,
			actor,
			previous_owner = ?record.started_by,
			previous_generation = record.run_generation,
			"Took over stale canvas sync run"
		);
	}
	info!(scope_key, actor, generation, scale, "Canvas sync granted");

	Ok(AcquireResult::Granted(Lease {
		scope_key: scope_key.to_owned(),
		generation,
		actor: actor.to_owned(),
		scale,
		started_at: now,
	}))
}

impl Lease {
	/// Subquery that is non-empty only while this lease still owns the record
	pub(crate) fn ownership(&self) -> SelectStatement {
		Query::select()
			.expr(Expr::val(1))
			.from(canvas_sync_status::Entity)
			.and_where(canvas_sync_status::Column::ScopeKey.eq(self.scope_key.as_str()))
			.and_where(canvas_sync_status::Column::RunGeneration.eq(self.generation))
			.and_where(
				canvas_sync_status::Column::Status.eq(SyncStatus::InProgress.to_string()),
			)
			.to_owned()
	}

	fn fenced_update(&self) -> UpdateMany<canvas_sync_status::Entity> {
		canvas_sync_status::Entity::update_many()
			.col_expr(canvas_sync_status::Column::UpdatedAt, Expr::value(Utc::now()))
			.filter(canvas_sync_status::Column::ScopeKey.eq(self.scope_key.as_str()))
			.filter(canvas_sync_status::Column::RunGeneration.eq(self.generation))
			.filter(canvas_sync_status::Column::Status.eq(SyncStatus::InProgress.to_string()))
	}

	async fn apply<C: ConnectionTrait>(
		&self,
		db: &C,
		update: UpdateMany<canvas_sync_status::Entity>,
	) -> Result<()> {
		if update.exec(db).await?.rows_affected == 0 {
			warn!(
				scope_key = %self.scope_key,
				generation = self.generation,
				"Canvas sync run no longer owns its record"
			);
			return Err(self.superseded());
		}
		Ok(())
	}

	pub(crate) fn superseded(&self) -> CoreError {
		CoreError::Superseded {
			scope_key: self.scope_key.clone(),
			generation: self.generation,
		}
	}

	/// Whether the record still belongs to this run
	pub async fn is_current<C: ConnectionTrait>(&self, db: &C) -> Result<bool> {
		let record = super::store::find_record(db, &self.scope_key).await?;
		Ok(record.is_some_and(|r| r.run_generation == self.generation && r.is_in_progress()))
	}

	pub async fn record_center<C: ConnectionTrait>(&self, db: &C, center: Point) -> Result<()> {
		self.apply(
			db,
			self.fenced_update()
				.col_expr(canvas_sync_status::Column::CenterX, Expr::value(center.x))
				.col_expr(canvas_sync_status::Column::CenterY, Expr::value(center.y)),
		)
		.await
	}

	/// Publish progress and prove liveness to the reaper
	pub async fn heartbeat<C: ConnectionTrait>(&self, db: &C, processed: u64) -> Result<()> {
		self.apply(
			db,
			self.fenced_update()
				.col_expr(
					canvas_sync_status::Column::EntitiesProcessed,
					Expr::value(processed as i64),
				)
				.col_expr(canvas_sync_status::Column::LastHeartbeat, Expr::value(Utc::now())),
		)
		.await
	}

	pub async fn complete<C: ConnectionTrait>(&self, db: &C, processed: u64) -> Result<()> {
		let now = Utc::now();
		self.apply(
			db,
			self.fenced_update()
				.col_expr(
					canvas_sync_status::Column::Status,
					Expr::value(SyncStatus::Completed.to_string()),
				)
				.col_expr(canvas_sync_status::Column::CompletedAt, Expr::value(now))
				.col_expr(canvas_sync_status::Column::LastHeartbeat, Expr::value(now))
				.col_expr(
					canvas_sync_status::Column::EntitiesProcessed,
					Expr::value(processed as i64),
				),
		)
		.await
	}

	pub async fn fail<C: ConnectionTrait>(&self, db: &C, message: &str) -> Result<()> {
		self.apply(
			db,
			self.fenced_update()
				.col_expr(
					canvas_sync_status::Column::Status,
					Expr::value(SyncStatus::Failed.to_string()),
				)
				.col_expr(canvas_sync_status::Column::CompletedAt, Expr::value(Utc::now()))
				.col_expr(canvas_sync_status::Column::ErrorMessage, Expr::value(message)),
		)
		.await
	}
}
