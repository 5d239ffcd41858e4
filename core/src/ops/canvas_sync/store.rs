//! Sync record store access shared by acquisition and status reads

use crate::infra::db::entities::canvas_sync_status::{self, SyncStatus};
use chrono::{DateTime, Utc};
use sea_orm::{
	sea_query::OnConflict, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
	QueryFilter,
};

/// Insert an idle record for `scope_key` unless one already exists.
///
/// Concurrent callers race on the unique index; the loser's insert is a no-op.
pub(crate) async fn ensure_record<C: ConnectionTrait>(
	db: &C,
	scope_key: &str,
	now: DateTime<Utc>,
) -> Result<(), DbErr> {
	let record = canvas_sync_status::ActiveModel {
		scope_key: Set(scope_key.to_owned()),
		status: Set(SyncStatus::Idle.to_string()),
		entities_processed: Set(0),
		scale: Set(1.0),
		run_generation: Set(0),
		created_at: Set(now),
		updated_at: Set(now),
		..Default::default()
	};

	canvas_sync_status::Entity::insert(record)
		.on_conflict(
			OnConflict::column(canvas_sync_status::Column::ScopeKey)
				.do_nothing()
				.to_owned(),
		)
		.exec_without_returning(db)
		.await?;

	Ok(())
}

pub async fn find_record<C: ConnectionTrait>(
	db: &C,
	scope_key: &str,
) -> Result<Option<canvas_sync_status::Model>, DbErr> {
	canvas_sync_status::Entity::find()
		.filter(canvas_sync_status::Column::ScopeKey.eq(scope_key))
		.one(db)
		.await
}

/// Fetch the record for `scope_key`, lazily creating it as idle
pub async fn get_or_create<C: ConnectionTrait>(
	db: &C,
	scope_key: &str,
) -> Result<canvas_sync_status::Model, DbErr> {
	if let Some(record) = find_record(db, scope_key).await? {
		return Ok(record);
	}

	ensure_record(db, scope_key, Utc::now()).await?;
	find_record(db, scope_key)
		.await?
		.ok_or_else(|| DbErr::RecordNotFound(format!("canvas sync record {scope_key}")))
}
