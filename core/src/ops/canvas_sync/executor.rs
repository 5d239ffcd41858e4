//! Sync executor
//!
//! Computes canvas coordinates for a snapshot of the scope and writes them
//! through one node at a time, so partial progress survives a crash. Nodes
//! created after the snapshot are left for the next run.

use super::{
	lease::Lease,
	projection::{to_canvas, Bounds, Point},
	scope::ScopeFilter,
};
use crate::{
	common::errors::{CoreError, Result},
	infra::db::entities::network_node,
};
use chrono::Utc;
use sea_orm::{
	sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use tracing::{debug, error, info};

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
	pub updated: u64,
	pub message: String,
	/// `None` when the scope had no positioned nodes
	pub center: Option<Point>,
	pub bounds: Option<Bounds>,
}

/// Execute a granted run.
///
/// Must be called outside the acquisition transaction. Any failure is
/// recorded on the sync record before being returned, except supersession,
/// where the record belongs to someone else.
pub async fn run<C: ConnectionTrait>(
	db: &C,
	lease: &Lease,
	filter: &ScopeFilter,
	batch_size: usize,
) -> Result<RunResult> {
	match run_inner(db, lease, filter, batch_size.max(1)).await {
		Ok(result) => Ok(result),
		Err(e @ CoreError::Superseded { .. }) => Err(e),
		Err(e) => {
			let message = e.to_string();
			error!(
				scope_key = %lease.scope_key,
				generation = lease.generation,
				error = %message,
				"Canvas sync run failed"
			);

			if let Err(record_err) = lease.fail(db, &message).await {
				error!(
					scope_key = %lease.scope_key,
					error = %record_err,
					"Failed to record canvas sync failure"
				);
			}

			Err(CoreError::Execution {
				scope_key: lease.scope_key.clone(),
				message,
			})
		}
	}
}

async fn run_inner<C: ConnectionTrait>(
	db: &C,
	lease: &Lease,
	filter: &ScopeFilter,
	batch_size: usize,
) -> Result<RunResult> {
	let snapshot = take_snapshot(db, filter).await?;

	let Some(bounds) = Bounds::from_points(snapshot.iter().map(|(_, p)| *p)) else {
		lease.complete(db, 0).await?;
		info!(scope_key = %lease.scope_key, "No positioned nodes to sync");
		return Ok(RunResult {
			updated: 0,
			message: "no entities".to_string(),
			center: None,
			bounds: None,
		});
	};

	let center = bounds.center();
	lease.record_center(db, center).await?;

	info!(
		scope_key = %lease.scope_key,
		generation = lease.generation,
		nodes = snapshot.len(),
		center_x = center.x,
		center_y = center.y,
		scale = lease.scale,
		"Computing canvas coordinates"
	);

	let mut processed: u64 = 0;
	for (node_id, geo) in &snapshot {
		let canvas = to_canvas(*geo, center, lease.scale);
		write_canvas(db, lease, *node_id, canvas).await?;

		processed += 1;
		if processed % batch_size as u64 == 0 {
			lease.heartbeat(db, processed).await?;
			debug!(
				scope_key = %lease.scope_key,
				processed,
				total = snapshot.len(),
				"Canvas sync heartbeat"
			);
		}
	}

	lease.complete(db, processed).await?;
	info!(
		scope_key = %lease.scope_key,
		generation = lease.generation,
		updated = processed,
		"Canvas sync completed"
	);

	Ok(RunResult {
		updated: processed,
		message: format!("updated {processed} nodes"),
		center: Some(center),
		bounds: Some(bounds),
	})
}

/// Positioned nodes of the scope as of now
async fn take_snapshot<C: ConnectionTrait>(
	db: &C,
	filter: &ScopeFilter,
) -> Result<Vec<(i32, Point)>> {
	let nodes = network_node::Entity::find()
		.filter(filter.positioned())
		.order_by_asc(network_node::Column::Id)
		.all(db)
		.await?;

	nodes
		.into_iter()
		.filter_map(|node| node.position().map(|(x, y)| (node.id, Point::new(x, y))))
		.map(|(id, p)| {
			if p.is_finite() {
				Ok((id, p))
			} else {
				Err(CoreError::InvalidPosition {
					node_id: id,
					x: p.x,
					y: p.y,
				})
			}
		})
		.collect()
}

/// Write one node's canvas position, only while `lease` still owns the scope
async fn write_canvas<C: ConnectionTrait>(
	db: &C,
	lease: &Lease,
	node_id: i32,
	canvas: Point,
) -> Result<()> {
	let result = network_node::Entity::update_many()
		.col_expr(network_node::Column::CanvasX, Expr::value(canvas.x))
		.col_expr(network_node::Column::CanvasY, Expr::value(canvas.y))
		.col_expr(network_node::Column::UpdatedAt, Expr::value(Utc::now()))
		.filter(network_node::Column::Id.eq(node_id))
		.filter(Expr::exists(lease.ownership()))
		.exec(db)
		.await?;

	if result.rows_affected == 0 {
		if !lease.is_current(db).await? {
			return Err(lease.superseded());
		}
		// Deleted since the snapshot
		debug!(scope_key = %lease.scope_key, node_id, "Node vanished during canvas sync");
	}

	Ok(())
}
