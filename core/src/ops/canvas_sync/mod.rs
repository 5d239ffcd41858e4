//! # Canvas coordinate synchronization
//!
//! Projects the geographic positions of a scope's network nodes onto a 2D
//! canvas and stores the result on each node. Only one run per scope may be
//! live at a time, across every process sharing the database:
//!
//! - [`lease::acquire`] grants the run inside one row-locked transaction.
//! - [`executor::run`] writes coordinates node by node, heartbeating as it goes.
//! - [`reaper::reap_all`] fails runs whose heartbeat went silent.
//! - [`status::status`] reports progress to readers racing the writer.
//!
//! ## Example
//! ```rust,no_run
//! use cs_core::ops::canvas_sync::{CanvasSync, ScopeFilter};
//!
//! # async fn example(sync: &CanvasSync) -> cs_core::common::Result<()> {
//! let scope = ScopeFilter::project(1).with_flag(5);
//! let outcome = sync.synchronize(&scope, "alice", Some(0.2)).await?;
//! println!("updated {} nodes around {:?}", outcome.updated_count, outcome.center);
//! # Ok(())
//! # }
//! ```

pub mod executor;
pub mod lease;
pub mod projection;
pub mod reaper;
pub mod scope;
pub mod status;
pub mod store;

pub use executor::{RunResult, DEFAULT_BATCH_SIZE};
pub use lease::{AcquireResult, Lease};
pub use projection::{Bounds, Point};
pub use reaper::{is_stale, DEFAULT_STALE_TIMEOUT, TIMEOUT_MESSAGE};
pub use scope::ScopeFilter;
pub use status::StatusView;

use crate::{
	common::errors::{CoreError, Result},
	config::SyncConfig,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::instrument;

/// Result of a successful synchronization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
	pub scope_key: String,
	pub updated_count: u64,
	pub scale: f64,
	pub center: Point,
	pub bounds: Bounds,
}

/// Entry point bundling the database with sync tuning
#[derive(Clone)]
pub struct CanvasSync {
	db: DatabaseConnection,
	config: SyncConfig,
}

impl CanvasSync {
	pub fn new(db: DatabaseConnection, config: SyncConfig) -> Self {
		Self { db, config }
	}

	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	pub fn db(&self) -> &DatabaseConnection {
		&self.db
	}

	pub async fn status(&self, filter: &ScopeFilter) -> Result<StatusView> {
		status::status(&self.db, filter, self.config.stale_timeout()).await
	}

	pub async fn acquire(
		&self,
		filter: &ScopeFilter,
		actor: &str,
		scale: Option<f64>,
	) -> Result<AcquireResult> {
		lease::acquire(
			&self.db,
			&filter.scope_key(),
			actor,
			scale.unwrap_or(self.config.default_scale),
			self.config.stale_timeout(),
		)
		.await
	}

	/// Acquire the scope and run the projection to completion.
	///
	/// A live competing run yields [`CoreError::LockConflict`]; a scope without
	/// positioned nodes is marked completed and yields [`CoreError::EmptyScope`].
	#[instrument(skip(self), fields(scope_key = %filter.scope_key()))]
	pub async fn synchronize(
		&self,
		filter: &ScopeFilter,
		actor: &str,
		scale: Option<f64>,
	) -> Result<SyncOutcome> {
		let scope_key = filter.scope_key();

		let lease = match self.acquire(filter, actor, scale).await? {
			AcquireResult::Granted(lease) => lease,
			AcquireResult::Conflict {
				started_by,
				started_at,
			} => {
				return Err(CoreError::LockConflict {
					scope_key,
					started_by,
					started_at,
				})
			}
		};

		let result = executor::run(&self.db, &lease, filter, self.config.batch_size).await?;

		match (result.center, result.bounds) {
			(Some(center), Some(bounds)) => Ok(SyncOutcome {
				scope_key,
				updated_count: result.updated,
				scale: lease.scale,
				center,
				bounds,
			}),
			_ => Err(CoreError::EmptyScope { scope_key }),
		}
	}

	/// Sweep every scope for abandoned runs
	pub async fn reap_stale(&self) -> Result<u64> {
		reaper::reap_all(&self.db, self.config.stale_timeout()).await
	}
}
