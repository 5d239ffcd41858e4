//! Scope parameters and their derived record key

use crate::infra::db::entities::network_node;
use sea_orm::{ColumnTrait, Condition};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which nodes a sync covers: one project, optionally narrowed to one flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeFilter {
	pub project_id: i32,
	#[serde(default)]
	pub flag_id: Option<i32>,
}

impl ScopeFilter {
	pub fn project(project_id: i32) -> Self {
		Self {
			project_id,
			flag_id: None,
		}
	}

	pub fn with_flag(mut self, flag_id: i32) -> Self {
		self.flag_id = Some(flag_id);
		self
	}

	/// Deterministic key of the sync record guarding this scope
	pub fn scope_key(&self) -> String {
		match self.flag_id {
			Some(flag_id) => format!("project_{}_flag_{}", self.project_id, flag_id),
			None => format!("project_{}", self.project_id),
		}
	}

	/// Every node in the scope
	pub fn condition(&self) -> Condition {
		Condition::all()
			.add(network_node::Column::ProjectId.eq(self.project_id))
			.add_option(self.flag_id.map(|f| network_node::Column::FlagId.eq(f)))
	}

	/// Nodes in the scope that have a geographic position
	pub fn positioned(&self) -> Condition {
		self.condition()
			.add(network_node::Column::GeoX.is_not_null())
			.add(network_node::Column::GeoY.is_not_null())
	}

	/// Positioned nodes that already carry canvas coordinates
	pub fn with_canvas(&self) -> Condition {
		self.positioned()
			.add(network_node::Column::CanvasX.is_not_null())
			.add(network_node::Column::CanvasY.is_not_null())
	}
}

impl fmt::Display for ScopeFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.scope_key())
	}
}
