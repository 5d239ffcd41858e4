//! Network node entity
//!
//! Nodes belong to a project and optionally to a flag (a sub-filter). The
//! canvas sync only reads `geo_x`/`geo_y` and writes `canvas_x`/`canvas_y`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "network_node")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,

	pub project_id: i32,
	pub flag_id: Option<i32>,
	pub name: String,

	/// Geographic position in the project's projected CRS
	pub geo_x: Option<f64>,
	pub geo_y: Option<f64>,

	/// Diagram position, null until a sync has covered this node
	pub canvas_x: Option<f64>,
	pub canvas_y: Option<f64>,

	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
	pub fn position(&self) -> Option<(f64, f64)> {
		Some((self.geo_x?, self.geo_y?))
	}

	pub fn has_canvas(&self) -> bool {
		self.canvas_x.is_some() && self.canvas_y.is_some()
	}
}
