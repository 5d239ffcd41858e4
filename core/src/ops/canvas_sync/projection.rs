//! Geographic to canvas projection
//!
//! Canvas coordinates are centred on the bounding box of the scope and scaled
//! uniformly. The Y axis is flipped: geographic Y grows upward, canvas Y grows
//! downward.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn is_finite(&self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}
}

/// Axis-aligned bounding box of a set of positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
	pub min_x: f64,
	pub max_x: f64,
	pub min_y: f64,
	pub max_y: f64,
}

impl Bounds {
	/// `None` when `points` is empty
	pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
		points.into_iter().fold(None, |acc, p| {
			Some(match acc {
				None => Bounds {
					min_x: p.x,
					max_x: p.x,
					min_y: p.y,
					max_y: p.y,
				},
				Some(b) => Bounds {
					min_x: b.min_x.min(p.x),
					max_x: b.max_x.max(p.x),
					min_y: b.min_y.min(p.y),
					max_y: b.max_y.max(p.y),
				},
			})
		})
	}

	pub fn center(&self) -> Point {
		Point::new(
			(self.min_x + self.max_x) / 2.0,
			(self.min_y + self.max_y) / 2.0,
		)
	}
}

pub fn to_canvas(geo: Point, center: Point, scale: f64) -> Point {
	Point::new((geo.x - center.x) * scale, -(geo.y - center.y) * scale)
}
