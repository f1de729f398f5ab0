//! Plane geometry used by area-filtered listings.
//!
//! A widget is described by its center and its size. Its bounding box is
//! derived with truncating integer division, so for odd sizes the box is one
//! unit narrower than the size and the center stays at the box midpoint:
//!
//! ```text
//! left   = x - width / 2      right = x + width / 2
//! bottom = y - height / 2     top   = y + height / 2
//! ```
//!
//! A widget fits an area when its whole box lies inside the area, bounds
//! included.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::widget::Widget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle with inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub left_bottom: Point,
    pub right_top: Point,
}

impl Area {
    pub const fn new(left_bottom: Point, right_top: Point) -> Self {
        Self {
            left_bottom,
            right_top,
        }
    }

    /// Builds an area from request coordinates, rejecting degenerate or
    /// inverted rectangles.
    pub fn try_new(left_bottom: Point, right_top: Point) -> Result<Self> {
        if left_bottom.x >= right_top.x || left_bottom.y >= right_top.y {
            return Err(Error::validation(
                "Requested area is not valid (left/bottom must be below and left of right/top)",
            ));
        }
        Ok(Self::new(left_bottom, right_top))
    }
}

/// Widget bounds widened to i64 so that `x ± size / 2` cannot overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i64,
    pub bottom: i64,
    pub right: i64,
    pub top: i64,
}

impl BoundingBox {
    pub fn of(x: i32, y: i32, width: i32, height: i32) -> Self {
        let (x, y) = (i64::from(x), i64::from(y));
        let half_width = i64::from(width) / 2;
        let half_height = i64::from(height) / 2;
        Self {
            left: x - half_width,
            bottom: y - half_height,
            right: x + half_width,
            top: y + half_height,
        }
    }

    pub fn within(&self, area: &Area) -> bool {
        let fits_from_left_bottom = self.left >= i64::from(area.left_bottom.x)
            && self.bottom >= i64::from(area.left_bottom.y);
        let fits_from_right_top =
            self.right <= i64::from(area.right_top.x) && self.top <= i64::from(area.right_top.y);
        fits_from_left_bottom && fits_from_right_top
    }
}

/// Returns true when the widget's whole bounding box lies inside `area`.
pub fn fits_in_area(widget: &Widget, area: &Area) -> bool {
    widget.bounding_box().within(area)
}
