use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::BoundingBox;

pub type WidgetId = u64;

/// A stored widget.
///
/// Stores hand out owned copies, so mutating a returned value never touches
/// stored state. Equality ignores `last_modified`: two widgets are equal when
/// identity, z-order and geometry match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub id: WidgetId,
    pub z_order: i32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub last_modified: DateTime<Utc>,
}

impl PartialEq for Widget {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.z_order == other.z_order
            && self.x == other.x
            && self.y == other.y
            && self.width == other.width
            && self.height == other.height
    }
}

impl Eq for Widget {}

impl Widget {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::of(self.x, self.y, self.width, self.height)
    }

    /// True when applying `draft` would leave this widget unchanged.
    pub fn matches(&self, draft: &WidgetDraft) -> bool {
        draft.z_order == Some(self.z_order)
            && draft.x == self.x
            && draft.y == self.y
            && draft.width == self.width
            && draft.height == self.height
    }

    /// Copy of this widget moved to `z_order`, stamped with `now`.
    pub(crate) fn shifted_to(&self, z_order: i32, now: DateTime<Utc>) -> Self {
        Self {
            z_order,
            last_modified: now,
            ..self.clone()
        }
    }
}

/// Caller-supplied widget fields for create and update.
///
/// There is no id: the store assigns it on create and takes it as a separate
/// argument on update. A missing `z_order` means "put it on top".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDraft {
    #[serde(default)]
    pub z_order: Option<i32>,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WidgetDraft {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            z_order: None,
            x,
            y,
            width,
            height,
        }
    }

    pub fn z_order(mut self, z_order: i32) -> Self {
        self.z_order = Some(z_order);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.width < 1 || self.height < 1 {
            return Err(Error::validation(format!(
                "Widget dimensions must be positive (width={}, height={})",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub(crate) fn into_widget(self, id: WidgetId, z_order: i32, now: DateTime<Utc>) -> Widget {
        Widget {
            id,
            z_order,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            last_modified: now,
        }
    }
}

impl From<&Widget> for WidgetDraft {
    fn from(widget: &Widget) -> Self {
        Self {
            z_order: Some(widget.z_order),
            x: widget.x,
            y: widget.y,
            width: widget.width,
            height: widget.height,
        }
    }
}
