//! Pagination and area filtering over a descending z-order sequence.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{fits_in_area, Area};
use crate::widget::Widget;

pub const DEFAULT_PAGE: usize = 0;
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MIN_PAGE_SIZE: usize = 1;
pub const MAX_PAGE_SIZE: usize = 500;

/// A validated page request. Pages are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    size: usize,
}

impl PageRequest {
    /// Applies the default limits (size 10, at most 500).
    pub fn new(page: Option<i64>, size: Option<i64>) -> Result<Self> {
        Self::with_limits(page, size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    pub fn with_limits(
        page: Option<i64>,
        size: Option<i64>,
        default_size: usize,
        max_size: usize,
    ) -> Result<Self> {
        let page = match page {
            None => DEFAULT_PAGE,
            Some(page) => usize::try_from(page)
                .map_err(|_| Error::validation("Page must be a non-negative number"))?,
        };

        let size = match size {
            None => default_size,
            Some(size) => usize::try_from(size).unwrap_or(0),
        };
        if !(MIN_PAGE_SIZE..=max_size).contains(&size) {
            return Err(Error::validation(format!(
                "Items chunk must be between {} and {}",
                MIN_PAGE_SIZE, max_size
            )));
        }

        Ok(Self { page, size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Index of the first item on this page, saturating on absurd pages.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of widgets in descending z-order.
///
/// `total_count` is the size of the whole (possibly area-filtered)
/// collection, also when the page lies past the end and `items` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPage {
    pub total_count: u64,
    pub items: Vec<Widget>,
}

/// Widgets of `ordering` that fit `area`, order preserved.
pub fn filter_in_area(ordering: &[Arc<Widget>], area: &Area) -> Vec<Arc<Widget>> {
    ordering
        .iter()
        .filter(|widget| fits_in_area(widget, area))
        .cloned()
        .collect()
}

pub fn count_in_area(ordering: &[Arc<Widget>], area: &Area) -> usize {
    ordering
        .iter()
        .filter(|widget| fits_in_area(widget, area))
        .count()
}

/// Cuts one page out of `ordering`, optionally filtered by `area` first.
pub fn paginate(ordering: &[Arc<Widget>], request: PageRequest, area: Option<&Area>) -> WidgetPage {
    let filtered;
    let source = match area {
        Some(area) => {
            filtered = filter_in_area(ordering, area);
            filtered.as_slice()
        }
        None => ordering,
    };

    let total = source.len();
    let start = request.offset().min(total);
    let end = start.saturating_add(request.size()).min(total);

    WidgetPage {
        total_count: total as u64,
        items: source[start..end].iter().map(|w| Widget::clone(w)).collect(),
    }
}
