//! Z-order placement engine.
//!
//! Widgets are kept in a sequence sorted by descending `z_order`, and no two
//! widgets may share a `z_order`. This module computes where a widget goes in
//! that sequence and which existing widgets must move to keep the values
//! unique.
//!
//! # Placement rules
//!
//! 1. No requested z-order: the widget goes on top with `max + 1` (or `1` on
//!    an empty sequence). That value is free by construction.
//! 2. Requested z-order above the current maximum: head of the sequence.
//! 3. Requested z-order below the current minimum: tail of the sequence.
//! 4. Anything else: the widget keeps the requested value and is inserted
//!    below every widget whose z-order is greater or equal. If a widget
//!    already holds that value, it moves up by one, and so does every widget
//!    packed directly above it, until the first gap:
//!
//! ```text
//!   before        insert z=3       after
//!   ┌───┐                          ┌───┐
//!   │ 6 │                          │ 6 │  untouched (gap at 5)
//!   │ 4 │                          │ 5 │  shifted
//!   │ 3 │  ◄── collision           │ 4 │  shifted
//!   │ 1 │                          │ 3 │  new widget
//!   └───┘                          │ 1 │  untouched
//!                                  └───┘
//! ```
//!
//! # Cost
//!
//! Placement copies the sequence of `Arc<Widget>` handles once. Widgets
//! outside the collision run are shared with the previous sequence; only the
//! new widget and the shifted run are fresh allocations. The walk stops at the
//! first gap, so its length is bounded by the collision run, not by the
//! collection.
//!
//! # Failure
//!
//! A shift past `i32::MAX` fails with [`Error::ZOrderOverflow`]. The input
//! sequence is never modified, so a failed placement leaves no trace.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use itertools::Itertools;

use crate::error::{Error, Result};
use crate::widget::{Widget, WidgetDraft, WidgetId};

/// Outcome of placing one widget into an ordering.
#[derive(Debug)]
pub struct Placement {
    /// The finalized widget, as stored in `ordering`.
    pub widget: Arc<Widget>,
    /// Slot of `widget` in `ordering`. Every slot after it moved down by one.
    pub position: usize,
    /// The new descending ordering.
    pub ordering: Vec<Arc<Widget>>,
    /// Number of existing widgets whose z-order was incremented.
    pub shifted: usize,
}

/// Places a new widget built from `draft` into `current`.
///
/// `current` must be sorted by strictly descending z-order and must not
/// contain `id`.
pub fn place(
    draft: WidgetDraft,
    id: WidgetId,
    current: &[Arc<Widget>],
    now: DateTime<Utc>,
) -> Result<Placement> {
    let max = current.first().map(|w| w.z_order);
    let min = current.last().map(|w| w.z_order);

    let (z_order, position) = match (draft.z_order, max, min) {
        (None, None, _) => (1, 0),
        (None, Some(max), _) => (max.checked_add(1).ok_or(Error::ZOrderOverflow)?, 0),
        (Some(z), None, _) => (z, 0),
        (Some(z), Some(max), _) if z > max => (z, 0),
        (Some(z), _, Some(min)) if z < min => (z, current.len()),
        (Some(z), _, _) => (z, current.partition_point(|w| w.z_order >= z)),
    };

    let widget = Arc::new(draft.into_widget(id, z_order, now));

    let mut ordering = Vec::with_capacity(current.len() + 1);
    ordering.extend_from_slice(&current[..position]);
    ordering.push(Arc::clone(&widget));
    ordering.extend_from_slice(&current[position..]);

    let shifted = shift_collision_run(&mut ordering[..position], z_order, now)?;

    Ok(Placement {
        widget,
        position,
        ordering,
        shifted,
    })
}

/// Walks `above` from its last slot toward the head, bumping each widget that
/// sits on the value just claimed below it. Stops at the first gap.
fn shift_collision_run(above: &mut [Arc<Widget>], claimed: i32, now: DateTime<Utc>) -> Result<usize> {
    let mut occupied = claimed;
    let mut shifted = 0;

    for slot in above.iter_mut().rev() {
        if slot.z_order != occupied {
            break;
        }
        occupied = occupied.checked_add(1).ok_or(Error::ZOrderOverflow)?;
        tracing::trace!(id = slot.id, from = slot.z_order, to = occupied, "shifting widget");
        *slot = Arc::new(slot.shifted_to(occupied, now));
        shifted += 1;
    }

    Ok(shifted)
}

/// Returns `current` without the widget at `position`.
pub fn remove(current: &[Arc<Widget>], position: usize) -> Vec<Arc<Widget>> {
    let mut ordering = Vec::with_capacity(current.len().saturating_sub(1));
    ordering.extend_from_slice(&current[..position]);
    if position < current.len() {
        ordering.extend_from_slice(&current[position + 1..]);
    }
    ordering
}

/// Checks that `ordering` is strictly descending by z-order, which implies
/// unique z-orders, and that ids are unique.
pub fn validate_ordering(ordering: &[Arc<Widget>]) -> Result<()> {
    if let Some((upper, lower)) = ordering
        .iter()
        .tuple_windows()
        .find(|(upper, lower)| upper.z_order <= lower.z_order)
    {
        return Err(Error::InvariantViolation(format!(
            "widget {} (z={}) is not above widget {} (z={})",
            upper.id, upper.z_order, lower.id, lower.z_order
        )));
    }

    if let Some(id) = ordering.iter().map(|w| w.id).duplicates().next() {
        return Err(Error::InvariantViolation(format!(
            "widget {} appears more than once",
            id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordering_of(z_orders: &[i32]) -> Vec<Arc<Widget>> {
        let now = Utc::now();
        z_orders
            .iter()
            .enumerate()
            .map(|(i, &z)| Arc::new(WidgetDraft::new(0, 0, 10, 10).into_widget(i as u64 + 1, z, now)))
            .collect()
    }

    fn z_orders(ordering: &[Arc<Widget>]) -> Vec<i32> {
        ordering.iter().map(|w| w.z_order).collect()
    }

    fn draft(z: Option<i32>) -> WidgetDraft {
        WidgetDraft {
            z_order: z,
            ..WidgetDraft::new(0, 0, 10, 10)
        }
    }

    #[test]
    fn test_place_into_empty() -> Result<()> {
        let placed = place(draft(None), 1, &[], Utc::now())?;
        assert_eq!(placed.widget.z_order, 1);
        assert_eq!(placed.position, 0);

        let placed = place(draft(Some(-7)), 1, &[], Utc::now())?;
        assert_eq!(placed.widget.z_order, -7);
        assert_eq!(placed.shifted, 0);
        Ok(())
    }

    #[test]
    fn test_missing_z_goes_on_top() -> Result<()> {
        let current = ordering_of(&[5, 3, 1]);
        let placed = place(draft(None), 10, &current, Utc::now())?;
        assert_eq!(placed.widget.z_order, 6);
        assert_eq!(placed.position, 0);
        assert_eq!(z_orders(&placed.ordering), vec![6, 5, 3, 1]);
        Ok(())
    }

    #[test]
    fn test_above_max_and_below_min() -> Result<()> {
        let current = ordering_of(&[5, 3, 1]);

        let head = place(draft(Some(100)), 10, &current, Utc::now())?;
        assert_eq!(head.position, 0);
        assert_eq!(z_orders(&head.ordering), vec![100, 5, 3, 1]);

        let tail = place(draft(Some(-1)), 10, &current, Utc::now())?;
        assert_eq!(tail.position, 3);
        assert_eq!(z_orders(&tail.ordering), vec![5, 3, 1, -1]);
        assert_eq!(tail.shifted, 0);
        Ok(())
    }

    #[test]
    fn test_collision_shifts_until_gap() -> Result<()> {
        let current = ordering_of(&[5, 3, 1]);
        let placed = place(draft(Some(3)), 10, &current, Utc::now())?;

        assert_eq!(placed.widget.z_order, 3);
        assert_eq!(placed.position, 2);
        assert_eq!(placed.shifted, 1);
        assert_eq!(z_orders(&placed.ordering), vec![5, 4, 3, 1]);
        // the displaced widget kept its id
        assert_eq!(placed.ordering[1].id, 2);
        Ok(())
    }

    #[test]
    fn test_collision_run_shifts_contiguous_block() -> Result<()> {
        let current = ordering_of(&[9, 4, 3, 2, 1]);
        let placed = place(draft(Some(2)), 10, &current, Utc::now())?;

        assert_eq!(placed.shifted, 3);
        assert_eq!(z_orders(&placed.ordering), vec![9, 5, 4, 3, 2, 1]);
        validate_ordering(&placed.ordering)
    }

    #[test]
    fn test_insert_into_gap_shifts_nothing() -> Result<()> {
        let current = ordering_of(&[10, 5, 1]);
        let placed = place(draft(Some(7)), 10, &current, Utc::now())?;
        assert_eq!(placed.shifted, 0);
        assert_eq!(z_orders(&placed.ordering), vec![10, 7, 5, 1]);
        Ok(())
    }

    #[test]
    fn test_collision_at_max_and_min() -> Result<()> {
        let current = ordering_of(&[5, 3, 1]);

        let top = place(draft(Some(5)), 10, &current, Utc::now())?;
        assert_eq!(z_orders(&top.ordering), vec![6, 5, 3, 1]);

        let bottom = place(draft(Some(1)), 10, &current, Utc::now())?;
        assert_eq!(z_orders(&bottom.ordering), vec![5, 3, 2, 1]);
        Ok(())
    }

    #[test]
    fn test_untouched_widgets_are_shared() -> Result<()> {
        let current = ordering_of(&[8, 4, 3, 1]);
        let placed = place(draft(Some(3)), 10, &current, Utc::now())?;

        assert!(Arc::ptr_eq(&placed.ordering[0], &current[0]));
        assert!(!Arc::ptr_eq(&placed.ordering[1], &current[1]));
        assert!(!Arc::ptr_eq(&placed.ordering[2], &current[2]));
        assert!(Arc::ptr_eq(&placed.ordering[4], &current[3]));
        // input is untouched
        assert_eq!(z_orders(&current), vec![8, 4, 3, 1]);
        Ok(())
    }

    #[test]
    fn test_overflow_is_reported() {
        let current = ordering_of(&[i32::MAX]);
        assert!(matches!(
            place(draft(None), 2, &current, Utc::now()),
            Err(Error::ZOrderOverflow)
        ));

        let current = ordering_of(&[i32::MAX, i32::MAX - 1]);
        assert!(matches!(
            place(draft(Some(i32::MAX - 1)), 3, &current, Utc::now()),
            Err(Error::ZOrderOverflow)
        ));
    }

    #[test]
    fn test_remove() {
        let current = ordering_of(&[5, 3, 1]);
        assert_eq!(z_orders(&remove(&current, 1)), vec![5, 1]);
        assert_eq!(z_orders(&remove(&current, 0)), vec![3, 1]);
        assert_eq!(z_orders(&remove(&current, 2)), vec![5, 3]);
    }

    #[test]
    fn test_validate_ordering() {
        assert!(validate_ordering(&ordering_of(&[5, 3, 1])).is_ok());
        assert!(validate_ordering(&[]).is_ok());
        assert!(matches!(
            validate_ordering(&ordering_of(&[5, 5, 1])),
            Err(Error::InvariantViolation(_))
        ));
        assert!(validate_ordering(&ordering_of(&[1, 3])).is_err());

        let mut dup = ordering_of(&[5, 3]);
        dup[1] = Arc::new(dup[0].shifted_to(3, Utc::now()));
        assert!(validate_ordering(&dup).is_err());
    }
}
