use std::sync::Arc;

use chrono::Utc;

use super::{metrics, MemoryState, Snapshot, StoreStats};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::geometry::Area;
use crate::query::{self, PageRequest, WidgetPage};
use crate::store::{Backend, WidgetStore};
use crate::widget::{Widget, WidgetDraft, WidgetId};
use crate::zorder;

/// Widget store holding copy-on-write snapshots in memory
pub struct MemoryStore {
    config: StoreConfig,
    pub(crate) state: Arc<MemoryState>,
}

impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            state: Arc::new(MemoryState::new()),
        }
    }

    /// Pins the current snapshot, e.g. to serve several reads from one view.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.state.load()
    }

    /// Collect and log metrics
    pub fn collect_metrics(&self) -> StoreStats {
        metrics::collect_metrics(&self.state)
    }

    /// Validates the published state and returns the statistics of that
    /// same state.
    pub fn status(&self) -> Result<StoreStats> {
        let guard = self.state.write_lock.lock();
        let snapshot = self.state.load();
        if let Err(e) = self.state.validate_snapshot(&guard, &snapshot) {
            tracing::error!(error = %e, "widget store failed consistency check");
            return Err(e);
        }
        let stats = metrics::snapshot_metrics(&snapshot, self.state.peek_next_id(&guard));
        drop(guard);

        if stats.widgets > 0 && stats.snapshot_version == 0 {
            tracing::warn!(widgets = stats.widgets, "widgets present without a publish");
        }
        Ok(stats)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::memory())
    }
}

impl WidgetStore for MemoryStore {
    fn create(&self, draft: WidgetDraft) -> Result<Widget> {
        draft.validate()?;

        let guard = self.state.write_lock.lock();
        let current = self.state.load();
        let id = self.state.peek_next_id(&guard);

        let placement = zorder::place(draft, id, &current.widgets, Utc::now())?;
        let version = self.state.publish(
            &guard,
            placement.ordering,
            placement.position,
            None,
            self.config.verify_invariants,
        )?;
        self.state.commit_id(&guard, id);

        tracing::debug!(
            id,
            z_order = placement.widget.z_order,
            shifted = placement.shifted,
            version,
            "created widget"
        );
        Ok(Widget::clone(&placement.widget))
    }

    fn get(&self, id: WidgetId) -> Result<Option<Widget>> {
        Ok(self.state.find(id).map(|widget| Widget::clone(&widget)))
    }

    fn list(&self, request: PageRequest, area: Option<&Area>) -> Result<WidgetPage> {
        let snapshot = self.state.load();
        Ok(query::paginate(&snapshot.widgets, request, area))
    }

    fn count(&self) -> Result<u64> {
        Ok(self.state.load().len() as u64)
    }

    fn count_in_area(&self, area: &Area) -> Result<u64> {
        let snapshot = self.state.load();
        Ok(query::count_in_area(&snapshot.widgets, area) as u64)
    }

    fn update(&self, id: WidgetId, draft: WidgetDraft) -> Result<Widget> {
        draft.validate()?;

        let guard = self.state.write_lock.lock();
        let current = self.state.load();

        let position = self
            .state
            .locate(&current, id)
            .ok_or(Error::NotFound(id))?;
        if current.widgets[position].matches(&draft) {
            return Err(Error::validation("Nothing to update"));
        }

        let remaining = zorder::remove(&current.widgets, position);
        let placement = zorder::place(draft, id, &remaining, Utc::now())?;
        let version = self.state.publish(
            &guard,
            placement.ordering,
            position.min(placement.position),
            None,
            self.config.verify_invariants,
        )?;

        tracing::debug!(
            id,
            z_order = placement.widget.z_order,
            shifted = placement.shifted,
            version,
            "updated widget"
        );
        Ok(Widget::clone(&placement.widget))
    }

    fn delete(&self, id: WidgetId) -> Result<()> {
        let guard = self.state.write_lock.lock();
        let current = self.state.load();

        let position = self
            .state
            .locate(&current, id)
            .ok_or(Error::NotFound(id))?;
        let remaining = zorder::remove(&current.widgets, position);
        let version = self.state.publish(
            &guard,
            remaining,
            position,
            Some(id),
            self.config.verify_invariants,
        )?;

        tracing::debug!(id, version, "deleted widget");
        Ok(())
    }

    fn backend(&self) -> Backend {
        Backend::Memory
    }

    fn config(&self) -> &StoreConfig {
        &self.config
    }
}
