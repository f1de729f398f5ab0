use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use arc_swap::ArcSwap;
use crossbeam_skiplist::SkipMap;
use parking_lot::{FairMutex, FairMutexGuard};

use crate::error::{Error, Result};
use crate::widget::{Widget, WidgetId};
use crate::zorder;

/// Snapshot reloads a lock-free lookup tries before scanning.
pub const STALE_RETRIES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Found(usize),
    Absent,
    Stale,
}

/// Immutable point-in-time view of every stored widget.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Widgets sorted by strictly descending z-order.
    pub widgets: Vec<Arc<Widget>>,
    /// Number of publishes that led to this snapshot.
    pub version: u64,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    fn holds(&self, position: usize, id: WidgetId) -> bool {
        self.widgets.get(position).is_some_and(|w| w.id == id)
    }
}

/// Shared state of the in-memory store.
///
/// `snapshot` and `index` are only modified while `write_lock` is held.
pub struct MemoryState {
    pub snapshot: ArcSwap<Snapshot>,
    pub index: SkipMap<WidgetId, usize>,
    pub next_id: AtomicU64,
    pub write_lock: FairMutex<()>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            index: SkipMap::new(),
            next_id: AtomicU64::new(1),
            write_lock: FairMutex::new(()),
        }
    }

    /// Current snapshot. The returned `Arc` keeps it alive after later
    /// publishes.
    pub fn load(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Slot of `id` in `snapshot`, if present.
    ///
    /// Falls back to a scan when the index has moved on past `snapshot`.
    /// Writers look up the published snapshot under the lock, where the
    /// index hint is always exact.
    pub fn locate(&self, snapshot: &Snapshot, id: WidgetId) -> Option<usize> {
        match self.lookup_hint(snapshot, id) {
            Lookup::Found(position) => Some(position),
            Lookup::Absent => None,
            Lookup::Stale => snapshot.widgets.iter().position(|w| w.id == id),
        }
    }

    /// Latest published widget with `id`, without taking the write lock.
    ///
    /// A stale hint means a writer re-indexed for a snapshot newer than the
    /// one loaded, so the lookup reloads instead of scanning. Only a writer
    /// stalled between re-indexing and its swap for [`STALE_RETRIES`]
    /// reloads makes it scan.
    pub fn find(&self, id: WidgetId) -> Option<Arc<Widget>> {
        let mut snapshot = self.load();
        for _ in 0..STALE_RETRIES {
            match self.lookup_hint(&snapshot, id) {
                Lookup::Found(position) => return Some(Arc::clone(&snapshot.widgets[position])),
                Lookup::Absent => return None,
                Lookup::Stale => {
                    std::hint::spin_loop();
                    snapshot = self.load();
                }
            }
        }
        tracing::trace!(id, version = snapshot.version, "index hint stale, scanning snapshot");
        snapshot.widgets.iter().find(|w| w.id == id).cloned()
    }

    fn lookup_hint(&self, snapshot: &Snapshot, id: WidgetId) -> Lookup {
        let Some(entry) = self.index.get(&id) else {
            return Lookup::Absent;
        };
        let hint = *entry.value();
        // a single publish moves shifted widgets by one slot at most
        (hint.saturating_sub(1)..=hint.saturating_add(1))
            .find(|&position| snapshot.holds(position, id))
            .map_or(Lookup::Stale, Lookup::Found)
    }

    /// Id the next create will receive. Only meaningful under the write lock.
    pub fn peek_next_id(&self, _guard: &FairMutexGuard<'_, ()>) -> WidgetId {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Marks `id` as used once its create has been published.
    pub fn commit_id(&self, _guard: &FairMutexGuard<'_, ()>, id: WidgetId) {
        self.next_id.store(id + 1, Ordering::SeqCst);
    }

    /// Publishes `widgets` as the next snapshot.
    ///
    /// Slots from `reindex_from` on are re-inserted into the index before the
    /// swap; `removed` leaves the index after it. With `verify` set, the
    /// ordering is checked first and nothing is published if it is broken.
    pub fn publish(
        &self,
        _guard: &FairMutexGuard<'_, ()>,
        widgets: Vec<Arc<Widget>>,
        reindex_from: usize,
        removed: Option<WidgetId>,
        verify: bool,
    ) -> Result<u64> {
        if verify {
            zorder::validate_ordering(&widgets)?;
        }

        let version = self.snapshot.load().version + 1;

        for (position, widget) in widgets.iter().enumerate().skip(reindex_from) {
            self.index.insert(widget.id, position);
        }

        self.snapshot.store(Arc::new(Snapshot { widgets, version }));

        if let Some(id) = removed {
            self.index.remove(&id);
        }

        Ok(version)
    }

    /// Checks the published snapshot against the index.
    pub fn validate_consistency(&self) -> Result<()> {
        let guard = self.write_lock.lock();
        self.validate_snapshot(&guard, &self.load())
    }

    /// Checks `snapshot`, which must be the one published, against the index
    /// and the id counter.
    pub fn validate_snapshot(&self, guard: &FairMutexGuard<'_, ()>, snapshot: &Snapshot) -> Result<()> {
        zorder::validate_ordering(&snapshot.widgets)?;

        if self.index.len() != snapshot.len() {
            return Err(Error::InvariantViolation(format!(
                "index holds {} ids but snapshot holds {} widgets",
                self.index.len(),
                snapshot.len()
            )));
        }

        for entry in self.index.iter() {
            if !snapshot.holds(*entry.value(), *entry.key()) {
                return Err(Error::InvariantViolation(format!(
                    "index maps widget {} to slot {} which holds another widget",
                    entry.key(),
                    entry.value()
                )));
            }
        }

        let next_id = self.peek_next_id(guard);
        if let Some(widget) = snapshot.widgets.iter().find(|w| w.id >= next_id) {
            return Err(Error::InvariantViolation(format!(
                "widget {} is not below the next id {}",
                widget.id, next_id
            )));
        }

        Ok(())
    }
}

impl Default for MemoryState {
    fn default() -> Self {
        Self::new()
    }
}
