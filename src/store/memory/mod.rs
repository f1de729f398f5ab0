//! In-memory widget store built on copy-on-write snapshots.
//!
//! All widgets live in one immutable sequence sorted by descending z-order
//! (the snapshot). Writers never modify a published snapshot: they build a
//! replacement and swap it in atomically. Readers load the current snapshot
//! once and answer the whole call from it.
//!
//! ```text
//!   writers ──► FairMutex ──► zorder::place ──► new Vec<Arc<Widget>>
//!                                                      │
//!                                                      ▼
//!   readers ─────────────── ArcSwap<Snapshot> ◄── atomic store
//!      │
//!      └──► SkipMap<WidgetId, usize>  (id → slot hint)
//! ```
//!
//! # Write Path
//! 1. **Lock**: the single `FairMutex` hands the writer slot over in FIFO
//!    order, so no writer starves
//! 2. **Place**: the z-order engine builds the next sequence, sharing every
//!    untouched `Arc<Widget>` with the current one
//! 3. **Index**: slots that moved are re-inserted into the id index
//! 4. **Publish**: the snapshot is swapped in with one atomic store; ids of
//!    deleted widgets leave the index afterwards
//!
//! # Read Path
//! - `list` and `count` work on one loaded snapshot and never take the lock
//! - `get` asks the index for a slot and checks that slot and its neighbours
//!   in the loaded snapshot for the requested id. A miss means the index
//!   is ahead of that snapshot, so the lookup reloads the newest one. Only a
//!   writer stalled between steps 3 and 4 pushes it to scan the snapshot
//!
//! Every write copies the handle sequence once. This favours reads, which
//! never allocate beyond the returned widgets and never wait on a writer.

pub mod metrics;
pub mod state;
pub mod store;

pub use metrics::StoreStats;
pub use state::{MemoryState, Snapshot};
pub use store::MemoryStore;
