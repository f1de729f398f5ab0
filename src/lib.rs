//! Storage for rectangular, z-ordered widgets.
//!
//! Every stored widget has a unique `z_order`; inserting onto an occupied
//! value pushes the packed run above it up by one (see [`zorder`]). Two
//! backends implement [`WidgetStore`]: [`MemoryStore`], which serves reads
//! from atomically swapped snapshots without locking, and [`SqliteStore`],
//! which leaves isolation to SQLite transactions.

pub mod config;
pub mod error;
pub mod geometry;
pub mod query;
pub mod store;
pub mod widget;
pub mod zorder;

pub use config::{BackendConfig, StoreConfig};
pub use error::{Error, Result};
pub use geometry::{fits_in_area, Area, Point};
pub use query::{PageRequest, WidgetPage};
pub use store::{open, Backend, MemoryStore, SqliteStore, WidgetStore};
pub use widget::{Widget, WidgetDraft, WidgetId};
