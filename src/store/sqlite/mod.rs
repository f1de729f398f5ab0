//! SQLite-backed widget store.
//!
//! Offers the same contract as the in-memory store, but leaves isolation to
//! the database: every mutation runs in an `IMMEDIATE` transaction, SQLite's
//! serializable write mode, so concurrent writers queue on the database lock
//! and a failed mutation rolls back as a whole.
//!
//! - Ids come from `INTEGER PRIMARY KEY AUTOINCREMENT`, which never hands out
//!   an id twice, not even after deleting the newest row or reopening the file
//! - `z_order` carries a `UNIQUE` constraint; collision runs are rewritten
//!   highest first, so the constraint holds after every statement
//! - Listing, area filtering and counting run in SQL with the same truncating
//!   bounding-box arithmetic as the in-memory store

mod schema;
pub mod store;

pub use store::SqliteStore;
