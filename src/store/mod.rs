pub mod memory;
pub mod sqlite;

use crate::config::{BackendConfig, StoreConfig};
use crate::error::Result;
use crate::geometry::Area;
use crate::query::{PageRequest, WidgetPage};
use crate::widget::{Widget, WidgetDraft, WidgetId};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Sqlite,
}

/// Storage contract shared by every backend.
///
/// For every state a caller can observe, no two stored widgets share a
/// z-order, and ids are never changed or reused.
pub trait WidgetStore: Send + Sync {
    /// Stores a new widget, assigning its id and, if the draft has none, a
    /// z-order on top of every other widget.
    fn create(&self, draft: WidgetDraft) -> Result<Widget>;

    /// Retrieves the widget with the given id.
    fn get(&self, id: WidgetId) -> Result<Option<Widget>>;

    /// Returns one page of widgets in descending z-order, optionally limited
    /// to the widgets that fit `area`.
    fn list(&self, request: PageRequest, area: Option<&Area>) -> Result<WidgetPage>;

    fn count(&self) -> Result<u64>;

    fn count_in_area(&self, area: &Area) -> Result<u64>;

    /// Replaces every field but the id. Fails with `NotFound` for unknown ids
    /// and with `Validation` when nothing would change.
    fn update(&self, id: WidgetId, draft: WidgetDraft) -> Result<Widget>;

    fn delete(&self, id: WidgetId) -> Result<()>;

    fn backend(&self) -> Backend;

    fn config(&self) -> &StoreConfig;

    /// Validates listing parameters against this store's page limits.
    fn page_request(&self, page: Option<i64>, size: Option<i64>) -> Result<PageRequest> {
        let config = self.config();
        PageRequest::with_limits(page, size, config.default_page_size, config.max_page_size)
    }
}

/// Opens the backend selected by `config`.
pub fn open(config: StoreConfig) -> Result<Box<dyn WidgetStore>> {
    config.validate()?;

    let store: Box<dyn WidgetStore> = match config.backend.clone() {
        BackendConfig::Memory => Box::new(MemoryStore::new(config)),
        BackendConfig::Sqlite { path: Some(path) } => Box::new(SqliteStore::open(&path, config)?),
        BackendConfig::Sqlite { path: None } => Box::new(SqliteStore::open_in_memory(config)?),
    };

    tracing::info!(backend = ?store.backend(), "opened widget store");
    Ok(store)
}
