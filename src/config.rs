use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Which storage backend a [`StoreConfig`] opens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Copy-on-write snapshots held in process memory.
    Memory,
    /// SQLite database file. `None` opens a private in-memory database.
    Sqlite { path: Option<PathBuf> },
}

/// Configuration for a widget store
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend to open (default: memory)
    pub backend: BackendConfig,

    /// Re-check z-order uniqueness before every publish (default: debug builds only)
    pub verify_invariants: bool,

    /// Page size used when a listing does not ask for one (default: 10)
    pub default_page_size: usize,

    /// Largest page size a listing may ask for (default: 500)
    pub max_page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Memory,
            verify_invariants: cfg!(debug_assertions),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl StoreConfig {
    /// In-memory snapshot store
    pub fn memory() -> Self {
        Self::default()
    }

    /// SQLite store backed by the file at `path`
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendConfig::Sqlite {
                path: Some(path.into()),
            },
            ..Default::default()
        }
    }

    /// SQLite store backed by a private in-memory database
    pub fn sqlite_in_memory() -> Self {
        Self {
            backend: BackendConfig::Sqlite { path: None },
            ..Default::default()
        }
    }

    pub fn verify_invariants(mut self, enabled: bool) -> Self {
        self.verify_invariants = enabled;
        self
    }

    pub fn default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(Error::InvalidConfig(
                "page sizes must be positive".to_string(),
            ));
        }
        if self.default_page_size > self.max_page_size {
            return Err(Error::InvalidConfig(format!(
                "default page size {} exceeds max page size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }
}
