use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::schema::{self, COLUMNS, FITS_IN_AREA};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::geometry::Area;
use crate::query::{PageRequest, WidgetPage};
use crate::store::{Backend, WidgetStore};
use crate::widget::{Widget, WidgetDraft, WidgetId};

/// Widget store persisted in a SQLite database
pub struct SqliteStore {
    config: StoreConfig,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path, config: StoreConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::InvalidConfig(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened sqlite widget store");
        Self::with_connection(conn, config)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(config: StoreConfig) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, config)
    }

    fn with_connection(conn: Connection, config: StoreConfig) -> Result<Self> {
        schema::initialize(&conn)?;
        Ok(Self {
            config,
            conn: Mutex::new(conn),
        })
    }

    /// Runs `f` inside an IMMEDIATE transaction and commits on success.
    fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Runs `f` inside a read transaction so that every query sees the same
    /// database state.
    fn read<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn fetch(conn: &Connection, id: WidgetId) -> Result<Option<Widget>> {
    let Some(row_id) = schema::row_id(id) else {
        return Ok(None);
    };
    let widget = conn
        .query_row(
            &format!("SELECT {} FROM widgets WHERE id = ?1", COLUMNS),
            [row_id],
            schema::widget_from_row,
        )
        .optional()?;
    Ok(widget)
}

/// `max + 1`, or `1` for an empty table.
fn next_top(conn: &Connection) -> Result<i32> {
    let max: Option<i32> = conn.query_row("SELECT MAX(z_order) FROM widgets", [], |row| row.get(0))?;
    match max {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or(Error::ZOrderOverflow),
    }
}

/// Frees `claimed` by moving its holder and every widget packed directly
/// above it up by one, stopping at the first gap.
fn shift_collision_run(conn: &Connection, claimed: i32, now: DateTime<Utc>) -> Result<usize> {
    let run = {
        let mut stmt =
            conn.prepare("SELECT id, z_order FROM widgets WHERE z_order >= ?1 ORDER BY z_order ASC")?;
        let mut rows = stmt.query([claimed])?;

        let mut run = Vec::new();
        let mut occupied = claimed;
        while let Some(row) = rows.next()? {
            let (id, z_order): (i64, i32) = (row.get(0)?, row.get(1)?);
            if z_order != occupied {
                break;
            }
            occupied = occupied.checked_add(1).ok_or(Error::ZOrderOverflow)?;
            run.push((id, occupied));
        }
        run
    };

    // highest first, so every target value is already free
    for (id, z_order) in run.iter().rev() {
        tracing::trace!(id, to = z_order, "shifting widget");
        conn.execute(
            "UPDATE widgets SET z_order = ?1, last_modified = ?2 WHERE id = ?3",
            params![z_order, now, id],
        )?;
    }

    Ok(run.len())
}

/// Resolves the final z-order for `draft`, shifting collisions out of the way.
fn claim_z_order(conn: &Connection, draft: &WidgetDraft, now: DateTime<Utc>) -> Result<(i32, usize)> {
    match draft.z_order {
        None => Ok((next_top(conn)?, 0)),
        Some(z_order) => Ok((z_order, shift_collision_run(conn, z_order, now)?)),
    }
}

impl WidgetStore for SqliteStore {
    fn create(&self, draft: WidgetDraft) -> Result<Widget> {
        draft.validate()?;

        self.write(|tx| {
            let now = Utc::now();
            let (z_order, shifted) = claim_z_order(tx, &draft, now)?;
            tx.execute(
                "INSERT INTO widgets (z_order, x, y, width, height, last_modified) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![z_order, draft.x, draft.y, draft.width, draft.height, now],
            )?;
            let row_id = tx.last_insert_rowid();
            let id = WidgetId::try_from(row_id)
                .map_err(|_| Error::InvariantViolation(format!("negative row id {}", row_id)))?;

            tracing::debug!(id, z_order, shifted, "created widget");
            Ok(draft.into_widget(id, z_order, now))
        })
    }

    fn get(&self, id: WidgetId) -> Result<Option<Widget>> {
        fetch(&self.conn.lock(), id)
    }

    fn list(&self, request: PageRequest, area: Option<&Area>) -> Result<WidgetPage> {
        let limit = i64::try_from(request.size()).unwrap_or(i64::MAX);
        let offset = i64::try_from(request.offset()).unwrap_or(i64::MAX);

        self.read(|tx| {
            let (total, items) = match area {
                Some(area) => {
                    let bounds = (area.left_bottom.x, area.left_bottom.y, area.right_top.x, area.right_top.y);
                    let total: i64 = tx.query_row(
                        &format!("SELECT COUNT(*) FROM widgets WHERE {}", FITS_IN_AREA),
                        params![bounds.0, bounds.1, bounds.2, bounds.3],
                        |row| row.get(0),
                    )?;
                    let mut stmt = tx.prepare(&format!(
                        "SELECT {} FROM widgets WHERE {} ORDER BY z_order DESC LIMIT ?5 OFFSET ?6",
                        COLUMNS, FITS_IN_AREA
                    ))?;
                    let items = stmt
                        .query_map(
                            params![bounds.0, bounds.1, bounds.2, bounds.3, limit, offset],
                            schema::widget_from_row,
                        )?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    (total, items)
                }
                None => {
                    let total: i64 = tx.query_row("SELECT COUNT(*) FROM widgets", [], |row| row.get(0))?;
                    let mut stmt = tx.prepare(&format!(
                        "SELECT {} FROM widgets ORDER BY z_order DESC LIMIT ?1 OFFSET ?2",
                        COLUMNS
                    ))?;
                    let items = stmt
                        .query_map(params![limit, offset], schema::widget_from_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    (total, items)
                }
            };

            Ok(WidgetPage {
                total_count: total as u64,
                items,
            })
        })
    }

    fn count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM widgets", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_in_area(&self, area: &Area) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM widgets WHERE {}", FITS_IN_AREA),
            params![
                area.left_bottom.x,
                area.left_bottom.y,
                area.right_top.x,
                area.right_top.y
            ],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn update(&self, id: WidgetId, draft: WidgetDraft) -> Result<Widget> {
        draft.validate()?;

        self.write(|tx| {
            let stored = fetch(tx, id)?.ok_or(Error::NotFound(id))?;
            if stored.matches(&draft) {
                return Err(Error::validation("Nothing to update"));
            }
            let row_id = schema::row_id(id).ok_or(Error::NotFound(id))?;

            // take the row out so its old z-order cannot block the shift
            tx.execute("DELETE FROM widgets WHERE id = ?1", [row_id])?;

            let now = Utc::now();
            let (z_order, shifted) = claim_z_order(tx, &draft, now)?;
            tx.execute(
                "INSERT INTO widgets (id, z_order, x, y, width, height, last_modified) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![row_id, z_order, draft.x, draft.y, draft.width, draft.height, now],
            )?;

            tracing::debug!(id, z_order, shifted, "updated widget");
            Ok(draft.into_widget(id, z_order, now))
        })
    }

    fn delete(&self, id: WidgetId) -> Result<()> {
        let row_id = schema::row_id(id).ok_or(Error::NotFound(id))?;

        self.write(|tx| {
            if tx.execute("DELETE FROM widgets WHERE id = ?1", [row_id])? == 0 {
                return Err(Error::NotFound(id));
            }
            tracing::debug!(id, "deleted widget");
            Ok(())
        })
    }

    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn config(&self) -> &StoreConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use tempfile::TempDir;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory(StoreConfig::sqlite_in_memory()).expect("Failed to open store")
    }

    fn draft(z: i32) -> WidgetDraft {
        WidgetDraft::new(50, 50, 100, 100).z_order(z)
    }

    fn z_orders(store: &SqliteStore) -> Result<Vec<i32>> {
        let page = store.list(PageRequest::new(Some(0), Some(500))?, None)?;
        Ok(page.items.iter().map(|w| w.z_order).collect())
    }

    #[test]
    fn test_create_assigns_ids_and_top_z_order() -> Result<()> {
        let store = create_test_store();

        let first = store.create(WidgetDraft::new(0, 0, 10, 10))?;
        let second = store.create(WidgetDraft::new(0, 0, 10, 10))?;

        assert_eq!((first.id, first.z_order), (1, 1));
        assert_eq!((second.id, second.z_order), (2, 2));
        assert_eq!(store.get(second.id)?, Some(second));
        Ok(())
    }

    #[test]
    fn test_collision_shift_stops_at_gap() -> Result<()> {
        let store = create_test_store();
        let five = store.create(draft(5))?;
        let three = store.create(draft(3))?;
        store.create(draft(1))?;

        let new = store.create(draft(3))?;

        assert_eq!(new.z_order, 3);
        assert_eq!(store.get(three.id)?.map(|w| w.z_order), Some(4));
        assert_eq!(store.get(five.id)?.map(|w| w.z_order), Some(5));
        assert_eq!(z_orders(&store)?, vec![5, 4, 3, 1]);
        Ok(())
    }

    #[test]
    fn test_long_collision_run() -> Result<()> {
        let store = create_test_store();
        for z in [1, 2, 3, 4, 9] {
            store.create(draft(z))?;
        }

        store.create(draft(2))?;
        assert_eq!(z_orders(&store)?, vec![9, 5, 4, 3, 2, 1]);
        Ok(())
    }

    #[test]
    fn test_update_into_own_collision_run() -> Result<()> {
        let store = create_test_store();
        let a = store.create(draft(1))?;
        let b = store.create(draft(2))?;
        let c = store.create(draft(3))?;

        let updated = store.update(c.id, WidgetDraft::new(1, 1, 1, 1).z_order(1))?;

        assert_eq!(updated.id, c.id);
        assert_eq!(store.get(a.id)?.map(|w| w.z_order), Some(2));
        assert_eq!(store.get(b.id)?.map(|w| w.z_order), Some(3));
        assert_eq!(store.get(c.id)?.map(|w| (w.z_order, w.x)), Some((1, 1)));
        Ok(())
    }

    #[test]
    fn test_update_errors() -> Result<()> {
        let store = create_test_store();
        assert!(matches!(store.update(3, draft(1)), Err(Error::NotFound(3))));

        let widget = store.create(draft(1))?;
        assert!(matches!(
            store.update(widget.id, WidgetDraft::from(&widget)),
            Err(Error::Validation(_))
        ));
        assert_eq!(store.get(widget.id)?, Some(widget));
        Ok(())
    }

    #[test]
    fn test_delete() -> Result<()> {
        let store = create_test_store();
        let widget = store.create(draft(1))?;

        store.delete(widget.id)?;

        assert_eq!(store.get(widget.id)?, None);
        assert!(matches!(store.delete(widget.id), Err(Error::NotFound(_))));
        assert!(matches!(store.delete(u64::MAX), Err(Error::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_overflow_rolls_back() -> Result<()> {
        let store = create_test_store();
        store.create(draft(i32::MAX))?;
        store.create(draft(i32::MAX - 1))?;

        assert!(matches!(store.create(draft(i32::MAX - 1)), Err(Error::ZOrderOverflow)));
        assert!(matches!(
            store.create(WidgetDraft::new(0, 0, 1, 1)),
            Err(Error::ZOrderOverflow)
        ));

        assert_eq!(z_orders(&store)?, vec![i32::MAX, i32::MAX - 1]);
        assert_eq!(store.create(draft(0))?.id, 3);
        Ok(())
    }

    #[test]
    fn test_list_with_area_and_past_end() -> Result<()> {
        let store = create_test_store();
        store.create(WidgetDraft::new(25, 25, 50, 50))?;
        store.create(WidgetDraft::new(0, 0, 50, 50))?;
        store.create(WidgetDraft::new(75, 75, 51, 51))?;
        let area = Area::new(Point::new(0, 0), Point::new(100, 100));

        let page = store.list(PageRequest::default(), Some(&area))?;
        assert_eq!(page.total_count, 2);
        assert_eq!(page.items.iter().map(|w| w.x).collect::<Vec<_>>(), vec![75, 25]);
        assert_eq!(store.count_in_area(&area)?, 2);

        let past_end = store.list(PageRequest::new(Some(1), Some(10))?, None)?;
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_count, 3);
        Ok(())
    }

    #[test]
    fn test_ids_survive_reopen() -> Result<()> {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("widgets.db");

        {
            let store = SqliteStore::open(&path, StoreConfig::sqlite(&path))?;
            store.create(draft(1))?;
            let newest = store.create(draft(2))?;
            store.delete(newest.id)?;
        }

        let store = SqliteStore::open(&path, StoreConfig::sqlite(&path))?;
        assert_eq!(store.count()?, 1);
        assert_eq!(store.create(draft(5))?.id, 3);
        Ok(())
    }
}
