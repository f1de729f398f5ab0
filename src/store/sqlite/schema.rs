use rusqlite::{Connection, Row};

use crate::error::Result;
use crate::widget::{Widget, WidgetId};

/// Stored in `PRAGMA user_version`.
pub(super) const SCHEMA_VERSION: i32 = 1;

pub(super) const COLUMNS: &str = "id, z_order, x, y, width, height, last_modified";

/// Bounding box of a row inside the area bound to ?1..?4.
pub(super) const FITS_IN_AREA: &str = "x - width / 2 >= ?1 \
     AND y - height / 2 >= ?2 \
     AND x + width / 2 <= ?3 \
     AND y + height / 2 <= ?4";

pub(super) fn initialize(conn: &Connection) -> Result<()> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS widgets (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            z_order       INTEGER NOT NULL UNIQUE,
            x             INTEGER NOT NULL,
            y             INTEGER NOT NULL,
            width         INTEGER NOT NULL CHECK (width >= 1),
            height        INTEGER NOT NULL CHECK (height >= 1),
            last_modified TEXT NOT NULL
        );
        "#,
    )?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

    tracing::debug!(version = SCHEMA_VERSION, "initialized widget schema");
    Ok(())
}

/// Maps a row selected with [`COLUMNS`].
pub(super) fn widget_from_row(row: &Row<'_>) -> rusqlite::Result<Widget> {
    let id: i64 = row.get(0)?;
    Ok(Widget {
        id: WidgetId::try_from(id).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, id))?,
        z_order: row.get(1)?,
        x: row.get(2)?,
        y: row.get(3)?,
        width: row.get(4)?,
        height: row.get(5)?,
        last_modified: row.get(6)?,
    })
}

/// Row id for `id`, or `None` if no row can carry it.
pub(super) fn row_id(id: WidgetId) -> Option<i64> {
    i64::try_from(id).ok()
}
