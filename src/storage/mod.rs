// SQLite catalog and physical table layout
pub mod catalog;
pub mod layout;

pub use catalog::{DeclarationEntry, TableEntry};
pub use layout::{quote_ident, replacement_name, TableLayout, REPLACEMENT_SUFFIX};

use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Open (or create) a database file and make sure the catalog exists
pub fn open_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    catalog::ensure_catalog(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    catalog::ensure_catalog(&conn)?;
    Ok(conn)
}

/// Whether a physical table exists in the SQLite schema
pub fn physical_table_exists(conn: &Connection, physical: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [physical],
        |row| row.get(0),
    )
}
