/// Catalog relations
///
/// - `cargo_tables`: table registry (logical name -> serialized schema and helper tables)
/// - `cargo_pages`: page membership (page id <-> table name)
/// - `cargo_declarations`: declared schema per template

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::RegistryError;

const CATALOG_DDL: &str = "
CREATE TABLE IF NOT EXISTS cargo_tables (
    main_table TEXT PRIMARY KEY NOT NULL,
    template_id INTEGER,
    field_tables TEXT NOT NULL DEFAULT '[]',
    field_helper_tables TEXT NOT NULL DEFAULT '[]',
    table_schema TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS cargo_pages (
    page_id INTEGER NOT NULL,
    table_name TEXT NOT NULL,
    PRIMARY KEY (page_id, table_name)
);
CREATE TABLE IF NOT EXISTS cargo_declarations (
    template_id INTEGER PRIMARY KEY NOT NULL,
    main_table TEXT NOT NULL,
    table_schema TEXT NOT NULL
);
";

/// Row of `cargo_tables`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub main_table: String,
    pub template_id: Option<i64>,
    /// List-field helper tables (logical names)
    pub field_tables: Vec<String>,
    /// Hierarchy and file helper tables (logical names)
    pub field_helper_tables: Vec<String>,
    pub table_schema: String,
}

impl TableEntry {
    /// Every logical table of the entry, main table first
    #[must_use]
    pub fn all_tables(&self) -> Vec<&str> {
        std::iter::once(self.main_table.as_str())
            .chain(self.field_tables.iter().map(String::as_str))
            .chain(self.field_helper_tables.iter().map(String::as_str))
            .collect()
    }
}

/// Declared schema of a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationEntry {
    pub template_id: i64,
    pub main_table: String,
    pub table_schema: String,
}

pub fn ensure_catalog(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CATALOG_DDL)
}

fn decode_list(table: &str, json: &str) -> Result<Vec<String>, RegistryError> {
    serde_json::from_str(json).map_err(|source| RegistryError::CorruptSchema {
        table: table.to_string(),
        source,
    })
}

fn encode_list(list: &[String]) -> String {
    serde_json::Value::from(list.to_vec()).to_string()
}

type RawEntry = (String, Option<i64>, String, String, String);

fn raw_entry(row: &Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode_entry(raw: RawEntry) -> Result<TableEntry, RegistryError> {
    let (main_table, template_id, field_tables, helper_tables, table_schema) = raw;
    Ok(TableEntry {
        field_tables: decode_list(&main_table, &field_tables)?,
        field_helper_tables: decode_list(&main_table, &helper_tables)?,
        main_table,
        template_id,
        table_schema,
    })
}

pub fn get_table(conn: &Connection, name: &str) -> Result<Option<TableEntry>, RegistryError> {
    let raw = conn
        .query_row(
            "SELECT main_table, template_id, field_tables, field_helper_tables, table_schema
             FROM cargo_tables WHERE main_table = ?1",
            params![name],
            raw_entry,
        )
        .optional()?;
    raw.map(decode_entry).transpose()
}

pub fn list_tables(conn: &Connection) -> Result<Vec<TableEntry>, RegistryError> {
    let mut stmt = conn.prepare(
        "SELECT main_table, template_id, field_tables, field_helper_tables, table_schema
         FROM cargo_tables ORDER BY main_table",
    )?;
    let raws = stmt
        .query_map([], raw_entry)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(decode_entry).collect()
}

pub fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM cargo_tables WHERE main_table = ?1)",
        params![name],
        |row| row.get(0),
    )
}

pub fn put_table(conn: &Connection, entry: &TableEntry) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO cargo_tables
         (main_table, template_id, field_tables, field_helper_tables, table_schema)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.main_table,
            entry.template_id,
            encode_list(&entry.field_tables),
            encode_list(&entry.field_helper_tables),
            entry.table_schema,
        ],
    )?;
    Ok(())
}

pub fn remove_table(conn: &Connection, name: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM cargo_tables WHERE main_table = ?1", params![name])
}

/// Record that a page stored rows into a table
pub fn record_page(conn: &Connection, page_id: i64, table: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO cargo_pages (page_id, table_name) VALUES (?1, ?2)",
        params![page_id, table],
    )?;
    Ok(())
}

pub fn page_tables(conn: &Connection, page_id: i64) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT table_name FROM cargo_pages WHERE page_id = ?1 ORDER BY table_name")?;
    let rows = stmt.query_map(params![page_id], |row| row.get(0))?;
    rows.collect()
}

pub fn remove_page(conn: &Connection, page_id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM cargo_pages WHERE page_id = ?1", params![page_id])
}

pub fn remove_table_pages(conn: &Connection, table: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM cargo_pages WHERE table_name = ?1", params![table])
}

/// Point membership rows of `from` at `to`, dropping the old rows of `to`
pub fn move_table_pages(conn: &Connection, from: &str, to: &str) -> rusqlite::Result<()> {
    remove_table_pages(conn, to)?;
    conn.execute(
        "UPDATE cargo_pages SET table_name = ?2 WHERE table_name = ?1",
        params![from, to],
    )?;
    Ok(())
}

pub fn put_declaration(conn: &Connection, entry: &DeclarationEntry) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO cargo_declarations (template_id, main_table, table_schema)
         VALUES (?1, ?2, ?3)",
        params![entry.template_id, entry.main_table, entry.table_schema],
    )?;
    Ok(())
}

pub fn get_declaration(conn: &Connection, template_id: i64) -> rusqlite::Result<Option<DeclarationEntry>> {
    conn.query_row(
        "SELECT template_id, main_table, table_schema FROM cargo_declarations WHERE template_id = ?1",
        params![template_id],
        |row| {
            Ok(DeclarationEntry {
                template_id: row.get(0)?,
                main_table: row.get(1)?,
                table_schema: row.get(2)?,
            })
        },
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        ensure_catalog(&conn).unwrap();
        conn
    }

    fn entry(name: &str) -> TableEntry {
        TableEntry {
            main_table: name.to_string(),
            template_id: Some(3),
            field_tables: vec![format!("{name}__Authors")],
            field_helper_tables: vec![],
            table_schema: "{}".to_string(),
        }
    }

    #[test]
    fn test_table_registry() {
        let conn = conn();
        put_table(&conn, &entry("Books")).unwrap();
        assert!(table_exists(&conn, "Books").unwrap());
        assert!(!table_exists(&conn, "Films").unwrap());

        let loaded = get_table(&conn, "Books").unwrap().unwrap();
        assert_eq!(loaded, entry("Books"));
        assert_eq!(loaded.all_tables(), vec!["Books", "Books__Authors"]);

        assert_eq!(remove_table(&conn, "Books").unwrap(), 1);
        assert!(get_table(&conn, "Books").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_helper_list() {
        let conn = conn();
        conn.execute(
            "INSERT INTO cargo_tables (main_table, field_tables, table_schema) VALUES ('X', 'not json', '{}')",
            [],
        )
        .unwrap();
        assert!(matches!(get_table(&conn, "X"), Err(RegistryError::CorruptSchema { .. })));
    }

    #[test]
    fn test_page_membership() {
        let conn = conn();
        record_page(&conn, 1, "Books").unwrap();
        record_page(&conn, 1, "Books").unwrap();
        record_page(&conn, 1, "Books__NEXT").unwrap();
        assert_eq!(page_tables(&conn, 1).unwrap(), vec!["Books", "Books__NEXT"]);

        move_table_pages(&conn, "Books__NEXT", "Books").unwrap();
        assert_eq!(page_tables(&conn, 1).unwrap(), vec!["Books"]);

        remove_page(&conn, 1).unwrap();
        assert!(page_tables(&conn, 1).unwrap().is_empty());
    }

    #[test]
    fn test_declarations() {
        let conn = conn();
        let decl = DeclarationEntry {
            template_id: 9,
            main_table: "Books".to_string(),
            table_schema: "{}".to_string(),
        };
        put_declaration(&conn, &decl).unwrap();
        assert_eq!(get_declaration(&conn, 9).unwrap(), Some(decl));
        assert_eq!(get_declaration(&conn, 10).unwrap(), None);
    }
}
