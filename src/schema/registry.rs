use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::core::{LifecycleError, RegistryError, TableSchema, ValidationError};
use crate::storage::catalog::{self, TableEntry};

/// Resolves logical table names to schemas stored in the catalog
pub struct SchemaRegistry<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaRegistry<'a> {
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn exists(&self, table: &str) -> Result<bool, RegistryError> {
        Ok(catalog::table_exists(self.conn, table)?)
    }

    pub fn entry(&self, table: &str) -> Result<TableEntry, RegistryError> {
        catalog::get_table(self.conn, table)?
            .ok_or_else(|| RegistryError::UnknownTable(table.to_string()))
    }

    pub fn load(&self, table: &str) -> Result<TableSchema, RegistryError> {
        let entry = self.entry(table)?;
        TableSchema::from_json(&entry.table_schema).map_err(|source| RegistryError::CorruptSchema {
            table: table.to_string(),
            source,
        })
    }

    /// Load every named schema; fails on the first unknown table
    pub fn resolve<S: AsRef<str>>(&self, tables: &[S]) -> Result<BTreeMap<String, TableSchema>, RegistryError> {
        let mut resolved = BTreeMap::new();
        for table in tables {
            let name = table.as_ref();
            if !resolved.contains_key(name) {
                resolved.insert(name.to_string(), self.load(name)?);
            }
        }
        Ok(resolved)
    }

    /// Every parent table of `schema` must already exist
    pub fn check_parent_tables(&self, schema: &TableSchema) -> Result<(), LifecycleError> {
        for parent in &schema.parent_tables {
            if !self.exists(&parent.table)? {
                return Err(ValidationError::UnknownParentTable(parent.table.clone()).into());
            }
        }
        Ok(())
    }

    pub fn list_tables(&self) -> Result<Vec<TableEntry>, RegistryError> {
        catalog::list_tables(self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldDescription, FieldType, ParentTable};

    fn registry_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        catalog::ensure_catalog(&conn).unwrap();

        let mut schema = TableSchema::new();
        schema.add_field("Title", FieldDescription::new(FieldType::String)).unwrap();
        catalog::put_table(
            &conn,
            &TableEntry {
                main_table: "Books".to_string(),
                template_id: None,
                field_tables: vec![],
                field_helper_tables: vec![],
                table_schema: schema.to_json().unwrap(),
            },
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_resolve_known_tables() {
        let conn = registry_conn();
        let registry = SchemaRegistry::new(&conn);
        let resolved = registry.resolve(&["Books", "Books"]).unwrap();
        assert_eq!(resolved.len(), 1);
        assert!(resolved["Books"].contains("Title"));
    }

    #[test]
    fn test_unknown_table() {
        let conn = registry_conn();
        let registry = SchemaRegistry::new(&conn);
        assert!(matches!(
            registry.resolve(&["Books", "Films"]),
            Err(RegistryError::UnknownTable(name)) if name == "Films"
        ));
    }

    #[test]
    fn test_corrupt_schema() {
        let conn = registry_conn();
        conn.execute("UPDATE cargo_tables SET table_schema = 'garbage'", []).unwrap();
        let registry = SchemaRegistry::new(&conn);
        assert!(matches!(registry.load("Books"), Err(RegistryError::CorruptSchema { .. })));
    }

    #[test]
    fn test_parent_tables_must_exist() {
        let conn = registry_conn();
        let registry = SchemaRegistry::new(&conn);

        let mut schema = TableSchema::new();
        schema.parent_tables.push(ParentTable::new("Books"));
        assert!(registry.check_parent_tables(&schema).is_ok());

        schema.parent_tables.push(ParentTable::new("Series"));
        assert!(matches!(
            registry.check_parent_tables(&schema),
            Err(LifecycleError::Validation(ValidationError::UnknownParentTable(name))) if name == "Series"
        ));
    }

    #[test]
    fn test_parent_check_reports_catalog_errors() {
        let conn = registry_conn();
        conn.execute("DROP TABLE cargo_tables", []).unwrap();
        let mut schema = TableSchema::new();
        schema.parent_tables.push(ParentTable::new("Books"));
        assert!(matches!(
            SchemaRegistry::new(&conn).check_parent_tables(&schema),
            Err(LifecycleError::Registry(RegistryError::Database(_)))
        ));
    }
}
