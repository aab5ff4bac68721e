/// Physical layout of a Cargo table
///
/// Logical `Books` with list field `Authors`, hierarchy field `Category`
/// and a File field maps to:
///   Books                   main table
///   Books__Authors          list helper (_rowID, _value, _position)
///   Books__Category__hierarchy  nested set (_value, _left, _right)
///   Books___files           file helper
/// Physical names add the configured prefix.

use crate::config::Settings;
use crate::core::{FieldDescription, FieldType, TableSchema};

/// Suffix of the replacement table set
pub const REPLACEMENT_SUFFIX: &str = "__NEXT";

/// Double-quoted SQL identifier
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[must_use]
pub fn replacement_name(table: &str) -> String {
    format!("{table}{REPLACEMENT_SUFFIX}")
}

#[must_use]
pub fn is_replacement_name(table: &str) -> bool {
    table.ends_with(REPLACEMENT_SUFFIX)
}

#[must_use]
pub fn list_table_name(table: &str, field: &str) -> String {
    format!("{table}__{field}")
}

#[must_use]
pub fn hierarchy_table_name(table: &str, field: &str) -> String {
    format!("{table}__{field}__hierarchy")
}

#[must_use]
pub fn files_table_name(table: &str) -> String {
    format!("{table}___files")
}

/// Main-table column holding the combined text of a list or coordinates field
#[must_use]
pub fn full_column(field: &str) -> String {
    format!("{field}__full")
}

#[must_use]
pub fn precision_column(field: &str) -> String {
    format!("{field}__precision")
}

/// Whether a field is stored in a `__full` column rather than a plain one
#[must_use]
pub fn uses_full_column(desc: &FieldDescription) -> bool {
    desc.is_list || desc.field_type == FieldType::Coordinates
}

/// Column name + SQL type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
}

impl ColumnDef {
    fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }

    fn to_sql(&self) -> String {
        format!("{} {}", quote_ident(&self.name), self.sql_type)
    }
}

/// Logical tables of one Cargo table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub main: String,
    /// (field, helper table)
    pub list_tables: Vec<(String, String)>,
    /// (field, helper table)
    pub hierarchy_tables: Vec<(String, String)>,
    pub files_table: Option<String>,
}

impl TableLayout {
    #[must_use]
    pub fn new(table: &str, schema: &TableSchema) -> Self {
        let mut list_tables = Vec::new();
        let mut hierarchy_tables = Vec::new();
        for (name, desc) in schema.fields() {
            if desc.is_list {
                list_tables.push((name.to_string(), list_table_name(table, name)));
            }
            if desc.is_hierarchy {
                hierarchy_tables.push((name.to_string(), hierarchy_table_name(table, name)));
            }
        }
        Self {
            main: table.to_string(),
            list_tables,
            hierarchy_tables,
            files_table: schema.has_files().then(|| files_table_name(table)),
        }
    }

    #[must_use]
    pub fn field_tables(&self) -> Vec<String> {
        self.list_tables.iter().map(|(_, t)| t.clone()).collect()
    }

    #[must_use]
    pub fn field_helper_tables(&self) -> Vec<String> {
        self.hierarchy_tables
            .iter()
            .map(|(_, t)| t.clone())
            .chain(self.files_table.clone())
            .collect()
    }

    /// Main table first, then every helper
    #[must_use]
    pub fn all_tables(&self) -> Vec<String> {
        let mut all = vec![self.main.clone()];
        all.extend(self.field_tables());
        all.extend(self.field_helper_tables());
        all
    }

    #[must_use]
    pub fn list_table(&self, field: &str) -> Option<&str> {
        self.list_tables
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, t)| t.as_str())
    }

    #[must_use]
    pub fn hierarchy_table(&self, field: &str) -> Option<&str> {
        self.hierarchy_tables
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, t)| t.as_str())
    }
}

/// Column type of one value of a field (scalar column or helper `_value`)
fn value_type(desc: &FieldDescription, settings: &Settings) -> String {
    desc.field_type
        .sql_type(desc.field_size(settings.default_string_bytes))
}

pub fn main_table_columns(schema: &TableSchema, settings: &Settings) -> Vec<ColumnDef> {
    let page_type = format!("VARCHAR({})", settings.default_string_bytes);
    let mut columns = vec![
        ColumnDef::new("_ID", "INTEGER NOT NULL UNIQUE"),
        ColumnDef::new("_pageName", format!("{page_type} NOT NULL")),
        ColumnDef::new("_pageTitle", format!("{page_type} NOT NULL")),
        ColumnDef::new("_pageNamespace", "INTEGER NOT NULL"),
        ColumnDef::new("_pageID", "INTEGER NOT NULL"),
    ];

    for (name, desc) in schema.fields() {
        if desc.is_list {
            columns.push(ColumnDef::new(full_column(name), "TEXT"));
        } else if desc.field_type == FieldType::Coordinates {
            columns.push(ColumnDef::new(full_column(name), "TEXT"));
            columns.push(ColumnDef::new(format!("{name}__lat"), "REAL"));
            columns.push(ColumnDef::new(format!("{name}__lon"), "REAL"));
        } else {
            columns.push(ColumnDef::new(name, value_type(desc, settings)));
            if desc.is_date_or_datetime() {
                columns.push(ColumnDef::new(precision_column(name), "INTEGER"));
            }
        }
    }
    columns
}

pub fn list_table_columns(desc: &FieldDescription, settings: &Settings) -> Vec<ColumnDef> {
    let mut columns = vec![
        ColumnDef::new("_rowID", "INTEGER NOT NULL"),
        ColumnDef::new("_value", value_type(desc, settings)),
        ColumnDef::new("_position", "INTEGER NOT NULL"),
    ];
    if desc.field_type == FieldType::Coordinates {
        columns.push(ColumnDef::new("_lat", "REAL"));
        columns.push(ColumnDef::new("_lon", "REAL"));
    }
    if desc.is_date_or_datetime() {
        columns.push(ColumnDef::new("_value__precision", "INTEGER"));
    }
    columns
}

pub fn hierarchy_table_columns(desc: &FieldDescription, settings: &Settings) -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("_value", value_type(desc, settings)),
        ColumnDef::new("_left", "INTEGER NOT NULL"),
        ColumnDef::new("_right", "INTEGER NOT NULL"),
    ]
}

pub fn files_table_columns(settings: &Settings) -> Vec<ColumnDef> {
    let name_type = format!("VARCHAR({})", settings.default_string_bytes);
    vec![
        ColumnDef::new("_pageName", name_type.clone()),
        ColumnDef::new("_pageID", "INTEGER NOT NULL"),
        ColumnDef::new("_fieldName", name_type.clone()),
        ColumnDef::new("_fileName", name_type),
    ]
}

#[must_use]
pub fn create_table_sql(physical: &str, columns: &[ColumnDef]) -> String {
    let cols: Vec<String> = columns.iter().map(ColumnDef::to_sql).collect();
    format!("CREATE TABLE {} ({})", quote_ident(physical), cols.join(", "))
}

/// CREATE TABLE statements for the main table and every helper
pub fn create_statements(layout: &TableLayout, schema: &TableSchema, settings: &Settings) -> Vec<String> {
    let physical = |logical: &str| format!("{}{logical}", settings.table_prefix);

    let mut statements = vec![create_table_sql(
        &physical(&layout.main),
        &main_table_columns(schema, settings),
    )];
    for (field, table) in &layout.list_tables {
        if let Some(desc) = schema.field(field) {
            statements.push(create_table_sql(&physical(table), &list_table_columns(desc, settings)));
        }
    }
    for (field, table) in &layout.hierarchy_tables {
        if let Some(desc) = schema.field(field) {
            statements.push(create_table_sql(
                &physical(table),
                &hierarchy_table_columns(desc, settings),
            ));
        }
    }
    if let Some(files) = &layout.files_table {
        statements.push(create_table_sql(&physical(files), &files_table_columns(settings)));
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableDeclaration;

    fn books() -> TableSchema {
        TableDeclaration::parse(
            "_table=Books|Authors=List (,) of String|Cover=File|Published=Date|Location=Coordinates\
             |Category=String (hierarchy;allowed values=*Fiction\n**Fantasy)",
        )
        .unwrap()
        .schema
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("Books"), "\"Books\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_layout_names() {
        let layout = TableLayout::new("Books", &books());
        assert_eq!(layout.field_tables(), vec!["Books__Authors"]);
        assert_eq!(
            layout.field_helper_tables(),
            vec!["Books__Category__hierarchy", "Books___files"]
        );
        assert_eq!(layout.list_table("Authors"), Some("Books__Authors"));

        let next = TableLayout::new(&replacement_name("Books"), &books());
        assert_eq!(next.field_tables(), vec!["Books__NEXT__Authors"]);
        assert!(is_replacement_name(&next.main));
    }

    #[test]
    fn test_main_table_columns() {
        let settings = Settings::default();
        let names: Vec<String> = main_table_columns(&books(), &settings)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "_ID", "_pageName", "_pageTitle", "_pageNamespace", "_pageID",
                "Authors__full", "Cover", "Published", "Published__precision",
                "Location__full", "Location__lat", "Location__lon", "Category",
            ]
        );
    }

    #[test]
    fn test_create_statements_use_prefix() {
        let settings = Settings::default();
        let schema = books();
        let layout = TableLayout::new("Books", &schema);
        let statements = create_statements(&layout, &schema, &settings);
        assert_eq!(statements.len(), 4);
        assert!(statements[0].starts_with("CREATE TABLE \"cargo__Books\" (\"_ID\" INTEGER NOT NULL UNIQUE"));
        assert!(statements[1].contains("\"cargo__Books__Authors\""));
        assert!(statements[1].contains("\"_value\" VARCHAR(300)"));
    }
}
