/// Field storage: one store call writes one row (plus helper rows) for a page
///
/// Steps, all in one IMMEDIATE transaction:
/// 1. prepare values (type coercion, allowed values, regex, mandatory, unique, size)
/// 2. skip the insert if the page already has an identical row
/// 3. take `MAX(_ID) + 1` as the new row ID
/// 4. insert the main row, list helper rows and file rows
/// 5. record page membership

use std::collections::BTreeMap;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::config::Settings;
use crate::core::{
    Coordinates, FieldDescription, FieldType, PageIdentity, PreparedValue, StorageError,
    StoreContext, StoreOrigin, TableSchema, Value,
};
use crate::schema::SchemaRegistry;
use crate::storage::{catalog, physical_table_exists};
use crate::storage::layout::{full_column, precision_column, quote_ident, replacement_name, TableLayout};

/// Result of a store call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Inserted { row_id: i64 },
    /// The page already has a row with these values
    Duplicate,
    /// The table is not provisioned, or the context excludes it
    Skipped,
}

/// One field after preparation
struct PreparedField<'s> {
    name: &'s str,
    desc: &'s FieldDescription,
    value: PreparedValue,
    /// Elements of a list field
    elements: Vec<PreparedValue>,
}

impl PreparedField<'_> {
    fn is_blank(&self) -> bool {
        self.value.is_blank()
    }

    fn blank(&mut self) {
        self.value = PreparedValue::blank();
        self.elements.clear();
    }
}

pub struct StorageEngine;

impl StorageEngine {
    /// Store field values for a page into a Cargo table.
    ///
    /// Fields missing from the schema are ignored. When a `__NEXT`
    /// replacement exists, a batch recreation writes only to it and a page
    /// save writes to both the live table and the replacement.
    pub fn store<K, V>(
        conn: &mut Connection,
        settings: &Settings,
        ctx: &StoreContext,
        page: &PageIdentity,
        table_name: &str,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<StoreOutcome, StorageError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        if !ctx.accepts(table_name) {
            log::debug!("Skipping store into '{table_name}': batch recreation of another table");
            return Ok(StoreOutcome::Skipped);
        }
        let values: BTreeMap<String, String> =
            values.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

        let next_name = replacement_name(table_name);
        let (live_exists, next_exists) = {
            let registry = SchemaRegistry::new(conn);
            (registry.exists(table_name)?, registry.exists(&next_name)?)
        };

        let targets: Vec<&str> = match (&ctx.origin, live_exists, next_exists) {
            (StoreOrigin::BatchRecreate(_), _, true) => vec![next_name.as_str()],
            (StoreOrigin::PageSave, true, true) => vec![table_name, next_name.as_str()],
            (_, _, true) => vec![next_name.as_str()],
            (_, true, false) => vec![table_name],
            (_, false, false) => {
                log::info!("Table '{table_name}' is not provisioned yet, store skipped");
                return Ok(StoreOutcome::Skipped);
            }
        };

        // Live table and replacement commit or roll back together
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut outcome = StoreOutcome::Skipped;
        for (i, target) in targets.iter().enumerate() {
            let schema = SchemaRegistry::new(&tx).load(target)?;
            let result = Self::store_target(&tx, settings, page, target, &schema, &values)?;
            if i == 0 {
                outcome = result;
            }
        }
        tx.commit()?;
        Ok(outcome)
    }

    /// Store into `table_name` using an already resolved schema
    pub fn store_with_schema(
        conn: &mut Connection,
        settings: &Settings,
        page: &PageIdentity,
        table_name: &str,
        schema: &TableSchema,
        values: &BTreeMap<String, String>,
    ) -> Result<StoreOutcome, StorageError> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = Self::store_target(&tx, settings, page, table_name, schema, values)?;
        tx.commit()?;
        Ok(outcome)
    }

    fn store_target(
        tx: &Transaction<'_>,
        settings: &Settings,
        page: &PageIdentity,
        table_name: &str,
        schema: &TableSchema,
        values: &BTreeMap<String, String>,
    ) -> Result<StoreOutcome, StorageError> {
        for key in values.keys() {
            if !schema.contains(key) {
                log::debug!("Ignoring value for unknown field '{key}' of table '{table_name}'");
            }
        }
        if !physical_table_exists(tx, &physical(settings, table_name))? {
            log::info!("Table '{table_name}' has no physical storage, store skipped");
            return Ok(StoreOutcome::Skipped);
        }
        Self::insert_row(tx, settings, page, table_name, schema, values)
    }

    fn insert_row(
        tx: &Transaction<'_>,
        settings: &Settings,
        page: &PageIdentity,
        table_name: &str,
        schema: &TableSchema,
        values: &BTreeMap<String, String>,
    ) -> Result<StoreOutcome, StorageError> {
        let main = physical(settings, table_name);
        let fields = Self::prepare_fields(tx, settings, page, &main, schema, values)?;

        // Main-table columns and values, in schema order
        let mut columns: Vec<String> = Vec::new();
        let mut row: Vec<Value> = Vec::new();
        for field in &fields {
            for (column, value) in main_columns(field) {
                columns.push(column);
                row.push(value);
            }
        }

        if let Some(existing) = Self::find_duplicate(tx, settings, &main, page, schema, &columns, &row)? {
            log::debug!(
                "Page '{}' already has identical row {existing} in '{table_name}', insert skipped",
                page.name
            );
            return Ok(StoreOutcome::Duplicate);
        }

        let row_id: i64 = tx.query_row(
            &format!("SELECT COALESCE(MAX(\"_ID\"), 0) + 1 FROM {}", quote_ident(&main)),
            [],
            |r| r.get(0),
        )?;

        let mut all_columns = vec![
            "_ID".to_string(),
            "_pageName".to_string(),
            "_pageTitle".to_string(),
            "_pageNamespace".to_string(),
            "_pageID".to_string(),
        ];
        all_columns.extend(columns);
        let mut all_values = vec![
            Value::Integer(row_id),
            Value::Text(page.name.clone()),
            Value::Text(page.title.clone()),
            Value::Integer(page.namespace),
            Value::Integer(page.id),
        ];
        all_values.extend(row);

        let placeholders = vec!["?"; all_columns.len()].join(", ");
        let quoted: Vec<String> = all_columns.iter().map(|c| quote_ident(c)).collect();
        tx.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders})",
                quote_ident(&main),
                quoted.join(", ")
            ),
            params_from_iter(all_values.iter()),
        )?;

        let layout = TableLayout::new(table_name, schema);
        for field in fields.iter().filter(|f| f.desc.is_list && !f.is_blank()) {
            if let Some(helper) = layout.list_table(field.name) {
                Self::insert_list_rows(tx, settings, helper, row_id, field)?;
            }
        }
        if let Some(files) = &layout.files_table {
            Self::insert_file_rows(tx, settings, files, page, &fields)?;
        }

        catalog::record_page(tx, page.id, table_name)?;
        log::debug!("Stored row {row_id} for page '{}' in '{table_name}'", page.name);
        Ok(StoreOutcome::Inserted { row_id })
    }

    fn prepare_fields<'s>(
        tx: &Transaction<'_>,
        settings: &Settings,
        page: &PageIdentity,
        main: &str,
        schema: &'s TableSchema,
        values: &BTreeMap<String, String>,
    ) -> Result<Vec<PreparedField<'s>>, StorageError> {
        let mut prepared = Vec::with_capacity(schema.len());

        for (name, desc) in schema.fields() {
            let raw = values.get(name).map_or("", |v| v.trim());
            let mut field = PreparedField {
                name,
                desc,
                value: desc.prepare_and_validate_value(raw, settings),
                elements: if desc.is_list { desc.prepare_list(raw, settings) } else { Vec::new() },
            };

            if !field.is_blank() && !desc.matches_regex(raw) {
                log::warn!("Value '{raw}' of field '{name}' does not match its regex, stored as blank");
                field.blank();
            }
            if desc.is_mandatory && field.is_blank() {
                return Err(StorageError::MandatoryBlank(name.to_string()));
            }

            if let Some(size) = desc.field_size(settings.default_string_bytes) {
                if let Some(v) = field.value.value.as_mut() {
                    if !desc.is_list {
                        truncate_bytes(v, size);
                    }
                }
                for element in &mut field.elements {
                    if let Some(v) = element.value.as_mut() {
                        truncate_bytes(v, size);
                    }
                }
            }

            if desc.is_unique && !field.is_blank() {
                let taken = Self::value_taken(tx, main, name, desc, &field.value, page.id)?;
                if taken {
                    let value = field.value.value.clone().unwrap_or_default();
                    if desc.is_mandatory {
                        return Err(StorageError::MandatoryNotUnique {
                            field: name.to_string(),
                            value,
                        });
                    }
                    log::warn!("Value '{value}' of unique field '{name}' exists on another page, stored as blank");
                    field.blank();
                }
            }

            prepared.push(field);
        }
        Ok(prepared)
    }

    /// Whether another page already stored this value for a unique field
    fn value_taken(
        tx: &Transaction<'_>,
        main: &str,
        name: &str,
        desc: &FieldDescription,
        value: &PreparedValue,
        page_id: i64,
    ) -> Result<bool, StorageError> {
        let column = if desc.is_list || desc.field_type == FieldType::Coordinates {
            full_column(name)
        } else {
            name.to_string()
        };
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1 AND \"_pageID\" <> ?2)",
            quote_ident(main),
            quote_ident(&column)
        );
        let typed = typed_value(desc, value.value.as_deref());
        Ok(tx.query_row(&sql, params![typed, page_id], |r| r.get(0))?)
    }

    /// `_ID` of an identical row already stored for this page
    fn find_duplicate(
        tx: &Transaction<'_>,
        settings: &Settings,
        main: &str,
        page: &PageIdentity,
        schema: &TableSchema,
        columns: &[String],
        row: &[Value],
    ) -> Result<Option<i64>, StorageError> {
        let mut conditions = vec!["\"_pageID\" = ?".to_string()];
        let mut bound: Vec<&Value> = Vec::new();
        let page_id = Value::Integer(page.id);
        bound.push(&page_id);

        for (column, value) in columns.iter().zip(row) {
            let long_text = schema
                .field(column)
                .is_some_and(|d| d.field_type.is_long_text());
            if long_text {
                let n = settings.text_compare_chars;
                conditions.push(format!(
                    "substr({}, 1, {n}) IS substr(?, 1, {n})",
                    quote_ident(column)
                ));
            } else {
                conditions.push(format!("{} IS ?", quote_ident(column)));
            }
            bound.push(value);
        }

        let sql = format!(
            "SELECT \"_ID\" FROM {} WHERE {} LIMIT 1",
            quote_ident(main),
            conditions.join(" AND ")
        );
        Ok(tx
            .query_row(&sql, params_from_iter(bound), |r| r.get(0))
            .optional()?)
    }

    fn insert_list_rows(
        tx: &Transaction<'_>,
        settings: &Settings,
        helper: &str,
        row_id: i64,
        field: &PreparedField<'_>,
    ) -> Result<(), StorageError> {
        let desc = field.desc;
        let mut columns = vec!["_rowID", "_value", "_position"];
        if desc.field_type == FieldType::Coordinates {
            columns.extend(["_lat", "_lon"]);
        }
        if desc.is_date_or_datetime() {
            columns.push("_value__precision");
        }
        let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&physical(settings, helper)),
            quoted.join(", "),
            vec!["?"; columns.len()].join(", ")
        );
        let mut stmt = tx.prepare(&sql)?;

        for (position, element) in field.elements.iter().enumerate() {
            let text = element.value.as_deref();
            let mut row = vec![
                Value::Integer(row_id),
                typed_value(desc, text),
                Value::Integer(position as i64 + 1),
            ];
            if desc.field_type == FieldType::Coordinates {
                let point = text.and_then(Coordinates::parse);
                row.push(point.map_or(Value::Null, |c| Value::Real(c.lat)));
                row.push(point.map_or(Value::Null, |c| Value::Real(c.lon)));
            }
            if desc.is_date_or_datetime() {
                row.push(
                    element
                        .precision
                        .map_or(Value::Null, |p| Value::Integer(p.code())),
                );
            }
            stmt.execute(params_from_iter(row.iter()))?;
        }
        Ok(())
    }

    fn insert_file_rows(
        tx: &Transaction<'_>,
        settings: &Settings,
        files: &str,
        page: &PageIdentity,
        fields: &[PreparedField<'_>],
    ) -> Result<(), StorageError> {
        let sql = format!(
            "INSERT INTO {} (\"_pageName\", \"_pageID\", \"_fieldName\", \"_fileName\") VALUES (?1, ?2, ?3, ?4)",
            quote_ident(&physical(settings, files))
        );
        let mut stmt = tx.prepare(&sql)?;

        for field in fields.iter().filter(|f| f.desc.field_type == FieldType::File && !f.is_blank()) {
            let names: Vec<&str> = if field.desc.is_list {
                field.elements.iter().filter_map(|e| e.value.as_deref()).collect()
            } else {
                field.value.value.as_deref().into_iter().collect()
            };
            for file_name in names {
                stmt.execute(params![page.name, page.id, field.name, file_name])?;
            }
        }
        Ok(())
    }

    /// Remove every row a page stored, in all tables it is recorded for.
    /// Returns the number of main-table rows deleted.
    pub fn delete_page(
        conn: &mut Connection,
        settings: &Settings,
        page_id: i64,
    ) -> Result<usize, StorageError> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut deleted = 0;

        for table in catalog::page_tables(&tx, page_id)? {
            let Some(entry) = catalog::get_table(&tx, &table)? else {
                continue;
            };
            let schema = SchemaRegistry::new(&tx).load(&table)?;
            let layout = TableLayout::new(&table, &schema);
            let main = quote_ident(&physical(settings, &entry.main_table));

            for (_, helper) in &layout.list_tables {
                tx.execute(
                    &format!(
                        "DELETE FROM {} WHERE \"_rowID\" IN (SELECT \"_ID\" FROM {main} WHERE \"_pageID\" = ?1)",
                        quote_ident(&physical(settings, helper))
                    ),
                    params![page_id],
                )?;
            }
            if let Some(files) = &layout.files_table {
                tx.execute(
                    &format!(
                        "DELETE FROM {} WHERE \"_pageID\" = ?1",
                        quote_ident(&physical(settings, files))
                    ),
                    params![page_id],
                )?;
            }
            deleted += tx.execute(&format!("DELETE FROM {main} WHERE \"_pageID\" = ?1"), params![page_id])?;
        }

        catalog::remove_page(&tx, page_id)?;
        tx.commit()?;
        log::debug!("Deleted {deleted} row(s) of page {page_id}");
        Ok(deleted)
    }
}

fn physical(settings: &Settings, logical: &str) -> String {
    format!("{}{logical}", settings.table_prefix)
}

/// Main-table (column, value) pairs of one prepared field
fn main_columns(field: &PreparedField<'_>) -> Vec<(String, Value)> {
    let desc = field.desc;
    let text = field.value.value.as_deref();

    if desc.is_list {
        return vec![(full_column(field.name), text.map_or(Value::Null, |t| Value::Text(t.to_string())))];
    }
    if desc.field_type == FieldType::Coordinates {
        let point = text.and_then(Coordinates::parse);
        return vec![
            (full_column(field.name), text.map_or(Value::Null, |t| Value::Text(t.to_string()))),
            (format!("{}__lat", field.name), point.map_or(Value::Null, |c| Value::Real(c.lat))),
            (format!("{}__lon", field.name), point.map_or(Value::Null, |c| Value::Real(c.lon))),
        ];
    }

    let mut columns = vec![(field.name.to_string(), typed_value(desc, text))];
    if desc.is_date_or_datetime() {
        columns.push((
            precision_column(field.name),
            field
                .value
                .precision
                .map_or(Value::Null, |p| Value::Integer(p.code())),
        ));
    }
    columns
}

/// SQL value of one prepared scalar
fn typed_value(desc: &FieldDescription, text: Option<&str>) -> Value {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return Value::Null;
    };
    match desc.field_type {
        FieldType::Integer | FieldType::Boolean => text
            .parse::<i64>()
            .map_or_else(|_| Value::Text(text.to_string()), Value::Integer),
        FieldType::Float | FieldType::Rating => text
            .parse::<f64>()
            .map_or_else(|_| Value::Text(text.to_string()), Value::Real),
        _ => Value::Text(text.to_string()),
    }
}

/// Cut a string to at most `max` bytes on a character boundary
fn truncate_bytes(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TableLifecycleManager;
    use crate::schema::TableDeclaration;
    use crate::storage::open_in_memory;

    fn setup(declaration: &str) -> (Connection, Settings) {
        let mut conn = open_in_memory().unwrap();
        let settings = Settings::default();
        let decl = TableDeclaration::parse(declaration).unwrap();
        TableLifecycleManager::create_or_replace(&mut conn, &settings, &decl.table_name, &decl.schema, None)
            .unwrap();
        (conn, settings)
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_store_list_values() {
        let (mut conn, settings) = setup("_table=Books|Authors=List (,) of String|Year=Integer");
        let page = PageIdentity::main(1, "Lorem Ipsum");
        let outcome = StorageEngine::store(
            &mut conn,
            &settings,
            &StoreContext::page_save(),
            &page,
            "Books",
            [("Authors", "John Doe, ,Jane Miller,"), ("Year", "1,999")],
        )
        .unwrap();
        assert_eq!(outcome, StoreOutcome::Inserted { row_id: 1 });

        let values: Vec<(String, i64)> = conn
            .prepare("SELECT _value, _position FROM \"cargo__Books__Authors\" ORDER BY _position")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(values, vec![("John Doe".to_string(), 1), ("Jane Miller".to_string(), 2)]);

        let (full, year): (String, i64) = conn
            .query_row("SELECT Authors__full, Year FROM \"cargo__Books\"", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(full, "John Doe,Jane Miller");
        assert_eq!(year, 1999);
        assert_eq!(catalog::page_tables(&conn, 1).unwrap(), vec!["Books"]);
    }

    #[test]
    fn test_store_is_idempotent() {
        let (mut conn, settings) = setup("_table=Books|Title=String|Summary=Text");
        let page = PageIdentity::main(1, "Lorem Ipsum");
        let values = [("Title", "Lorem"), ("Summary", "A long text")];
        let ctx = StoreContext::page_save();

        let first = StorageEngine::store(&mut conn, &settings, &ctx, &page, "Books", values).unwrap();
        let second = StorageEngine::store(&mut conn, &settings, &ctx, &page, "Books", values).unwrap();
        assert_eq!(first, StoreOutcome::Inserted { row_id: 1 });
        assert_eq!(second, StoreOutcome::Duplicate);
        assert_eq!(count(&conn, "cargo__Books"), 1);
    }

    #[test]
    fn test_mandatory_blank_rejects_row() {
        let (mut conn, settings) = setup("_table=Books|Title=String (mandatory)|Year=Integer");
        let page = PageIdentity::main(1, "Lorem Ipsum");
        let result = StorageEngine::store(
            &mut conn,
            &settings,
            &StoreContext::page_save(),
            &page,
            "Books",
            [("Title", "  "), ("Year", "2000")],
        );
        assert!(matches!(result, Err(StorageError::MandatoryBlank(f)) if f == "Title"));
        assert_eq!(count(&conn, "cargo__Books"), 0);
    }

    #[test]
    fn test_unique_values() {
        let (mut conn, settings) = setup("_table=Books|Isbn=String (unique)|Code=String (unique;mandatory)");
        let ctx = StoreContext::page_save();
        StorageEngine::store(&mut conn, &settings, &ctx, &PageIdentity::main(1, "A"), "Books", [("Isbn", "123"), ("Code", "x")])
            .unwrap();

        // Same ISBN on another page: kept, but blanked
        StorageEngine::store(&mut conn, &settings, &ctx, &PageIdentity::main(2, "B"), "Books", [("Isbn", "123"), ("Code", "y")])
            .unwrap();
        let isbn: Option<String> = conn
            .query_row("SELECT Isbn FROM \"cargo__Books\" WHERE _pageID = 2", [], |r| r.get(0))
            .unwrap();
        assert_eq!(isbn, None);

        // Mandatory unique conflict: rejected
        let result = StorageEngine::store(
            &mut conn,
            &settings,
            &ctx,
            &PageIdentity::main(3, "C"),
            "Books",
            [("Isbn", "456"), ("Code", "x")],
        );
        assert!(matches!(result, Err(StorageError::MandatoryNotUnique { .. })));

        // Same page again with the same value is not a conflict
        let again = StorageEngine::store(&mut conn, &settings, &ctx, &PageIdentity::main(1, "A"), "Books", [("Isbn", "123"), ("Code", "x")])
            .unwrap();
        assert_eq!(again, StoreOutcome::Duplicate);
    }

    #[test]
    fn test_regex_and_size() {
        let (mut conn, settings) = setup("_table=Books|Code=String (regex=[A-Z]{3})|Short=String (size=4)");
        StorageEngine::store(
            &mut conn,
            &settings,
            &StoreContext::page_save(),
            &PageIdentity::main(1, "A"),
            "Books",
            [("Code", "abc"), ("Short", "abcdefgh")],
        )
        .unwrap();
        let (code, short): (Option<String>, String) = conn
            .query_row("SELECT Code, Short FROM \"cargo__Books\"", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(code, None);
        assert_eq!(short, "abcd");
    }

    #[test]
    fn test_dates_coordinates_and_files() {
        let (mut conn, settings) =
            setup("_table=Events|Held=Date|Place=Coordinates|Posters=List (;) of File");
        StorageEngine::store(
            &mut conn,
            &settings,
            &StoreContext::page_save(),
            &PageIdentity::main(4, "Fair"),
            "Events",
            [("Held", "2020-06"), ("Place", "40.5, -74.25"), ("Posters", "File:A.png; b.png")],
        )
        .unwrap();

        let (held, precision, lat): (String, i64, f64) = conn
            .query_row(
                "SELECT Held, Held__precision, Place__lat FROM \"cargo__Events\"",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(held, "2020-06-01");
        assert_eq!(precision, 2);
        assert!((lat - 40.5).abs() < 1e-9);

        let files: Vec<String> = conn
            .prepare("SELECT _fileName FROM \"cargo__Events___files\" ORDER BY _fileName")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(files, vec!["A.png", "B.png"]);
    }

    #[test]
    fn test_unprovisioned_table_is_skipped() {
        let mut conn = open_in_memory().unwrap();
        let outcome = StorageEngine::store(
            &mut conn,
            &Settings::default(),
            &StoreContext::page_save(),
            &PageIdentity::main(1, "A"),
            "Nowhere",
            [("Title", "x")],
        )
        .unwrap();
        assert_eq!(outcome, StoreOutcome::Skipped);
    }

    #[test]
    fn test_missing_physical_table_is_skipped() {
        let (mut conn, settings) = setup("_table=Books|Title=String");
        conn.execute("DROP TABLE \"cargo__Books\"", []).unwrap();
        let outcome = StorageEngine::store(
            &mut conn,
            &settings,
            &StoreContext::page_save(),
            &PageIdentity::main(1, "A"),
            "Books",
            [("Title", "x")],
        )
        .unwrap();
        assert_eq!(outcome, StoreOutcome::Skipped);
    }

    #[test]
    fn test_replacement_failure_rolls_back_live_row() {
        let mut conn = open_in_memory().unwrap();
        let settings = Settings::default();
        let live = TableDeclaration::parse("_table=Books|Title=String|Year=Integer").unwrap();
        TableLifecycleManager::declare(&conn, 1, &live).unwrap();
        TableLifecycleManager::recreate_for_template(&mut conn, &settings, 1, false).unwrap();

        let stricter = TableDeclaration::parse("_table=Books|Title=String (mandatory)|Year=Integer").unwrap();
        TableLifecycleManager::declare(&conn, 1, &stricter).unwrap();
        TableLifecycleManager::recreate_for_template(&mut conn, &settings, 1, true).unwrap();

        let result = StorageEngine::store(
            &mut conn,
            &settings,
            &StoreContext::page_save(),
            &PageIdentity::main(1, "Untitled"),
            "Books",
            [("Year", "2001")],
        );
        assert!(matches!(result, Err(StorageError::MandatoryBlank(f)) if f == "Title"));
        assert_eq!(count(&conn, "cargo__Books"), 0);
        assert_eq!(count(&conn, "cargo__Books__NEXT"), 0);

        // Both tables receive a valid row
        StorageEngine::store(
            &mut conn,
            &settings,
            &StoreContext::page_save(),
            &PageIdentity::main(1, "Titled"),
            "Books",
            [("Title", "T"), ("Year", "2001")],
        )
        .unwrap();
        assert_eq!(count(&conn, "cargo__Books"), 1);
        assert_eq!(count(&conn, "cargo__Books__NEXT"), 1);
    }

    #[test]
    fn test_batch_context_filters_tables() {
        let (mut conn, settings) = setup("_table=Books|Title=String");
        let outcome = StorageEngine::store(
            &mut conn,
            &settings,
            &StoreContext::batch_recreate("Authors"),
            &PageIdentity::main(1, "A"),
            "Books",
            [("Title", "x")],
        )
        .unwrap();
        assert_eq!(outcome, StoreOutcome::Skipped);
        assert_eq!(count(&conn, "cargo__Books"), 0);
    }

    #[test]
    fn test_delete_page() {
        let (mut conn, settings) = setup("_table=Books|Authors=List of String");
        let ctx = StoreContext::page_save();
        StorageEngine::store(&mut conn, &settings, &ctx, &PageIdentity::main(1, "A"), "Books", [("Authors", "x,y")]).unwrap();
        StorageEngine::store(&mut conn, &settings, &ctx, &PageIdentity::main(2, "B"), "Books", [("Authors", "z")]).unwrap();

        assert_eq!(StorageEngine::delete_page(&mut conn, &settings, 1).unwrap(), 1);
        assert_eq!(count(&conn, "cargo__Books"), 1);
        assert_eq!(count(&conn, "cargo__Books__Authors"), 1);
        assert!(catalog::page_tables(&conn, 1).unwrap().is_empty());
    }

    #[test]
    fn test_truncate_bytes_on_char_boundary() {
        let mut s = "héllo".to_string();
        truncate_bytes(&mut s, 2);
        assert_eq!(s, "h");
    }
}
