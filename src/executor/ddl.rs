/// Table lifecycle: declare, create, recreate into a replacement, switch, delete
///
/// Every operation runs in one transaction, so readers never see a
/// half-created or half-renamed table set.

use rusqlite::{params, Connection, Transaction};

use crate::config::Settings;
use crate::core::{LifecycleError, RegistryError, TableSchema};
use crate::schema::{SchemaRegistry, TableDeclaration};
use crate::storage::catalog::{self, DeclarationEntry, TableEntry};
use crate::storage::layout::{self, quote_ident, replacement_name, TableLayout};

pub struct TableLifecycleManager;

impl TableLifecycleManager {
    /// Record the schema a template declares. Parent tables must exist.
    pub fn declare(
        conn: &Connection,
        template_id: i64,
        declaration: &TableDeclaration,
    ) -> Result<(), LifecycleError> {
        SchemaRegistry::new(conn).check_parent_tables(&declaration.schema)?;
        catalog::put_declaration(
            conn,
            &DeclarationEntry {
                template_id,
                main_table: declaration.table_name.clone(),
                table_schema: declaration.schema.to_json()?,
            },
        )?;
        log::info!(
            "Template {template_id} declares table '{}' ({} fields)",
            declaration.table_name,
            declaration.schema.len()
        );
        Ok(())
    }

    /// Drop whatever exists under `table_name` and create it from `schema`
    pub fn create_or_replace(
        conn: &mut Connection,
        settings: &Settings,
        table_name: &str,
        schema: &TableSchema,
        template_id: Option<i64>,
    ) -> Result<(), LifecycleError> {
        let tx = conn.transaction()?;
        Self::drop_table_set(&tx, settings, table_name)?;

        let table_layout = TableLayout::new(table_name, schema);
        for statement in layout::create_statements(&table_layout, schema, settings) {
            log::debug!("{statement}");
            tx.execute(&statement, [])?;
        }
        Self::fill_hierarchy_tables(&tx, settings, &table_layout, schema)?;

        catalog::put_table(
            &tx,
            &TableEntry {
                main_table: table_name.to_string(),
                template_id,
                field_tables: table_layout.field_tables(),
                field_helper_tables: table_layout.field_helper_tables(),
                table_schema: schema.to_json()?,
            },
        )?;
        tx.commit()?;

        log::info!(
            "Created table '{table_name}' with {} helper table(s)",
            table_layout.all_tables().len() - 1
        );
        Ok(())
    }

    /// Rebuild the table a template declares, either in place or as a
    /// `__NEXT` replacement. Returns the logical name that was created.
    pub fn recreate_for_template(
        conn: &mut Connection,
        settings: &Settings,
        template_id: i64,
        as_replacement: bool,
    ) -> Result<String, LifecycleError> {
        let declaration = catalog::get_declaration(conn, template_id)?
            .ok_or(LifecycleError::NoDeclaration(template_id))?;
        let schema = TableSchema::from_json(&declaration.table_schema)?;

        let target = if as_replacement {
            replacement_name(&declaration.main_table)
        } else {
            declaration.main_table.clone()
        };
        Self::create_or_replace(conn, settings, &target, &schema, Some(template_id))?;
        Ok(target)
    }

    /// Drop the live table set and rename the `__NEXT` set into its place
    pub fn switch_in_replacement(
        conn: &mut Connection,
        settings: &Settings,
        table_name: &str,
    ) -> Result<(), LifecycleError> {
        let next_name = replacement_name(table_name);
        let tx = conn.transaction()?;

        let next = catalog::get_table(&tx, &next_name)?
            .ok_or_else(|| LifecycleError::NoReplacement(table_name.to_string()))?;
        let schema = TableSchema::from_json(&next.table_schema)?;

        Self::drop_table_set(&tx, settings, table_name)?;

        let from = TableLayout::new(&next_name, &schema);
        let to = TableLayout::new(table_name, &schema);
        for (old, new) in from.all_tables().iter().zip(to.all_tables().iter()) {
            let sql = format!(
                "ALTER TABLE {} RENAME TO {}",
                quote_ident(&format!("{}{old}", settings.table_prefix)),
                quote_ident(&format!("{}{new}", settings.table_prefix)),
            );
            log::debug!("{sql}");
            tx.execute(&sql, [])?;
        }

        catalog::remove_table(&tx, &next_name)?;
        catalog::put_table(
            &tx,
            &TableEntry {
                main_table: table_name.to_string(),
                template_id: next.template_id,
                field_tables: to.field_tables(),
                field_helper_tables: to.field_helper_tables(),
                table_schema: next.table_schema,
            },
        )?;
        catalog::move_table_pages(&tx, &next_name, table_name)?;
        tx.commit()?;

        log::info!("Switched in replacement for table '{table_name}'");
        Ok(())
    }

    /// Drop a `__NEXT` set without switching it in
    pub fn discard_replacement(
        conn: &mut Connection,
        settings: &Settings,
        table_name: &str,
    ) -> Result<(), LifecycleError> {
        let next_name = replacement_name(table_name);
        if !catalog::table_exists(conn, &next_name)? {
            return Err(LifecycleError::NoReplacement(table_name.to_string()));
        }
        Self::delete_table(conn, settings, &next_name)
    }

    /// Drop a table with its helpers, catalog row and page membership
    pub fn delete_table(
        conn: &mut Connection,
        settings: &Settings,
        table_name: &str,
    ) -> Result<(), LifecycleError> {
        let tx = conn.transaction()?;
        if !catalog::table_exists(&tx, table_name)? {
            return Err(RegistryError::UnknownTable(table_name.to_string()).into());
        }
        Self::drop_table_set(&tx, settings, table_name)?;
        tx.commit()?;

        log::info!("Deleted table '{table_name}'");
        Ok(())
    }

    /// Drop every physical table of a catalog entry plus its catalog rows.
    /// No-op when the table is not in the catalog.
    fn drop_table_set(
        tx: &Transaction<'_>,
        settings: &Settings,
        table_name: &str,
    ) -> Result<(), LifecycleError> {
        let Some(entry) = catalog::get_table(tx, table_name)? else {
            return Ok(());
        };
        for table in entry.all_tables() {
            let sql = format!(
                "DROP TABLE IF EXISTS {}",
                quote_ident(&format!("{}{table}", settings.table_prefix))
            );
            log::debug!("{sql}");
            tx.execute(&sql, [])?;
        }
        catalog::remove_table(tx, table_name)?;
        catalog::remove_table_pages(tx, table_name)?;
        Ok(())
    }

    fn fill_hierarchy_tables(
        tx: &Transaction<'_>,
        settings: &Settings,
        table_layout: &TableLayout,
        schema: &TableSchema,
    ) -> Result<(), LifecycleError> {
        for (field, table) in &table_layout.hierarchy_tables {
            let Some(tree) = schema.field(field).and_then(|d| d.hierarchy()) else {
                continue;
            };
            let sql = format!(
                "INSERT INTO {} (\"_value\", \"_left\", \"_right\") VALUES (?1, ?2, ?3)",
                quote_ident(&format!("{}{table}", settings.table_prefix))
            );
            let mut stmt = tx.prepare(&sql)?;
            for row in tree.nested_set() {
                stmt.execute(params![row.value, row.left, row.right])?;
            }
        }
        Ok(())
    }
}
