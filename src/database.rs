use std::path::Path;

use rusqlite::Connection;

use crate::config::Settings;
use crate::core::{CargoError, PageIdentity, StoreContext, TableSchema};
use crate::executor::{QueryExecutor, RowSet, StorageEngine, StoreOutcome, TableLifecycleManager};
use crate::format::{DisplayParams, FormatRegistry};
use crate::query::{QueryCompiler, QueryPlan, QueryText};
use crate::schema::{SchemaRegistry, TableDeclaration};
use crate::storage::{self, TableEntry};

/// One SQLite database holding Cargo tables, with the settings they use
pub struct CargoDatabase {
    conn: Connection,
    settings: Settings,
    formats: FormatRegistry,
}

impl CargoDatabase {
    pub fn open(path: &Path, settings: Settings) -> Result<Self, CargoError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = storage::open_connection(path)?;
        log::debug!("Opened database {}", path.display());
        Ok(Self::with_connection(conn, settings))
    }

    pub fn open_in_memory(settings: Settings) -> Result<Self, CargoError> {
        Ok(Self::with_connection(storage::open_in_memory()?, settings))
    }

    fn with_connection(conn: Connection, settings: Settings) -> Self {
        Self {
            conn,
            settings,
            formats: FormatRegistry::builtin(),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn formats_mut(&mut self) -> &mut FormatRegistry {
        &mut self.formats
    }

    /// Record a template's declaration; the table is created when it does
    /// not exist yet. An existing table keeps its data until recreated.
    pub fn declare(&mut self, template_id: i64, declaration: &str) -> Result<TableDeclaration, CargoError> {
        let declaration = TableDeclaration::parse(declaration)?;
        TableLifecycleManager::declare(&self.conn, template_id, &declaration)?;

        if !SchemaRegistry::new(&self.conn).exists(&declaration.table_name)? {
            TableLifecycleManager::recreate_for_template(&mut self.conn, &self.settings, template_id, false)?;
        }
        Ok(declaration)
    }

    pub fn recreate(&mut self, template_id: i64, as_replacement: bool) -> Result<String, CargoError> {
        Ok(TableLifecycleManager::recreate_for_template(
            &mut self.conn,
            &self.settings,
            template_id,
            as_replacement,
        )?)
    }

    pub fn create_or_replace(&mut self, table_name: &str, schema: &TableSchema) -> Result<(), CargoError> {
        Ok(TableLifecycleManager::create_or_replace(&mut self.conn, &self.settings, table_name, schema, None)?)
    }

    pub fn switch_in_replacement(&mut self, table_name: &str) -> Result<(), CargoError> {
        Ok(TableLifecycleManager::switch_in_replacement(&mut self.conn, &self.settings, table_name)?)
    }

    pub fn discard_replacement(&mut self, table_name: &str) -> Result<(), CargoError> {
        Ok(TableLifecycleManager::discard_replacement(&mut self.conn, &self.settings, table_name)?)
    }

    pub fn delete_table(&mut self, table_name: &str) -> Result<(), CargoError> {
        Ok(TableLifecycleManager::delete_table(&mut self.conn, &self.settings, table_name)?)
    }

    pub fn store<K, V>(
        &mut self,
        ctx: &StoreContext,
        page: &PageIdentity,
        table_name: &str,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<StoreOutcome, CargoError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        Ok(StorageEngine::store(&mut self.conn, &self.settings, ctx, page, table_name, values)?)
    }

    pub fn delete_page(&mut self, page_id: i64) -> Result<usize, CargoError> {
        Ok(StorageEngine::delete_page(&mut self.conn, &self.settings, page_id)?)
    }

    pub fn compile(&self, query: &QueryText) -> Result<QueryPlan, CargoError> {
        Ok(QueryCompiler::new(&self.conn, &self.settings).compile(query)?)
    }

    pub fn query(&self, query: &QueryText) -> Result<RowSet, CargoError> {
        let plan = self.compile(query)?;
        Ok(QueryExecutor::run(&self.conn, &plan)?)
    }

    /// Run the queries through a named display format
    pub fn render(&self, format: &str, queries: &[QueryText], params: &DisplayParams) -> Result<String, CargoError> {
        Ok(self.formats.render(&self.conn, &self.settings, format, queries, params)?)
    }

    pub fn tables(&self) -> Result<Vec<TableEntry>, CargoError> {
        Ok(SchemaRegistry::new(&self.conn).list_tables()?)
    }

    pub fn schema(&self, table_name: &str) -> Result<TableSchema, CargoError> {
        Ok(SchemaRegistry::new(&self.conn).load(table_name)?)
    }
}
