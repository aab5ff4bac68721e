// CargoQL - declarative wiki tables on top of SQLite
// Schema declarations, field storage and a safe query compiler

// Clippy configuration - allow non-critical warnings
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::items_after_statements)]

// Runtime settings (limits, prefixes, number formats)
pub mod config;

// Core structures: field types, field descriptions, table schemas, values
pub mod core;

// Declaration and query-language parsers
pub mod parser;

// Naming rules, declaration strings, catalog-backed schema resolution
pub mod schema;

// SQLite catalog and physical table layout
pub mod storage;

// Table lifecycle (DDL), field storage (DML) and query execution
pub mod executor;

// Query compiler: clauses -> parameterized SQL plan
pub mod query;

// Display formatter dispatch
pub mod format;

// Convenience facade over a single connection
pub mod database;

// Re-export commonly used types for convenience
pub use config::Settings;
pub use core::{
    CargoError, DatePrecision, FieldDescription, FieldType, PageIdentity, StoreContext,
    TableSchema, Value,
};
pub use database::CargoDatabase;
pub use executor::{QueryExecutor, RowSet, StorageEngine, StoreOutcome, TableLifecycleManager};
pub use query::{QueryCompiler, QueryPlan, QueryText};
pub use schema::{SchemaRegistry, TableDeclaration};
