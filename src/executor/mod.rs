/// Executor module - everything that touches physical tables
///
/// Structure:
/// - ddl: table lifecycle (create, recreate into `__NEXT`, switch, delete)
/// - dml: field storage and page deletion
/// - queries: running compiled query plans

pub mod ddl;
pub mod dml;
pub mod queries;

pub use ddl::TableLifecycleManager;
pub use dml::{StorageEngine, StoreOutcome};
pub use queries::{QueryExecutor, RowSet};
