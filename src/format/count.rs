use rusqlite::Connection;

use super::DisplayParams;
use crate::config::Settings;
use crate::core::{QueryError, Value};
use crate::executor::QueryExecutor;
use crate::query::{QueryCompiler, QueryText};

/// Total number of rows the queries match, ignoring their limits
pub fn render(
    conn: &Connection,
    settings: &Settings,
    queries: &[QueryText],
    _params: &DisplayParams,
) -> Result<String, QueryError> {
    let mut total = 0;
    for query in queries {
        let counting = QueryText {
            fields: "COUNT(*)=Count".to_string(),
            order_by: String::new(),
            limit: String::new(),
            offset: String::new(),
            ..query.clone()
        };
        let plan = QueryCompiler::new(conn, settings).compile(&counting)?;
        let rows = QueryExecutor::run(conn, &plan)?;
        // Grouped queries return one count per group
        total += rows
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_int))
            .sum::<i64>();
    }
    Ok(total.to_string())
}
