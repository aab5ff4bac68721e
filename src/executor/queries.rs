/// Query execution: runs a compiled plan and collects a `RowSet`

use rusqlite::{params_from_iter, Connection};

use crate::core::{FieldDescription, QueryError, Value};
use crate::query::QueryPlan;

/// Result of a query: rows of values in column order, plus the
/// description of every column for formatters
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub descriptions: Vec<FieldDescription>,
    pub rows: Vec<Vec<Value>>,
    /// Page of each row; empty for aggregating queries
    pub pages: Vec<String>,
    /// Effective limit the query ran with
    pub limit: usize,
    pub is_aggregating: bool,
}

impl RowSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn column_index(&self, alias: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == alias)
    }

    #[must_use]
    pub fn description(&self, alias: &str) -> Option<&FieldDescription> {
        self.column_index(alias).map(|i| &self.descriptions[i])
    }

    #[must_use]
    pub fn value(&self, row: usize, alias: &str) -> Option<&Value> {
        let column = self.column_index(alias)?;
        self.rows.get(row)?.get(column)
    }

    /// Ordered (alias, value) pairs of one row
    #[must_use]
    pub fn row_map(&self, row: usize) -> Vec<(&str, &Value)> {
        self.rows.get(row).map_or_else(Vec::new, |values| {
            self.columns.iter().map(String::as_str).zip(values).collect()
        })
    }

    /// The row count reached the limit, so more rows may exist
    #[must_use]
    pub fn possibly_more(&self) -> bool {
        self.limit > 0 && self.rows.len() >= self.limit
    }

    /// Elements of a list field's combined text, split by its delimiter
    #[must_use]
    pub fn list_values(&self, row: usize, alias: &str) -> Vec<String> {
        let Some(value) = self.value(row, alias) else {
            return Vec::new();
        };
        let text = value.to_string();
        match self.description(alias) {
            Some(desc) if desc.is_list => desc
                .list_elements(&text)
                .into_iter()
                .map(str::to_string)
                .collect(),
            _ if text.is_empty() => Vec::new(),
            _ => vec![text],
        }
    }

    /// Distinct pages the rows came from, in first-seen order
    #[must_use]
    pub fn page_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for page in &self.pages {
            if !names.contains(&page.as_str()) {
                names.push(page);
            }
        }
        names
    }
}

pub struct QueryExecutor;

impl QueryExecutor {
    /// Run a compiled plan. No matching rows is an empty `RowSet`.
    pub fn run(conn: &Connection, plan: &QueryPlan) -> Result<RowSet, QueryError> {
        let mut stmt = conn.prepare(&plan.sql)?;
        let visible = plan.projections.len();

        let mut rows = Vec::new();
        let mut pages = Vec::new();
        let mut cursor = stmt.query(params_from_iter(plan.params.iter()))?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(visible);
            for i in 0..visible {
                values.push(Value::from_value_ref(row.get_ref(i)?));
            }
            if plan.tracks_pages {
                let page = Value::from_value_ref(row.get_ref(visible)?);
                pages.push(page.to_string());
            }
            rows.push(values);
        }

        log::debug!("Query returned {} row(s)", rows.len());
        Ok(RowSet {
            columns: plan.projections.iter().map(|p| p.alias.clone()).collect(),
            descriptions: plan.projections.iter().map(|p| p.description.clone()).collect(),
            rows,
            pages,
            limit: plan.limit,
            is_aggregating: plan.is_aggregating,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::core::{PageIdentity, StoreContext};
    use crate::executor::{StorageEngine, TableLifecycleManager};
    use crate::query::{QueryCompiler, QueryText};
    use crate::schema::TableDeclaration;
    use crate::storage::open_in_memory;

    fn books() -> (Connection, Settings) {
        let mut conn = open_in_memory().unwrap();
        let settings = Settings::default();
        let decl = TableDeclaration::parse("_table=Books|Authors=List (,) of String|Year=Integer|Published=Date").unwrap();
        TableLifecycleManager::create_or_replace(&mut conn, &settings, "Books", &decl.schema, None).unwrap();

        let ctx = StoreContext::page_save();
        for (id, page, authors, year) in [
            (1, "Lorem Ipsum", "John Doe, Jane Miller", "1999"),
            (2, "A Test", "Jane Miller", "2005"),
            (3, "Third", "Someone", "2005"),
        ] {
            StorageEngine::store(
                &mut conn,
                &settings,
                &ctx,
                &PageIdentity::main(id, page),
                "Books",
                [("Authors", authors), ("Year", year), ("Published", "2001")],
            )
            .unwrap();
        }
        (conn, settings)
    }

    fn run(conn: &Connection, settings: &Settings, text: &QueryText) -> RowSet {
        let plan = QueryCompiler::new(conn, settings).compile(text).unwrap();
        QueryExecutor::run(conn, &plan).unwrap()
    }

    #[test]
    fn test_rows_and_metadata() {
        let (conn, settings) = books();
        let result = run(&conn, &settings, &QueryText::new("Books", "_pageName=Page, Authors, Published"));
        assert_eq!(result.columns, vec!["Page", "Authors", "Published", "Published__precision"]);
        assert_eq!(result.len(), 3);
        assert_eq!(result.value(0, "Page"), Some(&Value::Text("Lorem Ipsum".to_string())));
        assert_eq!(result.list_values(0, "Authors"), vec!["John Doe", "Jane Miller"]);
        assert_eq!(result.value(0, "Published__precision"), Some(&Value::Integer(3)));
        assert_eq!(result.page_names(), vec!["Lorem Ipsum", "A Test", "Third"]);
        assert!(!result.possibly_more());
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let (conn, settings) = books();
        let result = run(&conn, &settings, &QueryText::new("Books", "_pageName").where_clause("Year > 3000"));
        assert!(result.is_empty());
        assert!(result.page_names().is_empty());
    }

    #[test]
    fn test_possibly_more() {
        let (conn, settings) = books();
        let result = run(&conn, &settings, &QueryText::new("Books", "_pageName").limit("2"));
        assert_eq!(result.len(), 2);
        assert!(result.possibly_more());

        let rest = run(&conn, &settings, &QueryText::new("Books", "_pageName").limit("2").offset("2"));
        assert_eq!(rest.row_map(0), vec![("_pageName", &Value::Text("Third".to_string()))]);
    }

    #[test]
    fn test_aggregate_query() {
        let (conn, settings) = books();
        let result = run(
            &conn,
            &settings,
            &QueryText::new("Books", "Year, COUNT(*)=Total").group_by("Year").order_by("Year"),
        );
        assert!(result.is_aggregating);
        assert!(result.pages.is_empty());
        assert_eq!(result.rows, vec![
            vec![Value::Integer(1999), Value::Integer(1)],
            vec![Value::Integer(2005), Value::Integer(2)],
        ]);
    }

    #[test]
    fn test_holds_matches_any_element() {
        let (conn, settings) = books();
        let result = run(
            &conn,
            &settings,
            &QueryText::new("Books", "_pageName").where_clause("Authors HOLDS 'Jane Miller'"),
        );
        assert_eq!(result.page_names(), vec!["Lorem Ipsum", "A Test"]);

        let like = run(
            &conn,
            &settings,
            &QueryText::new("Books", "_pageName").where_clause("Authors HOLDS LIKE 'Some%'"),
        );
        assert_eq!(like.page_names(), vec!["Third"]);
    }
}
