use crate::core::{FieldDescription, Value};

/// The nine clause strings of a query, as written by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryText {
    pub tables: String,
    pub fields: String,
    pub where_clause: String,
    pub join_on: String,
    pub group_by: String,
    pub having: String,
    pub order_by: String,
    pub limit: String,
    pub offset: String,
}

impl QueryText {
    #[must_use]
    pub fn new(tables: impl Into<String>, fields: impl Into<String>) -> Self {
        Self {
            tables: tables.into(),
            fields: fields.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn where_clause(mut self, text: impl Into<String>) -> Self {
        self.where_clause = text.into();
        self
    }

    #[must_use]
    pub fn join_on(mut self, text: impl Into<String>) -> Self {
        self.join_on = text.into();
        self
    }

    #[must_use]
    pub fn group_by(mut self, text: impl Into<String>) -> Self {
        self.group_by = text.into();
        self
    }

    #[must_use]
    pub fn having(mut self, text: impl Into<String>) -> Self {
        self.having = text.into();
        self
    }

    #[must_use]
    pub fn order_by(mut self, text: impl Into<String>) -> Self {
        self.order_by = text.into();
        self
    }

    #[must_use]
    pub fn limit(mut self, text: impl Into<String>) -> Self {
        self.limit = text.into();
        self
    }

    #[must_use]
    pub fn offset(mut self, text: impl Into<String>) -> Self {
        self.offset = text.into();
        self
    }

    /// Set one clause by its wiki name (`where`, `join on`, `order by`, ...).
    /// Returns false for an unknown clause name.
    pub fn set_clause(&mut self, clause: &str, value: &str) -> bool {
        let normalized = clause.trim().to_lowercase().replace('_', " ");
        let slot = match normalized.as_str() {
            "tables" | "table" => &mut self.tables,
            "fields" => &mut self.fields,
            "where" => &mut self.where_clause,
            "join on" => &mut self.join_on,
            "group by" => &mut self.group_by,
            "having" => &mut self.having,
            "order by" => &mut self.order_by,
            "limit" => &mut self.limit,
            "offset" => &mut self.offset,
            _ => return false,
        };
        *slot = value.trim().to_string();
        true
    }
}

/// A table of the query with its alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanTable {
    pub name: String,
    pub alias: String,
}

/// One result column
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub alias: String,
    pub sql: String,
    pub description: FieldDescription,
}

/// Compiled, parameterized query ready for `QueryExecutor::run`
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub tables: Vec<PlanTable>,
    /// Visible columns, including generated precision and lat/lon columns
    pub projections: Vec<Projection>,
    pub sql: String,
    /// Bound in order as `?1`, `?2`, ...
    pub params: Vec<Value>,
    pub limit: usize,
    pub offset: usize,
    pub is_aggregating: bool,
    /// A trailing hidden `_pageName` column is selected for backlink tracking
    pub tracks_pages: bool,
}
