/// Query compiler: nine clause strings -> one parameterized SQLite SELECT
///
/// Compilation order:
/// 1. unsafe-token check on every free-text clause (quoted literals removed)
/// 2. resolve tables and aliases through the schema registry
/// 3. build the join graph from `join on` plus declared parent tables
/// 4. compile projections, WHERE, GROUP BY, HAVING, ORDER BY
/// 5. clamp limit and offset
///
/// Every literal becomes a numbered parameter; every identifier is quoted.

use rusqlite::Connection;

use super::functions;
use super::plan::{PlanTable, Projection, QueryPlan, QueryText};
use super::safety;
use crate::config::Settings;
use crate::core::{
    system_field_description, FieldDescription, FieldType, QueryError, RegistryError, TableSchema, Value,
};
use crate::parser::{
    parse_condition, parse_fields, parse_group_by, parse_join_on, parse_order_by, parse_tables,
    parse_count, Condition, DistanceUnit, Expr, FieldRef, JoinCondition, Literal, SelectField,
    SortOrder,
};
use crate::schema::SchemaRegistry;
use crate::storage::layout::{full_column, precision_column, quote_ident, uses_full_column, TableLayout};

/// Mean length of one degree of latitude
const KM_PER_DEGREE: f64 = 111.0;

/// Clause an expression is compiled for; projection aliases are visible
/// only after the SELECT list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Fields,
    Where,
    GroupBy,
    Having,
    OrderBy,
}

impl Clause {
    const fn sees_aliases(self) -> bool {
        matches!(self, Self::GroupBy | Self::Having | Self::OrderBy)
    }
}

struct ScopeTable {
    name: String,
    alias: String,
    schema: TableSchema,
    layout: TableLayout,
}

/// A field reference resolved against the query's tables
struct Resolved {
    table: usize,
    field: String,
    desc: FieldDescription,
}

/// A join condition between two query tables
struct JoinEdge {
    a: usize,
    b: usize,
    sql: String,
}

/// Mutable state of one compilation
struct Scope<'a> {
    settings: &'a Settings,
    tables: Vec<ScopeTable>,
    params: Vec<Value>,
    aliases: Vec<String>,
    subqueries: usize,
}

impl Scope<'_> {
    fn physical(&self, logical: &str) -> String {
        quote_ident(&format!("{}{logical}", self.settings.table_prefix))
    }

    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("?{}", self.params.len())
    }

    fn subquery_alias(&mut self) -> String {
        self.subqueries += 1;
        quote_ident(&format!("_sub{}", self.subqueries))
    }

    fn alias_of(&self, resolved: &Resolved) -> String {
        quote_ident(&self.tables[resolved.table].alias)
    }

    fn resolve(&self, field: &FieldRef) -> Result<Resolved, QueryError> {
        let display = field
            .table
            .as_ref()
            .map_or_else(|| field.field.clone(), |t| format!("{t}.{}", field.field));

        if let Some(alias) = &field.table {
            let table = self
                .tables
                .iter()
                .position(|t| &t.alias == alias)
                .ok_or_else(|| QueryError::UnknownAlias(alias.clone()))?;
            let desc = self.tables[table]
                .schema
                .resolve_field(&field.field)
                .ok_or(QueryError::UnknownField(display))?;
            return Ok(Resolved { table, field: field.field.clone(), desc });
        }

        // System fields of an unqualified reference belong to the first table
        if let Some(desc) = system_field_description(&field.field) {
            return Ok(Resolved { table: 0, field: field.field.clone(), desc });
        }

        let mut matches = self
            .tables
            .iter()
            .enumerate()
            .filter(|(_, t)| t.schema.contains(&field.field));
        match (matches.next(), matches.next()) {
            (Some((table, t)), None) => Ok(Resolved {
                table,
                field: field.field.clone(),
                desc: t.schema.field(&field.field).cloned().ok_or(QueryError::UnknownField(display))?,
            }),
            (Some(_), Some(_)) => Err(QueryError::AmbiguousField(display)),
            (None, _) => Err(QueryError::UnknownField(display)),
        }
    }

    /// Main-table column a plain reference to the field reads
    fn column(&self, resolved: &Resolved) -> String {
        let is_system = resolved.field.starts_with('_');
        let column = if !is_system && uses_full_column(&resolved.desc) {
            full_column(&resolved.field)
        } else {
            resolved.field.clone()
        };
        format!("{}.{}", self.alias_of(resolved), quote_ident(&column))
    }

    fn is_projection_alias(&self, field: &FieldRef, clause: Clause) -> bool {
        clause.sees_aliases()
            && field.table.is_none()
            && self.aliases.iter().any(|a| a == &field.field)
            && !self.tables.iter().any(|t| t.schema.contains(&field.field))
    }

    fn compile_expr(&mut self, expr: &Expr, clause: Clause) -> Result<String, QueryError> {
        match expr {
            Expr::Field(field) => {
                if self.is_projection_alias(field, clause) {
                    return Ok(quote_ident(&field.field));
                }
                let resolved = self.resolve(field)?;
                Ok(self.column(&resolved))
            }
            Expr::Literal(literal) => Ok(self.bind(literal_value(literal))),
            Expr::Function { name, args, distinct } => {
                if !functions::is_allowed(name) {
                    return Err(QueryError::DisallowedFunction(name.clone()));
                }
                if clause == Clause::Where && functions::is_aggregate(name) {
                    return Err(QueryError::Parse(format!(
                        "aggregate function {} cannot be used in where, use having",
                        name.to_uppercase()
                    )));
                }
                let compiled = args
                    .iter()
                    .map(|arg| match arg {
                        Expr::Star => Ok("*".to_string()),
                        other => self.compile_expr(other, clause),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                functions::translate(name, &compiled, *distinct)
            }
            Expr::Star => Err(QueryError::Parse("'*' is only allowed in COUNT(*)".to_string())),
            Expr::Binary { left, op, right } => {
                let left = self.compile_expr(left, clause)?;
                let right = self.compile_expr(right, clause)?;
                Ok(format!("{left} {} {right}", op.as_sql()))
            }
            Expr::Nested(inner) => Ok(format!("({})", self.compile_expr(inner, clause)?)),
        }
    }

    fn compile_condition(&mut self, condition: &Condition, clause: Clause) -> Result<String, QueryError> {
        match condition {
            Condition::Compare { left, op, right } => {
                let left = self.compile_expr(left, clause)?;
                let right = self.compile_expr(right, clause)?;
                Ok(format!("{left} {} {right}", op.as_sql()))
            }
            Condition::Like { expr, pattern, negated } => {
                let expr = self.compile_expr(expr, clause)?;
                let pattern = self.compile_expr(pattern, clause)?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{expr} {not}LIKE {pattern}"))
            }
            Condition::Holds { field, value } => self.compile_holds(field, value, "=", "HOLDS", clause),
            Condition::HoldsLike { field, pattern } => {
                self.compile_holds(field, pattern, "LIKE", "HOLDS LIKE", clause)
            }
            Condition::Near { field, lat, lon, distance, unit } => {
                self.compile_near(field, *lat, *lon, *distance, *unit)
            }
            Condition::Within { field, value } => self.compile_within(field, value, clause),
            Condition::IsNull { expr, negated } => {
                let expr = self.compile_expr(expr, clause)?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{expr} IS {not}NULL"))
            }
            Condition::In { expr, values, negated } => {
                let expr = self.compile_expr(expr, clause)?;
                let values = values
                    .iter()
                    .map(|v| self.compile_expr(v, clause))
                    .collect::<Result<Vec<_>, _>>()?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{expr} {not}IN ({})", values.join(", ")))
            }
            Condition::And(a, b) => Ok(format!(
                "({} AND {})",
                self.compile_condition(a, clause)?,
                self.compile_condition(b, clause)?
            )),
            Condition::Or(a, b) => Ok(format!(
                "({} OR {})",
                self.compile_condition(a, clause)?,
                self.compile_condition(b, clause)?
            )),
            Condition::Not(inner) => Ok(format!("NOT ({})", self.compile_condition(inner, clause)?)),
        }
    }

    /// List membership through the field's helper table
    fn compile_holds(
        &mut self,
        field: &FieldRef,
        value: &Expr,
        comparison: &str,
        operator: &str,
        clause: Clause,
    ) -> Result<String, QueryError> {
        let resolved = self.resolve(field)?;
        let helper = self.list_helper(&resolved, operator)?;
        let value = self.compile_expr(value, clause)?;
        let sub = self.subquery_alias();
        Ok(format!(
            "EXISTS (SELECT 1 FROM {helper} AS {sub} WHERE {sub}.\"_rowID\" = {}.\"_ID\" AND {sub}.\"_value\" {comparison} {value})",
            self.alias_of(&resolved)
        ))
    }

    /// Bounding box around (lat, lon)
    fn compile_near(
        &mut self,
        field: &FieldRef,
        lat: f64,
        lon: f64,
        distance: f64,
        unit: DistanceUnit,
    ) -> Result<String, QueryError> {
        let resolved = self.resolve(field)?;
        if resolved.desc.field_type != FieldType::Coordinates {
            return Err(QueryError::InvalidOperator {
                operator: "NEAR".to_string(),
                field: resolved.field,
                reason: "field is not of type Coordinates".to_string(),
            });
        }

        let km = unit.to_kilometers(distance);
        let lat_delta = km / KM_PER_DEGREE;
        let lon_delta = km / (KM_PER_DEGREE * lat.to_radians().cos()).abs().max(f64::EPSILON);
        let lat_min = self.bind(Value::Real(lat - lat_delta));
        let lat_max = self.bind(Value::Real(lat + lat_delta));
        let lon_min = self.bind(Value::Real(lon - lon_delta));
        let lon_max = self.bind(Value::Real(lon + lon_delta));

        let alias = self.alias_of(&resolved);
        if resolved.desc.is_list {
            let helper = self.list_helper(&resolved, "NEAR")?;
            let sub = self.subquery_alias();
            return Ok(format!(
                "EXISTS (SELECT 1 FROM {helper} AS {sub} WHERE {sub}.\"_rowID\" = {alias}.\"_ID\" \
                 AND {sub}.\"_lat\" BETWEEN {lat_min} AND {lat_max} \
                 AND {sub}.\"_lon\" BETWEEN {lon_min} AND {lon_max})"
            ));
        }
        let lat_col = quote_ident(&format!("{}__lat", resolved.field));
        let lon_col = quote_ident(&format!("{}__lon", resolved.field));
        Ok(format!(
            "({alias}.{lat_col} BETWEEN {lat_min} AND {lat_max} AND {alias}.{lon_col} BETWEEN {lon_min} AND {lon_max})"
        ))
    }

    /// The value or any descendant of it in the field's hierarchy
    fn compile_within(&mut self, field: &FieldRef, value: &Expr, clause: Clause) -> Result<String, QueryError> {
        let resolved = self.resolve(field)?;
        let table = &self.tables[resolved.table];
        let Some(hierarchy) = table.layout.hierarchy_table(&resolved.field).map(str::to_string) else {
            return Err(QueryError::InvalidOperator {
                operator: "WITHIN".to_string(),
                field: resolved.field,
                reason: "field is not a hierarchy".to_string(),
            });
        };
        let hierarchy = self.physical(&hierarchy);
        let value = self.compile_expr(value, clause)?;
        let child = self.subquery_alias();
        let parent = self.subquery_alias();
        let subtree = format!(
            "SELECT {child}.\"_value\" FROM {hierarchy} AS {child} JOIN {hierarchy} AS {parent} \
             ON {child}.\"_left\" >= {parent}.\"_left\" AND {child}.\"_right\" <= {parent}.\"_right\" \
             WHERE {parent}.\"_value\" = {value}"
        );

        if resolved.desc.is_list {
            let helper = self.list_helper(&resolved, "WITHIN")?;
            let sub = self.subquery_alias();
            return Ok(format!(
                "EXISTS (SELECT 1 FROM {helper} AS {sub} WHERE {sub}.\"_rowID\" = {}.\"_ID\" AND {sub}.\"_value\" IN ({subtree}))",
                self.alias_of(&resolved)
            ));
        }
        Ok(format!("{} IN ({subtree})", self.column(&resolved)))
    }

    fn list_helper(&self, resolved: &Resolved, operator: &str) -> Result<String, QueryError> {
        let table = &self.tables[resolved.table];
        table
            .layout
            .list_table(&resolved.field)
            .map(|helper| self.physical(helper))
            .ok_or_else(|| QueryError::InvalidOperator {
                operator: operator.to_string(),
                field: resolved.field.clone(),
                reason: "field is not a list".to_string(),
            })
    }

    /// Description of a projected expression
    fn describe(&self, expr: &Expr) -> Result<FieldDescription, QueryError> {
        Ok(match expr {
            Expr::Field(field) => self.resolve(field)?.desc,
            Expr::Function { name, args, .. } => {
                let first = match args.first() {
                    Some(Expr::Field(field)) => Some(self.resolve(field)?.desc),
                    _ => None,
                };
                functions::result_description(name, first.as_ref())
            }
            Expr::Literal(Literal::Integer(_)) | Expr::Star => FieldDescription::new(FieldType::Integer),
            Expr::Literal(Literal::Real(_)) | Expr::Binary { .. } => FieldDescription::new(FieldType::Float),
            Expr::Literal(Literal::Text(_)) => FieldDescription::new(FieldType::String),
            Expr::Nested(inner) => self.describe(inner)?,
        })
    }

    fn join_edge(&mut self, join: &JoinCondition) -> Result<JoinEdge, QueryError> {
        let left = self.resolve(&join.left)?;
        let right = self.resolve(&join.right)?;
        let right_column = self.column(&right);

        let sql = if join.holds {
            let helper = self.list_helper(&left, "HOLDS")?;
            let sub = self.subquery_alias();
            format!(
                "EXISTS (SELECT 1 FROM {helper} AS {sub} WHERE {sub}.\"_rowID\" = {}.\"_ID\" AND {sub}.\"_value\" = {right_column})",
                self.alias_of(&left)
            )
        } else {
            format!("{} = {right_column}", self.column(&left))
        };
        Ok(JoinEdge { a: left.table, b: right.table, sql })
    }

    /// Joins implied by `_parentTables` declarations between query tables
    fn parent_edges(&self) -> Vec<JoinEdge> {
        let mut edges = Vec::new();
        for (child, table) in self.tables.iter().enumerate() {
            for parent in &table.schema.parent_tables {
                for (target, other) in self.tables.iter().enumerate() {
                    if target == child || other.name != parent.table {
                        continue;
                    }
                    let local = table.schema.resolve_field(&parent.local_field);
                    let remote = other.schema.resolve_field(&parent.remote_field);
                    let (Some(local), Some(remote)) = (local, remote) else {
                        log::warn!(
                            "Parent table join {}.{} -> {}.{} names an unknown field, ignored",
                            table.name, parent.local_field, other.name, parent.remote_field
                        );
                        continue;
                    };
                    let left = self.column(&Resolved { table: child, field: parent.local_field.clone(), desc: local });
                    let right = self.column(&Resolved { table: target, field: parent.remote_field.clone(), desc: remote });
                    edges.push(JoinEdge { a: child, b: target, sql: format!("{left} = {right}") });
                }
            }
        }
        edges
    }

    /// FROM clause joining every table, plus conditions that did not fit an ON
    fn from_clause(&self, edges: &[JoinEdge]) -> Result<(String, Vec<String>), QueryError> {
        let first = &self.tables[0];
        let mut from = format!("{} AS {}", self.physical(&first.name), quote_ident(&first.alias));
        let mut joined = vec![false; self.tables.len()];
        joined[0] = true;
        let mut used = vec![false; edges.len()];

        while let Some(missing) = joined.iter().position(|j| !j) {
            let connects = |e: &JoinEdge, k: usize| (e.a == k && joined[e.b]) || (e.b == k && joined[e.a]);
            let Some(next) = (0..self.tables.len()).find(|&k| !joined[k] && edges.iter().any(|e| connects(e, k)))
            else {
                return Err(QueryError::MissingJoin(self.tables[missing].name.clone()));
            };

            let mut conditions = Vec::new();
            for (i, edge) in edges.iter().enumerate() {
                if !used[i] && connects(edge, next) {
                    used[i] = true;
                    conditions.push(edge.sql.as_str());
                }
            }
            let table = &self.tables[next];
            from.push_str(&format!(
                " LEFT OUTER JOIN {} AS {} ON {}",
                self.physical(&table.name),
                quote_ident(&table.alias),
                conditions.join(" AND ")
            ));
            joined[next] = true;
        }

        let leftover = edges
            .iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
            .map(|(e, _)| e.sql.clone())
            .collect();
        Ok((from, leftover))
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Text(s) => Value::Text(s.clone()),
        Literal::Integer(i) => Value::Integer(*i),
        Literal::Real(r) => Value::Real(*r),
    }
}

/// Alias of an unaliased projection: the field name, or the expression text
fn default_alias(field: &SelectField) -> String {
    match field.expr.as_field() {
        Some(f) => f.field.clone(),
        None => field.text.clone(),
    }
}

fn unique_alias(alias: String, taken: &[String]) -> String {
    if !taken.contains(&alias) {
        return alias;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{alias}_{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

pub struct QueryCompiler<'a> {
    conn: &'a Connection,
    settings: &'a Settings,
}

impl<'a> QueryCompiler<'a> {
    #[must_use]
    pub const fn new(conn: &'a Connection, settings: &'a Settings) -> Self {
        Self { conn, settings }
    }

    pub fn compile(&self, text: &QueryText) -> Result<QueryPlan, QueryError> {
        for clause in [
            &text.tables,
            &text.fields,
            &text.where_clause,
            &text.join_on,
            &text.group_by,
            &text.having,
            &text.order_by,
        ] {
            safety::check_clause(clause)?;
        }

        let mut scope = Scope {
            settings: self.settings,
            tables: Vec::new(),
            params: Vec::new(),
            aliases: Vec::new(),
            subqueries: 0,
        };

        // Tables
        let registry = SchemaRegistry::new(self.conn);
        for table in parse_tables(&text.tables).map_err(QueryError::Parse)? {
            let schema = match registry.load(&table.name) {
                Ok(schema) => schema,
                Err(RegistryError::UnknownTable(name)) => return Err(QueryError::UnknownTable(name)),
                Err(e) => return Err(e.into()),
            };
            let alias = table.alias.unwrap_or_else(|| table.name.clone());
            if scope.tables.iter().any(|t| t.alias == alias) {
                return Err(QueryError::DuplicateAlias(alias));
            }
            let layout = TableLayout::new(&table.name, &schema);
            scope.tables.push(ScopeTable { name: table.name, alias, schema, layout });
        }

        // Projections
        let fields_text = if text.fields.trim().is_empty() { "_pageName" } else { text.fields.as_str() };
        let fields = parse_fields(fields_text).map_err(QueryError::Parse)?;
        let group_by = parse_group_by(&text.group_by).map_err(QueryError::Parse)?;
        let is_aggregating = !group_by.is_empty() || fields.iter().any(|f| f.expr.contains_aggregate());

        let mut projections = Vec::new();
        for field in &fields {
            let alias = match &field.alias {
                Some(alias) if alias.starts_with('_') => return Err(QueryError::ReservedAlias(alias.clone())),
                Some(alias) => alias.clone(),
                None => default_alias(field),
            };
            let alias = unique_alias(alias, &scope.aliases);
            scope.aliases.push(alias.clone());

            let sql = scope.compile_expr(&field.expr, Clause::Fields)?;
            let description = scope.describe(&field.expr)?;
            let meta = match field.expr.as_field() {
                Some(f) => metadata_projections(&scope, &scope.resolve(f)?, &alias),
                None => Vec::new(),
            };
            projections.push(Projection { alias, sql, description });
            projections.extend(meta);
        }

        // Joins
        let mut edges = Vec::new();
        for join in parse_join_on(&text.join_on).map_err(QueryError::Parse)? {
            edges.push(scope.join_edge(&join)?);
        }
        edges.extend(scope.parent_edges());
        let (from, mut where_parts) = scope.from_clause(&edges)?;

        if !text.where_clause.trim().is_empty() {
            let condition = parse_condition(&text.where_clause, "where").map_err(QueryError::Parse)?;
            where_parts.push(scope.compile_condition(&condition, Clause::Where)?);
        }

        let group_sql = group_by
            .iter()
            .map(|e| scope.compile_expr(e, Clause::GroupBy))
            .collect::<Result<Vec<_>, _>>()?;

        let having_sql = if text.having.trim().is_empty() {
            None
        } else {
            let condition = parse_condition(&text.having, "having").map_err(QueryError::Parse)?;
            if condition.uses_cargo_operator() {
                return Err(QueryError::Parse(
                    "HOLDS, NEAR and WITHIN cannot be used in having".to_string(),
                ));
            }
            Some(scope.compile_condition(&condition, Clause::Having)?)
        };

        let mut order_sql = Vec::new();
        for item in parse_order_by(&text.order_by).map_err(QueryError::Parse)? {
            let expr = scope.compile_expr(&item.expr, Clause::OrderBy)?;
            let direction = match item.order {
                SortOrder::Asc => "ASC",
                SortOrder::Desc => "DESC",
            };
            order_sql.push(format!("{expr} {direction}"));
        }
        if order_sql.is_empty() && !is_aggregating {
            order_sql.push(format!("{}.\"_ID\" ASC", quote_ident(&scope.tables[0].alias)));
        }

        let requested = parse_limit(&text.limit, "limit")?;
        let limit = self.settings.effective_limit(requested);
        let offset = parse_limit(&text.offset, "offset")?.unwrap_or(0);

        // Assemble
        let mut columns: Vec<String> = projections
            .iter()
            .map(|p| format!("{} AS {}", p.sql, quote_ident(&p.alias)))
            .collect();
        let tracks_pages = !is_aggregating;
        if tracks_pages {
            columns.push(format!("{}.\"_pageName\"", quote_ident(&scope.tables[0].alias)));
        }

        let mut sql = format!("SELECT {} FROM {from}", columns.join(", "));
        if !where_parts.is_empty() {
            sql.push_str(&format!(" WHERE {}", where_parts.join(" AND ")));
        }
        if !group_sql.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", group_sql.join(", ")));
        }
        if let Some(having) = having_sql {
            sql.push_str(&format!(" HAVING {having}"));
        }
        if !order_sql.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", order_sql.join(", ")));
        }
        sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
        log::debug!("Compiled query: {sql}");

        Ok(QueryPlan {
            tables: scope
                .tables
                .iter()
                .map(|t| PlanTable { name: t.name.clone(), alias: t.alias.clone() })
                .collect(),
            projections,
            sql,
            params: scope.params,
            limit,
            offset,
            is_aggregating,
            tracks_pages,
        })
    }
}

/// Extra columns projected next to a bare date or coordinates field
fn metadata_projections(scope: &Scope<'_>, resolved: &Resolved, alias: &str) -> Vec<Projection> {
    let desc = &resolved.desc;
    if desc.is_list {
        return Vec::new();
    }
    let table = scope.alias_of(resolved);
    if desc.is_date_or_datetime() {
        return vec![Projection {
            alias: format!("{alias}__precision"),
            sql: format!("{table}.{}", quote_ident(&precision_column(&resolved.field))),
            description: FieldDescription::new(FieldType::Integer),
        }];
    }
    if desc.field_type == FieldType::Coordinates {
        return ["lat", "lon"]
            .into_iter()
            .map(|axis| Projection {
                alias: format!("{alias}  {axis}"),
                sql: format!("{table}.{}", quote_ident(&format!("{}__{axis}", resolved.field))),
                description: FieldDescription::new(FieldType::Float),
            })
            .collect();
    }
    Vec::new()
}

fn parse_limit(text: &str, clause: &str) -> Result<Option<usize>, QueryError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_count(text, clause)
        .map(Some)
        .map_err(|_| QueryError::InvalidLimit {
            clause: clause.to_string(),
            value: text.trim().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TableLifecycleManager;
    use crate::schema::TableDeclaration;
    use crate::storage::open_in_memory;

    fn setup() -> (Connection, Settings) {
        let mut conn = open_in_memory().unwrap();
        let settings = Settings::default();
        for declaration in [
            "_table=Books|Authors=List (,) of String|Genres=List (,) of String|Year=Integer\
             |Published=Date|Place=Coordinates|Category=String (hierarchy;allowed values=*Fiction\n**Fantasy)",
            "_table=Reviews|_parentTables=Books(_localField=Book)|Book=Page|Stars=Rating",
            "_table=Films|Title=String|Year=Integer",
        ] {
            let decl = TableDeclaration::parse(declaration).unwrap();
            TableLifecycleManager::create_or_replace(&mut conn, &settings, &decl.table_name, &decl.schema, None)
                .unwrap();
        }
        (conn, settings)
    }

    fn compile(conn: &Connection, settings: &Settings, text: &QueryText) -> Result<QueryPlan, QueryError> {
        QueryCompiler::new(conn, settings).compile(text)
    }

    #[test]
    fn test_simple_select() {
        let (conn, settings) = setup();
        let plan = compile(&conn, &settings, &QueryText::new("Books", "_pageName, Year").where_clause("Year > 1990"))
            .unwrap();
        assert_eq!(
            plan.sql,
            "SELECT \"Books\".\"_pageName\" AS \"_pageName\", \"Books\".\"Year\" AS \"Year\", \
             \"Books\".\"_pageName\" FROM \"cargo__Books\" AS \"Books\" WHERE \"Books\".\"Year\" > ?1 \
             ORDER BY \"Books\".\"_ID\" ASC LIMIT 100 OFFSET 0"
        );
        assert_eq!(plan.params, vec![Value::Integer(1990)]);
        assert!(plan.tracks_pages);
        assert!(!plan.is_aggregating);
    }

    #[test]
    fn test_holds_uses_helper_table() {
        let (conn, settings) = setup();
        let plan = compile(&conn, &settings, &QueryText::new("Books", "Authors").where_clause("Authors HOLDS 'Jane'"))
            .unwrap();
        assert!(plan.sql.contains(
            "EXISTS (SELECT 1 FROM \"cargo__Books__Authors\" AS \"_sub1\" WHERE \"_sub1\".\"_rowID\" = \"Books\".\"_ID\" AND \"_sub1\".\"_value\" = ?1)"
        ));
        assert!(plan.sql.contains("\"Books\".\"Authors__full\" AS \"Authors\""));
        assert!(plan.projections[0].description.is_list);
    }

    #[test]
    fn test_holds_requires_list() {
        let (conn, settings) = setup();
        let err = compile(&conn, &settings, &QueryText::new("Books", "").where_clause("Year HOLDS 3")).unwrap_err();
        assert!(matches!(err, QueryError::InvalidOperator { operator, .. } if operator == "HOLDS"));
        let err = compile(&conn, &settings, &QueryText::new("Books", "").where_clause("Year NEAR (1, 2, 3)")).unwrap_err();
        assert!(matches!(err, QueryError::InvalidOperator { operator, .. } if operator == "NEAR"));
        let err = compile(&conn, &settings, &QueryText::new("Books", "").where_clause("Year WITHIN 'x'")).unwrap_err();
        assert!(matches!(err, QueryError::InvalidOperator { operator, .. } if operator == "WITHIN"));
    }

    #[test]
    fn test_near_and_within() {
        let (conn, settings) = setup();
        let plan = compile(
            &conn,
            &settings,
            &QueryText::new("Books", "Place").where_clause("Place NEAR (40, -74, 10 km) AND Category WITHIN 'Fiction'"),
        )
        .unwrap();
        assert!(plan.sql.contains("\"Books\".\"Place__lat\" BETWEEN ?1 AND ?2"));
        assert!(plan.sql.contains("\"Books\".\"Category\" IN (SELECT"));
        assert_eq!(plan.params.len(), 5);
        let aliases: Vec<&str> = plan.projections.iter().map(|p| p.alias.as_str()).collect();
        assert_eq!(aliases, vec!["Place", "Place  lat", "Place  lon"]);
    }

    #[test]
    fn test_date_projection_adds_precision() {
        let (conn, settings) = setup();
        let plan = compile(&conn, &settings, &QueryText::new("Books", "Published=When")).unwrap();
        let aliases: Vec<&str> = plan.projections.iter().map(|p| p.alias.as_str()).collect();
        assert_eq!(aliases, vec!["When", "When__precision"]);
    }

    #[test]
    fn test_parent_table_join() {
        let (conn, settings) = setup();
        let plan = compile(&conn, &settings, &QueryText::new("Reviews=R, Books=B", "B._pageName, R.Stars")).unwrap();
        assert!(plan.sql.contains(
            "FROM \"cargo__Reviews\" AS \"R\" LEFT OUTER JOIN \"cargo__Books\" AS \"B\" ON \"R\".\"Book\" = \"B\".\"_pageName\""
        ));
    }

    #[test]
    fn test_missing_join() {
        let (conn, settings) = setup();
        let err = compile(&conn, &settings, &QueryText::new("Books, Films", "Films.Title")).unwrap_err();
        assert!(matches!(err, QueryError::MissingJoin(t) if t == "Films"));

        let plan = compile(
            &conn,
            &settings,
            &QueryText::new("Books=B, Films=F", "F.Title").join_on("B.Year = F.Year"),
        )
        .unwrap();
        assert!(plan.sql.contains("LEFT OUTER JOIN \"cargo__Films\" AS \"F\" ON \"B\".\"Year\" = \"F\".\"Year\""));
    }

    #[test]
    fn test_field_resolution_errors() {
        let (conn, settings) = setup();
        let join = "B.Year = F.Year";
        assert!(matches!(
            compile(&conn, &settings, &QueryText::new("Books=B, Films=F", "Year").join_on(join)),
            Err(QueryError::AmbiguousField(_))
        ));
        assert!(matches!(
            compile(&conn, &settings, &QueryText::new("Books", "Nope")),
            Err(QueryError::UnknownField(_))
        ));
        assert!(matches!(
            compile(&conn, &settings, &QueryText::new("Books", "X.Year")),
            Err(QueryError::UnknownAlias(_))
        ));
        assert!(matches!(
            compile(&conn, &settings, &QueryText::new("Nowhere", "_pageName")),
            Err(QueryError::UnknownTable(_))
        ));
        assert!(matches!(
            compile(&conn, &settings, &QueryText::new("Books=B, Films=B", "_pageName")),
            Err(QueryError::DuplicateAlias(_))
        ));
    }

    #[test]
    fn test_reserved_alias() {
        let (conn, settings) = setup();
        assert!(matches!(
            compile(&conn, &settings, &QueryText::new("Books", "Year=_hidden")),
            Err(QueryError::ReservedAlias(_))
        ));
    }

    #[test]
    fn test_aggregation() {
        let (conn, settings) = setup();
        let plan = compile(
            &conn,
            &settings,
            &QueryText::new("Books", "Year, COUNT(*)=Total")
                .group_by("Year")
                .having("COUNT(*) > 1")
                .order_by("Total DESC"),
        )
        .unwrap();
        assert!(plan.is_aggregating);
        assert!(!plan.tracks_pages);
        assert!(plan.sql.ends_with("GROUP BY \"Books\".\"Year\" HAVING COUNT(*) > ?1 ORDER BY \"Total\" DESC LIMIT 100 OFFSET 0"));
        assert_eq!(plan.projections[1].description.field_type, FieldType::Integer);

        assert!(matches!(
            compile(&conn, &settings, &QueryText::new("Books", "Year").group_by("Year").having("Authors HOLDS 'x'")),
            Err(QueryError::Parse(_))
        ));
    }

    #[test]
    fn test_limits() {
        let (conn, settings) = setup();
        let plan = compile(&conn, &settings, &QueryText::new("Books", "").limit("100000").offset("20")).unwrap();
        assert_eq!(plan.limit, 5000);
        assert_eq!(plan.offset, 20);
        assert!(matches!(
            compile(&conn, &settings, &QueryText::new("Books", "").limit("ten")),
            Err(QueryError::InvalidLimit { .. })
        ));
    }

    #[test]
    fn test_unsafe_text_rejected() {
        let (conn, settings) = setup();
        assert!(compile(&conn, &settings, &QueryText::new("Books", "").where_clause("_pageName = 'SELECT this'")).is_ok());
        assert!(matches!(
            compile(&conn, &settings, &QueryText::new("Books", "").where_clause("_ID IN (SELECT 1)")),
            Err(QueryError::DisallowedToken(_))
        ));
        assert!(matches!(
            compile(&conn, &settings, &QueryText::new("Books", "LOAD_EXTENSION(Year)")),
            Err(QueryError::DisallowedFunction(_))
        ));
    }

    #[test]
    fn test_duplicate_default_aliases() {
        let (conn, settings) = setup();
        let plan = compile(&conn, &settings, &QueryText::new("Books", "Year, Year")).unwrap();
        assert_eq!(plan.projections[1].alias, "Year_1");
    }
}
