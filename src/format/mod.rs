/// Display formatter dispatch
///
/// A format is either immediate (renders an already executed `RowSet`) or
/// deferred (receives the queries and runs them itself). Formats are
/// looked up by name in a `FormatRegistry`.

pub mod count;
pub mod json;
pub mod list;
pub mod table;

use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::config::Settings;
use crate::core::QueryError;
use crate::executor::{QueryExecutor, RowSet};
use crate::query::{QueryCompiler, QueryText};

/// Display parameters shared by the built-in formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayParams {
    /// Separator between rows of inline formats
    pub delimiter: String,
    pub intro: String,
    pub outro: String,
    /// Text shown when the query returns nothing
    pub default: String,
    /// Appended when the result may have been cut by the limit
    pub more_results_text: Option<String>,
}

impl Default for DisplayParams {
    fn default() -> Self {
        Self {
            delimiter: ", ".to_string(),
            intro: String::new(),
            outro: String::new(),
            default: "No results".to_string(),
            more_results_text: None,
        }
    }
}

impl DisplayParams {
    /// Build from `name=value` pairs; unknown names are rejected
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, QueryError>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref().trim().replace(' ', "_").as_str() {
                "delimiter" => params.delimiter = value,
                "intro" => params.intro = value,
                "outro" => params.outro = value,
                "default" => params.default = value,
                "more_results_text" => params.more_results_text = Some(value),
                other => return Err(QueryError::Parse(format!("unknown display parameter '{other}'"))),
            }
        }
        Ok(params)
    }
}

pub type ImmediateFn = fn(&RowSet, &DisplayParams) -> String;
pub type DeferredFn = fn(&Connection, &Settings, &[QueryText], &DisplayParams) -> Result<String, QueryError>;

#[derive(Debug, Clone, Copy)]
pub enum Formatter {
    Immediate(ImmediateFn),
    Deferred(DeferredFn),
}

pub struct FormatRegistry {
    formats: BTreeMap<String, Formatter>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FormatRegistry {
    /// `table`, `list`, `ul`, `json` and `count`
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self {
            formats: BTreeMap::new(),
        };
        registry.register("table", Formatter::Immediate(table::render));
        registry.register("list", Formatter::Immediate(list::render_inline));
        registry.register("ul", Formatter::Immediate(list::render_bulleted));
        registry.register("json", Formatter::Immediate(json::render));
        registry.register("count", Formatter::Deferred(count::render));
        registry
    }

    pub fn register(&mut self, name: &str, formatter: Formatter) {
        self.formats.insert(name.to_lowercase(), formatter);
    }

    pub fn get(&self, name: &str) -> Result<Formatter, QueryError> {
        self.formats
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| QueryError::UnknownFormat(name.to_string()))
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.formats.keys().map(String::as_str).collect()
    }

    /// Run the queries and render them with the named format
    pub fn render(
        &self,
        conn: &Connection,
        settings: &Settings,
        format: &str,
        queries: &[QueryText],
        params: &DisplayParams,
    ) -> Result<String, QueryError> {
        match self.get(format)? {
            Formatter::Deferred(render) => render(conn, settings, queries, params),
            Formatter::Immediate(render) => {
                let mut parts = Vec::with_capacity(queries.len());
                for query in queries {
                    let plan = QueryCompiler::new(conn, settings).compile(query)?;
                    let rows = QueryExecutor::run(conn, &plan)?;
                    parts.push(wrap(&rows, params, render));
                }
                Ok(parts.join("\n"))
            }
        }
    }
}

/// Intro, outro, empty-result text and the "more results" hint around a
/// rendered row set
fn wrap(rows: &RowSet, params: &DisplayParams, render: ImmediateFn) -> String {
    if rows.is_empty() {
        return params.default.clone();
    }
    let mut out = format!("{}{}{}", params.intro, render(rows, params), params.outro);
    if let Some(more) = params.more_results_text.as_ref().filter(|_| rows.possibly_more()) {
        out.push('\n');
        out.push_str(more);
    }
    out
}

/// Columns worth showing: generated precision and lat/lon columns are left out
pub(crate) fn display_columns(rows: &RowSet) -> Vec<usize> {
    rows.columns
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.ends_with("__precision") && !c.ends_with("  lat") && !c.ends_with("  lon"))
        .map(|(i, _)| i)
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = FormatRegistry::builtin();
        assert_eq!(registry.names(), vec!["count", "json", "list", "table", "ul"]);
        assert!(matches!(registry.get("TABLE"), Ok(Formatter::Immediate(_))));
        assert!(matches!(registry.get("count"), Ok(Formatter::Deferred(_))));
        assert!(matches!(registry.get("calendar"), Err(QueryError::UnknownFormat(_))));
    }

    #[test]
    fn test_display_params() {
        let params = DisplayParams::from_pairs([("delimiter", "; "), ("more results text", "More...")]).unwrap();
        assert_eq!(params.delimiter, "; ");
        assert_eq!(params.more_results_text.as_deref(), Some("More..."));
        assert!(DisplayParams::from_pairs([("colour", "red")]).is_err());
    }

    #[test]
    fn test_wrap() {
        let rows = test_support::sample_rows();
        let params = DisplayParams {
            intro: "<".to_string(),
            outro: ">".to_string(),
            more_results_text: Some("more".to_string()),
            ..DisplayParams::default()
        };
        assert_eq!(wrap(&rows, &params, list::render_inline), "<Lorem Ipsum (John Doe,Jane Miller, 1999), A Test (2005)>\nmore");

        let empty = RowSet { rows: Vec::new(), pages: Vec::new(), ..rows };
        assert_eq!(wrap(&empty, &params, list::render_inline), "No results");
    }
}
