use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Runtime settings shared by storage, lifecycle and query code.
///
/// Loaded with priority: explicit file > ENV (`CARGOQL_*`) > config file in
/// the usual locations > defaults.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Prefix of every physical table (`Books` -> `cargo__Books`)
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    /// Byte cap for String-like fields declared without `size`
    #[serde(default = "default_string_bytes")]
    pub default_string_bytes: usize,
    #[serde(default = "default_query_limit")]
    pub default_query_limit: usize,
    /// Any requested limit above this is clamped to it
    #[serde(default = "default_max_query_limit")]
    pub max_query_limit: usize,
    #[serde(default = "default_digit_grouping_character")]
    pub digit_grouping_character: String,
    #[serde(default = "default_decimal_mark")]
    pub decimal_mark: String,
    /// Prefix length compared by the duplicate-row check for long text fields
    #[serde(default = "default_text_compare_chars")]
    pub text_compare_chars: usize,
}

fn default_table_prefix() -> String { "cargo__".to_string() }
fn default_string_bytes() -> usize { 300 }
fn default_query_limit() -> usize { 100 }
fn default_max_query_limit() -> usize { 5000 }
fn default_digit_grouping_character() -> String { ",".to_string() }
fn default_decimal_mark() -> String { ".".to_string() }
fn default_text_compare_chars() -> usize { 100 }

impl Default for Settings {
    fn default() -> Self {
        Self {
            table_prefix: default_table_prefix(),
            default_string_bytes: default_string_bytes(),
            default_query_limit: default_query_limit(),
            max_query_limit: default_max_query_limit(),
            digit_grouping_character: default_digit_grouping_character(),
            decimal_mark: default_decimal_mark(),
            text_compare_chars: default_text_compare_chars(),
        }
    }
}

impl Settings {
    /// Load settings from an optional explicit file, the default locations and ENV
    pub fn load(explicit: Option<&Path>) -> Result<Self, config::ConfigError> {
        let config_paths = ["/etc/cargoql/cargoql.toml", "./cargoql.toml"];

        let mut builder = Config::builder();

        for path in &config_paths {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
                log::info!("Loaded config from: {path}");
                break;
            }
        }

        builder = builder.add_source(Environment::with_prefix("CARGOQL").try_parsing(true));

        // Explicit file wins over everything else
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path));
        }

        builder.build()?.try_deserialize::<Self>()
    }

    /// Effective limit for a query: requested or default, never above the maximum
    #[must_use]
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_query_limit)
            .min(self.max_query_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.table_prefix, "cargo__");
        assert_eq!(settings.default_string_bytes, 300);
        assert_eq!(settings.default_query_limit, 100);
        assert_eq!(settings.max_query_limit, 5000);
    }

    #[test]
    fn test_effective_limit_is_clamped() {
        let settings = Settings::default();
        assert_eq!(settings.effective_limit(None), 100);
        assert_eq!(settings.effective_limit(Some(20)), 20);
        assert_eq!(settings.effective_limit(Some(100_000)), 5000);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cargoql.toml");
        std::fs::write(&path, "max_query_limit = 50\ndecimal_mark = \",\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.max_query_limit, 50);
        assert_eq!(settings.decimal_mark, ",");
        assert_eq!(settings.table_prefix, "cargo__");
    }
}
