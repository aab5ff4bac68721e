/// FieldDescription: one declared field of a Cargo table
///
/// Built from a declaration string such as `List (;) of String (size=50; mandatory)`.
/// `Display` writes the canonical declaration back, so parse -> to_string -> parse
/// yields an equal description.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::coordinates::Coordinates;
use super::date::parse_date_value;
use super::error::DeclarationError;
use super::field_type::FieldType;
use super::hierarchy::HierarchyTree;
use super::value::PreparedValue;
use crate::config::Settings;
use crate::parser::common::paren_split;
use crate::parser::declaration::{escape_delimiter, parse_field_declaration, Modifier};

/// Delimiter used by list fields declared without one
pub const DEFAULT_DELIMITER: &str = ",";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub field_type: FieldType,
    pub is_list: bool,
    /// Explicit delimiter; lists fall back to `,`
    pub delimiter: Option<String>,
    /// Byte cap for String-like fields
    pub size: Option<usize>,
    pub allowed_values: Option<Vec<String>>,
    pub is_mandatory: bool,
    pub is_unique: bool,
    pub regex: Option<String>,
    pub is_hidden: bool,
    pub is_hierarchy: bool,
    /// Bulleted structure, normalized
    pub hierarchy_structure: Option<String>,
    pub dependent_on: Option<String>,
    /// Unrecognized modifiers; bare flags have an empty value
    pub other_params: BTreeMap<String, String>,
}

impl FieldDescription {
    /// Scalar field of the given type with no modifiers
    #[must_use]
    pub const fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            is_list: false,
            delimiter: None,
            size: None,
            allowed_values: None,
            is_mandatory: false,
            is_unique: false,
            regex: None,
            is_hidden: false,
            is_hierarchy: false,
            hierarchy_structure: None,
            dependent_on: None,
            other_params: BTreeMap::new(),
        }
    }

    /// List field of the given type, split on `delimiter` (or `,`)
    #[must_use]
    pub fn list_of(field_type: FieldType, delimiter: Option<&str>) -> Self {
        Self {
            is_list: true,
            delimiter: delimiter.map(str::to_string),
            ..Self::new(field_type)
        }
    }

    pub fn parse(declaration: &str) -> Result<Self, DeclarationError> {
        let raw = parse_field_declaration(declaration)?;
        let field_type = FieldType::from_name(&raw.type_name)
            .ok_or_else(|| DeclarationError::UnknownType(raw.type_name.clone()))?;

        let mut desc = Self::new(field_type);
        desc.is_list = raw.is_list;
        desc.delimiter = raw.delimiter;

        let mut allowed_raw: Option<String> = None;

        for modifier in raw.modifiers {
            match modifier {
                Modifier::Flag(flag) => match flag.as_str() {
                    "mandatory" => desc.is_mandatory = true,
                    "unique" => desc.is_unique = true,
                    "hidden" => desc.is_hidden = true,
                    "hierarchy" => desc.is_hierarchy = true,
                    _ => {
                        desc.other_params.insert(flag, String::new());
                    }
                },
                Modifier::Param(key, value) => match key.as_str() {
                    "size" => {
                        let size = value
                            .parse::<usize>()
                            .ok()
                            .filter(|s| *s > 0)
                            .ok_or_else(|| DeclarationError::BadParameter {
                                param: key.clone(),
                                value: value.clone(),
                            })?;
                        desc.size = Some(size);
                    }
                    "delimiter" => {
                        if value.is_empty() {
                            return Err(DeclarationError::BadDelimiter(declaration.to_string()));
                        }
                        desc.delimiter = Some(if value == "\\n" { "\n".to_string() } else { value });
                    }
                    "dependent on" => desc.dependent_on = Some(value),
                    "allowed values" => allowed_raw = Some(value),
                    "regex" => {
                        Regex::new(&anchored(&value)).map_err(|e| DeclarationError::BadRegex {
                            pattern: value.clone(),
                            reason: e.to_string(),
                        })?;
                        desc.regex = Some(value);
                    }
                    _ => {
                        desc.other_params.insert(key, value);
                    }
                },
            }
        }

        if desc.is_hierarchy {
            if desc.field_type == FieldType::Coordinates {
                return Err(DeclarationError::HierarchyCoordinates(declaration.trim().to_string()));
            }
            let structure = allowed_raw
                .ok_or_else(|| DeclarationError::BadHierarchy("no values".to_string()))?;
            let tree = HierarchyTree::parse(&structure)?;
            desc.allowed_values = Some(tree.all_values());
            desc.hierarchy_structure = Some(tree.to_structure());
        } else if let Some(values) = allowed_raw {
            let values: Vec<String> = paren_split(',', &values)
                .into_iter()
                .filter(|v| !v.is_empty())
                .collect();
            if !values.is_empty() {
                desc.allowed_values = Some(values);
            }
        }

        Ok(desc)
    }

    /// Delimiter used to split list values
    #[must_use]
    pub fn delimiter(&self) -> &str {
        self.delimiter.as_deref().unwrap_or(DEFAULT_DELIMITER)
    }

    #[must_use]
    pub const fn is_date_or_datetime(&self) -> bool {
        self.field_type.is_date_or_datetime()
    }

    /// Byte cap of String-like fields; None for numeric, date and long text types
    #[must_use]
    pub fn field_size(&self, default_bytes: usize) -> Option<usize> {
        if self.field_type.is_sized_string() {
            Some(self.size.unwrap_or(default_bytes))
        } else {
            None
        }
    }

    /// Parsed hierarchy tree, when declared
    #[must_use]
    pub fn hierarchy(&self) -> Option<HierarchyTree> {
        self.hierarchy_structure
            .as_deref()
            .and_then(|s| HierarchyTree::parse(s).ok())
    }

    /// Trimmed, non-blank elements of a list value
    #[must_use]
    pub fn list_elements<'a>(&self, raw: &'a str) -> Vec<&'a str> {
        let delimiter = self.delimiter();
        raw.split(delimiter)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect()
    }

    fn is_allowed(&self, value: &str) -> bool {
        self.allowed_values
            .as_ref()
            .is_none_or(|allowed| allowed.iter().any(|a| a == value))
    }

    /// Whether the raw value satisfies the `regex` modifier.
    ///
    /// The pattern must match the whole value, or every element of a list.
    #[must_use]
    pub fn matches_regex(&self, raw: &str) -> bool {
        let Some(pattern) = &self.regex else {
            return true;
        };
        let Ok(re) = Regex::new(&anchored(pattern)) else {
            return false;
        };
        if self.is_list {
            self.list_elements(raw).iter().all(|v| re.is_match(v))
        } else {
            re.is_match(raw.trim())
        }
    }

    /// Normalize a raw value for storage.
    ///
    /// Lists are split, filtered against allowed values and joined again with
    /// the delimiter; scalars are coerced by type. Values that cannot be
    /// coerced come back blank.
    #[must_use]
    pub fn prepare_and_validate_value(&self, raw: &str, settings: &Settings) -> PreparedValue {
        let raw = raw.trim();
        if raw.is_empty() {
            return PreparedValue::blank();
        }

        if self.is_list {
            let kept: Vec<String> = self
                .prepare_list(raw, settings)
                .into_iter()
                .filter_map(|p| p.value)
                .collect();
            if kept.is_empty() {
                return PreparedValue::blank();
            }
            return PreparedValue::text(kept.join(self.delimiter()));
        }

        if !self.is_allowed(raw) {
            return PreparedValue::blank();
        }
        self.prepare_scalar(raw, settings)
    }

    /// Prepared elements of a list value, in order; blank, disallowed and
    /// uncoercible elements are dropped
    #[must_use]
    pub fn prepare_list(&self, raw: &str, settings: &Settings) -> Vec<PreparedValue> {
        self.list_elements(raw)
            .into_iter()
            .filter(|v| self.is_allowed(v))
            .map(|v| self.prepare_scalar(v, settings))
            .filter(|p| !p.is_blank())
            .collect()
    }

    /// Type coercion of a single (non-list) value
    #[must_use]
    pub fn prepare_scalar(&self, raw: &str, settings: &Settings) -> PreparedValue {
        let raw = raw.trim();
        if raw.is_empty() {
            return PreparedValue::blank();
        }

        match self.field_type {
            t if t.is_date_or_datetime() => match parse_date_value(raw, t.has_time()) {
                Some(parsed) => PreparedValue {
                    value: Some(parsed.value),
                    precision: Some(parsed.precision),
                },
                None => PreparedValue::blank(),
            },
            FieldType::Integer => parse_number(raw, settings)
                .map(|n| PreparedValue::text((n.round() as i64).to_string()))
                .unwrap_or_else(PreparedValue::blank),
            FieldType::Float | FieldType::Rating => parse_number(raw, settings)
                .map(|n| PreparedValue::text(n.to_string()))
                .unwrap_or_else(PreparedValue::blank),
            FieldType::Boolean => {
                let lower = raw.to_lowercase();
                let value = if matches!(lower.as_str(), "0" | "no" | "false") { "0" } else { "1" };
                PreparedValue::text(value.to_string())
            }
            FieldType::Coordinates => match Coordinates::parse(raw) {
                Some(c) => PreparedValue::text(c.to_string()),
                None => PreparedValue::blank(),
            },
            FieldType::Page => PreparedValue::text(normalize_page_name(raw)),
            FieldType::File => {
                let name = strip_file_prefix(raw);
                PreparedValue::text(normalize_page_name(name))
            }
            _ => PreparedValue::text(raw.to_string()),
        }
    }
}

fn anchored(pattern: &str) -> String {
    format!("^(?:{pattern})$")
}

fn parse_number(raw: &str, settings: &Settings) -> Option<f64> {
    let mut s = raw.to_string();
    if !settings.digit_grouping_character.is_empty() {
        s = s.replace(&settings.digit_grouping_character, "");
    }
    if !settings.decimal_mark.is_empty() && settings.decimal_mark != "." {
        s = s.replace(&settings.decimal_mark, ".");
    }
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Wiki page names: underscores are spaces, first letter is upper case
fn normalize_page_name(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    let trimmed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn strip_file_prefix(raw: &str) -> &str {
    for prefix in ["File:", "Image:"] {
        if raw.get(..prefix.len()).is_some_and(|p| p.eq_ignore_ascii_case(prefix)) {
            return raw.get(prefix.len()..).map_or(raw, str::trim);
        }
    }
    raw
}

impl FromStr for FieldDescription {
    type Err = DeclarationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_list {
            match &self.delimiter {
                Some(d) => write!(f, "List ({}) of ", escape_delimiter(d))?,
                None => write!(f, "List of ")?,
            }
        }
        write!(f, "{}", self.field_type)?;

        let mut modifiers: Vec<String> = Vec::new();
        if let Some(size) = self.size {
            modifiers.push(format!("size={size}"));
        }
        if !self.is_list {
            if let Some(d) = &self.delimiter {
                modifiers.push(format!("delimiter={}", escape_delimiter(d)));
            }
        }
        if let Some(dep) = &self.dependent_on {
            modifiers.push(format!("dependent on={dep}"));
        }
        if self.is_hierarchy {
            modifiers.push("hierarchy".to_string());
            if let Some(structure) = &self.hierarchy_structure {
                modifiers.push(format!("allowed values={structure}"));
            }
        } else if let Some(values) = &self.allowed_values {
            modifiers.push(format!("allowed values={}", values.join(",")));
        }
        if let Some(re) = &self.regex {
            modifiers.push(format!("regex={re}"));
        }
        if self.is_mandatory {
            modifiers.push("mandatory".to_string());
        }
        if self.is_unique {
            modifiers.push("unique".to_string());
        }
        if self.is_hidden {
            modifiers.push("hidden".to_string());
        }
        for (key, value) in &self.other_params {
            if value.is_empty() {
                modifiers.push(key.clone());
            } else {
                modifiers.push(format!("{key}={value}"));
            }
        }

        if !modifiers.is_empty() {
            write!(f, " ({})", modifiers.join(";"))?;
        }
        Ok(())
    }
}
