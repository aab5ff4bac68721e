/// Table declaration strings
///
/// `_table=Books|Title=String (mandatory)|Authors=List (,) of Page`
///
/// `_parentTables` entries are separated by `;`, each with optional
/// `(_localField=..., _remoteField=..., _alias=...)` parameters.
/// `_drilldownTabs` entries are separated by `,`, each with optional
/// `(key=value; ...)` parameters.

use std::collections::BTreeMap;

use super::naming::validate_name;
use crate::core::{DeclarationError, DrilldownTab, FieldDescription, NameKind, ParentTable, TableSchema};
use crate::parser::common::paren_split;

/// Separator between `key=value` pairs of a declaration string
pub const PAIR_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDeclaration {
    pub table_name: String,
    pub schema: TableSchema,
}

impl TableDeclaration {
    pub fn parse(input: &str) -> Result<Self, DeclarationError> {
        let mut pairs = Vec::new();
        for piece in paren_split(PAIR_SEPARATOR, input) {
            if piece.is_empty() {
                continue;
            }
            let (key, value) = piece
                .split_once('=')
                .ok_or_else(|| DeclarationError::Malformed(format!("expected key=value, got '{piece}'")))?;
            pairs.push((key.trim().to_string(), value.trim().to_string()));
        }
        Self::from_pairs(pairs)
    }

    /// Build from already separated parameters, in declaration order
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, DeclarationError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut table_name = None;
        let mut schema = TableSchema::new();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref().trim(), value.as_ref().trim());
            match key {
                "_table" => {
                    validate_name(value, NameKind::Table)?;
                    table_name = Some(value.to_string());
                }
                "_parentTables" => schema.parent_tables = parse_parent_tables(value)?,
                "_drilldownTabs" => schema.drilldown_tabs = parse_drilldown_tabs(value)?,
                k if k.starts_with('_') => {
                    log::warn!("Ignoring unknown declaration parameter '{k}'");
                }
                field => {
                    validate_name(field, NameKind::Field)?;
                    let desc = FieldDescription::parse(value)?;
                    schema.add_field(field, desc)?;
                }
            }
        }

        let table_name = table_name.ok_or(DeclarationError::MissingTable)?;
        Ok(Self { table_name, schema })
    }
}

/// Split `Name(params)` into the name and the parameter text
fn name_and_params(entry: &str) -> Result<(&str, Option<&str>), DeclarationError> {
    match entry.find('(') {
        Some(open) => {
            let params = entry[open + 1..]
                .trim_end()
                .strip_suffix(')')
                .ok_or_else(|| DeclarationError::UnbalancedParentheses(entry.to_string()))?;
            Ok((entry[..open].trim(), Some(params)))
        }
        None => Ok((entry.trim(), None)),
    }
}

fn key_value(piece: &str) -> Result<(String, String), DeclarationError> {
    piece
        .split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| DeclarationError::Malformed(format!("expected key=value, got '{piece}'")))
}

pub fn parse_parent_tables(value: &str) -> Result<Vec<ParentTable>, DeclarationError> {
    let mut parents: Vec<ParentTable> = Vec::new();

    for entry in paren_split(';', value) {
        if entry.is_empty() {
            continue;
        }
        let (name, params) = name_and_params(&entry)?;
        validate_name(name, NameKind::Table)?;
        let mut parent = ParentTable::new(name);

        for piece in params.map(|p| paren_split(',', p)).unwrap_or_default() {
            if piece.is_empty() {
                continue;
            }
            let (key, val) = key_value(&piece)?;
            match key.as_str() {
                "_localField" => parent.local_field = val,
                "_remoteField" => parent.remote_field = val,
                "_alias" => parent.alias = val,
                other => {
                    return Err(DeclarationError::BadParameter {
                        param: other.to_string(),
                        value: val,
                    })
                }
            }
        }

        let taken = parents
            .iter()
            .filter(|p| p.alias == parent.alias || p.alias.starts_with(&format!("{}_", parent.alias)))
            .count();
        if taken > 0 {
            parent.alias = format!("{}_{taken}", parent.alias);
        }
        parents.push(parent);
    }
    Ok(parents)
}

pub fn parse_drilldown_tabs(value: &str) -> Result<Vec<DrilldownTab>, DeclarationError> {
    let mut tabs = Vec::new();
    for entry in paren_split(',', value) {
        if entry.is_empty() {
            continue;
        }
        let (name, params) = name_and_params(&entry)?;
        if name.is_empty() {
            return Err(DeclarationError::Malformed(format!("drilldown tab without a name: '{entry}'")));
        }
        let mut map = BTreeMap::new();
        for piece in params.map(|p| paren_split(';', p)).unwrap_or_default() {
            if piece.is_empty() {
                continue;
            }
            let (key, val) = key_value(&piece)?;
            map.insert(key, val);
        }
        tabs.push(DrilldownTab {
            name: name.to_string(),
            params: map,
        });
    }
    Ok(tabs)
}
