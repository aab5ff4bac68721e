use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::DeclarationError;
use super::field_description::FieldDescription;
use super::field_type::{DateRole, FieldType};

/// Implicit columns of every main table
pub const SYSTEM_FIELDS: [&str; 5] = ["_pageName", "_pageTitle", "_pageNamespace", "_pageID", "_ID"];

/// Declared join to another Cargo table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentTable {
    pub table: String,
    pub alias: String,
    pub local_field: String,
    pub remote_field: String,
}

impl ParentTable {
    /// Join on `_pageName` at both ends, aliased by the table name
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            alias: table.clone(),
            table,
            local_field: "_pageName".to_string(),
            remote_field: "_pageName".to_string(),
        }
    }
}

/// Drilldown tab for the browsing UI; kept as declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrilldownTab {
    pub name: String,
    pub params: BTreeMap<String, String>,
}

/// Ordered field name -> FieldDescription mapping of one Cargo table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    fields: Vec<(String, FieldDescription)>,
    #[serde(default)]
    pub parent_tables: Vec<ParentTable>,
    #[serde(default)]
    pub drilldown_tabs: Vec<DrilldownTab>,
}

impl TableSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, enforcing unique names and the start/end date rules
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        desc: FieldDescription,
    ) -> Result<(), DeclarationError> {
        let name = name.into();
        if self.fields.iter().any(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            return Err(DeclarationError::DuplicateField(name));
        }

        if let Some(role) = desc.field_type.date_role() {
            if let Some(existing) = self.field_with_role(role) {
                let label = match role {
                    DateRole::Start => "Start date",
                    DateRole::End => "End date",
                };
                log::debug!("second {label} field '{name}', first is '{existing}'");
                return Err(DeclarationError::DuplicateDateRole(label.to_string()));
            }
            if role == DateRole::Start {
                if let Some(end) = self.field_with_role(DateRole::End) {
                    return Err(DeclarationError::EndBeforeStart {
                        start: name,
                        end: end.to_string(),
                    });
                }
            }
        }

        self.fields.push((name, desc));
        Ok(())
    }

    fn field_with_role(&self, role: DateRole) -> Option<&str> {
        self.fields
            .iter()
            .find(|(_, d)| d.field_type.date_role() == Some(role))
            .map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescription> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Declared field or one of the system fields
    #[must_use]
    pub fn resolve_field(&self, name: &str) -> Option<FieldDescription> {
        self.field(name)
            .cloned()
            .or_else(|| system_field_description(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescription)> {
        self.fields.iter().map(|(n, d)| (n.as_str(), d))
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether any File field exists, so a `___files` helper is needed
    #[must_use]
    pub fn has_files(&self) -> bool {
        self.fields.iter().any(|(_, d)| d.field_type == FieldType::File)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// FieldDescription of a system field, None for any other name
#[must_use]
pub fn system_field_description(name: &str) -> Option<FieldDescription> {
    let field_type = match name {
        "_pageName" => FieldType::Page,
        "_pageTitle" => FieldType::String,
        "_pageNamespace" | "_pageID" | "_ID" => FieldType::Integer,
        _ => return None,
    };
    Some(FieldDescription::new(field_type))
}
