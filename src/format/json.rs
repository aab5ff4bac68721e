use serde_json::{Map, Value as JsonValue};

use super::DisplayParams;
use crate::executor::RowSet;

/// Array of row objects keyed by column alias; list fields become arrays
pub fn render(rows: &RowSet, _params: &DisplayParams) -> String {
    let objects: Vec<JsonValue> = (0..rows.len())
        .map(|row| {
            let mut object = Map::new();
            for (c, alias) in rows.columns.iter().enumerate() {
                let value = if rows.descriptions[c].is_list {
                    JsonValue::from(rows.list_values(row, alias))
                } else {
                    rows.rows[row][c].to_json()
                };
                object.insert(alias.clone(), value);
            }
            JsonValue::Object(object)
        })
        .collect();
    JsonValue::Array(objects).to_string()
}
