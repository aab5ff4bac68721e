use comfy_table::{presets::UTF8_FULL, Cell, Table as ComfyTable};

use super::{display_columns, DisplayParams};
use crate::executor::RowSet;

/// Bordered table with one header cell per displayed column.
/// List values are joined with the list delimiter of their field.
pub fn render(rows: &RowSet, _params: &DisplayParams) -> String {
    let columns = display_columns(rows);

    let mut table = ComfyTable::new();
    table.load_preset(UTF8_FULL);
    table.set_header(columns.iter().map(|&c| Cell::new(&rows.columns[c])));

    for row in 0..rows.len() {
        table.add_row(columns.iter().map(|&c| {
            let alias = &rows.columns[c];
            let text = match rows.description(alias) {
                Some(desc) if desc.is_list => rows.list_values(row, alias).join(&format!("{} ", desc.delimiter())),
                _ => rows.rows[row][c].to_string(),
            };
            Cell::new(text)
        }));
    }

    format!("{table}\n({} rows)", rows.len())
}
