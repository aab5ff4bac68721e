// `list` and `ul` formats: first column, then the other values in parentheses

use super::{display_columns, DisplayParams};
use crate::executor::RowSet;

fn row_text(rows: &RowSet, row: usize, columns: &[usize]) -> String {
    let values: Vec<String> = columns
        .iter()
        .map(|&c| rows.rows[row][c].to_string())
        .collect();
    let Some((first, rest)) = values.split_first() else {
        return String::new();
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).filter(|v| !v.is_empty()).collect();
    if rest.is_empty() {
        first.clone()
    } else {
        format!("{first} ({})", rest.join(", "))
    }
}

/// Rows on one line, separated by the delimiter
pub fn render_inline(rows: &RowSet, params: &DisplayParams) -> String {
    let columns = display_columns(rows);
    (0..rows.len())
        .map(|row| row_text(rows, row, &columns))
        .collect::<Vec<_>>()
        .join(&params.delimiter)
}

/// One `* row` line per row
pub fn render_bulleted(rows: &RowSet, _params: &DisplayParams) -> String {
    let columns = display_columns(rows);
    (0..rows.len())
        .map(|row| format!("* {}", row_text(rows, row, &columns)))
        .collect::<Vec<_>>()
        .join("\n")
}
