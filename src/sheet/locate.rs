//! Find data by header text rather than fixed coordinates.
//!
//! Every lookup scans the used cells in row-major order and the first cell whose
//! trimmed text equals the label (ignoring ASCII case) wins.

use super::{Cell, Sheet};

fn matches_label(cell: &Cell, label: &str) -> bool {
    cell.value.trim().eq_ignore_ascii_case(label.trim())
}

fn find_cell<'a>(sheet: &'a Sheet, label: &str) -> Option<Cell<'a>> {
    sheet.cells_used().find(|c| matches_label(c, label))
}

/// Trimmed text of the cell directly below the first cell labelled `label`.
///
/// Returns `Some("")` when the label exists but nothing is below it.
pub fn find_labeled_value(sheet: &Sheet, label: &str) -> Option<String> {
    let cell = find_cell(sheet, label)?;
    Some(
        sheet
            .get(cell.row + 1, cell.col)
            .unwrap_or_default()
            .trim()
            .to_string(),
    )
}

pub fn find_header_row(sheet: &Sheet, label: &str) -> Option<u32> {
    find_cell(sheet, label).map(|c| c.row)
}

/// Column of the first cell matching any of `labels`.
///
/// The candidates are synonyms: their order does not matter, scan order does.
pub fn find_column(sheet: &Sheet, labels: &[&str]) -> Option<u32> {
    sheet
        .cells_used()
        .find(|c| labels.iter().any(|l| matches_label(c, l)))
        .map(|c| c.col)
}
