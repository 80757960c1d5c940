use std::collections::BTreeMap;

pub mod locate;
pub mod xlsx;

/// Sparse grid of text cells, addressed by 1-indexed (row, column).
///
/// Only non-empty cells are stored, so every stored cell counts as "used".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sheet {
    cells: BTreeMap<(u32, u32), String>,
}

impl Sheet {
    pub fn new() -> Self {
        Sheet {
            cells: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, row: u32, col: u32, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&str> {
        self.cells.get(&(row, col)).map(String::as_str)
    }

    pub fn is_empty_at(&self, row: u32, col: u32) -> bool {
        self.get(row, col).is_none()
    }

    /// Used cells in row-major order: ascending row, then ascending column.
    pub fn cells_used(&self) -> impl Iterator<Item = Cell<'_>> {
        self.cells.iter().map(|(&(row, col), value)| Cell {
            row,
            col,
            value: value.as_str(),
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell<'a> {
    pub row: u32,
    pub col: u32,
    pub value: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_used_is_row_major() {
        let mut sheet = Sheet::new();
        sheet.set(2, 1, "c");
        sheet.set(1, 3, "b");
        sheet.set(1, 1, "a");
        let order: Vec<&str> = sheet.cells_used().map(|c| c.value).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_values_are_not_used() {
        let mut sheet = Sheet::new();
        sheet.set(1, 1, "x");
        sheet.set(1, 1, "");
        sheet.set(1, 2, "");
        assert!(sheet.is_empty());
        assert!(sheet.is_empty_at(1, 1));
    }
}
