use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{TablePullError, TablePullResult};

/// A single recognized text fragment at a row/column position within a
/// detected table. Produced by the analysis service; indices are 0-based.
///
/// Indices are carried as `i64` so that a malformed payload with negative
/// positions is representable and can be rejected instead of wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub row_index: i64,
    pub column_index: i64,
    pub content: String,
}

impl Cell {
    pub fn new(row_index: i64, column_index: i64, content: impl Into<String>) -> Self {
        Self {
            row_index,
            column_index,
            content: content.into(),
        }
    }
}

/// A reconstructed rectangular table: the first recognized row promoted to a
/// header, remaining rows kept as positional values.
///
/// `header` and `rows` always have uniform width. The default value is the
/// distinct empty table (zero rows, zero columns) produced for empty cell
/// input; callers must check `is_empty` before indexing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from an unordered collection of recognized cells.
    ///
    /// Dimensions come from the maximum observed indices: width is
    /// `1 + max(column_index)`, height is `1 + max(row_index)`. Positions
    /// without a supplied cell stay empty strings, and when two cells share a
    /// coordinate the later one in input order wins. Row 0 becomes the
    /// header; if no cell has row index 0 the header keeps its empty-string
    /// defaults.
    ///
    /// Fails with `InvalidIndex` if any cell carries a negative row or
    /// column index.
    pub fn from_cells(cells: &[Cell]) -> TablePullResult<Table> {
        if cells.is_empty() {
            return Ok(Table::default());
        }

        let mut num_rows = 0usize;
        let mut num_cols = 0usize;
        for cell in cells {
            if cell.row_index < 0 || cell.column_index < 0 {
                return Err(TablePullError::InvalidIndex {
                    row: cell.row_index,
                    column: cell.column_index,
                });
            }
            num_rows = num_rows.max(cell.row_index as usize + 1);
            num_cols = num_cols.max(cell.column_index as usize + 1);
        }

        // Positional grid first; naming happens afterwards.
        let mut grid = vec![vec![String::new(); num_cols]; num_rows];
        for cell in cells {
            grid[cell.row_index as usize][cell.column_index as usize] = cell.content.clone();
        }

        let mut rows = grid.into_iter();
        let header = rows.next().unwrap_or_default();

        Ok(Table {
            header,
            rows: rows.collect(),
        })
    }

    /// True only for the table built from empty input.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Number of rows including the header.
    pub fn height(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            1 + self.rows.len()
        }
    }

    /// Name-keyed view of one body row (0-based, header excluded).
    ///
    /// When the header contains duplicate names the later column wins in the
    /// mapping; use positional access through `rows` when strict column
    /// identity matters.
    pub fn record(&self, row: usize) -> Option<HashMap<&str, &str>> {
        let values = self.rows.get(row)?;
        let mut record = HashMap::with_capacity(self.header.len());
        for (name, value) in self.header.iter().zip(values) {
            record.insert(name.as_str(), value.as_str());
        }
        Some(record)
    }

    /// Name-keyed views of all body rows, in row order.
    pub fn records(&self) -> impl Iterator<Item = HashMap<&str, &str>> + '_ {
        (0..self.rows.len()).filter_map(|row| self.record(row))
    }
}
