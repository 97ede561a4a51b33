//! Cell-level mutation operations
//!
//! The annotation collector and the profile transformer reduce a grid to a
//! flat list of [`Operation`]s. Operations are produced once, in a stable
//! order, and never reordered downstream: remote services are sensitive to
//! index shifts caused by row/column deletion, so deletions are always
//! emitted as maximal contiguous ranges in descending index order.

use crate::types::RequirementLevel;
use serde::{Deserialize, Serialize};

/// Zero-based half-open cell range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    /// First row, inclusive
    pub start_row: usize,
    /// Last row, exclusive
    pub end_row: usize,
    /// First column, inclusive
    pub start_col: usize,
    /// Last column, exclusive
    pub end_col: usize,
}

impl CellRange {
    /// A single cell
    #[must_use]
    pub fn cell(row: usize, col: usize) -> Self {
        Self {
            start_row: row,
            end_row: row + 1,
            start_col: col,
            end_col: col + 1,
        }
    }

    /// A horizontal run within one row
    #[must_use]
    pub fn row_span(row: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            start_row: row,
            end_row: row + 1,
            start_col,
            end_col,
        }
    }

    /// A vertical run within one column
    #[must_use]
    pub fn col_span(col: usize, start_row: usize, end_row: usize) -> Self {
        Self {
            start_row,
            end_row,
            start_col: col,
            end_col: col + 1,
        }
    }

    /// A rectangular block
    #[must_use]
    pub fn block(start_row: usize, end_row: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            start_row,
            end_row,
            start_col,
            end_col,
        }
    }
}

/// What an operation does to its range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Write a row-major block of literal cell text
    SetValues {
        /// Cell text, one inner vector per row of the range
        rows: Vec<Vec<String>>,
    },
    /// Set bold emphasis across the range
    SetEmphasis {
        /// Bold on or off
        bold: bool,
    },
    /// Paint the requirement-level background class across the range
    SetBackground {
        /// Requirement level providing the color class
        level: RequirementLevel,
    },
    /// Attach an explanatory note to the range
    SetNote {
        /// Note text
        note: String,
    },
    /// Constrain the range to an enumerated list of values
    SetConstraint {
        /// Permitted values, in order
        values: Vec<String>,
        /// Enforce membership, or merely suggest
        strict: bool,
    },
    /// Delete the rows covered by the range
    DeleteRows,
    /// Delete the columns covered by the range
    DeleteColumns,
    /// Resize the sheet to the given dimensions
    Resize {
        /// New row count
        rows: usize,
        /// New column count
        cols: usize,
    },
}

/// One atomic intended mutation against a remote grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Remote sheet the operation targets
    pub sheet_id: i64,
    /// Affected cell range
    pub range: CellRange,
    /// What to do
    pub kind: OperationKind,
}

impl Operation {
    /// Create an operation
    #[must_use]
    pub fn new(sheet_id: i64, range: CellRange, kind: OperationKind) -> Self {
        Self {
            sheet_id,
            range,
            kind,
        }
    }
}

/// Convert a list of indices into maximal contiguous half-open ranges,
/// ordered descending. Emitting deletions in this order keeps earlier
/// ranges valid while later ones are applied.
#[must_use]
pub fn coalesce_descending(indices: &[usize]) -> Vec<(usize, usize)> {
    if indices.is_empty() {
        return Vec::new();
    }
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges = Vec::new();
    let mut start = sorted[0];
    let mut prev = sorted[0];
    for &idx in &sorted[1..] {
        if idx == prev + 1 {
            prev = idx;
        } else {
            ranges.push((start, prev + 1));
            start = idx;
            prev = idx;
        }
    }
    ranges.push((start, prev + 1));
    ranges.reverse();
    ranges
}
