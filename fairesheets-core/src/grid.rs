//! In-memory grid model
//!
//! A [`Grid`] is a rectangle of annotated [`Cell`]s plus the designated
//! structural axes that join it back to the checklist schema: exactly one
//! field-name row or column, one requirement-level row or column, and at most
//! one section row or column. Field-to-index resolution happens once, during
//! assembly, and is carried in the grid itself; nothing ever searches for a
//! column by label at mutation time.

use crate::types::RequirementLevel;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An enumerated-choice constraint attached to a value cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Permitted values, in vocabulary order
    pub values: Vec<String>,
    /// Whether the remote UI should enforce membership or merely suggest it
    pub strict: bool,
}

/// One grid cell with its annotations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Cell text, possibly empty
    pub value: String,
    /// Bold emphasis
    pub emphasis: bool,
    /// Requirement-level background class
    pub background: Option<RequirementLevel>,
    /// Explanatory note
    pub note: Option<String>,
    /// Enumerated-choice constraint
    pub constraint: Option<Constraint>,
}

impl Cell {
    /// An empty, unannotated cell
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A plain text cell
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }
}

/// Orientation of a grid with respect to the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridLayout {
    /// One field per row; structural columns carry name, section, level
    /// (project-style metadata grids)
    FieldPerRow,
    /// One field per column; structural rows carry section, level, name
    /// (wide sample-style metadata grids)
    FieldPerColumn,
}

/// A named rectangle of cells bound to a remote sheet
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Grid name (remote sheet title)
    pub name: String,
    /// Remote sheet identifier
    pub sheet_id: i64,
    /// Orientation
    pub layout: GridLayout,
    /// Index of the row or column holding field names, along the cross axis
    pub name_axis: usize,
    /// Index of the requirement-level row or column
    pub level_axis: Option<usize>,
    /// Index of the section row or column
    pub section_axis: Option<usize>,
    /// Index of the value column (field-per-row) or first data row
    /// (field-per-column)
    pub value_axis: Option<usize>,
    /// Leading structural rows that later expansion must never overwrite
    pub reserved_rows: usize,
    cells: Vec<Vec<Cell>>,
    field_index: IndexMap<String, usize>,
}

impl Grid {
    /// Create an empty grid bound to a remote sheet
    #[must_use]
    pub fn new(name: impl Into<String>, sheet_id: i64, layout: GridLayout) -> Self {
        Self {
            name: name.into(),
            sheet_id,
            layout,
            name_axis: 0,
            level_axis: None,
            section_axis: None,
            value_axis: None,
            reserved_rows: 0,
            cells: Vec::new(),
            field_index: IndexMap::new(),
        }
    }

    /// Number of rows
    #[must_use]
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    /// Number of columns
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    /// Grow the rectangle to at least the given shape, padding with empty cells
    pub fn ensure_shape(&mut self, rows: usize, cols: usize) {
        let cols = cols.max(self.cols());
        for row in &mut self.cells {
            row.resize_with(cols, Cell::empty);
        }
        while self.cells.len() < rows {
            self.cells.push(vec![Cell::empty(); cols]);
        }
    }

    /// Borrow a cell, if inside the rectangle
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// Mutably borrow a cell, growing the rectangle to fit
    pub fn cell_mut(&mut self, row: usize, col: usize) -> &mut Cell {
        self.ensure_shape(row + 1, col + 1);
        &mut self.cells[row][col]
    }

    /// Cell text, or empty when outside the rectangle
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> &str {
        self.cell(row, col).map_or("", |c| c.value.as_str())
    }

    /// Record where a field landed along the field axis
    pub fn bind_field(&mut self, name: impl Into<String>, index: usize) {
        self.field_index.insert(name.into(), index);
    }

    /// Row (field-per-row) or column (field-per-column) of a field
    #[must_use]
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.field_index.get(name).copied()
    }

    /// Number of bound fields
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.field_index.len()
    }

    /// Bound fields in assembly order as `(name, index)`
    pub fn fields(&self) -> impl Iterator<Item = (&str, usize)> {
        self.field_index.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Next free slot along the field axis
    #[must_use]
    pub fn next_field_slot(&self) -> usize {
        match self.layout {
            GridLayout::FieldPerRow => self.rows().max(self.reserved_rows),
            GridLayout::FieldPerColumn => self.cols(),
        }
    }

    /// Section label of the field at `index`, if a section axis exists
    #[must_use]
    pub fn section_of(&self, index: usize) -> &str {
        match (self.layout, self.section_axis) {
            (GridLayout::FieldPerRow, Some(axis)) => self.value(index, axis),
            (GridLayout::FieldPerColumn, Some(axis)) => self.value(axis, index),
            _ => "",
        }
    }

    /// Field name at `index` along the field axis
    #[must_use]
    pub fn field_name_at(&self, index: usize) -> &str {
        match self.layout {
            GridLayout::FieldPerRow => self.value(index, self.name_axis),
            GridLayout::FieldPerColumn => self.value(self.name_axis, index),
        }
    }

    /// Remove fields along the field axis. `indices` may arrive in any order;
    /// the rectangle and the field bindings are both reindexed.
    pub fn remove_fields(&mut self, indices: &[usize]) {
        if indices.is_empty() {
            return;
        }
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        match self.layout {
            GridLayout::FieldPerRow => {
                for &idx in sorted.iter().rev() {
                    if idx < self.cells.len() {
                        self.cells.remove(idx);
                    }
                }
            }
            GridLayout::FieldPerColumn => {
                for row in &mut self.cells {
                    for &idx in sorted.iter().rev() {
                        if idx < row.len() {
                            row.remove(idx);
                        }
                    }
                }
            }
        }

        let removed = sorted;
        let old_index = std::mem::take(&mut self.field_index);
        for (name, idx) in old_index {
            if removed.binary_search(&idx).is_ok() {
                continue;
            }
            let shift = removed.iter().take_while(|&&r| r < idx).count();
            self.field_index.insert(name, idx - shift);
        }
    }

    /// Row-major copy of all cell text
    #[must_use]
    pub fn values(&self) -> Vec<Vec<String>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|c| c.value.clone()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> Grid {
        let mut grid = Grid::new("sampleMetadata", 7, GridLayout::FieldPerColumn);
        grid.name_axis = 2;
        grid.section_axis = Some(0);
        grid.level_axis = Some(1);
        grid.reserved_rows = 3;
        for (col, name) in ["samp_name", "decimalLatitude", "env_medium"].iter().enumerate() {
            grid.cell_mut(2, col + 1).value = (*name).to_string();
            grid.bind_field(*name, col + 1);
        }
        grid
    }

    #[test]
    fn test_ensure_shape_pads_rectangle() {
        let mut grid = Grid::new("g", 0, GridLayout::FieldPerRow);
        grid.cell_mut(2, 3).value = "x".into();
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 4);
        assert_eq!(grid.value(0, 0), "");
        assert_eq!(grid.value(2, 3), "x");
    }

    #[test]
    fn test_field_binding_and_lookup() {
        let grid = sample_grid();
        assert_eq!(grid.field_position("decimalLatitude"), Some(2));
        assert_eq!(grid.field_name_at(2), "decimalLatitude");
        assert_eq!(grid.field_count(), 3);
    }

    #[test]
    fn test_remove_fields_reindexes() {
        let mut grid = sample_grid();
        grid.remove_fields(&[2]);
        assert_eq!(grid.field_position("decimalLatitude"), None);
        assert_eq!(grid.field_position("env_medium"), Some(2));
        assert_eq!(grid.field_name_at(2), "env_medium");
    }

    #[test]
    fn test_remove_fields_is_idempotent_for_missing_indices() {
        let mut grid = sample_grid();
        grid.remove_fields(&[2]);
        let before = grid.clone();
        grid.remove_fields(&[]);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_next_field_slot_respects_reserved_rows() {
        let mut grid = Grid::new("projectMetadata", 1, GridLayout::FieldPerRow);
        grid.reserved_rows = 1;
        assert_eq!(grid.next_field_slot(), 1);
        grid.cell_mut(0, 0).value = "term_name".into();
        assert_eq!(grid.next_field_slot(), 1);
    }
}
