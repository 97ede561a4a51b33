//! Annotation collection
//!
//! Walks a final grid exactly once and emits the flat operation list in a
//! fixed per-grid order: values, emphasis, backgrounds, notes, constraints.
//! One collector serves both layouts; which rows are headers and which are
//! data comes from the grid itself, not from per-sheet code paths.

use fairesheets_core::grid::{Grid, GridLayout};
use fairesheets_core::ops::{CellRange, Operation, OperationKind};
use fairesheets_core::types::{FieldKind, FieldSpec};
use indexmap::IndexMap;
use tracing::debug;

/// Options controlling annotation collection
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Number of data rows below the header that receive dropdown
    /// constraints on field-per-column grids; never the whole column
    pub constraint_rows: usize,
    /// When set, restrict emission to fields at or beyond this index along
    /// the field axis (used after profile appends, where earlier cells
    /// already exist remotely)
    pub start_field: Option<usize>,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            constraint_rows: 9,
            start_field: None,
        }
    }
}

impl CollectorOptions {
    /// Restrict emission to fields appended at or beyond `index`
    #[must_use]
    pub fn appended_from(index: usize) -> Self {
        Self {
            start_field: Some(index),
            ..Self::default()
        }
    }
}

/// Emits cell-level operations from assembled grids
#[derive(Debug, Clone, Default)]
pub struct AnnotationCollector {
    options: CollectorOptions,
}

impl AnnotationCollector {
    /// Create a collector with the given options
    #[must_use]
    pub fn new(options: CollectorOptions) -> Self {
        Self { options }
    }

    /// Collect the operation list for one grid.
    ///
    /// `schema` maps field names to their specs for note composition;
    /// user-defined fields have no entry and therefore get no note.
    #[must_use]
    pub fn collect(&self, grid: &Grid, schema: &IndexMap<String, FieldSpec>) -> Vec<Operation> {
        let (row_from, col_from) = match (grid.layout, self.options.start_field) {
            (_, None) => (0, 0),
            (GridLayout::FieldPerRow, Some(n)) => (n, 0),
            (GridLayout::FieldPerColumn, Some(n)) => (0, n),
        };
        let rows = grid.rows();
        let cols = grid.cols();
        if row_from >= rows || col_from >= cols {
            return Vec::new();
        }

        let mut ops = Vec::new();
        self.collect_values(grid, row_from, col_from, &mut ops);
        self.collect_emphasis(grid, row_from, col_from, &mut ops);
        self.collect_backgrounds(grid, row_from, col_from, &mut ops);
        self.collect_notes(grid, schema, &mut ops);
        self.collect_constraints(grid, row_from, col_from, &mut ops);

        debug!(grid = %grid.name, operations = ops.len(), "collected annotations");
        ops
    }

    /// One row-major block of literal cell text for the whole region
    fn collect_values(&self, grid: &Grid, row_from: usize, col_from: usize, ops: &mut Vec<Operation>) {
        let rows: Vec<Vec<String>> = grid
            .values()
            .into_iter()
            .skip(row_from)
            .map(|row| row.into_iter().skip(col_from).collect())
            .collect();
        ops.push(Operation::new(
            grid.sheet_id,
            CellRange::block(row_from, grid.rows(), col_from, grid.cols()),
            OperationKind::SetValues { rows },
        ));
    }

    /// Bold runs, coalesced horizontally within each row
    fn collect_emphasis(&self, grid: &Grid, row_from: usize, col_from: usize, ops: &mut Vec<Operation>) {
        for row in row_from..grid.rows() {
            let mut run_start = None;
            for col in col_from..=grid.cols() {
                let bold = grid.cell(row, col).is_some_and(|c| c.emphasis);
                match (bold, run_start) {
                    (true, None) => run_start = Some(col),
                    (false, Some(start)) => {
                        ops.push(Operation::new(
                            grid.sheet_id,
                            CellRange::row_span(row, start, col),
                            OperationKind::SetEmphasis { bold: true },
                        ));
                        run_start = None;
                    }
                    _ => {}
                }
            }
        }
    }

    /// Requirement-level background cells, one operation per cell
    fn collect_backgrounds(&self, grid: &Grid, row_from: usize, col_from: usize, ops: &mut Vec<Operation>) {
        for row in row_from..grid.rows() {
            for col in col_from..grid.cols() {
                if let Some(level) = grid.cell(row, col).and_then(|c| c.background) {
                    ops.push(Operation::new(
                        grid.sheet_id,
                        CellRange::cell(row, col),
                        OperationKind::SetBackground { level },
                    ));
                }
            }
        }
    }

    /// Field notes on the field-name cells, composed from the schema
    fn collect_notes(
        &self,
        grid: &Grid,
        schema: &IndexMap<String, FieldSpec>,
        ops: &mut Vec<Operation>,
    ) {
        for (name, idx) in grid.fields() {
            if let Some(start) = self.options.start_field {
                if idx < start {
                    continue;
                }
            }
            let Some(spec) = resolve_spec(schema, name) else {
                continue;
            };
            let Some(note) = compose_note(spec, grid, idx) else {
                continue;
            };
            let range = match grid.layout {
                GridLayout::FieldPerRow => CellRange::cell(idx, grid.name_axis),
                GridLayout::FieldPerColumn => CellRange::cell(grid.name_axis, idx),
            };
            ops.push(Operation::new(
                grid.sheet_id,
                range,
                OperationKind::SetNote { note },
            ));
        }
    }

    /// Dropdown constraints: single cells on field-per-row grids, a bounded
    /// run of data rows on field-per-column grids
    fn collect_constraints(&self, grid: &Grid, row_from: usize, col_from: usize, ops: &mut Vec<Operation>) {
        for row in row_from..grid.rows() {
            for col in col_from..grid.cols() {
                let Some(constraint) = grid.cell(row, col).and_then(|c| c.constraint.as_ref())
                else {
                    continue;
                };
                let range = match grid.layout {
                    GridLayout::FieldPerRow => CellRange::cell(row, col),
                    GridLayout::FieldPerColumn => {
                        CellRange::col_span(col, row, row + self.options.constraint_rows)
                    }
                };
                ops.push(Operation::new(
                    grid.sheet_id,
                    range,
                    OperationKind::SetConstraint {
                        values: constraint.values.clone(),
                        strict: constraint.strict,
                    },
                ));
            }
        }
    }
}

/// Look a field up by name, falling back to the fan-out base name
/// (`detected_notDetected_assay1` resolves to `detected_notDetected`)
fn resolve_spec<'a>(
    schema: &'a IndexMap<String, FieldSpec>,
    name: &str,
) -> Option<&'a FieldSpec> {
    if let Some(spec) = schema.get(name) {
        return Some(spec);
    }
    schema
        .iter()
        .filter(|(base, _)| {
            name.len() > base.len() && name.starts_with(base.as_str()) && name.as_bytes()[base.len()] == b'_'
        })
        .max_by_key(|(base, _)| base.len())
        .map(|(_, spec)| spec)
}

/// Fixed multi-line note template: requirement level (+ condition),
/// description, example, field kind (+ vocabulary or format)
fn compose_note(spec: &FieldSpec, grid: &Grid, field_idx: usize) -> Option<String> {
    if spec.description.is_empty() && spec.example.is_empty() && spec.fixed_format.is_none() {
        return None;
    }

    let mut note = format!("Requirement level: {}", spec.requirement_level.label());
    if let Some(condition) = &spec.requirement_condition {
        note.push_str(&format!(" ({condition})"));
    }
    note.push_str(&format!("\nDescription: {}", spec.description));
    note.push_str(&format!("\nExample: {}", spec.example));
    note.push_str(&format!("\nField type: {}", spec.kind.label()));

    match spec.kind {
        FieldKind::ControlledVocabulary => {
            let values = grid.value_axis.and_then(|axis| {
                let (row, col) = match grid.layout {
                    GridLayout::FieldPerRow => (field_idx, axis),
                    GridLayout::FieldPerColumn => (axis, field_idx),
                };
                grid.cell(row, col).and_then(|c| c.constraint.as_ref())
            });
            if let Some(constraint) = values {
                note.push_str(&format!(" ({})", constraint.values.join(", ")));
            }
        }
        FieldKind::FixedFormat => {
            if let Some(format_spec) = &spec.fixed_format {
                note.push_str(&format!(" ({format_spec})"));
            }
        }
        FieldKind::FreeText => {}
    }
    Some(note)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{AssemblerOptions, GridAssembler};
    use crate::schema::index_fields;
    use fairesheets_core::types::{
        FieldSpec, RequirementLevel, Selection, VocabularyIndex,
    };
    use pretty_assertions::assert_eq;

    fn schema() -> Vec<FieldSpec> {
        let mut env = FieldSpec::new("env_medium", RequirementLevel::HighlyRecommended)
            .with_section("Sample collection")
            .with_kind(FieldKind::ControlledVocabulary);
        env.description = "Material sampled".into();
        env.example = "sea water".into();
        let mut date = FieldSpec::new("eventDate", RequirementLevel::Mandatory)
            .with_section("Sample collection")
            .with_kind(FieldKind::FixedFormat);
        date.description = "Date of sampling".into();
        date.example = "2024-03-01".into();
        date.fixed_format = Some("YYYY-MM-DD".into());
        date.requirement_condition = Some("if samples were collected".into());
        vec![env, date]
    }

    fn vocab() -> VocabularyIndex {
        let mut index = VocabularyIndex::new();
        index.insert("env_medium", vec!["sea water".into(), "sediment".into()]);
        index
    }

    fn assembled() -> Grid {
        let selection = Selection {
            extra_user_fields: vec!["my_field".into()],
            ..Selection::default()
        };
        GridAssembler::new(AssemblerOptions::sample("sampleMetadata", 9))
            .assemble(&schema(), &vocab(), &selection)
            .expect("assemble")
    }

    fn kinds(ops: &[Operation]) -> Vec<&'static str> {
        ops.iter()
            .map(|op| match op.kind {
                OperationKind::SetValues { .. } => "values",
                OperationKind::SetEmphasis { .. } => "emphasis",
                OperationKind::SetBackground { .. } => "background",
                OperationKind::SetNote { .. } => "note",
                OperationKind::SetConstraint { .. } => "constraint",
                _ => "structural",
            })
            .collect()
    }

    #[test]
    fn test_fixed_kind_order() {
        let grid = assembled();
        let ops = AnnotationCollector::default().collect(&grid, &index_fields(&schema()));
        let kinds = kinds(&ops);
        let first_of = |k: &str| kinds.iter().position(|x| *x == k);
        assert_eq!(first_of("values"), Some(0));
        assert!(first_of("emphasis") < first_of("background"));
        assert!(first_of("background") < first_of("note"));
        assert!(first_of("note") < first_of("constraint"));
    }

    #[test]
    fn test_values_block_covers_rectangle() {
        let grid = assembled();
        let ops = AnnotationCollector::default().collect(&grid, &index_fields(&schema()));
        match &ops[0].kind {
            OperationKind::SetValues { rows } => {
                assert_eq!(rows.len(), grid.rows());
                assert_eq!(rows[0].len(), grid.cols());
                assert_eq!(rows[2][1], "env_medium");
            }
            other => panic!("expected values block, got {other:?}"),
        }
    }

    #[test]
    fn test_emphasis_runs_are_coalesced() {
        let grid = assembled();
        let ops = AnnotationCollector::default().collect(&grid, &index_fields(&schema()));
        let emphasis: Vec<&Operation> = ops
            .iter()
            .filter(|op| matches!(op.kind, OperationKind::SetEmphasis { .. }))
            .collect();
        // Field names sit in one contiguous run on the name row
        assert_eq!(emphasis.len(), 1);
        assert_eq!(emphasis[0].range, CellRange::row_span(2, 1, 4));
    }

    #[test]
    fn test_note_template_and_user_field_exclusion() {
        let grid = assembled();
        let ops = AnnotationCollector::default().collect(&grid, &index_fields(&schema()));
        let notes: Vec<(&CellRange, &String)> = ops
            .iter()
            .filter_map(|op| match &op.kind {
                OperationKind::SetNote { note } => Some((&op.range, note)),
                _ => None,
            })
            .collect();
        // Two schema fields get notes; the user field gets none
        assert_eq!(notes.len(), 2);
        assert_eq!(
            notes[0].1.as_str(),
            "Requirement level: Highly recommended\nDescription: Material sampled\nExample: sea water\nField type: controlled vocabulary (sea water, sediment)"
        );
        assert_eq!(
            notes[1].1.as_str(),
            "Requirement level: Mandatory (if samples were collected)\nDescription: Date of sampling\nExample: 2024-03-01\nField type: fixed format (YYYY-MM-DD)"
        );
    }

    #[test]
    fn test_constraints_bounded_below_header() {
        let grid = assembled();
        let collector = AnnotationCollector::new(CollectorOptions {
            constraint_rows: 5,
            start_field: None,
        });
        let ops = collector.collect(&grid, &index_fields(&schema()));
        let constraint = ops
            .iter()
            .find(|op| matches!(op.kind, OperationKind::SetConstraint { .. }))
            .expect("constraint op");
        let col = grid.field_position("env_medium").expect("env_medium");
        assert_eq!(constraint.range, CellRange::col_span(col, 3, 8));
    }

    #[test]
    fn test_fan_out_names_resolve_to_base_spec() {
        let index = index_fields(&schema());
        assert_eq!(
            resolve_spec(&index, "env_medium_assay1").map(|s| s.name.as_str()),
            Some("env_medium")
        );
        assert_eq!(resolve_spec(&index, "unknown_field"), None);
    }

    #[test]
    fn test_start_field_restricts_emission() {
        let grid = assembled();
        let date_col = grid.field_position("eventDate").expect("eventDate");
        let ops = AnnotationCollector::new(CollectorOptions::appended_from(date_col))
            .collect(&grid, &index_fields(&schema()));
        match &ops[0].kind {
            OperationKind::SetValues { rows } => {
                assert_eq!(rows[0].len(), grid.cols() - date_col);
            }
            other => panic!("expected values block, got {other:?}"),
        }
        // No note for env_medium, which sits before the appended region
        let notes: Vec<&Operation> = ops
            .iter()
            .filter(|op| matches!(op.kind, OperationKind::SetNote { .. }))
            .collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].range, CellRange::cell(2, date_col));
    }
}
