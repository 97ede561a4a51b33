//! Grid assembly
//!
//! Builds an in-memory [`Grid`] from the checklist schema, applying the
//! selection filters and the structural expansion rules: assay fan-out,
//! assay-name value filling, and user-defined field appending. The result is
//! deterministic for identical inputs: fields keep checklist order, fan-out
//! columns follow assay order, user fields follow input order.

use fairesheets_core::error::Result;
use fairesheets_core::grid::{Constraint, Grid, GridLayout};
use fairesheets_core::types::{FieldSpec, RequirementLevel, Selection, VocabularyIndex};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Column titles of a project-style (field-per-row) grid
const PROJECT_HEADERS: [&str; 4] = [
    "term_name",
    "section",
    "requirement_level_code",
    "project_level",
];

/// Marker labels in the leading column of a sample-style grid
const SECTION_MARKER: &str = "# section";
const LEVEL_MARKER: &str = "# requirement_level_code";

/// Options controlling how a grid is assembled
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Orientation of the produced grid
    pub layout: GridLayout,
    /// Grid name (remote sheet title)
    pub grid_name: String,
    /// Remote sheet identifier
    pub sheet_id: i64,
    /// The designated assay-name field
    pub assay_name_field: String,
    /// Fields declared per-assay repeatable (fanned out when several assays
    /// are selected)
    pub repeatable_fields: Vec<String>,
    /// Values written into designated fields at assembly time (e.g. the
    /// project identifier)
    pub value_overrides: IndexMap<String, String>,
    /// Whether dropdown constraints enforce membership or merely suggest it
    pub strict_constraints: bool,
}

impl AssemblerOptions {
    /// Options for a project-style (one field per row) grid
    #[must_use]
    pub fn project(grid_name: impl Into<String>, sheet_id: i64) -> Self {
        Self {
            layout: GridLayout::FieldPerRow,
            grid_name: grid_name.into(),
            sheet_id,
            assay_name_field: "assay_name".to_string(),
            repeatable_fields: vec!["detected_notDetected".to_string()],
            value_overrides: IndexMap::new(),
            strict_constraints: true,
        }
    }

    /// Options for a sample-style (one field per column) grid
    #[must_use]
    pub fn sample(grid_name: impl Into<String>, sheet_id: i64) -> Self {
        Self {
            layout: GridLayout::FieldPerColumn,
            ..Self::project(grid_name, sheet_id)
        }
    }

    /// Set a value override for a designated field
    #[must_use]
    pub fn with_value_override(
        mut self,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.value_overrides.insert(field.into(), value.into());
        self
    }

    /// Set the per-assay repeatable fields
    #[must_use]
    pub fn with_repeatable_fields(mut self, fields: Vec<String>) -> Self {
        self.repeatable_fields = fields;
        self
    }

    /// Set constraint strictness
    #[must_use]
    pub fn with_strict_constraints(mut self, strict: bool) -> Self {
        self.strict_constraints = strict;
        self
    }
}

/// One field slot planned for the output grid
#[derive(Debug, Clone)]
struct PlannedField {
    spec: FieldSpec,
    value: String,
    /// Name used for vocabulary lookup; differs from `spec.name` for
    /// fanned-out columns, which inherit the base field's vocabulary
    lookup_name: String,
    user_defined: bool,
}

/// Assembles grids from a schema, a vocabulary index, and a selection
#[derive(Debug, Clone)]
pub struct GridAssembler {
    options: AssemblerOptions,
}

impl GridAssembler {
    /// Create an assembler with the given options
    #[must_use]
    pub fn new(options: AssemblerOptions) -> Self {
        Self { options }
    }

    /// Build a grid from the schema under the given selection.
    ///
    /// An empty level selection yields a grid containing only structural
    /// rows and zero data fields; this is valid, not an error.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; the `Result` is part of the stage
    /// contract so callers treat assembly like the other pipeline stages.
    pub fn assemble(
        &self,
        schema: &[FieldSpec],
        vocab: &VocabularyIndex,
        selection: &Selection,
    ) -> Result<Grid> {
        let planned = self.plan_fields(schema, selection);
        if planned.is_empty() {
            warn!(
                grid = %self.options.grid_name,
                "selection matched no fields; producing a structural-only grid"
            );
        }

        let grid = match self.options.layout {
            GridLayout::FieldPerRow => self.build_field_per_row(&planned, vocab, selection),
            GridLayout::FieldPerColumn => self.build_field_per_column(&planned, vocab, selection),
        };
        debug!(
            grid = %grid.name,
            rows = grid.rows(),
            cols = grid.cols(),
            fields = grid.field_count(),
            "assembled grid"
        );
        Ok(grid)
    }

    /// Apply the selection filters and expansion rules, producing the ordered
    /// field plan shared by both layouts
    fn plan_fields(&self, schema: &[FieldSpec], selection: &Selection) -> Vec<PlannedField> {
        let assays = &selection.assay_names;
        let mut planned = Vec::new();

        for field in schema.iter().filter(|f| selection.keeps(f)) {
            let repeatable = self
                .options
                .repeatable_fields
                .iter()
                .any(|r| r == &field.name);

            if repeatable && assays.len() > 1 {
                for assay in assays {
                    let mut spec = field.clone();
                    spec.name = format!("{}_{assay}", field.name);
                    planned.push(PlannedField {
                        spec,
                        value: String::new(),
                        lookup_name: field.name.clone(),
                        user_defined: false,
                    });
                }
                continue;
            }

            let value = if field.name == self.options.assay_name_field && !assays.is_empty() {
                assays.join(" | ")
            } else {
                self.options
                    .value_overrides
                    .get(&field.name)
                    .cloned()
                    .unwrap_or_default()
            };
            planned.push(PlannedField {
                lookup_name: field.name.clone(),
                spec: field.clone(),
                value,
                user_defined: false,
            });
        }

        for name in &selection.extra_user_fields {
            planned.push(PlannedField {
                spec: FieldSpec::new(name.clone(), RequirementLevel::Optional)
                    .with_section("User defined"),
                value: String::new(),
                lookup_name: name.clone(),
                user_defined: true,
            });
        }

        planned
    }

    /// Permitted values for a planned field, honoring the fan-out lookup name
    fn constraint_for(
        &self,
        planned: &PlannedField,
        vocab: &VocabularyIndex,
    ) -> Option<Constraint> {
        if planned.user_defined {
            return None;
        }
        let key = match planned.spec.vocabulary_key() {
            Some(_) if planned.lookup_name != planned.spec.name => planned.lookup_name.as_str(),
            Some(key) => key,
            None => return None,
        };
        vocab.get(key).map(|values| Constraint {
            values: values.to_vec(),
            strict: self.options.strict_constraints,
        })
    }

    /// Project-style layout: structural columns, one field per row, optional
    /// per-assay override columns after the value column
    fn build_field_per_row(
        &self,
        planned: &[PlannedField],
        vocab: &VocabularyIndex,
        selection: &Selection,
    ) -> Grid {
        let mut grid = Grid::new(
            self.options.grid_name.clone(),
            self.options.sheet_id,
            GridLayout::FieldPerRow,
        );
        grid.name_axis = 0;
        grid.section_axis = Some(1);
        grid.level_axis = Some(2);
        grid.value_axis = Some(3);
        grid.reserved_rows = 1;

        let assays = &selection.assay_names;
        let assay_cols = if assays.len() > 1 { assays.len() } else { 0 };

        for (col, title) in PROJECT_HEADERS.iter().enumerate() {
            let cell = grid.cell_mut(0, col);
            cell.value = (*title).to_string();
            cell.emphasis = true;
        }
        for i in 0..assay_cols {
            let cell = grid.cell_mut(0, PROJECT_HEADERS.len() + i);
            cell.value = format!("assay{}", i + 1);
            cell.emphasis = true;
        }

        for (i, field) in planned.iter().enumerate() {
            let row = grid.reserved_rows + i;
            let spec = &field.spec;

            let name_cell = grid.cell_mut(row, 0);
            name_cell.value = spec.name.clone();
            name_cell.emphasis = true;

            grid.cell_mut(row, 1).value = spec.section.clone();

            let level_cell = grid.cell_mut(row, 2);
            level_cell.value = spec.requirement_level.code().to_string();
            level_cell.background = Some(spec.requirement_level);

            grid.cell_mut(row, 3).value = field.value.clone();

            let constraint = self.constraint_for(field, vocab);
            if let Some(constraint) = &constraint {
                grid.cell_mut(row, 3).constraint = Some(constraint.clone());
            }

            // Per-assay override columns carry the individual assay names on
            // the assay-name row, and inherit the dropdown everywhere else
            for (j, assay) in assays.iter().enumerate().take(assay_cols) {
                let cell = grid.cell_mut(row, PROJECT_HEADERS.len() + j);
                if spec.name == self.options.assay_name_field {
                    cell.value = assay.clone();
                }
                if let Some(constraint) = &constraint {
                    cell.constraint = Some(constraint.clone());
                }
            }

            grid.bind_field(spec.name.clone(), row);
        }

        grid.ensure_shape(
            grid.reserved_rows.max(grid.rows()),
            PROJECT_HEADERS.len() + assay_cols,
        );
        grid
    }

    /// Sample-style layout: structural rows, one field per column, a single
    /// data-entry row below the field names
    fn build_field_per_column(
        &self,
        planned: &[PlannedField],
        vocab: &VocabularyIndex,
        _selection: &Selection,
    ) -> Grid {
        let mut grid = Grid::new(
            self.options.grid_name.clone(),
            self.options.sheet_id,
            GridLayout::FieldPerColumn,
        );
        grid.section_axis = Some(0);
        grid.level_axis = Some(1);
        grid.name_axis = 2;
        grid.value_axis = Some(3);
        grid.reserved_rows = 3;

        grid.cell_mut(0, 0).value = SECTION_MARKER.to_string();
        grid.cell_mut(1, 0).value = LEVEL_MARKER.to_string();

        for (i, field) in planned.iter().enumerate() {
            let col = 1 + i;
            let spec = &field.spec;

            grid.cell_mut(0, col).value = spec.section.clone();

            let level_cell = grid.cell_mut(1, col);
            level_cell.value = spec.requirement_level.code().to_string();
            level_cell.background = Some(spec.requirement_level);

            let name_cell = grid.cell_mut(2, col);
            name_cell.value = spec.name.clone();
            name_cell.emphasis = true;

            let value_cell = grid.cell_mut(3, col);
            value_cell.value = field.value.clone();
            value_cell.constraint = self.constraint_for(field, vocab);

            grid.bind_field(spec.name.clone(), col);
        }

        grid.ensure_shape(4, 1 + planned.len());
        grid
    }
}
