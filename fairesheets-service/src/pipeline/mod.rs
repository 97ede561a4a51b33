//! End-to-end compile pipelines
//!
//! [`TemplatePipeline`] turns one checklist plus selection parameters into a
//! full template: README, project grid, sample grid, and the vocabulary grid,
//! annotated and applied as one ordered operation queue.
//! [`ProfilePipeline`] re-derives existing grids under a [`ProfileConfig`]
//! and applies the structural and annotation operations the same way.
//!
//! Per-grid operation streams are concatenated, never interleaved: all chunks
//! for one compile form a single queue against the shared write quota.

pub mod readme;

pub use readme::build_readme_grid;

use crate::annotate::{AnnotationCollector, CollectorOptions};
use crate::assembler::{AssemblerOptions, GridAssembler};
use crate::engine::{BatchEngine, SheetsBackend};
use crate::profile::{ProfileConfig, ProfileTransformer};
use crate::schema::{index_fields, load_schema, load_vocabulary, ChecklistTable};
use chrono::Utc;
use fairesheets_core::error::Result;
use fairesheets_core::grid::{Grid, GridLayout};
use fairesheets_core::ops::Operation;
use fairesheets_core::types::{AssayType, FieldSpec, Selection, VocabularyIndex};
use indexmap::IndexMap;
use tracing::info;

/// Name of the experiment-run grid; checklist rows routed to it carry this
/// tag in their sheet column
const EXPERIMENT_GRID: &str = "experimentRunMetadata";

/// Remote sheet identifiers of the four template grids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetIds {
    /// README sheet
    pub readme: i64,
    /// Project metadata sheet (field per row)
    pub project: i64,
    /// Sample metadata sheet (field per column)
    pub sample: i64,
    /// Vocabulary ("Drop-down values") sheet
    pub dropdown: i64,
    /// Experiment-run metadata sheet (metabarcoding runs only)
    pub experiment: i64,
}

impl Default for SheetIds {
    fn default() -> Self {
        Self {
            readme: 0,
            project: 1,
            sample: 2,
            dropdown: 3,
            experiment: 4,
        }
    }
}

/// Parameters of one template compile
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    /// Checklist version shown on the README
    pub checklist_version: String,
    /// Project identifier, filled into the project grid and the README
    pub project_id: String,
    /// Field selection shared by the project and sample grids
    pub selection: Selection,
    /// Assay strategy; metabarcoding runs add the experiment-run grid
    pub assay_type: Option<AssayType>,
    /// User-defined fields appended to the experiment-run grid
    pub experiment_user_fields: Vec<String>,
    /// Remote sheet identifiers
    pub sheet_ids: SheetIds,
    /// Data rows receiving dropdowns below the sample-grid header
    pub constraint_rows: usize,
}

impl TemplateOptions {
    /// Options for the given checklist version and project
    #[must_use]
    pub fn new(checklist_version: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            checklist_version: checklist_version.into(),
            project_id: project_id.into(),
            selection: Selection::default(),
            assay_type: None,
            experiment_user_fields: Vec::new(),
            sheet_ids: SheetIds::default(),
            constraint_rows: CollectorOptions::default().constraint_rows,
        }
    }

    /// Set the field selection
    #[must_use]
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Set the assay strategy
    #[must_use]
    pub fn with_assay_type(mut self, assay_type: AssayType) -> Self {
        self.assay_type = Some(assay_type);
        self
    }

    /// Set the user fields appended to the experiment-run grid
    #[must_use]
    pub fn with_experiment_user_fields(mut self, fields: Vec<String>) -> Self {
        self.experiment_user_fields = fields;
        self
    }
}

/// Shape summary of one compiled grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSummary {
    /// Grid name
    pub name: String,
    /// Row count
    pub rows: usize,
    /// Column count
    pub cols: usize,
    /// Bound field count
    pub fields: usize,
}

impl From<&Grid> for GridSummary {
    fn from(grid: &Grid) -> Self {
        Self {
            name: grid.name.clone(),
            rows: grid.rows(),
            cols: grid.cols(),
            fields: grid.field_count(),
        }
    }
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    /// Compiled grids, in queue order
    pub grids: Vec<GridSummary>,
    /// Total operations queued
    pub operations: usize,
    /// Chunks applied against the backend
    pub chunks_applied: usize,
}

/// Compiles a checklist into a full template on a remote document
#[derive(Debug, Clone)]
pub struct TemplatePipeline {
    engine: BatchEngine,
}

impl TemplatePipeline {
    /// Create a pipeline over the given engine
    #[must_use]
    pub fn new(engine: BatchEngine) -> Self {
        Self { engine }
    }

    /// Compile the checklist and apply the template to the backend.
    ///
    /// Queue order: README, project grid, sample grid, then the experiment-run
    /// grid on metabarcoding runs, then the vocabulary grid.
    ///
    /// # Errors
    ///
    /// Returns [`fairesheets_core::FaireError::Schema`] on a malformed
    /// checklist, and the engine's errors
    /// ([`fairesheets_core::FaireError::QuotaExhausted`],
    /// [`fairesheets_core::FaireError::Remote`]) from application.
    pub async fn compile(
        &self,
        checklist: &ChecklistTable,
        vocab_table: &ChecklistTable,
        options: &TemplateOptions,
        backend: &dyn SheetsBackend,
    ) -> Result<CompileReport> {
        let schema = load_schema(checklist)?;
        let vocab = load_vocabulary(vocab_table)?;
        let field_index = index_fields(&schema);
        let ids = options.sheet_ids;

        let project = GridAssembler::new(
            AssemblerOptions::project("projectMetadata", ids.project)
                .with_value_override("project_id", options.project_id.clone()),
        )
        .assemble(&schema, &vocab, &options.selection)?;
        let sample = GridAssembler::new(AssemblerOptions::sample("sampleMetadata", ids.sample))
            .assemble(&schema, &vocab, &options.selection)?;

        let mut grids = vec![project, sample];
        if options.assay_type == Some(AssayType::Metabarcoding) {
            grids.push(assemble_experiment_grid(&schema, &vocab, options)?);
        }
        grids.push(build_dropdown_grid(vocab_table, ids.dropdown));

        let sheet_names: Vec<String> = grids.iter().map(|g| g.name.clone()).collect();
        let readme = build_readme_grid(
            ids.readme,
            &options.checklist_version,
            &options.project_id,
            &options.selection,
            &sheet_names,
            Utc::now(),
        );
        grids.insert(0, readme);

        let collector = AnnotationCollector::new(CollectorOptions {
            constraint_rows: options.constraint_rows,
            start_field: None,
        });
        let mut queue: Vec<Operation> = Vec::new();
        for grid in &grids {
            queue.extend(collector.collect(grid, &field_index));
        }

        let chunks_applied = self.engine.apply(&queue, backend).await?;
        info!(
            grids = grids.len(),
            operations = queue.len(),
            chunks = chunks_applied,
            "template compiled"
        );
        Ok(CompileReport {
            grids: grids.iter().map(GridSummary::from).collect(),
            operations: queue.len(),
            chunks_applied,
        })
    }
}

/// Assemble the experiment-run grid from the checklist rows routed to it,
/// with the run's own user fields appended
fn assemble_experiment_grid(
    schema: &[FieldSpec],
    vocab: &VocabularyIndex,
    options: &TemplateOptions,
) -> Result<Grid> {
    let fields: Vec<FieldSpec> = schema
        .iter()
        .filter(|f| f.profile_tags.contains(EXPERIMENT_GRID))
        .cloned()
        .collect();
    let selection = Selection {
        extra_user_fields: options.experiment_user_fields.clone(),
        ..options.selection.clone()
    };
    GridAssembler::new(AssemblerOptions::sample(
        EXPERIMENT_GRID,
        options.sheet_ids.experiment,
    ))
    .assemble(&fields, vocab, &selection)
}

/// Outcome of a profile run
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileReport {
    /// Transformed grids, in queue order
    pub grids: Vec<Grid>,
    /// Total operations queued
    pub operations: usize,
    /// Chunks applied against the backend
    pub chunks_applied: usize,
}

/// Re-derives existing grids under a profile and applies the result
#[derive(Debug, Clone)]
pub struct ProfilePipeline {
    engine: BatchEngine,
    transformer: ProfileTransformer,
}

impl ProfilePipeline {
    /// Create a pipeline over the given engine
    #[must_use]
    pub fn new(engine: BatchEngine) -> Self {
        Self {
            engine,
            transformer: ProfileTransformer::new(),
        }
    }

    /// Apply the profile to each grid and drive the combined queue.
    ///
    /// Per grid the queue carries the structural operations first (coalesced
    /// descending deletions, then the derived resize), then annotations
    /// restricted to the appended region; earlier cells already exist
    /// remotely and are left untouched.
    ///
    /// # Errors
    ///
    /// Propagates engine errors; a [`fairesheets_core::FaireError::QuotaExhausted`]
    /// leaves the queue resumable through [`BatchEngine::apply_from`].
    pub async fn apply(
        &self,
        grids: Vec<Grid>,
        secondary: &[FieldSpec],
        profile: &ProfileConfig,
        vocab: &VocabularyIndex,
        backend: &dyn SheetsBackend,
    ) -> Result<ProfileReport> {
        let secondary_index: IndexMap<String, FieldSpec> = index_fields(secondary);
        let mut queue: Vec<Operation> = Vec::new();
        let mut transformed = Vec::with_capacity(grids.len());

        for grid in grids {
            let outcome = self
                .transformer
                .apply_profile(grid, secondary, profile, vocab)?;
            queue.extend(outcome.structural_ops.iter().cloned());
            if let Some(appended_from) = outcome.first_appended {
                let collector = AnnotationCollector::new(CollectorOptions::appended_from(appended_from));
                queue.extend(collector.collect(&outcome.grid, &secondary_index));
            }
            transformed.push(outcome.grid);
        }

        let chunks_applied = self.engine.apply(&queue, backend).await?;
        info!(
            grids = transformed.len(),
            operations = queue.len(),
            chunks = chunks_applied,
            "profile applied"
        );
        Ok(ProfileReport {
            grids: transformed,
            operations: queue.len(),
            chunks_applied,
        })
    }
}

/// Verbatim copy of the vocabulary table, with a bold header row
#[must_use]
pub fn build_dropdown_grid(table: &ChecklistTable, sheet_id: i64) -> Grid {
    let mut grid = Grid::new("Drop-down values", sheet_id, GridLayout::FieldPerRow);
    grid.reserved_rows = 1;
    for (col, header) in table.headers.iter().enumerate() {
        let cell = grid.cell_mut(0, col);
        cell.value = header.clone();
        cell.emphasis = true;
    }
    for (row, cells) in table.rows.iter().enumerate() {
        for (col, value) in cells.iter().enumerate() {
            grid.cell_mut(row + 1, col).value = value.clone();
        }
    }
    grid.ensure_shape(1 + table.rows.len(), table.headers.len());
    grid
}
