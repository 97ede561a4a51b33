//! Profile-driven grid re-derivation
//!
//! Takes an already-assembled grid and a second checklist (the profile's
//! schema), removes the fields the profile excludes, and splices in
//! profile-tagged fields with auto-filled values. Removal coordinates are
//! coalesced into maximal contiguous ranges and emitted descending, so each
//! deletion leaves the remaining ranges valid. Steps run in a fixed order
//! because later steps address cells in the post-removal coordinate space.

use fairesheets_core::error::{FaireError, Result};
use fairesheets_core::grid::{Constraint, Grid, GridLayout};
use fairesheets_core::ops::{coalesce_descending, CellRange, Operation, OperationKind};
use fairesheets_core::types::{FieldSpec, VocabularyIndex};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters of one profile application, loadable from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Profile identifier; secondary-schema fields tagged with it are
    /// spliced into the grid
    pub profile_id: String,
    /// Sections whose fields are removed
    #[serde(default)]
    pub remove_sections: Vec<String>,
    /// Individual fields removed by name
    #[serde(default)]
    pub remove_field_names: Vec<String>,
    /// Values written into appended fields by name (e.g. the project
    /// identifier or the current profile run name)
    #[serde(default)]
    pub auto_fill: IndexMap<String, String>,
}

impl ProfileConfig {
    /// Create a config for the given profile identifier
    #[must_use]
    pub fn new(profile_id: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            ..Self::default()
        }
    }

    /// Parse a config from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`fairesheets_core::FaireError::Serialization`] on malformed YAML.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Add a section to remove
    #[must_use]
    pub fn with_removed_section(mut self, section: impl Into<String>) -> Self {
        self.remove_sections.push(section.into());
        self
    }

    /// Add a field to remove by name
    #[must_use]
    pub fn with_removed_field(mut self, field: impl Into<String>) -> Self {
        self.remove_field_names.push(field.into());
        self
    }

    /// Add an auto-fill value for an appended field
    #[must_use]
    pub fn with_auto_fill(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.auto_fill.insert(field.into(), value.into());
        self
    }
}

/// Result of one profile application
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileOutcome {
    /// The transformed grid
    pub grid: Grid,
    /// Structural operations to replay remotely: coalesced descending
    /// deletions, then the derived resize
    pub structural_ops: Vec<Operation>,
    /// Field-axis index of the first appended field, when any were appended;
    /// collectors can restrict emission to this region
    pub first_appended: Option<usize>,
}

/// Applies profile configs to assembled grids
#[derive(Debug, Clone, Default)]
pub struct ProfileTransformer;

impl ProfileTransformer {
    /// Create a transformer
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Apply a profile to a grid.
    ///
    /// Fixed step order: coalesced removal, profile-tagged appends,
    /// auto-fill of appended fields. Structural rows and columns are never
    /// pruned, even when removal leaves them with no data beside them. An
    /// appended field whose vocabulary cannot be resolved is appended
    /// without a constraint.
    ///
    /// # Errors
    ///
    /// Returns [`FaireError::Validation`] when the profile has an empty
    /// `profile_id`; such a profile can never match a tagged field.
    pub fn apply_profile(
        &self,
        mut grid: Grid,
        secondary: &[FieldSpec],
        profile: &ProfileConfig,
        vocab: &VocabularyIndex,
    ) -> Result<ProfileOutcome> {
        if profile.profile_id.is_empty() {
            return Err(FaireError::validation("profile_id must not be empty"));
        }
        let mut structural_ops = Vec::new();

        // Step 1: removal, one coalesced deletion per contiguous range
        let remove: Vec<usize> = grid
            .fields()
            .filter(|(name, idx)| {
                profile
                    .remove_sections
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(grid.section_of(*idx)))
                    || profile.remove_field_names.iter().any(|f| f == name)
            })
            .map(|(_, idx)| idx)
            .collect();

        for (start, end) in coalesce_descending(&remove) {
            let (range, kind) = match grid.layout {
                GridLayout::FieldPerRow => (
                    CellRange::block(start, end, 0, grid.cols()),
                    OperationKind::DeleteRows,
                ),
                GridLayout::FieldPerColumn => (
                    CellRange::block(0, grid.rows(), start, end),
                    OperationKind::DeleteColumns,
                ),
            };
            structural_ops.push(Operation::new(grid.sheet_id, range, kind));
        }
        grid.remove_fields(&remove);

        // Step 2: splice in profile-tagged fields after the last data slot
        let mut first_appended = None;
        for spec in secondary
            .iter()
            .filter(|s| s.profile_tags.contains(&profile.profile_id))
        {
            if grid.field_position(&spec.name).is_some() {
                continue;
            }
            let slot = grid.next_field_slot();
            first_appended.get_or_insert(slot);
            let constraint = spec
                .vocabulary_key()
                .and_then(|key| vocab.get(key))
                .map(|values| Constraint {
                    values: values.to_vec(),
                    strict: false,
                });
            append_field(&mut grid, spec, slot, constraint);
        }

        // Step 3: auto-fill, appended fields only
        if let Some(appended_from) = first_appended {
            for (name, value) in &profile.auto_fill {
                let Some(idx) = grid.field_position(name) else {
                    continue;
                };
                if idx < appended_from {
                    continue;
                }
                if let Some(value_axis) = grid.value_axis {
                    let (row, col) = match grid.layout {
                        GridLayout::FieldPerRow => (idx, value_axis),
                        GridLayout::FieldPerColumn => (value_axis, idx),
                    };
                    grid.cell_mut(row, col).value = value.clone();
                }
            }
        }

        // Dimensions derive from the transformed grid, never from a constant
        structural_ops.push(Operation::new(
            grid.sheet_id,
            CellRange::block(0, grid.rows(), 0, grid.cols()),
            OperationKind::Resize {
                rows: grid.rows(),
                cols: grid.cols(),
            },
        ));

        debug!(
            grid = %grid.name,
            removed = remove.len(),
            appended = first_appended.map_or(0, |s| grid.field_count().saturating_sub(s)),
            "applied profile"
        );
        Ok(ProfileOutcome {
            grid,
            structural_ops,
            first_appended,
        })
    }
}

/// Write one appended field's structural cells
fn append_field(grid: &mut Grid, spec: &FieldSpec, slot: usize, constraint: Option<Constraint>) {
    match grid.layout {
        GridLayout::FieldPerRow => {
            let name_cell = grid.cell_mut(slot, grid.name_axis);
            name_cell.value = spec.name.clone();
            name_cell.emphasis = true;
            if let Some(axis) = grid.section_axis {
                grid.cell_mut(slot, axis).value = spec.section.clone();
            }
            if let Some(axis) = grid.level_axis {
                let cell = grid.cell_mut(slot, axis);
                cell.value = spec.requirement_level.code().to_string();
                cell.background = Some(spec.requirement_level);
            }
            if let Some(axis) = grid.value_axis {
                grid.cell_mut(slot, axis).constraint = constraint;
            }
        }
        GridLayout::FieldPerColumn => {
            let name_cell = grid.cell_mut(grid.name_axis, slot);
            name_cell.value = spec.name.clone();
            name_cell.emphasis = true;
            if let Some(axis) = grid.section_axis {
                grid.cell_mut(axis, slot).value = spec.section.clone();
            }
            if let Some(axis) = grid.level_axis {
                let cell = grid.cell_mut(axis, slot);
                cell.value = spec.requirement_level.code().to_string();
                cell.background = Some(spec.requirement_level);
            }
            if let Some(axis) = grid.value_axis {
                grid.cell_mut(axis, slot).constraint = constraint;
            }
        }
    }
    grid.bind_field(spec.name.clone(), slot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{AssemblerOptions, GridAssembler};
    use fairesheets_core::types::{FieldKind, RequirementLevel, Selection};
    use pretty_assertions::assert_eq;

    fn base_grid() -> Grid {
        let schema = vec![
            FieldSpec::new("otu_db", RequirementLevel::Recommended).with_section("Bioinformatics"),
            FieldSpec::new("otu_seq_comp_appr", RequirementLevel::Recommended)
                .with_section("Bioinformatics"),
            FieldSpec::new("samp_name", RequirementLevel::Mandatory).with_section("Core"),
            FieldSpec::new("output_read_count", RequirementLevel::Optional)
                .with_section("Sequencing"),
        ];
        let assembler = GridAssembler::new(AssemblerOptions::sample("sampleMetadata", 4));
        assembler
            .assemble(&schema, &VocabularyIndex::new(), &Selection::default())
            .expect("assemble")
    }

    fn secondary() -> Vec<FieldSpec> {
        let mut run_name = FieldSpec::new("analysis_run_name", RequirementLevel::Mandatory)
            .with_section("NOAA");
        run_name.profile_tags.insert("sampleMetadata".to_string());
        let mut vocab_field = FieldSpec::new("study_type", RequirementLevel::Optional)
            .with_section("NOAA")
            .with_kind(FieldKind::ControlledVocabulary);
        vocab_field.profile_tags.insert("sampleMetadata".to_string());
        let mut unrelated = FieldSpec::new("ode_only", RequirementLevel::Optional);
        unrelated.profile_tags.insert("projectMetadata".to_string());
        vec![run_name, vocab_field, unrelated]
    }

    #[test]
    fn test_section_removal_emits_coalesced_descending_deletion() {
        let profile = ProfileConfig::new("sampleMetadata")
            .with_removed_section("Bioinformatics")
            .with_removed_field("output_read_count");
        let outcome = ProfileTransformer::new()
            .apply_profile(base_grid(), &[], &profile, &VocabularyIndex::new())
            .expect("apply");

        // Columns 1,2 (Bioinformatics) and 4 (denylist) coalesce to two
        // ranges, descending
        let deletions: Vec<&Operation> = outcome
            .structural_ops
            .iter()
            .filter(|op| matches!(op.kind, OperationKind::DeleteColumns))
            .collect();
        assert_eq!(deletions.len(), 2);
        assert_eq!(
            (deletions[0].range.start_col, deletions[0].range.end_col),
            (4, 5)
        );
        assert_eq!(
            (deletions[1].range.start_col, deletions[1].range.end_col),
            (1, 3)
        );

        assert_eq!(outcome.grid.field_position("otu_db"), None);
        assert_eq!(outcome.grid.field_position("samp_name"), Some(1));
    }

    #[test]
    fn test_removal_is_idempotent() {
        let profile = ProfileConfig::new("sampleMetadata").with_removed_section("Bioinformatics");
        let transformer = ProfileTransformer::new();
        let once = transformer
            .apply_profile(base_grid(), &[], &profile, &VocabularyIndex::new())
            .expect("first");
        let twice = transformer
            .apply_profile(once.grid.clone(), &[], &profile, &VocabularyIndex::new())
            .expect("second");
        assert_eq!(once.grid, twice.grid);
        // Second pass finds nothing to delete
        assert!(twice
            .structural_ops
            .iter()
            .all(|op| !matches!(op.kind, OperationKind::DeleteColumns)));
    }

    #[test]
    fn test_profile_appends_with_auto_fill_and_suggest_constraint() {
        let mut vocab = VocabularyIndex::new();
        vocab.insert("study_type", vec!["baseline".into(), "timeseries".into()]);
        let profile = ProfileConfig::new("sampleMetadata")
            .with_removed_section("Bioinformatics")
            .with_auto_fill("analysis_run_name", "run_2025_08");
        let outcome = ProfileTransformer::new()
            .apply_profile(base_grid(), &secondary(), &profile, &vocab)
            .expect("apply");

        let grid = &outcome.grid;
        let run_col = grid.field_position("analysis_run_name").expect("appended");
        assert_eq!(outcome.first_appended, Some(run_col));
        assert_eq!(grid.value(3, run_col), "run_2025_08");
        assert_eq!(grid.value(1, run_col), "M");

        // Appended vocabulary fields get suggest-only dropdowns
        let vocab_col = grid.field_position("study_type").expect("appended");
        let constraint = grid
            .cell(3, vocab_col)
            .and_then(|c| c.constraint.as_ref())
            .expect("constraint");
        assert!(!constraint.strict);

        // Fields tagged for other profiles stay out
        assert_eq!(grid.field_position("ode_only"), None);
    }

    #[test]
    fn test_unresolvable_vocabulary_is_not_fatal() {
        let profile = ProfileConfig::new("sampleMetadata");
        let outcome = ProfileTransformer::new()
            .apply_profile(base_grid(), &secondary(), &profile, &VocabularyIndex::new())
            .expect("apply");
        let col = outcome.grid.field_position("study_type").expect("appended");
        assert!(outcome.grid.cell(3, col).expect("cell").constraint.is_none());
    }

    #[test]
    fn test_resize_derives_from_transformed_grid() {
        let profile = ProfileConfig::new("sampleMetadata").with_removed_section("Bioinformatics");
        let outcome = ProfileTransformer::new()
            .apply_profile(base_grid(), &secondary(), &profile, &VocabularyIndex::new())
            .expect("apply");
        let resize = outcome
            .structural_ops
            .last()
            .expect("resize is last structural op");
        match resize.kind {
            OperationKind::Resize { rows, cols } => {
                assert_eq!(rows, outcome.grid.rows());
                assert_eq!(cols, outcome.grid.cols());
            }
            ref other => panic!("expected resize, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_profile_id_is_rejected() {
        let err = ProfileTransformer::new()
            .apply_profile(base_grid(), &secondary(), &ProfileConfig::default(), &VocabularyIndex::new())
            .expect_err("empty profile_id");
        assert!(matches!(err, FaireError::Validation { .. }));
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r"
profile_id: projectMetadata
remove_sections:
  - Bioinformatics
  - OTU/ASV
remove_field_names:
  - output_read_count
auto_fill:
  project_id: gomecc4
";
        let config = ProfileConfig::from_yaml_str(yaml).expect("parse");
        assert_eq!(config.profile_id, "projectMetadata");
        assert_eq!(config.remove_sections.len(), 2);
        assert_eq!(config.auto_fill.get("project_id").map(String::as_str), Some("gomecc4"));
    }
}
