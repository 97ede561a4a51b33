//! Checklist schema loading
//!
//! Input arrives as a plain in-memory [`ChecklistTable`]; file formats and
//! fetch mechanisms are a collaborator's concern. Header resolution happens
//! exactly once through [`ColumnMapping`], so no later stage ever looks up a
//! column by label string.

pub mod vocabulary;

pub use vocabulary::load_vocabulary;

use fairesheets_core::error::{FaireError, Result};
use fairesheets_core::types::{Applicability, FieldKind, FieldSpec, RequirementLevel};
use indexmap::IndexMap;
use tracing::debug;

/// An in-memory table: one header row plus data rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChecklistTable {
    /// Column labels
    pub headers: Vec<String>,
    /// Data rows; short rows are treated as padded with empty cells
    pub rows: Vec<Vec<String>>,
}

impl ChecklistTable {
    /// Create a table from headers and rows
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Cell text at `(row, col)`, empty when outside the table
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }
}

/// Column indices resolved from a checklist header row
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    /// Column index for the field name (key column)
    pub term_name: Option<usize>,
    /// Column index for the section label
    pub section: Option<usize>,
    /// Column index for the requirement-level label
    pub requirement_level: Option<usize>,
    /// Column index for the requirement-level short code
    pub requirement_level_code: Option<usize>,
    /// Column index for the requirement-level condition
    pub requirement_condition: Option<usize>,
    /// Column index for sample-type applicability
    pub sample_type: Option<usize>,
    /// Column index for the description
    pub description: Option<usize>,
    /// Column index for the example value
    pub example: Option<usize>,
    /// Column index for the field kind
    pub term_type: Option<usize>,
    /// Column index for the fixed-format specification
    pub fixed_format: Option<usize>,
    /// Column index for profile tags (secondary checklists)
    pub profile: Option<usize>,
}

impl ColumnMapping {
    /// Resolve well-known checklist columns from a header row
    #[must_use]
    pub fn from_headers(headers: &[String]) -> Self {
        let mut mapping = Self::default();
        for (idx, header) in headers.iter().enumerate() {
            match header.trim().to_lowercase().as_str() {
                "term_name" | "field_name" => mapping.term_name = Some(idx),
                "section" => mapping.section = Some(idx),
                "requirement_level" => mapping.requirement_level = Some(idx),
                "requirement_level_code" => mapping.requirement_level_code = Some(idx),
                "requirement_level_condition" => mapping.requirement_condition = Some(idx),
                "sample_type_specificity" | "sample_type" => mapping.sample_type = Some(idx),
                "description" => mapping.description = Some(idx),
                "example" => mapping.example = Some(idx),
                "term_type" | "field_type" => mapping.term_type = Some(idx),
                "fixed_format" => mapping.fixed_format = Some(idx),
                "profile" | "target_sheet" | "sheet" => mapping.profile = Some(idx),
                _ => {}
            }
        }
        mapping
    }
}

/// Load typed field specs from a checklist table.
///
/// # Errors
///
/// Returns [`FaireError::Schema`] if the key column is missing, a row has an
/// empty field name, or a requirement level falls outside the four-value
/// enumeration. Rows that are entirely empty are skipped.
pub fn load_schema(table: &ChecklistTable) -> Result<Vec<FieldSpec>> {
    let mapping = ColumnMapping::from_headers(&table.headers);
    let Some(name_col) = mapping.term_name else {
        return Err(FaireError::schema("checklist has no term_name column"));
    };

    let get = |row: usize, col: Option<usize>| -> &str {
        col.map_or("", |c| table.cell(row, c))
    };

    let mut fields = Vec::with_capacity(table.rows.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let name = table.cell(row_idx, name_col).trim();
        if name.is_empty() {
            return Err(FaireError::schema_at(
                "row is missing its field name",
                format!("row {}", row_idx + 1),
            ));
        }

        let level_text = {
            let code = get(row_idx, mapping.requirement_level_code).trim();
            if code.is_empty() {
                get(row_idx, mapping.requirement_level).trim()
            } else {
                code
            }
        };
        let Some(level) = RequirementLevel::parse(level_text) else {
            return Err(FaireError::schema_at(
                format!("unknown requirement level '{level_text}' for field '{name}'"),
                format!("row {}", row_idx + 1),
            ));
        };

        let condition = get(row_idx, mapping.requirement_condition).trim();
        let fixed_format = get(row_idx, mapping.fixed_format).trim();
        let profile_tags = get(row_idx, mapping.profile)
            .split([',', '|'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        fields.push(FieldSpec {
            name: name.to_string(),
            section: get(row_idx, mapping.section).trim().to_string(),
            requirement_level: level,
            requirement_condition: (!condition.is_empty()).then(|| condition.to_string()),
            applicability: Applicability::parse(get(row_idx, mapping.sample_type)),
            description: get(row_idx, mapping.description).trim().to_string(),
            example: get(row_idx, mapping.example).trim().to_string(),
            kind: FieldKind::parse(get(row_idx, mapping.term_type)),
            fixed_format: (!fixed_format.is_empty()).then(|| fixed_format.to_string()),
            vocabulary_ref: None,
            profile_tags,
        });
    }

    debug!(fields = fields.len(), "loaded checklist schema");
    Ok(fields)
}

/// Index field specs by name, preserving checklist order
#[must_use]
pub fn index_fields(fields: &[FieldSpec]) -> IndexMap<String, FieldSpec> {
    fields
        .iter()
        .map(|f| (f.name.clone(), f.clone()))
        .collect()
}
