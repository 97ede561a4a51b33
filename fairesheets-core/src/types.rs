//! Checklist schema model
//!
//! Typed view over the rows of a FAIR eDNA metadata checklist: field
//! definitions, requirement levels, sample-type applicability, and the
//! controlled-vocabulary index. All of these are loaded once at compile
//! start and immutable thereafter.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Requirement level of a checklist field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequirementLevel {
    /// M: the field must be provided
    Mandatory,
    /// HR: strongly encouraged
    HighlyRecommended,
    /// R: encouraged
    Recommended,
    /// O: optional
    Optional,
}

impl RequirementLevel {
    /// All levels, in canonical M, HR, R, O order
    pub const ALL: [Self; 4] = [
        Self::Mandatory,
        Self::HighlyRecommended,
        Self::Recommended,
        Self::Optional,
    ];

    /// Short code used in the checklist (`M`, `HR`, `R`, `O`)
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Mandatory => "M",
            Self::HighlyRecommended => "HR",
            Self::Recommended => "R",
            Self::Optional => "O",
        }
    }

    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mandatory => "Mandatory",
            Self::HighlyRecommended => "Highly recommended",
            Self::Recommended => "Recommended",
            Self::Optional => "Optional",
        }
    }

    /// Background color class for cells carrying this level
    #[must_use]
    pub fn color(&self) -> Color {
        // Hex values from the upstream checklist: #E26B0A, #FFCC00, #FFFF99, #CCFF99
        match self {
            Self::Mandatory => Color::from_rgb8(0xE2, 0x6B, 0x0A),
            Self::HighlyRecommended => Color::from_rgb8(0xFF, 0xCC, 0x00),
            Self::Recommended => Color::from_rgb8(0xFF, 0xFF, 0x99),
            Self::Optional => Color::from_rgb8(0xCC, 0xFF, 0x99),
        }
    }

    /// Parse a requirement level from its short code or label
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "M" | "Mandatory" | "mandatory" => Some(Self::Mandatory),
            "HR" | "Highly recommended" | "highly recommended" => Some(Self::HighlyRecommended),
            "R" | "Recommended" | "recommended" => Some(Self::Recommended),
            "O" | "Optional" | "optional" => Some(Self::Optional),
            _ => None,
        }
    }
}

/// RGB color with unit-interval channels, as the remote service expects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel, 0.0..=1.0
    pub red: f64,
    /// Green channel, 0.0..=1.0
    pub green: f64,
    /// Blue channel, 0.0..=1.0
    pub blue: f64,
}

impl Color {
    /// Build a color from 8-bit channels
    #[must_use]
    pub fn from_rgb8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: f64::from(red) / 255.0,
            green: f64::from(green) / 255.0,
            blue: f64::from(blue) / 255.0,
        }
    }
}

/// Kind of value a field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldKind {
    /// Unconstrained text
    #[default]
    FreeText,
    /// Text that must match a declared format (e.g. a date layout)
    FixedFormat,
    /// One of an enumerated list of permitted values
    ControlledVocabulary,
}

impl FieldKind {
    /// Parse the checklist's `term_type` column
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "controlled vocabulary" => Self::ControlledVocabulary,
            "fixed format" => Self::FixedFormat,
            _ => Self::FreeText,
        }
    }

    /// Label used when composing field notes
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::FreeText => "free text",
            Self::FixedFormat => "fixed format",
            Self::ControlledVocabulary => "controlled vocabulary",
        }
    }
}

/// Which sample types a field applies to
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Applicability {
    /// Applies to every sample type (`ALL` or unspecified in the checklist)
    #[default]
    All,
    /// Applies only to the listed sample types
    SampleTypes(Vec<String>),
}

impl Applicability {
    /// Parse the checklist's `sample_type_specificity` column
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::SampleTypes(
                value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            )
        }
    }

    /// Whether a field with this applicability survives the given selection
    #[must_use]
    pub fn matches(&self, selected: &[String]) -> bool {
        match self {
            Self::All => true,
            Self::SampleTypes(types) => types
                .iter()
                .any(|t| selected.iter().any(|s| s.eq_ignore_ascii_case(t))),
        }
    }
}

/// One checklist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name; unique key within a schema
    pub name: String,
    /// Grouping label
    pub section: String,
    /// Requirement level
    pub requirement_level: RequirementLevel,
    /// Free-text condition qualifying the requirement level
    pub requirement_condition: Option<String>,
    /// Sample-type applicability
    pub applicability: Applicability,
    /// Description shown in the field note
    pub description: String,
    /// Example value shown in the field note
    pub example: String,
    /// Kind of value the field accepts
    pub kind: FieldKind,
    /// Format specification for fixed-format fields
    pub fixed_format: Option<String>,
    /// Key into the vocabulary index for controlled-vocabulary fields
    pub vocabulary_ref: Option<String>,
    /// Profile identifiers this field belongs to (secondary grid injection)
    pub profile_tags: IndexSet<String>,
}

impl FieldSpec {
    /// Create a field with the given name and requirement level; everything
    /// else starts empty
    #[must_use]
    pub fn new(name: impl Into<String>, requirement_level: RequirementLevel) -> Self {
        Self {
            name: name.into(),
            section: String::new(),
            requirement_level,
            requirement_condition: None,
            applicability: Applicability::All,
            description: String::new(),
            example: String::new(),
            kind: FieldKind::FreeText,
            fixed_format: None,
            vocabulary_ref: None,
            profile_tags: IndexSet::new(),
        }
    }

    /// Set the section
    #[must_use]
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    /// Set the applicability
    #[must_use]
    pub fn with_applicability(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    /// Set the field kind
    #[must_use]
    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Key used to look up permitted values in the vocabulary index
    #[must_use]
    pub fn vocabulary_key(&self) -> Option<&str> {
        match self.kind {
            FieldKind::ControlledVocabulary => {
                Some(self.vocabulary_ref.as_deref().unwrap_or(&self.name))
            }
            _ => None,
        }
    }
}

/// Assay strategy of a template run; decides which grids accompany the
/// project and sample grids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssayType {
    /// Metabarcoding runs carry an experiment-run grid
    Metabarcoding,
    /// Targeted (qPCR-style) runs carry per-assay data grids
    Targeted,
}

impl AssayType {
    /// Parse the run parameter (`metabarcoding` or `targeted`)
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "metabarcoding" => Some(Self::Metabarcoding),
            "targeted" => Some(Self::Targeted),
            _ => None,
        }
    }
}

/// Sample-type selection: either the `other` sentinel (keep every
/// sample-type-specific field) or an explicit set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleTypeFilter {
    /// Keep all sample-type-specific fields
    Other,
    /// Keep fields applicable to at least one of the listed types
    Selected(Vec<String>),
}

impl Default for SampleTypeFilter {
    fn default() -> Self {
        Self::Other
    }
}

/// Parameters selecting which checklist fields make it into a grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Requirement levels to keep
    pub requirement_levels: IndexSet<RequirementLevel>,
    /// Sample-type filter
    pub sample_types: SampleTypeFilter,
    /// Assay names, in output order
    pub assay_names: Vec<String>,
    /// User-defined fields appended after the checklist fields
    pub extra_user_fields: Vec<String>,
    /// Sections excluded from this grid (e.g. targeted-assay sections on a
    /// metabarcoding run)
    pub exclude_sections: Vec<String>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            requirement_levels: RequirementLevel::ALL.into_iter().collect(),
            sample_types: SampleTypeFilter::Other,
            assay_names: Vec::new(),
            extra_user_fields: Vec::new(),
            exclude_sections: Vec::new(),
        }
    }
}

impl Selection {
    /// Whether a field survives the level, sample-type, and section filters
    #[must_use]
    pub fn keeps(&self, field: &FieldSpec) -> bool {
        if !self.requirement_levels.contains(&field.requirement_level) {
            return false;
        }
        if self
            .exclude_sections
            .iter()
            .any(|s| s.eq_ignore_ascii_case(&field.section))
        {
            return false;
        }
        match &self.sample_types {
            SampleTypeFilter::Other => true,
            SampleTypeFilter::Selected(types) => field.applicability.matches(types),
        }
    }
}

/// Ordered permitted values per field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyIndex {
    entries: IndexMap<String, Vec<String>>,
}

impl VocabularyIndex {
    /// Create an empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the permitted values for a field
    pub fn insert(&mut self, field: impl Into<String>, values: Vec<String>) {
        self.entries.insert(field.into(), values);
    }

    /// Permitted values for a field, if any are known
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries.get(field).map(Vec::as_slice)
    }

    /// Number of vocabularies in the index
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate vocabularies in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
