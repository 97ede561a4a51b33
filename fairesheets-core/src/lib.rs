//! # FAIReSheets Core
//!
//! Core types for compiling FAIR eDNA metadata checklists into structured,
//! annotated grids destined for a remote tabular-document service.
//!
//! This crate provides the fundamental building blocks shared by the grid
//! compiler: the checklist schema model, the in-memory grid and cell model,
//! the cell-level mutation operations, the engine configuration, and the
//! error taxonomy.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Core error types for grid compilation
pub mod error;

/// Checklist schema model: fields, requirement levels, vocabularies
pub mod types;

/// In-memory grid and cell model
pub mod grid;

/// Cell-level mutation operations
pub mod ops;

/// Engine and backoff configuration
pub mod config;

// Re-export commonly used types
pub use config::{BackoffPolicy, EngineConfig};
pub use error::{FaireError, Result};
pub use grid::{Cell, Constraint, Grid, GridLayout};
pub use ops::{CellRange, Operation, OperationKind};
pub use types::{
    Applicability, AssayType, Color, FieldKind, FieldSpec, RequirementLevel, SampleTypeFilter,
    Selection, VocabularyIndex,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::{FaireError, Result};
    pub use crate::grid::*;
    pub use crate::ops::*;
    pub use crate::types::*;
}
