//! # FAIReSheets Service
//!
//! Compiles a FAIR eDNA metadata checklist into annotated grids on a remote,
//! quota-limited tabular-document service.
//!
//! The compile pipeline runs in strictly sequential stages:
//!
//! 1. **Schema loading** ([`schema`]): typed field specs and the controlled
//!    vocabulary index from in-memory checklist tables.
//! 2. **Grid assembly** ([`assembler`]): selection filters, assay fan-out,
//!    user fields, producing an in-memory [`fairesheets_core::Grid`].
//! 3. **Profile transformation** ([`profile`]): optional re-derivation of a
//!    grid against a second checklist, with coalesced removals plus
//!    profile-tagged appends and auto-filled values.
//! 4. **Annotation collection** ([`annotate`]): one walk over the final grid
//!    emitting the flat operation list.
//! 5. **Batched application** ([`engine`]): order-preserving chunking under
//!    the request ceiling, bounded exponential backoff on quota signals.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Checklist and vocabulary loading
pub mod schema;

/// Grid assembly from schema plus selection parameters
pub mod assembler;

/// Profile-driven grid re-derivation
pub mod profile;

/// Annotation collection over assembled grids
pub mod annotate;

/// Batched mutation engine and wire-request mapping
pub mod engine;

/// End-to-end compile pipelines
pub mod pipeline;

pub use annotate::{AnnotationCollector, CollectorOptions};
pub use assembler::{AssemblerOptions, GridAssembler};
pub use engine::{BatchEngine, RemoteError, SheetsBackend};
pub use pipeline::{CompileReport, ProfilePipeline, TemplateOptions, TemplatePipeline};
pub use profile::{ProfileConfig, ProfileOutcome, ProfileTransformer};
pub use schema::{ChecklistTable, load_schema, load_vocabulary};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::annotate::*;
    pub use crate::assembler::*;
    pub use crate::engine::*;
    pub use crate::pipeline::*;
    pub use crate::profile::*;
    pub use crate::schema::*;
    pub use fairesheets_core::prelude::*;
}
