//! # conveyor-stages
//!
//! The stage functions and the pipeline composer.
//!
//! Call [`pipeline::run`] with [`pipeline::BuildScope::Full`] for a
//! deployable build, or with a single [`report::StageKind`] for watch-loop
//! rebuilds and per-stage CLI commands.

pub mod cdn;
pub mod clean;
pub mod compress;
pub mod copy;
pub mod diff;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod report;
pub mod revision;
pub mod scripts;
pub mod size;
pub mod styles;
pub mod walk;

pub use error::StageError;
pub use pipeline::BuildScope;
pub use report::{EntryOutcome, PipelineReport, StageKind, StageReport};
pub use size::SizeReport;
