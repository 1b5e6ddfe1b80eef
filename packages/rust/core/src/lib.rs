//! Incremental generation engine for specdocs.
//!
//! - [`hash`]: per-section content hashes over a spec index
//! - [`manifest`]: load/save of the build manifest
//! - [`planner`] / [`writer`]: collaborator seams with built-in and
//!   command-backed implementations
//! - [`generate`]: the run that ties them together

mod command;
pub mod generate;
pub mod hash;
pub mod manifest;
pub mod planner;
pub mod writer;

pub use generate::{
    DEFAULT_MAX_CONCURRENCY, GenerateConfig, GenerateOutcome, GenerateResult, ProgressReporter,
    SilentProgress, generate, generate_with_index, plan_sections, validate_output_path,
    validate_plan,
};
pub use planner::{CommandPlanner, ENDPOINTS_GROUP, Planner, TagPlanner, tag_plan};
pub use writer::{CommandWriter, ReferenceWriter, WriteContext, Writer, reference_body};
