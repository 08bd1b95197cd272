//! Plan handling: acquisition, preprocessing, validation, reattachment,
//! and remapping.

pub mod format;
pub mod ingest;
pub mod pipeline;
pub mod preprocess;
pub mod reattach;
pub mod remap;
pub mod schema;

pub use format::{
    BlueprintPlan, CatalogDiscipline, CompiledPlan, Discipline, ExportHints, Plan,
    Session, Weekday,
};
pub use ingest::{AcquisitionError, PlanFormat, PlanShape, classify, parse_plan_source};
pub use pipeline::{CompileError, Compiled, compile_plan};
pub use preprocess::{ExpansionMiss, MissReason, Preprocessed, preprocess};
pub use reattach::{ConsistencyError, check_consistency, infer_discipline, reattach};
pub use remap::{RemapPreferences, remap};
pub use schema::{SchemaErrors, SchemaValidator, StrictSchemaValidator};
