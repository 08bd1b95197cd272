//! Training-plan compiler.
//!
//! Turns authored, week-by-week training plans into a normalized,
//! schema-valid [`plan::CompiledPlan`]: session macros and swim cues are
//! expanded into step lists, authoring-only fields are stripped before
//! strict validation and restored afterwards, and long sessions can be
//! relocated to an athlete's preferred days.

pub mod catalog;
pub mod dsl;
pub mod macros;
pub mod plan;
