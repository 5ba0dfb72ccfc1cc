//! Shared AFQ run types: parameter values, configuration documents and stages.
//!
//! This crate has no I/O; the core crate parses, resolves and persists these
//! types, and the CLI only sees them through the core crate.

pub mod document;
pub mod stage;
pub mod value;

pub use document::{ConfigDocument, Section, SectionName};
pub use stage::{SegmentationAlgorithm, Stage};
pub use value::{ParamValue, ParameterSet, ValueKind};
