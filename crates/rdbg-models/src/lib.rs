//! Shared models for the Reality Debugger backend.
//!
//! This crate provides:
//! - The causal-analysis report types
//! - The declarative schema given to the generation API
//! - The structural validator applied to model output
//! - HTTP request and response bodies

pub mod report;
pub mod request;
pub mod schema;
pub mod validate;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use report::{
    Counterfactual, Domain, EvidenceType, MinimalIntervention, Observation, RealityDebugReport,
    RootCauseStep, Scenario, TimelineEntry,
};
pub use request::{AnalyzeRequest, SegmentAnalyzeRequest, UploadResponse};
pub use schema::report_schema;
pub use validate::{is_valid_report, validate_report, SchemaViolation, ValidationResult};
