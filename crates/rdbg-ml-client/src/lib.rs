//! Client for the generative model behind Reality Debugger.
//!
//! This crate provides:
//! - A Gemini `generateContent` client constrained to the report schema
//! - The analysis prompts (full video and time-window re-checks)
//! - The single-shot repair path for schema-nonconforming responses

pub mod client;
pub mod error;
pub mod prompts;
pub mod repair;
pub mod service;
pub mod types;

pub use client::{GeminiClient, GeminiConfig};
pub use error::{MlError, MlResult};
pub use repair::AnalysisOutcome;
pub use service::AnalysisService;
pub use types::{GenerationRequest, Media, ModelTier, ReportModel};
