//! Model client error types.

use rdbg_models::SchemaViolation;
use thiserror::Error;

pub type MlResult<T> = Result<T, MlError>;

/// Characters of raw model output kept in a malformed-response error.
pub const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum MlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gemini API request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Gemini API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("No content in Gemini response: {0}")]
    EmptyResponse(String),

    #[error("Failed to parse Gemini response as JSON: {reason}. Response: {preview}")]
    MalformedResponse { reason: String, preview: String },

    #[error("Report does not match schema: {0}")]
    SchemaMismatch(#[from] SchemaViolation),

    #[error("Validation failed ({original}) and repair failed: {repair}")]
    RepairFailed {
        original: SchemaViolation,
        repair: Box<MlError>,
    },
}

impl MlError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a malformed-response error from the raw model text.
    pub fn malformed(reason: impl Into<String>, raw_text: &str) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
            preview: raw_text.chars().take(PREVIEW_CHARS).collect(),
        }
    }

    /// Whether the model produced output that failed the report schema.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, MlError::SchemaMismatch(_))
    }
}
