//! Generation request types and Gemini wire format.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MlResult;

/// Model quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    /// Full-video analysis and repair.
    HighFidelity,
    /// Time-window re-checks.
    Fast,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::HighFidelity => "high_fidelity",
            ModelTier::Fast => "fast",
        }
    }
}

/// Media sent inline with a generation request.
///
/// The bytes are shared so the repair call can reuse them.
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub mime_type: String,
    pub data: Arc<[u8]>,
}

impl Media {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// One call to the generation capability.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub tier: ModelTier,
    pub system_instruction: String,
    pub user_prompt: String,
    pub media: Media,
}

/// Something that turns a generation request into parsed JSON.
///
/// Implementations constrain the output to the report schema and parse it,
/// but do not validate it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportModel: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> MlResult<Value>;

    /// Whether the model has the credentials it needs.
    fn is_configured(&self) -> bool;
}

// ============================================================================
// Gemini wire format
// ============================================================================

/// `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest<'a> {
    pub system_instruction: Content<'a>,
    pub contents: Vec<Content<'a>>,
    pub generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum Part<'a> {
    Text(&'a str),
    InlineData(InlineData<'a>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData<'a> {
    pub mime_type: &'a str,
    /// Base64-encoded media.
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig<'a> {
    pub response_mime_type: &'static str,
    pub response_schema: &'a Value,
}

/// `generateContent` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<ResponseContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, or why there is none.
    pub fn into_text(self) -> Result<String, String> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(match block_reason {
                Some(reason) => format!("prompt blocked ({reason})"),
                None => "no candidates".to_string(),
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(match candidate.finish_reason {
                Some(reason) => format!("empty candidate (finish reason {reason})"),
                None => "empty candidate".to_string(),
            });
        }

        Ok(text)
    }
}
