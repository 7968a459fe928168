//! Analysis calls built on a [`ReportModel`].

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use rdbg_models::{validate_report, RealityDebugReport};

use crate::error::{MlError, MlResult};
use crate::prompts;
use crate::types::{GenerationRequest, Media, ModelTier, ReportModel};

/// Full and segment analysis over a shared model.
#[derive(Clone)]
pub struct AnalysisService {
    pub(crate) model: Arc<dyn ReportModel>,
}

impl AnalysisService {
    pub fn new(model: Arc<dyn ReportModel>) -> Self {
        Self { model }
    }

    /// Whether the underlying model has its credentials.
    pub fn is_configured(&self) -> bool {
        self.model.is_configured()
    }

    /// Analyse the whole video. The returned value is not validated.
    pub async fn analyze_full(&self, media: &Media, expectation: &str) -> MlResult<Value> {
        let request = GenerationRequest {
            tier: ModelTier::HighFidelity,
            system_instruction: prompts::SYSTEM_INSTRUCTION.to_string(),
            user_prompt: prompts::full_analysis_prompt(expectation),
            media: media.clone(),
        };
        self.model.generate(&request).await
    }

    /// Re-check `[t_start, t_end]` seconds. The model still receives the
    /// whole video; the window is an instruction only. The returned value is
    /// not validated.
    pub async fn analyze_segment(
        &self,
        media: &Media,
        expectation: &str,
        t_start: f64,
        t_end: f64,
    ) -> MlResult<Value> {
        let request = GenerationRequest {
            tier: ModelTier::Fast,
            system_instruction: prompts::SYSTEM_INSTRUCTION.to_string(),
            user_prompt: prompts::segment_analysis_prompt(expectation, t_start, t_end),
            media: media.clone(),
        };
        self.model.generate(&request).await
    }

    /// Segment analysis followed by validation. Exactly one model call; a
    /// schema mismatch is returned as an error, never repaired.
    pub async fn analyze_segment_validated(
        &self,
        media: &Media,
        expectation: &str,
        t_start: f64,
        t_end: f64,
    ) -> MlResult<RealityDebugReport> {
        let value = self.analyze_segment(media, expectation, t_start, t_end).await?;
        match validate_report(&value) {
            Ok(report) => {
                info!(t_start, t_end, "Segment report validated");
                Ok(report)
            }
            Err(violation) => {
                warn!(t_start, t_end, "Segment report failed validation: {}", violation);
                Err(MlError::SchemaMismatch(violation))
            }
        }
    }
}
