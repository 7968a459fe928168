//! Gemini `generateContent` client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use rdbg_models::report_schema;

use crate::error::{MlError, MlResult};
use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, GenerationRequest,
    InlineData, ModelTier, Part, ReportModel,
};

/// Histogram of generation call latency, labelled by tier and outcome.
pub const MODEL_CALL_DURATION_SECONDS: &str = "rdbg_model_call_duration_seconds";

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key. Absence is reported on the first call, not at startup.
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Model used for full analysis and repair
    pub full_model: String,
    /// Model used for segment re-checks
    pub segment_model: String,
    /// Transport timeout for a single call
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            full_model: "gemini-3-pro-preview".to_string(),
            segment_model: "gemini-3-flash-preview".to_string(),
            timeout: Duration::from_secs(300), // 5 minutes for video analysis
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            full_model: std::env::var("GEMINI_FULL_MODEL").unwrap_or(defaults.full_model),
            segment_model: std::env::var("GEMINI_SEGMENT_MODEL").unwrap_or(defaults.segment_model),
            timeout: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Model name for a tier.
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::HighFidelity => &self.full_model,
            ModelTier::Fast => &self.segment_model,
        }
    }
}

/// Gemini API client.
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(config: GeminiConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(GeminiConfig::from_env())
    }

    fn api_key(&self) -> MlResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| MlError::config("GEMINI_API_KEY environment variable is not set"))
    }

    /// Call `generateContent` and return the raw response text.
    async fn call_gemini_api(&self, request: &GenerationRequest) -> MlResult<String> {
        let api_key = self.api_key()?;
        let model = self.config.model_for(request.tier);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let encoded = BASE64.encode(&request.media.data);
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text(&request.system_instruction)],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![
                    Part::InlineData(InlineData {
                        mime_type: &request.media.mime_type,
                        data: encoded,
                    }),
                    Part::Text(&request.user_prompt),
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: report_schema(),
            },
        };

        debug!(
            model,
            media_bytes = request.media.data.len(),
            "Sending generateContent request"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MlError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        parsed.into_text().map_err(MlError::EmptyResponse)
    }
}

#[async_trait]
impl ReportModel for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> MlResult<Value> {
        let model = self.config.model_for(request.tier).to_string();
        let start = Instant::now();

        let result = self.call_gemini_api(request).await.and_then(|text| {
            serde_json::from_str::<Value>(&text).map_err(|e| MlError::malformed(e.to_string(), &text))
        });

        let elapsed = start.elapsed();
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::histogram!(
            MODEL_CALL_DURATION_SECONDS,
            "tier" => request.tier.as_str(),
            "outcome" => outcome
        )
        .record(elapsed.as_secs_f64());

        match &result {
            Ok(_) => info!(model = %model, duration_ms = elapsed.as_millis() as u64, "Gemini call succeeded"),
            Err(e) => warn!(model = %model, duration_ms = elapsed.as_millis() as u64, "Gemini call failed: {}", e),
        }

        result
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}
