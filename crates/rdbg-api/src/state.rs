//! Application state.

use std::sync::Arc;

use thiserror::Error;

use rdbg_ml_client::{AnalysisService, GeminiClient, MlError, ReportModel};
use rdbg_storage::{StorageError, UploadStore};

use crate::config::ApiConfig;

/// Errors raised while building the application state at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to open upload store: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to create Gemini client: {0}")]
    Model(#[from] MlError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub uploads: UploadStore,
    pub analysis: AnalysisService,
}

impl AppState {
    /// Create application state backed by the Gemini client.
    pub async fn new(config: ApiConfig) -> Result<Self, StartupError> {
        let uploads = UploadStore::open(config.upload_dir.clone()).await?;
        let gemini = GeminiClient::from_env()?;
        if !gemini.is_configured() {
            tracing::warn!("GEMINI_API_KEY is not set; analysis requests will fail until it is");
        }

        Ok(Self::with_components(config, uploads, Arc::new(gemini)))
    }

    /// Assemble state from already-built parts.
    pub fn with_components(
        config: ApiConfig,
        uploads: UploadStore,
        model: Arc<dyn ReportModel>,
    ) -> Self {
        Self {
            config,
            uploads,
            analysis: AnalysisService::new(model),
        }
    }
}
