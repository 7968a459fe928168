//! Analysis handlers.
//!
//! Both endpoints resolve the upload, send the whole video to the model and
//! return a validated report. Only full analysis gets a repair attempt.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::{error, info, warn};
use validator::Validate;

use rdbg_ml_client::{AnalysisOutcome, Media};
use rdbg_models::{AnalyzeRequest, RealityDebugReport, SegmentAnalyzeRequest};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

const INVALID_WINDOW: &str = "Invalid time window: tStart must be < tEnd and >= 0";

/// Resolve an upload id to its media bytes.
async fn load_media(state: &AppState, file_id: &str) -> ApiResult<Media> {
    let upload = state.uploads.lookup(file_id).await?;
    let bytes = state.uploads.read(&upload).await?;
    Ok(Media::new(upload.content_type, bytes))
}

fn warn_out_of_range(file_id: &str, report: &RealityDebugReport) {
    for path in report.out_of_range_scores() {
        warn!(file_id = %file_id, field = %path, "Score outside [0, 1]");
    }
}

// ============================================================================
// Full analysis
// ============================================================================

/// Analyse an uploaded video against the user's expectation.
///
/// A report that fails validation is repaired once; a second failure is
/// terminal.
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<RealityDebugReport>> {
    let Json(request) = payload?;
    request.validate()?;

    let media = load_media(&state, &request.file_id).await?;

    info!(
        file_id = %request.file_id,
        media_bytes = media.data.len(),
        "Starting full analysis"
    );

    match state
        .analysis
        .analyze_validated(&media, &request.expectation_text)
        .await
    {
        Ok(AnalysisOutcome { report, repaired }) => {
            metrics::record_analysis("full", if repaired { "repaired" } else { "ok" });
            info!(file_id = %request.file_id, repaired, "Full analysis complete");
            warn_out_of_range(&request.file_id, &report);
            Ok(Json(report))
        }
        Err(e) => {
            let err = ApiError::model("Analysis failed", e);
            metrics::record_analysis("full", err.code());
            error!(file_id = %request.file_id, "{}", err);
            Err(err)
        }
    }
}

// ============================================================================
// Segment analysis
// ============================================================================

/// Re-check a time window of an uploaded video.
///
/// The model still receives the whole video; the window is part of the
/// instruction. A schema mismatch fails the request without repair.
pub async fn segment_analyze(
    State(state): State<AppState>,
    payload: Result<Json<SegmentAnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<RealityDebugReport>> {
    let Json(request) = payload?;
    request.validate()?;
    let (t_start, t_end) = request
        .window()
        .ok_or_else(|| ApiError::bad_request(INVALID_WINDOW))?;

    let media = load_media(&state, &request.file_id).await?;

    info!(
        file_id = %request.file_id,
        t_start,
        t_end,
        "Starting segment analysis"
    );

    match state
        .analysis
        .analyze_segment_validated(&media, &request.expectation_text, t_start, t_end)
        .await
    {
        Ok(report) => {
            metrics::record_analysis("segment", "ok");
            info!(file_id = %request.file_id, "Segment analysis complete");
            warn_out_of_range(&request.file_id, &report);
            Ok(Json(report))
        }
        Err(e) => {
            let err = ApiError::model("Segment analysis failed", e);
            metrics::record_analysis("segment", err.code());
            error!(file_id = %request.file_id, "{}", err);
            Err(err)
        }
    }
}
