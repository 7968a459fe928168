//! HTTP request and response bodies.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Response for a stored upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_id: String,
    pub file_name: String,
    /// Placeholder; duration is not measured server-side.
    pub duration: f64,
}

/// Request for a full-video analysis.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "fileId is required"))]
    pub file_id: String,

    #[serde(default)]
    #[validate(length(min = 10, message = "expectationText must be at least 10 characters"))]
    pub expectation_text: String,
}

/// Request for a segment re-analysis.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SegmentAnalyzeRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "fileId is required"))]
    pub file_id: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "expectationText is required"))]
    pub expectation_text: String,

    #[serde(default)]
    #[validate(required(message = "tStart is required"))]
    pub t_start: Option<f64>,

    #[serde(default)]
    #[validate(required(message = "tEnd is required"))]
    pub t_end: Option<f64>,
}

impl SegmentAnalyzeRequest {
    /// The requested window, if it is well-formed (`0 <= start < end`).
    pub fn window(&self) -> Option<(f64, f64)> {
        match (self.t_start, self.t_end) {
            (Some(start), Some(end)) if start >= 0.0 && start < end => Some((start, end)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(t_start: Option<f64>, t_end: Option<f64>) -> SegmentAnalyzeRequest {
        SegmentAnalyzeRequest {
            file_id: "f".to_string(),
            expectation_text: "Cake should rise evenly".to_string(),
            t_start,
            t_end,
        }
    }

    #[test]
    fn test_analyze_request_expectation_length() {
        let short: AnalyzeRequest =
            serde_json::from_str(r#"{"fileId":"abc","expectationText":"too short"}"#).unwrap();
        assert!(short.validate().is_err());

        let ok: AnalyzeRequest =
            serde_json::from_str(r#"{"fileId":"abc","expectationText":"Cake should rise evenly"}"#)
                .unwrap();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_fail_validation_not_parsing() {
        let empty: AnalyzeRequest = serde_json::from_str("{}").unwrap();
        let errors = empty.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("file_id"));

        let segment: SegmentAnalyzeRequest =
            serde_json::from_str(r#"{"fileId":"abc","expectationText":"x"}"#).unwrap();
        let errors = segment.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("t_start"));
        assert!(errors.field_errors().contains_key("t_end"));
    }

    #[test]
    fn test_segment_window() {
        assert_eq!(segment(Some(2.0), Some(5.0)).window(), Some((2.0, 5.0)));
        assert_eq!(segment(Some(0.0), Some(0.5)).window(), Some((0.0, 0.5)));
        assert_eq!(segment(Some(5.0), Some(2.0)).window(), None);
        assert_eq!(segment(Some(3.0), Some(3.0)).window(), None);
        assert_eq!(segment(Some(-1.0), Some(2.0)).window(), None);
        assert_eq!(segment(None, Some(2.0)).window(), None);
    }

    #[test]
    fn test_upload_response_wire_names() {
        let body = UploadResponse {
            file_id: "id".to_string(),
            file_name: "id.mp4".to_string(),
            duration: 0.0,
        };
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["fileId"], "id");
        assert_eq!(json["fileName"], "id.mp4");
        assert_eq!(json["duration"], 0.0);
    }
}
