//! Validation with a single repair attempt for full analysis.
//!
//! A full-analysis response that parses but fails the report schema gets one
//! more generation call with the failure quoted back to the model. Whatever
//! that call returns is final: at most two calls per analysis.

use tracing::{info, warn};

use rdbg_models::{validate_report, RealityDebugReport, SchemaViolation};

use crate::error::{MlError, MlResult};
use crate::prompts;
use crate::service::AnalysisService;
use crate::types::{GenerationRequest, Media, ModelTier};

/// Counter of repair attempts, labelled by result.
pub const REPAIR_ATTEMPTS_TOTAL: &str = "rdbg_repair_attempts_total";

/// A validated full-analysis report.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub report: RealityDebugReport,
    /// Whether the report came from the repair call.
    pub repaired: bool,
}

impl AnalysisService {
    /// Full analysis, validated, with one repair attempt on schema mismatch.
    ///
    /// Transport and malformed-response failures of the first call are
    /// returned unchanged; only a schema mismatch triggers repair.
    pub async fn analyze_validated(
        &self,
        media: &Media,
        expectation: &str,
    ) -> MlResult<AnalysisOutcome> {
        let first = self.analyze_full(media, expectation).await?;

        match validate_report(&first) {
            Ok(report) => Ok(AnalysisOutcome {
                report,
                repaired: false,
            }),
            Err(violation) => {
                warn!("Invalid report structure, attempting repair: {}", violation);
                self.repair(media, expectation, violation).await
            }
        }
    }

    async fn repair(
        &self,
        media: &Media,
        expectation: &str,
        original: SchemaViolation,
    ) -> MlResult<AnalysisOutcome> {
        let request = GenerationRequest {
            tier: ModelTier::HighFidelity,
            system_instruction: prompts::SYSTEM_INSTRUCTION.to_string(),
            user_prompt: prompts::repair_prompt(expectation, &original.to_string()),
            media: media.clone(),
        };

        let result = match self.model.generate(&request).await {
            Ok(value) => validate_report(&value).map_err(MlError::SchemaMismatch),
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => {
                metrics::counter!(REPAIR_ATTEMPTS_TOTAL, "result" => "repaired").increment(1);
                info!("Repair produced a valid report");
                Ok(AnalysisOutcome {
                    report,
                    repaired: true,
                })
            }
            Err(e) => {
                metrics::counter!(REPAIR_ATTEMPTS_TOTAL, "result" => "failed").increment(1);
                warn!("Repair failed: {}", e);
                Err(MlError::RepairFailed {
                    original,
                    repair: Box::new(e),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockall::Sequence;
    use serde_json::{json, Value};

    use super::*;
    use crate::types::MockReportModel;
    use rdbg_models::fixtures::sample_report_value;

    const EXPECTATION: &str = "Cake should rise evenly";

    fn media() -> Media {
        Media::new("video/mp4", b"video".to_vec())
    }

    fn two_counterfactuals() -> Value {
        let mut value = sample_report_value();
        value["counterfactuals"].as_array_mut().unwrap().pop();
        value
    }

    #[tokio::test]
    async fn test_valid_first_response_needs_one_call() {
        let mut model = MockReportModel::new();
        model
            .expect_generate()
            .times(1)
            .returning(|_| Ok(sample_report_value()));

        let service = AnalysisService::new(Arc::new(model));
        let outcome = service.analyze_validated(&media(), EXPECTATION).await.unwrap();
        assert!(!outcome.repaired);
        assert_eq!(outcome.report.observations.len(), 5);
    }

    #[tokio::test]
    async fn test_invalid_then_valid_is_repaired() {
        let mut seq = Sequence::new();
        let mut model = MockReportModel::new();
        model
            .expect_generate()
            .withf(|req| !req.user_prompt.contains("Previous error"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(two_counterfactuals()));
        model
            .expect_generate()
            .withf(|req| {
                req.tier == ModelTier::HighFidelity
                    && req.user_prompt.contains(prompts::REPAIR_DIRECTIVE)
                    && req.user_prompt.ends_with(
                        "Previous error: `counterfactuals` must have exactly 3 items, found 2",
                    )
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(sample_report_value()));

        let service = AnalysisService::new(Arc::new(model));
        let outcome = service.analyze_validated(&media(), EXPECTATION).await.unwrap();
        assert!(outcome.repaired);
        assert_eq!(outcome.report.counterfactuals.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_twice_is_terminal() {
        let mut model = MockReportModel::new();
        model
            .expect_generate()
            .times(2)
            .returning(|_| Ok(two_counterfactuals()));

        let service = AnalysisService::new(Arc::new(model));
        let err = service.analyze_validated(&media(), EXPECTATION).await.unwrap_err();
        match err {
            MlError::RepairFailed { original, repair } => {
                assert_eq!(original.path(), Some("counterfactuals"));
                assert!(repair.is_schema_mismatch());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repair_call_transport_failure_is_wrapped() {
        let mut seq = Sequence::new();
        let mut model = MockReportModel::new();
        model
            .expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json!({ "scenario": {} })));
        model
            .expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(MlError::malformed("expected value", "not json")));

        let service = AnalysisService::new(Arc::new(model));
        let err = service.analyze_validated(&media(), EXPECTATION).await.unwrap_err();
        match err {
            MlError::RepairFailed { repair, .. } => {
                assert!(matches!(*repair, MlError::MalformedResponse { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_call_failure_skips_repair() {
        let mut model = MockReportModel::new();
        model.expect_generate().times(1).returning(|_| {
            Err(MlError::Upstream {
                status: 503,
                body: "unavailable".to_string(),
            })
        });

        let service = AnalysisService::new(Arc::new(model));
        let err = service.analyze_validated(&media(), EXPECTATION).await.unwrap_err();
        assert!(matches!(err, MlError::Upstream { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_malformed_first_response_skips_repair() {
        let mut model = MockReportModel::new();
        model
            .expect_generate()
            .times(1)
            .returning(|_| Err(MlError::malformed("expected value", "Sure! Here it is")));

        let service = AnalysisService::new(Arc::new(model));
        let err = service.analyze_validated(&media(), EXPECTATION).await.unwrap_err();
        assert!(matches!(err, MlError::MalformedResponse { .. }));
    }
}
