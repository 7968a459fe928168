//! Causal-analysis report models.
//!
//! These types are the single source of truth for the report contract: the
//! generation schema in [`crate::schema`] is derived from them, and the
//! structural validator in [`crate::validate`] decodes into them.
//!
//! Doc comments on these types and their fields end up as `description`
//! entries in the schema the model receives, so they are written as
//! instructions to the model. Developer notes go in `//` comments.
//!
//! A report is built once per analysis call; a segment re-analysis yields a
//! brand-new report that replaces the previous one wholesale.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of failure shown in the media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    CookingFailure,
}

impl Domain {
    /// Every accepted domain, in wire order.
    pub const ALL: [Domain; 1] = [Domain::CookingFailure];

    /// Wire name of the domain.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::CookingFailure => "cooking_failure",
        }
    }

    /// Parse a wire name.
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

/// Which modality the observation is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    Visual,
    Audio,
    TextLog,
    UserText,
}

impl EvidenceType {
    /// Every accepted evidence type, in wire order.
    pub const ALL: [EvidenceType; 4] = [
        EvidenceType::Visual,
        EvidenceType::Audio,
        EvidenceType::TextLog,
        EvidenceType::UserText,
    ];

    /// Wire name of the evidence type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceType::Visual => "visual",
            EvidenceType::Audio => "audio",
            EvidenceType::TextLog => "text_log",
            EvidenceType::UserText => "user_text",
        }
    }

    /// Parse a wire name.
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }
}

/// What failed, in one sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scenario {
    pub domain: Domain,
    /// 1 sentence summary of what went wrong.
    pub failure_summary: String,
}

/// A timestamped observation grounded in the media. No speculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Observation {
    pub t_start_sec: f64,
    pub t_end_sec: f64,
    /// Concrete, visible/audible observation. No speculation.
    pub observation: String,
    pub evidence_type: EvidenceType,
    #[schemars(range(min = 0, max = 1))]
    pub confidence: f64,
}

/// One link in the causal chain from first cause to the observed failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RootCauseStep {
    #[schemars(range(min = 1))]
    pub step: u64,
    pub cause: String,
    /// How this cause leads to the next step; must be specific.
    pub mechanism: String,
    /// Indices into `observations` that support this step.
    #[schemars(length(min = 1))]
    pub linked_observation_indices: Vec<u64>,
    #[schemars(range(min = 0, max = 1))]
    pub confidence: f64,
}

/// A single controlled change and its predicted effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Counterfactual {
    /// Single controlled change.
    pub change: String,
    /// What would differ in the outcome.
    pub predicted_outcome_change: String,
    /// Causal explanation, not generic.
    pub why_it_changes: String,
    #[schemars(range(min = 0, max = 1))]
    pub confidence: f64,
}

/// The smallest fix that would have prevented the failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MinimalIntervention {
    /// Smallest viable fix.
    pub action: String,
    pub why_this_is_minimal: String,
    pub expected_effect: String,
    pub risk_tradeoffs: String,
}

/// Expected versus observed state at one point in the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineEntry {
    pub t_sec: f64,
    pub expected_state: String,
    pub observed_state: String,
    #[schemars(range(min = 0, max = 1))]
    pub divergence_score: f64,
    pub notes: String,
}

/// Causal analysis of why the observed outcome diverged from the expectation.
/// Every claim must be tied to observations from the media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RealityDebugReport {
    pub scenario: Scenario,
    #[schemars(length(min = 5))]
    pub observations: Vec<Observation>,
    #[schemars(length(min = 4, max = 10))]
    pub root_cause_chain: Vec<RootCauseStep>,
    #[schemars(length(equal = 3))]
    pub counterfactuals: Vec<Counterfactual>,
    pub minimal_intervention: MinimalIntervention,
    #[schemars(length(min = 6))]
    pub timeline: Vec<TimelineEntry>,
}

impl RealityDebugReport {
    /// Field paths of confidence and divergence scores outside `[0, 1]`.
    ///
    /// The structural validator only checks that scores are numbers; callers
    /// use this to surface out-of-range values without rejecting the report.
    pub fn out_of_range_scores(&self) -> Vec<String> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        let mut paths = Vec::new();

        for (i, obs) in self.observations.iter().enumerate() {
            if !in_range(obs.confidence) {
                paths.push(format!("observations[{i}].confidence"));
            }
        }
        for (i, step) in self.root_cause_chain.iter().enumerate() {
            if !in_range(step.confidence) {
                paths.push(format!("root_cause_chain[{i}].confidence"));
            }
        }
        for (i, cf) in self.counterfactuals.iter().enumerate() {
            if !in_range(cf.confidence) {
                paths.push(format!("counterfactuals[{i}].confidence"));
            }
        }
        for (i, entry) in self.timeline.iter().enumerate() {
            if !in_range(entry.divergence_score) {
                paths.push(format!("timeline[{i}].divergence_score"));
            }
        }

        paths
    }
}
