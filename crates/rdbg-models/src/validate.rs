//! Structural validation of model output.
//!
//! Checks run in a fixed order and stop at the first failure: top-level
//! presence, scenario, observations, root-cause chain, counterfactuals,
//! minimal intervention, timeline. A value that passes is decoded into a
//! [`RealityDebugReport`].
//!
//! Not enforced here: score ranges, `t_start_sec <= t_end_sec`, whether
//! linked observation indices point at existing observations, and step
//! uniqueness or ordering. Unknown keys are tolerated.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::report::{Domain, EvidenceType, RealityDebugReport};

/// Top-level fields, in check order.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "scenario",
    "observations",
    "root_cause_chain",
    "counterfactuals",
    "minimal_intervention",
    "timeline",
];

pub const MIN_OBSERVATIONS: usize = 5;
pub const MIN_ROOT_CAUSE_STEPS: usize = 4;
pub const MAX_ROOT_CAUSE_STEPS: usize = 10;
pub const COUNTERFACTUAL_COUNT: usize = 3;
pub const MIN_TIMELINE_ENTRIES: usize = 6;

/// Why a value does not conform to the report schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("report is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{path}`")]
    MissingField { path: String },

    #[error("`{path}` must be {expected}")]
    WrongType { path: String, expected: &'static str },

    #[error("`{path}` has value {found}, expected one of [{allowed}]")]
    InvalidEnum {
        path: String,
        found: String,
        allowed: String,
    },

    #[error("`{path}` must have at least {min} items, found {found}")]
    TooFewItems { path: String, min: usize, found: usize },

    #[error("`{path}` must have at most {max} items, found {found}")]
    TooManyItems { path: String, max: usize, found: usize },

    #[error("`{path}` must have exactly {expected} items, found {found}")]
    WrongItemCount {
        path: String,
        expected: usize,
        found: usize,
    },

    #[error("`{path}` must not be empty")]
    EmptyArray { path: String },

    #[error("report could not be decoded: {reason}")]
    Undecodable { reason: String },
}

impl SchemaViolation {
    /// Field path the violation refers to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            SchemaViolation::MissingField { path }
            | SchemaViolation::WrongType { path, .. }
            | SchemaViolation::InvalidEnum { path, .. }
            | SchemaViolation::TooFewItems { path, .. }
            | SchemaViolation::TooManyItems { path, .. }
            | SchemaViolation::WrongItemCount { path, .. }
            | SchemaViolation::EmptyArray { path } => Some(path),
            SchemaViolation::NotAnObject | SchemaViolation::Undecodable { .. } => None,
        }
    }
}

pub type ValidationResult<T> = Result<T, SchemaViolation>;

/// Boolean verdict: does `value` conform to the report schema?
pub fn is_valid_report(value: &Value) -> bool {
    validate_report(value).is_ok()
}

/// Validate `value` against the report schema and decode it.
pub fn validate_report(value: &Value) -> ValidationResult<RealityDebugReport> {
    let root = value.as_object().ok_or(SchemaViolation::NotAnObject)?;

    for field in REQUIRED_FIELDS {
        present(root, "", field)?;
    }

    check_scenario(root)?;
    check_observations(root)?;
    check_root_cause_chain(root)?;
    check_counterfactuals(root)?;
    check_minimal_intervention(root)?;
    check_timeline(root)?;

    serde_json::from_value(value.clone()).map_err(|e| SchemaViolation::Undecodable {
        reason: e.to_string(),
    })
}

fn check_scenario(root: &Map<String, Value>) -> ValidationResult<()> {
    let scenario = object_field(root, "", "scenario")?;

    let domain = present(scenario, "scenario", "domain")?;
    if domain.as_str().and_then(Domain::from_wire).is_none() {
        return Err(invalid_enum(
            "scenario.domain",
            domain,
            Domain::ALL.iter().map(Domain::as_str),
        ));
    }

    string_field(scenario, "scenario", "failure_summary")
}

fn check_observations(root: &Map<String, Value>) -> ValidationResult<()> {
    let items = array_field(root, "", "observations")?;
    min_items("observations", items, MIN_OBSERVATIONS)?;

    for (i, item) in items.iter().enumerate() {
        let path = format!("observations[{i}]");
        let obs = item_object(item, &path)?;
        number_field(obs, &path, "t_start_sec")?;
        number_field(obs, &path, "t_end_sec")?;
        string_field(obs, &path, "observation")?;
        number_field(obs, &path, "confidence")?;

        let evidence = present(obs, &path, "evidence_type")?;
        if evidence.as_str().and_then(EvidenceType::from_wire).is_none() {
            return Err(invalid_enum(
                &join(&path, "evidence_type"),
                evidence,
                EvidenceType::ALL.iter().map(EvidenceType::as_str),
            ));
        }
    }

    Ok(())
}

fn check_root_cause_chain(root: &Map<String, Value>) -> ValidationResult<()> {
    let items = array_field(root, "", "root_cause_chain")?;
    min_items("root_cause_chain", items, MIN_ROOT_CAUSE_STEPS)?;
    if items.len() > MAX_ROOT_CAUSE_STEPS {
        return Err(SchemaViolation::TooManyItems {
            path: "root_cause_chain".to_string(),
            max: MAX_ROOT_CAUSE_STEPS,
            found: items.len(),
        });
    }

    for (i, item) in items.iter().enumerate() {
        let path = format!("root_cause_chain[{i}]");
        let step = item_object(item, &path)?;
        integer_field(step, &path, "step")?;
        string_field(step, &path, "cause")?;
        string_field(step, &path, "mechanism")?;
        number_field(step, &path, "confidence")?;

        let indices_path = join(&path, "linked_observation_indices");
        let indices = array_field(step, &path, "linked_observation_indices")?;
        if indices.is_empty() {
            return Err(SchemaViolation::EmptyArray { path: indices_path });
        }
        for (j, index) in indices.iter().enumerate() {
            if index.as_u64().is_none() {
                return Err(SchemaViolation::WrongType {
                    path: format!("{indices_path}[{j}]"),
                    expected: "a non-negative integer",
                });
            }
        }
    }

    Ok(())
}

fn check_counterfactuals(root: &Map<String, Value>) -> ValidationResult<()> {
    let items = array_field(root, "", "counterfactuals")?;
    if items.len() != COUNTERFACTUAL_COUNT {
        return Err(SchemaViolation::WrongItemCount {
            path: "counterfactuals".to_string(),
            expected: COUNTERFACTUAL_COUNT,
            found: items.len(),
        });
    }

    for (i, item) in items.iter().enumerate() {
        let path = format!("counterfactuals[{i}]");
        let cf = item_object(item, &path)?;
        string_field(cf, &path, "change")?;
        string_field(cf, &path, "predicted_outcome_change")?;
        string_field(cf, &path, "why_it_changes")?;
        number_field(cf, &path, "confidence")?;
    }

    Ok(())
}

fn check_minimal_intervention(root: &Map<String, Value>) -> ValidationResult<()> {
    let path = "minimal_intervention";
    let intervention = object_field(root, "", path)?;
    string_field(intervention, path, "action")?;
    string_field(intervention, path, "why_this_is_minimal")?;
    string_field(intervention, path, "expected_effect")?;
    string_field(intervention, path, "risk_tradeoffs")
}

fn check_timeline(root: &Map<String, Value>) -> ValidationResult<()> {
    let items = array_field(root, "", "timeline")?;
    min_items("timeline", items, MIN_TIMELINE_ENTRIES)?;

    for (i, item) in items.iter().enumerate() {
        let path = format!("timeline[{i}]");
        let entry = item_object(item, &path)?;
        number_field(entry, &path, "t_sec")?;
        string_field(entry, &path, "expected_state")?;
        string_field(entry, &path, "observed_state")?;
        number_field(entry, &path, "divergence_score")?;
        string_field(entry, &path, "notes")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// A field counts as present when it exists and is not `null`.
fn present<'a>(obj: &'a Map<String, Value>, parent: &str, name: &str) -> ValidationResult<&'a Value> {
    match obj.get(name) {
        Some(Value::Null) | None => Err(SchemaViolation::MissingField {
            path: join(parent, name),
        }),
        Some(value) => Ok(value),
    }
}

fn wrong_type(parent: &str, name: &str, expected: &'static str) -> SchemaViolation {
    SchemaViolation::WrongType {
        path: join(parent, name),
        expected,
    }
}

fn string_field(obj: &Map<String, Value>, parent: &str, name: &str) -> ValidationResult<()> {
    match present(obj, parent, name)? {
        Value::String(_) => Ok(()),
        _ => Err(wrong_type(parent, name, "a string")),
    }
}

fn number_field(obj: &Map<String, Value>, parent: &str, name: &str) -> ValidationResult<()> {
    match present(obj, parent, name)? {
        Value::Number(_) => Ok(()),
        _ => Err(wrong_type(parent, name, "a number")),
    }
}

fn integer_field(obj: &Map<String, Value>, parent: &str, name: &str) -> ValidationResult<()> {
    match present(obj, parent, name)?.as_u64() {
        Some(_) => Ok(()),
        None => Err(wrong_type(parent, name, "a non-negative integer")),
    }
}

fn object_field<'a>(
    obj: &'a Map<String, Value>,
    parent: &str,
    name: &str,
) -> ValidationResult<&'a Map<String, Value>> {
    present(obj, parent, name)?
        .as_object()
        .ok_or_else(|| wrong_type(parent, name, "an object"))
}

fn array_field<'a>(
    obj: &'a Map<String, Value>,
    parent: &str,
    name: &str,
) -> ValidationResult<&'a Vec<Value>> {
    present(obj, parent, name)?
        .as_array()
        .ok_or_else(|| wrong_type(parent, name, "an array"))
}

fn item_object<'a>(item: &'a Value, path: &str) -> ValidationResult<&'a Map<String, Value>> {
    item.as_object().ok_or_else(|| SchemaViolation::WrongType {
        path: path.to_string(),
        expected: "an object",
    })
}

fn min_items(path: &str, items: &[Value], min: usize) -> ValidationResult<()> {
    if items.len() < min {
        return Err(SchemaViolation::TooFewItems {
            path: path.to_string(),
            min,
            found: items.len(),
        });
    }
    Ok(())
}

fn invalid_enum<'a>(
    path: &str,
    found: &Value,
    allowed: impl Iterator<Item = &'a str>,
) -> SchemaViolation {
    SchemaViolation::InvalidEnum {
        path: path.to_string(),
        found: found.to_string(),
        allowed: allowed.collect::<Vec<_>>().join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_report_value;
    use serde_json::json;

    fn violation(value: &Value) -> SchemaViolation {
        validate_report(value).expect_err("value should be rejected")
    }

    #[test]
    fn test_sample_report_is_valid() {
        let value = sample_report_value();
        assert!(is_valid_report(&value));
        let report = validate_report(&value).unwrap();
        assert_eq!(report.counterfactuals.len(), 3);
    }

    #[test]
    fn test_non_object_rejected() {
        assert_eq!(violation(&json!([1, 2, 3])), SchemaViolation::NotAnObject);
        assert_eq!(violation(&Value::Null), SchemaViolation::NotAnObject);
    }

    #[test]
    fn test_each_top_level_field_required() {
        for field in REQUIRED_FIELDS {
            let mut value = sample_report_value();
            value.as_object_mut().unwrap().remove(field);
            assert!(!is_valid_report(&value), "{field} removed should fail");
            assert_eq!(
                violation(&value),
                SchemaViolation::MissingField {
                    path: field.to_string()
                }
            );
        }
    }

    #[test]
    fn test_null_top_level_field_counts_as_missing() {
        let mut value = sample_report_value();
        value["timeline"] = Value::Null;
        assert_eq!(violation(&value).path(), Some("timeline"));
    }

    #[test]
    fn test_presence_checked_before_shape() {
        // An invalid scenario must not mask a missing timeline.
        let mut value = sample_report_value();
        value["scenario"]["domain"] = json!("plumbing_failure");
        value.as_object_mut().unwrap().remove("timeline");
        assert_eq!(violation(&value).path(), Some("timeline"));
    }

    #[test]
    fn test_unknown_domain_rejected() {
        let mut value = sample_report_value();
        value["scenario"]["domain"] = json!("baking");
        assert!(matches!(
            violation(&value),
            SchemaViolation::InvalidEnum { ref path, .. } if path == "scenario.domain"
        ));
    }

    #[test]
    fn test_counterfactuals_need_exactly_three() {
        for count in [0usize, 2, 4] {
            let mut value = sample_report_value();
            let template = value["counterfactuals"][0].clone();
            value["counterfactuals"] = Value::Array(vec![template; count]);
            assert_eq!(
                violation(&value),
                SchemaViolation::WrongItemCount {
                    path: "counterfactuals".to_string(),
                    expected: 3,
                    found: count,
                }
            );
        }
    }

    #[test]
    fn test_observation_minimum() {
        let mut value = sample_report_value();
        value["observations"].as_array_mut().unwrap().pop();
        assert!(matches!(
            violation(&value),
            SchemaViolation::TooFewItems { min: 5, found: 4, .. }
        ));
    }

    #[test]
    fn test_evidence_type_outside_enum_rejected() {
        let mut value = sample_report_value();
        value["observations"][3]["evidence_type"] = json!("smell");
        let err = violation(&value);
        assert_eq!(err.path(), Some("observations[3].evidence_type"));
        assert!(err.to_string().contains("visual, audio, text_log, user_text"));
    }

    #[test]
    fn test_root_cause_chain_bounds() {
        let mut value = sample_report_value();
        let template = value["root_cause_chain"][0].clone();

        value["root_cause_chain"] = Value::Array(vec![template.clone(); 3]);
        assert!(matches!(violation(&value), SchemaViolation::TooFewItems { min: 4, .. }));

        value["root_cause_chain"] = Value::Array(vec![template.clone(); 11]);
        assert!(matches!(violation(&value), SchemaViolation::TooManyItems { max: 10, .. }));

        value["root_cause_chain"] = Value::Array(vec![template; 10]);
        assert!(is_valid_report(&value));
    }

    #[test]
    fn test_empty_linked_indices_rejected() {
        let mut value = sample_report_value();
        value["root_cause_chain"][2]["linked_observation_indices"] = json!([]);
        assert_eq!(
            violation(&value),
            SchemaViolation::EmptyArray {
                path: "root_cause_chain[2].linked_observation_indices".to_string()
            }
        );
    }

    #[test]
    fn test_out_of_range_indices_are_not_checked() {
        let mut value = sample_report_value();
        value["root_cause_chain"][0]["linked_observation_indices"] = json!([99, 1000]);
        assert!(is_valid_report(&value));
    }

    #[test]
    fn test_unenforced_invariants_pass() {
        let mut value = sample_report_value();
        value["observations"][0]["confidence"] = json!(3.5);
        value["observations"][1]["t_start_sec"] = json!(9.0);
        value["observations"][1]["t_end_sec"] = json!(2.0);
        value["timeline"][0]["divergence_score"] = json!(-1);
        value["root_cause_chain"][0]["step"] = json!(7);
        value["root_cause_chain"][1]["step"] = json!(7);
        value["extra_key"] = json!("tolerated");

        let report = validate_report(&value).unwrap();
        assert_eq!(report.out_of_range_scores().len(), 2);
    }

    #[test]
    fn test_string_where_number_expected() {
        let mut value = sample_report_value();
        value["timeline"][5]["t_sec"] = json!("00:12");
        assert_eq!(
            violation(&value),
            SchemaViolation::WrongType {
                path: "timeline[5].t_sec".to_string(),
                expected: "a number",
            }
        );
    }

    #[test]
    fn test_fractional_step_rejected() {
        let mut value = sample_report_value();
        value["root_cause_chain"][0]["step"] = json!(1.5);
        assert_eq!(violation(&value).path(), Some("root_cause_chain[0].step"));
    }

    #[test]
    fn test_minimal_intervention_shape() {
        let mut value = sample_report_value();
        value["minimal_intervention"] = json!(["not", "an", "object"]);
        assert_eq!(violation(&value).path(), Some("minimal_intervention"));

        let mut value = sample_report_value();
        value["minimal_intervention"]["risk_tradeoffs"] = json!(false);
        assert_eq!(
            violation(&value).path(),
            Some("minimal_intervention.risk_tradeoffs")
        );
    }

    #[test]
    fn test_first_failure_wins() {
        let mut value = sample_report_value();
        value["observations"][0]["observation"] = json!(42);
        value["timeline"] = json!([]);
        assert_eq!(violation(&value).path(), Some("observations[0].observation"));
    }

    #[test]
    fn test_timeline_minimum() {
        let mut value = sample_report_value();
        value["timeline"].as_array_mut().unwrap().truncate(5);
        assert!(matches!(
            violation(&value),
            SchemaViolation::TooFewItems { min: 6, found: 5, .. }
        ));
    }
}
