//! Declarative report schema handed to the generation API.
//!
//! The schema is generated from [`RealityDebugReport`] and then normalised
//! for the structured-output dialect the model accepts: sub-schemas are
//! inlined, every object is closed with `additionalProperties: false`, and
//! meta keys the API rejects are removed.

use std::sync::OnceLock;

use schemars::gen::SchemaSettings;
use serde_json::{Map, Value};

use crate::report::RealityDebugReport;

/// Keys dropped from every schema node.
const STRIPPED_KEYS: [&str; 4] = ["$schema", "title", "format", "definitions"];

static REPORT_SCHEMA: OnceLock<Value> = OnceLock::new();

/// Schema document for [`RealityDebugReport`], built once per process.
pub fn report_schema() -> &'static Value {
    REPORT_SCHEMA.get_or_init(build_report_schema)
}

fn build_report_schema() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.option_add_null_type = false;
        })
        .into_generator();
    let root = generator.into_root_schema_for::<RealityDebugReport>();

    let mut value = serde_json::to_value(root).expect("report schema is serializable");
    normalize(&mut value);
    value
}

fn normalize(value: &mut Value) {
    match value {
        Value::Object(map) => {
            flatten_single_all_of(map);
            for key in STRIPPED_KEYS {
                map.remove(key);
            }
            if is_object_schema(map) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            for child in map.values_mut() {
                normalize(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize),
        _ => {}
    }
}

/// Field metadata on a struct-typed field can wrap the inlined schema in a
/// one-element `allOf`; hoist it so every object is a plain node.
fn flatten_single_all_of(map: &mut Map<String, Value>) {
    let inner = match map.get("allOf") {
        Some(Value::Array(parts)) if parts.len() == 1 => parts[0].clone(),
        _ => return,
    };
    map.remove("allOf");
    if let Value::Object(inner) = inner {
        for (k, v) in inner {
            map.entry(k).or_insert(v);
        }
    }
}

fn is_object_schema(map: &Map<String, Value>) -> bool {
    map.get("type").and_then(Value::as_str) == Some("object") && map.contains_key("properties")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop<'a>(schema: &'a Value, name: &str) -> &'a Value {
        &schema["properties"][name]
    }

    fn required(schema: &Value) -> Vec<&str> {
        let mut fields: Vec<&str> = schema["required"]
            .as_array()
            .expect("required list")
            .iter()
            .filter_map(Value::as_str)
            .collect();
        fields.sort_unstable();
        fields
    }

    fn walk<'a>(value: &'a Value, out: &mut Vec<&'a Map<String, Value>>) {
        match value {
            Value::Object(map) => {
                out.push(map);
                map.values().for_each(|v| walk(v, out));
            }
            Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
            _ => {}
        }
    }

    #[test]
    fn test_top_level_shape() {
        let schema = report_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(
            required(schema),
            vec![
                "counterfactuals",
                "minimal_intervention",
                "observations",
                "root_cause_chain",
                "scenario",
                "timeline",
            ]
        );
    }

    #[test]
    fn test_schema_is_self_contained() {
        let text = report_schema().to_string();
        assert!(!text.contains("$ref"));
        assert!(!text.contains("definitions"));
        assert!(!text.contains("$schema"));
        assert!(!text.contains("\"format\""));
    }

    #[test]
    fn test_every_object_is_closed() {
        let mut nodes = Vec::new();
        walk(report_schema(), &mut nodes);
        let objects: Vec<_> = nodes
            .into_iter()
            .filter(|m| m.get("type").and_then(Value::as_str) == Some("object"))
            .collect();

        // report, scenario, observation, step, counterfactual, intervention, timeline entry
        assert_eq!(objects.len(), 7);
        for object in objects {
            assert_eq!(object.get("additionalProperties"), Some(&Value::Bool(false)));
            assert!(object.contains_key("required"));
        }
    }

    #[test]
    fn test_array_bounds_mirror_report_contract() {
        let schema = report_schema();

        assert_eq!(prop(schema, "observations")["minItems"], 5);
        assert!(prop(schema, "observations").get("maxItems").is_none());

        assert_eq!(prop(schema, "root_cause_chain")["minItems"], 4);
        assert_eq!(prop(schema, "root_cause_chain")["maxItems"], 10);

        assert_eq!(prop(schema, "counterfactuals")["minItems"], 3);
        assert_eq!(prop(schema, "counterfactuals")["maxItems"], 3);

        assert_eq!(prop(schema, "timeline")["minItems"], 6);

        let step = &prop(schema, "root_cause_chain")["items"];
        assert_eq!(prop(step, "linked_observation_indices")["minItems"], 1);
        assert_eq!(prop(step, "linked_observation_indices")["items"]["type"], "integer");
        assert_eq!(prop(step, "step")["type"], "integer");
        assert_eq!(prop(step, "step")["minimum"].as_f64(), Some(1.0));
    }

    #[test]
    fn test_enums_and_score_bounds() {
        let schema = report_schema();

        let domain = &prop(prop(schema, "scenario"), "domain");
        assert_eq!(domain["enum"], serde_json::json!(["cooking_failure"]));

        let observation = &prop(schema, "observations")["items"];
        assert_eq!(
            prop(observation, "evidence_type")["enum"],
            serde_json::json!(["visual", "audio", "text_log", "user_text"])
        );
        assert_eq!(prop(observation, "confidence")["minimum"].as_f64(), Some(0.0));
        assert_eq!(prop(observation, "confidence")["maximum"].as_f64(), Some(1.0));

        let entry = &prop(schema, "timeline")["items"];
        assert_eq!(prop(entry, "divergence_score")["maximum"].as_f64(), Some(1.0));
    }

    #[test]
    fn test_field_descriptions_reach_the_model() {
        let schema = report_schema();
        let summary = &prop(prop(schema, "scenario"), "failure_summary");
        assert_eq!(summary["description"], "1 sentence summary of what went wrong.");
    }

    #[test]
    fn test_type_descriptions_are_model_instructions() {
        let schema = report_schema();
        let root = schema["description"].as_str().unwrap();
        assert!(root.starts_with(
            "Causal analysis of why the observed outcome diverged from the expectation."
        ));
        assert!(root.contains("Every claim must be tied to observations from the media."));

        let mut nodes = Vec::new();
        walk(schema, &mut nodes);
        for node in nodes {
            if let Some(Value::String(text)) = node.get("description") {
                assert!(!text.contains("segment re-analysis"), "{text}");
                assert!(!text.contains("Built once"), "{text}");
                assert!(!text.contains("analysed media"), "{text}");
            }
        }
    }
}
