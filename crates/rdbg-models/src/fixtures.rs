//! Sample reports for tests.

use serde_json::Value;

use crate::report::{
    Counterfactual, Domain, EvidenceType, MinimalIntervention, Observation, RealityDebugReport,
    RootCauseStep, Scenario, TimelineEntry,
};

/// A minimal report that satisfies every structural rule.
pub fn sample_report() -> RealityDebugReport {
    let observations = [
        (0.0, 3.0, "Batter is poured into a cold, unlined pan", EvidenceType::Visual),
        (3.0, 6.0, "Oven display reads 150C while recipe card shows 180C", EvidenceType::Visual),
        (6.0, 9.0, "Oven door is opened twice during the first minutes", EvidenceType::Visual),
        (9.0, 14.0, "Audible thud as the door closes", EvidenceType::Audio),
        (14.0, 20.0, "Cake centre is domed at the edges and sunken in the middle", EvidenceType::Visual),
    ]
    .into_iter()
    .map(|(t_start_sec, t_end_sec, text, evidence_type)| Observation {
        t_start_sec,
        t_end_sec,
        observation: text.to_string(),
        evidence_type,
        confidence: 0.8,
    })
    .collect();

    let root_cause_chain = [
        ("Oven set 30C below target", "Slow heat transfer delays crust set", vec![1]),
        ("Door opened early", "Temperature drop collapses early gas bubbles", vec![2, 3]),
        ("Uneven pan temperature", "Edges set before the centre can rise", vec![0]),
        ("Centre never sets", "Structure collapses as it cools", vec![4]),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (cause, mechanism, linked))| RootCauseStep {
        step: i as u64 + 1,
        cause: cause.to_string(),
        mechanism: mechanism.to_string(),
        linked_observation_indices: linked,
        confidence: 0.7,
    })
    .collect();

    let counterfactuals = [
        "Preheat to 180C",
        "Keep the door closed for 20 minutes",
        "Line and warm the pan",
    ]
    .into_iter()
    .map(|change| Counterfactual {
        change: change.to_string(),
        predicted_outcome_change: "Centre rises evenly".to_string(),
        why_it_changes: "Crumb sets before gas escapes".to_string(),
        confidence: 0.6,
    })
    .collect();

    let timeline = (0..6)
        .map(|i| TimelineEntry {
            t_sec: f64::from(i) * 3.0,
            expected_state: "Even rise".to_string(),
            observed_state: "Edges rising faster than centre".to_string(),
            divergence_score: f64::from(i) / 6.0,
            notes: String::new(),
        })
        .collect();

    RealityDebugReport {
        scenario: Scenario {
            domain: Domain::CookingFailure,
            failure_summary: "The cake sank in the middle because the oven ran cold.".to_string(),
        },
        observations,
        root_cause_chain,
        counterfactuals,
        minimal_intervention: MinimalIntervention {
            action: "Set the oven to 180C and verify with a thermometer".to_string(),
            why_this_is_minimal: "Single setting change".to_string(),
            expected_effect: "Even rise".to_string(),
            risk_tradeoffs: "Slightly darker crust".to_string(),
        },
        timeline,
    }
}

/// [`sample_report`] as a JSON value, as the model would return it.
pub fn sample_report_value() -> Value {
    serde_json::to_value(sample_report()).expect("sample report serializes")
}
