//! Prompt templates.

/// Fixed system instruction for every analysis call.
pub const SYSTEM_INSTRUCTION: &str = r#"You are Reality Debugger, a multimodal failure-investigation engine.
Goal: determine WHY a real-world failure happened (causal chain), not just WHAT happened.

Non-negotiables:
- Use evidence grounded in the provided media and user expectations.
- Provide timestamped observations and link every causal step to evidence.
- Produce non-generic, domain-specific reasoning.
- If uncertain, state uncertainty AND list what evidence is missing.
- Do not moralize. Do not be inspirational. Be concise and technical.

Output must EXACTLY match the provided JSON schema.
No markdown. No extra keys. No commentary."#;

pub const EXPECTATION_PLACEHOLDER: &str = "{{EXPECTATION_TEXT}}";
pub const T_START_PLACEHOLDER: &str = "{{T_START}}";
pub const T_END_PLACEHOLDER: &str = "{{T_END}}";

/// Task instruction for a full-video analysis.
pub const FULL_ANALYSIS_TEMPLATE: &str = r#"Expectation (what should have happened):
{{EXPECTATION_TEXT}}

Task:
1) Extract timestamped observations from the media.
2) Propose multiple plausible causes, then prune to the most likely root cause chain.
3) Provide exactly 3 counterfactuals.
4) Provide the minimal intervention (smallest fix).
5) Build an expectation-vs-reality timeline with divergence scores.

Guardrails:
- Every root_cause_chain step must reference linked_observation_indices.
- If you cannot see key evidence in the video/audio, say so in observations and lower confidence.
- Avoid generic advice; tie claims to observed evidence.
Return ONLY valid JSON per schema."#;

/// Task instruction for a time-window re-check.
pub const SEGMENT_ANALYSIS_TEMPLATE: &str = r#"We are re-checking ONLY this time window:
t_start_sec={{T_START}}
t_end_sec={{T_END}}

Given the same expectation:
{{EXPECTATION_TEXT}}

Task:
- Update observations relevant to this segment.
- Update the timeline entries that fall within [t_start_sec, t_end_sec].
- If this segment changes the most likely root cause chain, reflect it, otherwise keep it consistent.

Return ONLY JSON that matches the SAME schema.
(If fields are unchanged, repeat them exactly; do not omit required fields.)"#;

/// Appended to the full-analysis instruction on the repair call.
pub const REPAIR_DIRECTIVE: &str = r#"IMPORTANT: The previous response did not match the schema.
Return ONLY valid JSON that exactly matches the provided schema.
- Fix any type mismatches (e.g., strings where numbers are required)
- Ensure all enum values are correct
- Remove any extra keys not in the schema
- Ensure all required fields are present
- Ensure arrays meet minimum length requirements
- Do not include markdown formatting, code blocks, or any text outside the JSON object."#;

/// Render the full-analysis instruction.
pub fn full_analysis_prompt(expectation: &str) -> String {
    FULL_ANALYSIS_TEMPLATE.replace(EXPECTATION_PLACEHOLDER, expectation)
}

/// Render the segment instruction for `[t_start, t_end]` seconds.
pub fn segment_analysis_prompt(expectation: &str, t_start: f64, t_end: f64) -> String {
    // Substitute the expectation last so user text containing a time
    // placeholder is left untouched.
    SEGMENT_ANALYSIS_TEMPLATE
        .replace(T_START_PLACEHOLDER, &t_start.to_string())
        .replace(T_END_PLACEHOLDER, &t_end.to_string())
        .replace(EXPECTATION_PLACEHOLDER, expectation)
}

/// Render the repair instruction quoting why the previous response failed.
pub fn repair_prompt(expectation: &str, failure_reason: &str) -> String {
    format!(
        "{}\n\n{}\n\nPrevious error: {}",
        full_analysis_prompt(expectation),
        REPAIR_DIRECTIVE,
        failure_reason
    )
}
