//! Key normalization for model output.
//!
//! Models drift between `snake_case`, `camelCase` and a handful of synonyms,
//! and sometimes wrap the payload in an extra object. Each stage family has a
//! static [`KeySchema`] describing the known spellings; [`normalize`] rewrites
//! a parsed value onto the canonical camelCase schema. Adding an alias is a
//! table edit.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

// =============================================================================
// Schema tables
// =============================================================================

/// Alias table and structural hints for one stage family.
pub struct KeySchema {
    pub name: &'static str,
    /// `(alternate spelling, canonical key)` pairs.
    pub aliases: &'static [(&'static str, &'static str)],
    /// Canonical keys whose values are copied without per-key renaming.
    pub opaque: &'static [&'static str],
    /// Single-key envelopes hoisted away at the top level.
    pub wrappers: &'static [&'static str],
    /// Top-level objects flattened into canonical keys: `(key, [(inner, canonical)])`.
    pub nested: &'static [(&'static str, &'static [(&'static str, &'static str)])],
    index: &'static Lazy<HashMap<&'static str, &'static str>>,
}

impl KeySchema {
    /// Canonical spelling for `key`, if it is a known alias.
    pub fn canonical(&self, key: &str) -> Option<&'static str> {
        self.index.get(key).copied()
    }

    fn is_opaque(&self, key: &str) -> bool {
        self.opaque.contains(&key)
    }

    fn is_wrapper(&self, key: &str) -> bool {
        self.wrappers.contains(&key)
    }

    fn nested_for(&self, key: &str) -> Option<&'static [(&'static str, &'static str)]> {
        self.nested
            .iter()
            .find(|(outer, _)| *outer == key)
            .map(|(_, pairs)| *pairs)
    }
}

const PERSONALITY_ALIASES: &[(&str, &str)] = &[
    ("chain_of_reasoning", "chainOfReasoning"),
    ("reasoning_chain", "chainOfReasoning"),
    ("reasoning_steps", "chainOfReasoning"),
    ("reasoningSteps", "chainOfReasoning"),
    ("dimension_scores", "dimensionScores"),
    ("dimensions", "dimensionScores"),
    ("scores", "dimensionScores"),
    ("market_opportunity", "marketOpportunity"),
    ("market", "marketOpportunity"),
    ("problem_solution_fit", "problemSolutionFit"),
    ("team_execution", "teamExecution"),
    ("team", "teamExecution"),
    ("business_model", "businessModel"),
    ("competitive_moat", "competitiveMoat"),
    ("moat", "competitiveMoat"),
    ("traction_evidence", "tractionEvidence"),
    ("traction", "tractionEvidence"),
    ("strongest_counter_argument", "strongestCounterArgument"),
    ("counter_argument", "strongestCounterArgument"),
    ("counterArgument", "strongestCounterArgument"),
    ("response_to_counter_argument", "responseToCounterArgument"),
    ("counter_response", "responseToCounterArgument"),
    ("counterResponse", "responseToCounterArgument"),
    ("confidence_level", "confidence"),
    ("confidenceLevel", "confidence"),
    ("overall_score", "overallScore"),
    ("overall_reasoning", "overallReasoning"),
    ("final_verdict", "verdict"),
    ("finalVerdict", "verdict"),
    ("verdict_reasoning", "verdictReasoning"),
    ("critical_risks", "criticalRisks"),
    ("risks", "criticalRisks"),
    ("upside_drivers", "upsideDrivers"),
    ("upsides", "upsideDrivers"),
    ("bias_check", "biasCheck"),
];

const ADJUDICATION_ALIASES: &[(&str, &str)] = &[
    ("chain_of_reasoning", "chainOfReasoning"),
    ("reasoning_chain", "chainOfReasoning"),
    ("reasoning_steps", "chainOfReasoning"),
    ("reasoningSteps", "chainOfReasoning"),
    ("areas_of_agreement", "agreements"),
    ("agreement_points", "agreements"),
    ("areas_of_disagreement", "disagreements"),
    ("key_disagreements", "disagreements"),
    ("risk_first_view", "riskFirstView"),
    ("risk_view", "riskFirstView"),
    ("upside_first_view", "upsideFirstView"),
    ("upside_view", "upsideFirstView"),
    ("research_usage", "researchUsage"),
    ("how_research_was_used", "researchUsage"),
    ("research_used", "researchUsage"),
    ("final_score", "finalScore"),
    ("final_reasoning", "finalReasoning"),
    ("final_verdict", "finalVerdict"),
    ("verdict", "finalVerdict"),
    ("confidence_level", "confidence"),
    ("confidenceLevel", "confidence"),
    ("bias_check", "biasCheck"),
    ("prioritized_checklist", "checklist"),
    ("improvement_checklist", "checklist"),
    ("idea_improvements", "ideaImprovements"),
    ("pitch_improvements", "pitchImprovements"),
];

static PERSONALITY_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| PERSONALITY_ALIASES.iter().copied().collect());

static ADJUDICATION_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| ADJUDICATION_ALIASES.iter().copied().collect());

/// Keys for the risk-first and upside-first assessments.
pub static PERSONALITY_KEYS: KeySchema = KeySchema {
    name: "personality",
    aliases: PERSONALITY_ALIASES,
    opaque: &["chainOfReasoning", "criticalRisks", "upsideDrivers", "evidence"],
    wrappers: &["assessment", "analysis", "result", "response", "data"],
    nested: &[(
        "overall",
        &[("score", "overallScore"), ("reasoning", "overallReasoning")],
    )],
    index: &PERSONALITY_INDEX,
};

/// Keys for the adjudication verdict.
pub static ADJUDICATION_KEYS: KeySchema = KeySchema {
    name: "adjudication",
    aliases: ADJUDICATION_ALIASES,
    opaque: &["chainOfReasoning", "agreements"],
    wrappers: &["adjudication", "result", "response", "data"],
    nested: &[(
        "final",
        &[
            ("score", "finalScore"),
            ("reasoning", "finalReasoning"),
            ("verdict", "finalVerdict"),
            ("confidence", "confidence"),
        ],
    )],
    index: &ADJUDICATION_INDEX,
};

// =============================================================================
// Transform
// =============================================================================

/// Rewrite `value` onto the canonical schema described by `schema`.
///
/// Pure and idempotent. Unknown keys pass through; when an alias and its
/// canonical key are both present the canonical one wins.
pub fn normalize(value: &Value, schema: &KeySchema) -> Value {
    let mut root = value;
    while let Value::Object(map) = root {
        match envelope(map, schema) {
            Some(inner) => root = inner,
            None => break,
        }
    }

    match root {
        Value::Object(map) => {
            let out = normalize_object(map, schema, true);
            // Flattening can leave a lone envelope behind; unwrap it too.
            match envelope(&out, schema) {
                Some(inner) => normalize(inner, schema),
                None => Value::Object(out),
            }
        }
        other => normalize_value(other, schema),
    }
}

/// The inner object when `map` is a single-key wrapper around one.
fn envelope<'a>(map: &'a Map<String, Value>, schema: &KeySchema) -> Option<&'a Value> {
    if map.len() != 1 {
        return None;
    }
    match map.iter().next() {
        Some((key, inner @ Value::Object(_))) if schema.is_wrapper(key) => Some(inner),
        _ => None,
    }
}

fn normalize_value(value: &Value, schema: &KeySchema) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_object(map, schema, false)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| normalize_value(item, schema))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

fn normalize_object(map: &Map<String, Value>, schema: &KeySchema, top_level: bool) -> Map<String, Value> {
    let mut out = Map::new();

    for (key, value) in map {
        if top_level {
            if let (Some(pairs), Value::Object(inner)) = (schema.nested_for(key), value) {
                for (inner_key, canonical) in pairs {
                    if let Some(inner_value) = inner.get(*inner_key) {
                        if !map.contains_key(*canonical) && !out.contains_key(*canonical) {
                            out.insert(
                                (*canonical).to_string(),
                                normalize_field(canonical, inner_value, schema),
                            );
                        }
                    }
                }
                continue;
            }
        }

        let canonical = match schema.canonical(key) {
            Some(canonical) if map.contains_key(canonical) || out.contains_key(canonical) => {
                continue;
            }
            Some(canonical) => canonical,
            None => key.as_str(),
        };

        out.insert(canonical.to_string(), normalize_field(canonical, value, schema));
    }

    out
}

fn normalize_field(canonical: &str, value: &Value, schema: &KeySchema) -> Value {
    if schema.is_opaque(canonical) {
        value.clone()
    } else {
        normalize_value(value, schema)
    }
}
