//! Risk-first / upside-first analyst assessment.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::coerce::{self, NEUTRAL_SCORE};
use super::{Confidence, StageKind, StageSchema, Verdict};

/// Upper bound on kept reasoning steps.
pub const MAX_REASONING_STEPS: usize = 12;
/// Upper bound on kept risks and drivers, each.
pub const MAX_SIGNALS: usize = 10;

// =============================================================================
// Dimensions
// =============================================================================

/// The fixed set of scored dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    MarketOpportunity,
    ProblemSolutionFit,
    TeamExecution,
    BusinessModel,
    CompetitiveMoat,
    TractionEvidence,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::MarketOpportunity,
        Dimension::ProblemSolutionFit,
        Dimension::TeamExecution,
        Dimension::BusinessModel,
        Dimension::CompetitiveMoat,
        Dimension::TractionEvidence,
    ];

    /// Canonical JSON key.
    pub fn key(&self) -> &'static str {
        match self {
            Dimension::MarketOpportunity => "marketOpportunity",
            Dimension::ProblemSolutionFit => "problemSolutionFit",
            Dimension::TeamExecution => "teamExecution",
            Dimension::BusinessModel => "businessModel",
            Dimension::CompetitiveMoat => "competitiveMoat",
            Dimension::TractionEvidence => "tractionEvidence",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScore {
    pub score: f64,
    pub evidence: Vec<String>,
    pub reasoning: String,
    pub strongest_counter_argument: String,
    pub response_to_counter_argument: String,
    pub confidence: Confidence,
}

impl DimensionScore {
    pub fn neutral(reasoning: impl Into<String>) -> Self {
        Self {
            score: NEUTRAL_SCORE,
            evidence: Vec::new(),
            reasoning: reasoning.into(),
            strongest_counter_argument: String::new(),
            response_to_counter_argument: String::new(),
            confidence: Confidence::Medium,
        }
    }

    /// Complete one dimension. A bare number is taken as the score.
    fn complete(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self {
                score: coerce::score(map.get("score")),
                evidence: coerce::string_list(map.get("evidence")),
                reasoning: coerce::text(map.get("reasoning")),
                strongest_counter_argument: coerce::text(map.get("strongestCounterArgument")),
                response_to_counter_argument: coerce::text(map.get("responseToCounterArgument")),
                confidence: Confidence::coerce(map.get("confidence")),
            },
            Some(scalar @ (Value::Number(_) | Value::String(_))) => Self {
                score: coerce::score(Some(scalar)),
                ..Self::neutral("")
            },
            _ => Self::neutral(""),
        }
    }
}

/// One score per [`Dimension`]; every field is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScores {
    pub market_opportunity: DimensionScore,
    pub problem_solution_fit: DimensionScore,
    pub team_execution: DimensionScore,
    pub business_model: DimensionScore,
    pub competitive_moat: DimensionScore,
    pub traction_evidence: DimensionScore,
}

impl DimensionScores {
    pub fn from_fn(mut f: impl FnMut(Dimension) -> DimensionScore) -> Self {
        Self {
            market_opportunity: f(Dimension::MarketOpportunity),
            problem_solution_fit: f(Dimension::ProblemSolutionFit),
            team_execution: f(Dimension::TeamExecution),
            business_model: f(Dimension::BusinessModel),
            competitive_moat: f(Dimension::CompetitiveMoat),
            traction_evidence: f(Dimension::TractionEvidence),
        }
    }

    pub fn get(&self, dimension: Dimension) -> &DimensionScore {
        match dimension {
            Dimension::MarketOpportunity => &self.market_opportunity,
            Dimension::ProblemSolutionFit => &self.problem_solution_fit,
            Dimension::TeamExecution => &self.team_execution,
            Dimension::BusinessModel => &self.business_model,
            Dimension::CompetitiveMoat => &self.competitive_moat,
            Dimension::TractionEvidence => &self.traction_evidence,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &DimensionScore)> {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    fn complete(value: Option<&Value>) -> Self {
        let map = value.and_then(Value::as_object);
        Self::from_fn(|d| DimensionScore::complete(map.and_then(|m| m.get(d.key()))))
    }
}

// =============================================================================
// Risks / drivers
// =============================================================================

/// A critical risk or an upside driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub label: String,
    pub reasoning: String,
    pub confidence: Confidence,
}

impl Signal {
    fn from_map(map: &Map<String, Value>) -> Self {
        let confidence = ["confidence", "confidenceLevel", "confidence_level"]
            .iter()
            .find_map(|k| map.get(*k));
        Self {
            label: coerce::text_from(map, &["label", "risk", "driver", "title", "name"]),
            reasoning: coerce::text_from(map, &["reasoning", "why", "explanation", "description"]),
            confidence: Confidence::coerce(confidence),
        }
    }
}

/// Element-wise completion; bare strings become labels, empty entries drop.
fn signals(value: Option<&Value>) -> Vec<Signal> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(Signal::from_map(map)),
            Value::String(s) => Some(Signal {
                label: s.trim().to_string(),
                reasoning: String::new(),
                confidence: Confidence::Medium,
            }),
            _ => None,
        })
        .filter(|s| !s.label.is_empty() || !s.reasoning.is_empty())
        .take(MAX_SIGNALS)
        .collect()
}

// =============================================================================
// Assessment
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityAssessment {
    pub chain_of_reasoning: Vec<String>,
    pub dimension_scores: DimensionScores,
    pub overall_score: f64,
    pub overall_reasoning: String,
    pub verdict: Verdict,
    pub verdict_reasoning: String,
    pub critical_risks: Vec<Signal>,
    pub upside_drivers: Vec<Signal>,
    pub bias_check: String,
}

/// Normalized-but-unvalidated assessment. Every field may be absent or of
/// the wrong type.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialAssessment {
    pub chain_of_reasoning: Option<Value>,
    pub dimension_scores: Option<Value>,
    pub overall_score: Option<Value>,
    pub overall_reasoning: Option<Value>,
    #[serde(deserialize_with = "coerce::present")]
    pub verdict: Option<Value>,
    pub verdict_reasoning: Option<Value>,
    pub critical_risks: Option<Value>,
    pub upside_drivers: Option<Value>,
    pub bias_check: Option<Value>,
}

impl PartialAssessment {
    /// Non-objects read as an empty partial.
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn has_signal(&self) -> bool {
        matches!(self.dimension_scores, Some(Value::Object(_)))
            || coerce::is_numeric(self.overall_score.as_ref())
            || self.verdict.is_some()
    }

    pub fn complete(&self) -> PersonalityAssessment {
        let mut chain = coerce::string_list(self.chain_of_reasoning.as_ref());
        chain.truncate(MAX_REASONING_STEPS);

        PersonalityAssessment {
            chain_of_reasoning: chain,
            dimension_scores: DimensionScores::complete(self.dimension_scores.as_ref()),
            overall_score: coerce::score(self.overall_score.as_ref()),
            overall_reasoning: coerce::text(self.overall_reasoning.as_ref()),
            verdict: Verdict::coerce(self.verdict.as_ref()),
            verdict_reasoning: coerce::text(self.verdict_reasoning.as_ref()),
            critical_risks: signals(self.critical_risks.as_ref()),
            upside_drivers: signals(self.upside_drivers.as_ref()),
            bias_check: coerce::text(self.bias_check.as_ref()),
        }
    }
}

impl StageSchema for PersonalityAssessment {
    const KIND: StageKind = StageKind::Personality;

    fn is_usable(normalized: &Value) -> bool {
        PartialAssessment::from_value(normalized).has_signal()
    }

    fn complete(normalized: &Value) -> Self {
        PartialAssessment::from_value(normalized).complete()
    }

    fn fallback(reason: &str) -> Self {
        Self {
            chain_of_reasoning: vec![reason.to_string()],
            dimension_scores: DimensionScores::from_fn(|_| DimensionScore::neutral(reason)),
            overall_score: NEUTRAL_SCORE,
            overall_reasoning: reason.to_string(),
            verdict: Verdict::Maybe,
            verdict_reasoning: reason.to_string(),
            critical_risks: Vec::new(),
            upside_drivers: Vec::new(),
            bias_check: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize, PERSONALITY_KEYS};
    use serde_json::json;

    fn complete(v: Value) -> PersonalityAssessment {
        <PersonalityAssessment as StageSchema>::complete(&normalize(&v, &PERSONALITY_KEYS))
    }

    #[test]
    fn completion_is_total() {
        for input in [
            Value::Null,
            json!(3),
            json!("text"),
            json!([]),
            json!({}),
            json!({"dimensionScores": "nope", "criticalRisks": {"a": 1}, "overallScore": {}}),
        ] {
            let out = complete(input.clone());
            assert_eq!(out.verdict, Verdict::Maybe, "input {input}");
            assert_eq!(out.overall_score, NEUTRAL_SCORE);
            assert!(out.critical_risks.is_empty());
            for (_, score) in out.dimension_scores.iter() {
                assert_eq!(score.score, NEUTRAL_SCORE);
                assert_eq!(score.confidence, Confidence::Medium);
            }

            // Every dimension key is present in the serialized form.
            let json = serde_json::to_value(&out).unwrap();
            for dim in Dimension::ALL {
                assert!(json["dimensionScores"][dim.key()]["score"].is_number());
                assert!(json["dimensionScores"][dim.key()]["evidence"].is_array());
            }
        }
    }

    #[test]
    fn partial_dimensions_are_filled() {
        let out = complete(json!({
            "dimension_scores": {
                "market_opportunity": {
                    "score": "8",
                    "evidence": ["TAM $4B", ""],
                    "reasoning": "large market",
                    "counter_argument": "crowded",
                    "counter_response": "distribution edge",
                    "confidence": "HIGH"
                },
                "moat": 3
            },
            "overall_score": 6.5,
            "verdict": "proceed"
        }));

        let market = out.dimension_scores.get(Dimension::MarketOpportunity);
        assert_eq!(market.score, 8.0);
        assert_eq!(market.evidence, vec!["TAM $4B"]);
        assert_eq!(market.strongest_counter_argument, "crowded");
        assert_eq!(market.response_to_counter_argument, "distribution edge");
        assert_eq!(market.confidence, Confidence::High);

        assert_eq!(out.dimension_scores.get(Dimension::CompetitiveMoat).score, 3.0);
        assert_eq!(out.dimension_scores.get(Dimension::TeamExecution).score, 5.0);
        assert_eq!(out.overall_score, 6.5);
        assert_eq!(out.verdict, Verdict::Proceed);
    }

    #[test]
    fn signals_are_coerced_and_bounded() {
        let mut risks: Vec<Value> = vec![
            json!({"label": "Regulation", "reasoning": "FDA", "confidence": "low"}),
            json!({"risk": "Churn", "why": "annual contracts"}),
            json!("Founder burnout"),
            json!({}),
            json!(42),
        ];
        for i in 0..20 {
            risks.push(json!({"label": format!("r{i}")}));
        }

        let out = complete(json!({"verdict": "pass", "critical_risks": risks}));
        assert_eq!(out.critical_risks.len(), MAX_SIGNALS);
        assert_eq!(out.critical_risks[0].confidence, Confidence::Low);
        assert_eq!(out.critical_risks[1].label, "Churn");
        assert_eq!(out.critical_risks[1].reasoning, "annual contracts");
        assert_eq!(out.critical_risks[2].label, "Founder burnout");
        assert_eq!(out.critical_risks[3].label, "r0");
    }

    #[test]
    fn reasoning_steps_are_bounded() {
        let steps: Vec<String> = (0..30).map(|i| format!("step {i}")).collect();
        let out = complete(json!({"overallScore": 4, "chainOfReasoning": steps}));
        assert_eq!(out.chain_of_reasoning.len(), MAX_REASONING_STEPS);
        assert_eq!(out.chain_of_reasoning[0], "step 0");
    }

    #[test]
    fn signal_detection() {
        assert!(PartialAssessment::from_value(&json!({"dimensionScores": {}})).has_signal());
        assert!(PartialAssessment::from_value(&json!({"overallScore": "7"})).has_signal());
        assert!(PartialAssessment::from_value(&json!({"verdict": "maybe"})).has_signal());
        assert!(!PartialAssessment::from_value(&json!({"overallScore": "high"})).has_signal());
        assert!(!PartialAssessment::from_value(&json!({"summary": "x"})).has_signal());
        assert!(!PartialAssessment::from_value(&json!(null)).has_signal());
        // the verdict key alone counts, whatever its value
        assert!(PartialAssessment::from_value(&json!({"verdict": null})).has_signal());
        assert!(PartialAssessment::from_value(&json!({"verdict": 1})).has_signal());
    }

    #[test]
    fn fallback_is_complete() {
        let out = PersonalityAssessment::fallback("placeholder");
        assert_eq!(out.verdict, Verdict::Maybe);
        assert_eq!(out.overall_reasoning, "placeholder");
        assert_eq!(out.chain_of_reasoning, vec!["placeholder"]);
        for (_, score) in out.dimension_scores.iter() {
            assert_eq!(score.score, NEUTRAL_SCORE);
            assert_eq!(score.reasoning, "placeholder");
        }
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(PersonalityAssessment::fallback("x")).unwrap();
        assert!(json.get("chainOfReasoning").is_some());
        assert!(json.get("verdictReasoning").is_some());
        assert!(json["dimensionScores"]["problemSolutionFit"]
            .get("strongestCounterArgument")
            .is_some());
        assert_eq!(json["verdict"], json!("maybe"));
    }
}
