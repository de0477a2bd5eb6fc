//! Adjudicator verdict reconciling the two analyst assessments.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::coerce::{self, NEUTRAL_SCORE};
use super::personality::MAX_REASONING_STEPS;
use super::{Confidence, StageKind, StageSchema, Verdict};

/// Upper bound on kept items per checklist section.
pub const MAX_CHECKLIST_ITEMS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreement {
    pub point: String,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disagreement {
    pub topic: String,
    pub risk_first_view: String,
    pub upside_first_view: String,
    pub resolution: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub priority: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub idea_improvements: Vec<ChecklistItem>,
    pub pitch_improvements: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjudicationVerdict {
    pub chain_of_reasoning: Vec<String>,
    pub agreements: Vec<Agreement>,
    pub disagreements: Vec<Disagreement>,
    pub research_usage: String,
    pub final_score: f64,
    pub final_reasoning: String,
    pub final_verdict: Verdict,
    pub confidence: Confidence,
    pub bias_check: String,
    pub checklist: Checklist,
}

/// Normalized-but-unvalidated verdict.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialVerdict {
    pub chain_of_reasoning: Option<Value>,
    pub agreements: Option<Value>,
    pub disagreements: Option<Value>,
    pub research_usage: Option<Value>,
    pub final_score: Option<Value>,
    pub final_reasoning: Option<Value>,
    #[serde(deserialize_with = "coerce::present")]
    pub final_verdict: Option<Value>,
    pub confidence: Option<Value>,
    pub bias_check: Option<Value>,
    pub checklist: Option<Value>,
    // Some answers put the two checklist halves at the top level.
    pub idea_improvements: Option<Value>,
    pub pitch_improvements: Option<Value>,
}

impl PartialVerdict {
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn has_signal(&self) -> bool {
        self.final_verdict.is_some()
            || coerce::is_numeric(self.final_score.as_ref())
            || matches!(self.disagreements, Some(Value::Array(_)))
    }

    pub fn complete(&self) -> AdjudicationVerdict {
        let mut chain = coerce::string_list(self.chain_of_reasoning.as_ref());
        chain.truncate(MAX_REASONING_STEPS);

        let agreements = coerce::records(self.agreements.as_ref())
            .map(|m| Agreement {
                point: coerce::text_from(m, &["point", "agreement", "topic", "text"]),
                evidence: coerce::string_list(m.get("evidence")),
            })
            .filter(|a| !a.point.is_empty())
            .collect();

        let disagreements = coerce::records(self.disagreements.as_ref())
            .map(|m| Disagreement {
                topic: coerce::text(m.get("topic")),
                risk_first_view: coerce::text(m.get("riskFirstView")),
                upside_first_view: coerce::text(m.get("upsideFirstView")),
                resolution: coerce::text(m.get("resolution")),
                reasoning: coerce::text(m.get("reasoning")),
            })
            .filter(|d| !(d.topic.is_empty() && d.resolution.is_empty()))
            .collect();

        let section = self.checklist.as_ref().and_then(Value::as_object);
        let idea = section
            .and_then(|m| m.get("ideaImprovements"))
            .or(self.idea_improvements.as_ref());
        let pitch = section
            .and_then(|m| m.get("pitchImprovements"))
            .or(self.pitch_improvements.as_ref());

        AdjudicationVerdict {
            chain_of_reasoning: chain,
            agreements,
            disagreements,
            research_usage: coerce::text(self.research_usage.as_ref()),
            final_score: coerce::score(self.final_score.as_ref()),
            final_reasoning: coerce::text(self.final_reasoning.as_ref()),
            final_verdict: Verdict::coerce(self.final_verdict.as_ref()),
            confidence: Confidence::coerce(self.confidence.as_ref()),
            bias_check: coerce::text(self.bias_check.as_ref()),
            checklist: Checklist {
                idea_improvements: checklist_items(idea),
                pitch_improvements: checklist_items(pitch),
            },
        }
    }
}

/// Items sorted by priority; missing priorities take their list position.
fn checklist_items(value: Option<&Value>) -> Vec<ChecklistItem> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    let mut out: Vec<ChecklistItem> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let position = i as u32 + 1;
            match item {
                Value::Object(map) => Some(item_from_map(map, position)),
                Value::String(s) => Some(ChecklistItem {
                    priority: position,
                    text: s.trim().to_string(),
                    reasoning: None,
                }),
                _ => None,
            }
        })
        .filter(|item| !item.text.is_empty())
        .collect();

    out.sort_by_key(|item| item.priority);
    out.truncate(MAX_CHECKLIST_ITEMS);
    out
}

fn item_from_map(map: &Map<String, Value>, position: u32) -> ChecklistItem {
    let reasoning = ["reasoning", "why", "rationale"]
        .iter()
        .find_map(|k| coerce::optional_text(map.get(*k)));
    ChecklistItem {
        priority: coerce::priority(map.get("priority"), position),
        text: coerce::text_from(map, &["text", "item", "action", "suggestion"]),
        reasoning,
    }
}

impl StageSchema for AdjudicationVerdict {
    const KIND: StageKind = StageKind::Adjudication;

    fn is_usable(normalized: &Value) -> bool {
        PartialVerdict::from_value(normalized).has_signal()
    }

    fn complete(normalized: &Value) -> Self {
        PartialVerdict::from_value(normalized).complete()
    }

    fn fallback(reason: &str) -> Self {
        Self {
            chain_of_reasoning: vec![reason.to_string()],
            agreements: Vec::new(),
            disagreements: Vec::new(),
            research_usage: String::new(),
            final_score: NEUTRAL_SCORE,
            final_reasoning: reason.to_string(),
            final_verdict: Verdict::Maybe,
            confidence: Confidence::Medium,
            bias_check: String::new(),
            checklist: Checklist::default(),
        }
    }
}
