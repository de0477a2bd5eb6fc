//! Stage result schemas and the raw-text → typed-result path.
//!
//! Every stage answer goes through the same three steps:
//! [`extract_json`](crate::extract::extract_json) →
//! [`normalize`](crate::normalize::normalize) → [`StageSchema::complete`].
//! The path is total. Whatever the model said, the caller gets a fully
//! populated value, possibly the stage's fallback object.

pub mod adjudication;
pub mod coerce;
pub mod personality;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::extract_json;
use crate::normalize::{normalize, KeySchema, ADJUDICATION_KEYS, PERSONALITY_KEYS};

pub use adjudication::{
    AdjudicationVerdict, Agreement, Checklist, ChecklistItem, Disagreement, PartialVerdict,
};
pub use personality::{
    Dimension, DimensionScore, DimensionScores, PartialAssessment, PersonalityAssessment, Signal,
};

// =============================================================================
// Shared enums
// =============================================================================

/// Investment verdict. `Maybe` is the neutral member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    #[default]
    Maybe,
    Proceed,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Maybe => "maybe",
            Verdict::Proceed => "proceed",
        }
    }

    /// Case-insensitive parse; anything unrecognised is the neutral member.
    pub fn coerce(value: Option<&Value>) -> Self {
        let Some(Value::String(s)) = value else {
            return Self::default();
        };
        match s.trim().to_ascii_lowercase().as_str() {
            "pass" => Verdict::Pass,
            "proceed" => Verdict::Proceed,
            _ => Verdict::Maybe,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-reported confidence level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    #[default]
    Medium,
    High,
}

impl Confidence {
    /// Accepts level names in any case and probabilities in `[0, 1]`.
    pub fn coerce(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "low" => Confidence::Low,
                "high" => Confidence::High,
                _ => Confidence::Medium,
            },
            Some(Value::Number(n)) => match n.as_f64() {
                Some(p) if (0.0..1.0 / 3.0).contains(&p) => Confidence::Low,
                Some(p) if (2.0 / 3.0..=1.0).contains(&p) => Confidence::High,
                _ => Confidence::Medium,
            },
            _ => Confidence::Medium,
        }
    }
}

// =============================================================================
// Stage schema seam
// =============================================================================

/// Which result family a raw answer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Personality,
    Adjudication,
}

impl StageKind {
    pub fn key_schema(&self) -> &'static KeySchema {
        match self {
            StageKind::Personality => &PERSONALITY_KEYS,
            StageKind::Adjudication => &ADJUDICATION_KEYS,
        }
    }
}

/// A stage result type that can be completed from any normalized value.
pub trait StageSchema: Sized + Serialize {
    const KIND: StageKind;

    /// Whether a normalized value shares any of the stage's top-level signal.
    fn is_usable(normalized: &Value) -> bool;

    /// Fill every field, defaulting whatever is missing or invalid. Total.
    fn complete(normalized: &Value) -> Self;

    /// Whole-result placeholder carrying `reason` as its reasoning text.
    fn fallback(reason: &str) -> Self;
}

/// Why a stage answer was replaced by its fallback object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No JSON could be parsed out of the text.
    Unparseable,
    /// JSON parsed but was not an object.
    NotAnObject,
    /// Object had none of the stage's top-level fields.
    NoSignal,
}

impl FallbackReason {
    pub fn placeholder(&self) -> &'static str {
        match self {
            FallbackReason::Unparseable => {
                "Automated analysis unavailable: the model response could not be parsed."
            }
            FallbackReason::NotAnObject => {
                "Automated analysis unavailable: the model response had an unexpected shape."
            }
            FallbackReason::NoSignal => {
                "Automated analysis unavailable: the model response did not contain an assessment."
            }
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FallbackReason::Unparseable => "unparseable",
            FallbackReason::NotAnObject => "not_an_object",
            FallbackReason::NoSignal => "no_signal",
        })
    }
}

/// A completed stage result and whether it is a fallback.
#[derive(Debug, Clone)]
pub struct Interpreted<T> {
    pub value: T,
    pub fallback: Option<FallbackReason>,
}

/// Turn raw model text into a typed stage result. Never fails.
pub fn interpret<T: StageSchema>(raw: &str) -> Interpreted<T> {
    let candidate = extract_json(raw);

    let parsed: Value = match serde_json::from_str(candidate) {
        Ok(v) => v,
        Err(_) => return fallback(FallbackReason::Unparseable),
    };

    if !parsed.is_object() {
        return fallback(FallbackReason::NotAnObject);
    }

    let normalized = normalize(&parsed, T::KIND.key_schema());
    if !T::is_usable(&normalized) {
        return fallback(FallbackReason::NoSignal);
    }

    Interpreted {
        value: T::complete(&normalized),
        fallback: None,
    }
}

fn fallback<T: StageSchema>(reason: FallbackReason) -> Interpreted<T> {
    Interpreted {
        value: T::fallback(reason.placeholder()),
        fallback: Some(reason),
    }
}

/// Interpret raw text for `kind` and return the completed result as JSON.
pub fn parse_stage_output(raw: &str, kind: StageKind) -> (Value, Option<FallbackReason>) {
    fn to_json<T: StageSchema>(out: Interpreted<T>) -> (Value, Option<FallbackReason>) {
        (
            serde_json::to_value(&out.value).unwrap_or(Value::Null),
            out.fallback,
        )
    }

    match kind {
        StageKind::Personality => to_json(interpret::<PersonalityAssessment>(raw)),
        StageKind::Adjudication => to_json(interpret::<AdjudicationVerdict>(raw)),
    }
}
