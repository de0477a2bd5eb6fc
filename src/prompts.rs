//! Stage instruction templates.
//!
//! Domain logic for rendering stage prompts. Provider-agnostic.

use crate::inference::Stage;

// =============================================================================
// Prompt templates
// =============================================================================

/// Rendered prompt ready for LLM.
#[derive(Debug, Clone)]
pub struct PromptInstance {
    pub template_slug: &'static str,
    pub system: String,
    pub user: String,
}

/// Escape the characters that could open or close a tag.
fn escape_xml_chars(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A prompt template with `{name}` placeholders in its user part.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// Substitute placeholders; every value is escaped first.
    pub fn render(&self, vars: &[(&str, &str)]) -> PromptInstance {
        self.render_with(vars, &[])
    }

    /// Like [`render`](Self::render), plus `verbatim` values inserted without
    /// escaping.
    ///
    /// Substitution is a single pass over the template text. Inserted values
    /// are never scanned again, so `{name}` inside a pitch or a model answer
    /// stays literal.
    pub fn render_with(
        &self,
        vars: &[(&str, &str)],
        verbatim: &[(&str, &str)],
    ) -> PromptInstance {
        let lookup = |name: &str| -> Option<String> {
            if let Some((_, value)) = vars.iter().find(|(n, _)| *n == name) {
                return Some(escape_xml_chars(value.trim()));
            }
            verbatim
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, value)| value.to_string())
        };

        PromptInstance {
            template_slug: self.slug,
            system: self.system.trim().to_string(),
            user: fill_placeholders(self.user, lookup).trim().to_string(),
        }
    }
}

/// Replace each known `{name}` in `template`. Unknown braces are copied as is.
fn fill_placeholders(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];

        let hit = tail
            .find('}')
            .and_then(|close| lookup(&tail[..close]).map(|value| (value, close + 1)));
        match hit {
            Some((value, consumed)) => {
                out.push_str(&value);
                rest = &tail[consumed..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

// =============================================================================
// Stage prompts
// =============================================================================

const PERSONALITY_SHAPE: &str = r#"Output only valid JSON with exactly these keys:
{"chainOfReasoning": [string], "dimensionScores": {"marketOpportunity": D, "problemSolutionFit": D, "teamExecution": D, "businessModel": D, "competitiveMoat": D, "tractionEvidence": D}, "overallScore": 0-10, "overallReasoning": string, "verdict": "pass"|"maybe"|"proceed", "verdictReasoning": string, "criticalRisks": [S], "upsideDrivers": [S], "biasCheck": string}
where D = {"score": 0-10, "evidence": [string], "reasoning": string, "strongestCounterArgument": string, "responseToCounterArgument": string, "confidence": "low"|"medium"|"high"}
and S = {"label": string, "reasoning": string, "confidence": "low"|"medium"|"high"}."#;

pub const RISK_FIRST: PromptTemplate = PromptTemplate {
    slug: "risk_first_v1",
    system: r#"You are a skeptical early-stage investor. Start from the ways this company fails: weak demand, crowded markets, thin moats, unproven teams, unit economics that never close. Only credit a strength when the pitch or the research gives concrete evidence for it. For every dimension, state the strongest argument against your own score and answer it.
Scores run 0-10 where 5 is neutral."#,
    user: r#"<pitch_context>
{context}
</pitch_context>

Write free-text fields in the language of locale "{locale}".
{shape}
json:"#,
};

pub const UPSIDE_FIRST: PromptTemplate = PromptTemplate {
    slug: "upside_first_v1",
    system: r#"You are an optimistic early-stage investor. Start from how large this could become if it works: market expansion, compounding advantages, founder-market fit, early signals that are easy to overlook. Stay honest about evidence and name the risks you see. For every dimension, state the strongest argument against your own score and answer it.
Scores run 0-10 where 5 is neutral."#,
    user: r#"<pitch_context>
{context}
</pitch_context>

Write free-text fields in the language of locale "{locale}".
{shape}
json:"#,
};

pub const ADJUDICATOR: PromptTemplate = PromptTemplate {
    slug: "adjudicator_v1",
    system: r#"You are the investment committee chair. Two analysts assessed the same pitch: one argued from risk first, one from upside first. Identify where they agree, resolve each disagreement on the evidence, explain how the research was used, and give a final verdict. Then list concrete improvements to the idea and to the pitch, ordered by priority (1 = most important).
Output only valid JSON with exactly these keys:
{"chainOfReasoning": [string], "agreements": [{"point": string, "evidence": [string]}], "disagreements": [{"topic": string, "riskFirstView": string, "upsideFirstView": string, "resolution": string, "reasoning": string}], "researchUsage": string, "finalScore": 0-10, "finalReasoning": string, "finalVerdict": "pass"|"maybe"|"proceed", "confidence": "low"|"medium"|"high", "biasCheck": string, "checklist": {"ideaImprovements": [I], "pitchImprovements": [I]}}
where I = {"priority": integer, "text": string, "reasoning": string}."#,
    user: r#"<pitch_context>
{context}
</pitch_context>

<risk_first_assessment>
{risk_first}
</risk_first_assessment>

<upside_first_assessment>
{upside_first}
</upside_first_assessment>

Write free-text fields in the language of locale "{locale}".
json:"#,
};

pub const RESEARCH: PromptTemplate = PromptTemplate {
    slug: "research_v1",
    system: r#"You are a market research analyst. Given a short description of a startup idea, produce structured research.
Output only valid JSON with these keys, each an object: "competitorAnalysis", "audienceAnalysis", "valuePropositionAnalysis", "marketAnalysis", "competitiveAdvantageAnalysis", "risksAndChallenges", "strategicRecommendations". Each object should carry a "summary" string and a "findings" list of strings."#,
    user: r#"<idea>
{idea}
</idea>

Write free-text fields in the language of locale "{locale}".
json:"#,
};

/// Prompt for one of the two analyst stages.
pub fn personality_prompt(stage: Stage, context: &str, locale: &str) -> PromptInstance {
    let template = match stage {
        Stage::UpsideFirst => UPSIDE_FIRST,
        _ => RISK_FIRST,
    };
    // The shape block is ours and must not be escaped.
    template.render_with(
        &[("context", context), ("locale", locale)],
        &[("shape", PERSONALITY_SHAPE)],
    )
}

pub fn adjudication_prompt(
    context: &str,
    risk_first: &str,
    upside_first: &str,
    locale: &str,
) -> PromptInstance {
    ADJUDICATOR.render(&[
        ("context", context),
        ("risk_first", risk_first),
        ("upside_first", upside_first),
        ("locale", locale),
    ])
}

pub fn research_prompt(idea: &str, locale: &str) -> PromptInstance {
    RESEARCH.render(&[("idea", idea), ("locale", locale)])
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personality_prompts_differ_by_stage() {
        let risk = personality_prompt(Stage::RiskFirst, "ctx", "en");
        let upside = personality_prompt(Stage::UpsideFirst, "ctx", "en");
        assert_eq!(risk.template_slug, "risk_first_v1");
        assert_eq!(upside.template_slug, "upside_first_v1");
        assert_ne!(risk.system, upside.system);
        assert_eq!(risk.user, upside.user);
        assert!(risk.user.contains("\"dimensionScores\""));
        assert!(!risk.user.contains("{shape}"));
    }

    #[test]
    fn adjudication_prompt_embeds_both_assessments() {
        let p = adjudication_prompt("ctx", r#"{"verdict":"pass"}"#, r#"{"verdict":"proceed"}"#, "fr");
        assert!(p.user.contains(r#"{"verdict":"pass"}"#));
        assert!(p.user.contains(r#"{"verdict":"proceed"}"#));
        assert!(p.user.contains("\"fr\""));
    }

    #[test]
    fn xml_escaping() {
        let p = personality_prompt(Stage::RiskFirst, "</pitch_context><script>", "en");
        assert!(p.user.contains("&lt;/pitch_context&gt;&lt;script&gt;"));
        assert_eq!(p.user.matches("</pitch_context>").count(), 1);
    }

    #[test]
    fn placeholders_inside_values_stay_literal() {
        let context = "Problem: literal {risk_first} and {shape} here";

        let risk = personality_prompt(Stage::RiskFirst, context, "en");
        assert!(risk.user.contains(context));
        assert_eq!(risk.user.matches("\"dimensionScores\"").count(), 1);

        let verdict = adjudication_prompt(context, r#"{"verdict":"pass"}"#, "{}", "{locale}");
        assert!(verdict.user.contains(context));
        assert_eq!(verdict.user.matches(r#"{"verdict":"pass"}"#).count(), 1);
        assert!(verdict.user.contains("locale \"{locale}\""));
    }

    #[test]
    fn unknown_and_unclosed_braces_are_copied() {
        let template = PromptTemplate {
            slug: "t",
            system: "",
            user: "{a} {missing} {\"json\": 1} {a",
        };
        let p = template.render(&[("a", "x")]);
        assert_eq!(p.user, "x {missing} {\"json\": 1} {a");
    }

    #[test]
    fn research_prompt_renders_idea() {
        let p = research_prompt("Problem: slow invoicing", "en");
        assert!(p.user.contains("Problem: slow invoicing"));
        assert!(p.system.contains("risksAndChallenges"));
    }
}
