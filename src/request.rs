//! Pitch facts as the pipeline sees them.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::PipelineError;

pub const DEFAULT_LOCALE: &str = "en";

/// Normalized pitch facts plus run options. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    pub problem: String,
    pub solution: String,
    pub market: String,
    pub competitors: String,
    pub business_model: String,
    pub traction: String,
    pub team: String,
    pub financials: String,
    pub ask: String,
    pub stage: String,
    pub industry: String,
    pub notes: String,
    pub locale: String,
    pub full_research: bool,
}

// Accepted payload spellings per field, in lookup order.
const PROBLEM: &[&str] = &["problem", "problemStatement", "problem_statement"];
const SOLUTION: &[&str] = &["solution", "productDescription", "product_description"];
const MARKET: &[&str] = &["market", "targetMarket", "target_market"];
const COMPETITORS: &[&str] = &["competitors", "competition"];
const BUSINESS_MODEL: &[&str] = &["businessModel", "business_model", "revenueModel", "revenue_model"];
const TRACTION: &[&str] = &["traction"];
const TEAM: &[&str] = &["team"];
const FINANCIALS: &[&str] = &["financials", "financialProjections", "financial_projections"];
const ASK: &[&str] = &["ask", "fundingAsk", "funding_ask", "investmentAsk", "investment_ask"];
const STAGE: &[&str] = &["stage", "companyStage", "company_stage"];
const INDUSTRY: &[&str] = &["industry", "sector"];
const NOTES: &[&str] = &["notes", "additionalNotes", "additional_notes", "otherInfo", "other_info"];

impl PipelineRequest {
    /// Build from a caller payload.
    ///
    /// Every field is coerced to a string with an empty default. The payload
    /// must be an object and must describe at least a problem or a solution.
    pub fn from_payload(
        payload: &Value,
        locale: &str,
        full_research: bool,
    ) -> Result<Self, PipelineError> {
        let Some(map) = payload.as_object() else {
            return Err(PipelineError::validation("pitch payload must be a JSON object"));
        };

        let locale = locale.trim();
        let request = Self {
            problem: field(map, PROBLEM),
            solution: field(map, SOLUTION),
            market: field(map, MARKET),
            competitors: field(map, COMPETITORS),
            business_model: field(map, BUSINESS_MODEL),
            traction: field(map, TRACTION),
            team: field(map, TEAM),
            financials: field(map, FINANCIALS),
            ask: field(map, ASK),
            stage: field(map, STAGE),
            industry: field(map, INDUSTRY),
            notes: field(map, NOTES),
            locale: if locale.is_empty() {
                DEFAULT_LOCALE.to_string()
            } else {
                locale.to_string()
            },
            full_research,
        };

        if request.problem.is_empty() && request.solution.is_empty() {
            return Err(PipelineError::validation(
                "pitch must describe at least a problem or a solution",
            ));
        }
        Ok(request)
    }

    /// Pitch facts with display labels, in a fixed order.
    pub fn labeled_fields(&self) -> [(&'static str, &str); 12] {
        [
            ("Problem", self.problem.as_str()),
            ("Solution", self.solution.as_str()),
            ("Market", self.market.as_str()),
            ("Competitors", self.competitors.as_str()),
            ("Business model", self.business_model.as_str()),
            ("Traction", self.traction.as_str()),
            ("Team", self.team.as_str()),
            ("Financials", self.financials.as_str()),
            ("Ask", self.ask.as_str()),
            ("Stage", self.stage.as_str()),
            ("Industry", self.industry.as_str()),
            ("Notes", self.notes.as_str()),
        ]
    }

    /// Short description handed to the research collaborator.
    pub fn idea_summary(&self) -> String {
        [
            ("Problem", &self.problem),
            ("Solution", &self.solution),
            ("Industry", &self.industry),
            ("Market", &self.market),
        ]
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(label, v)| format!("{label}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
    }
}

fn field(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .map(stringify)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(stringify)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_every_field_to_text() {
        let req = PipelineRequest::from_payload(
            &json!({
                "problem": "  manual bookkeeping ",
                "business_model": "SaaS",
                "fundingAsk": 500000,
                "competitors": ["Xero", "", "QuickBooks"],
                "financials": {"arr": 120000},
                "traction": null,
                "team": true
            }),
            "de",
            true,
        )
        .unwrap();

        assert_eq!(req.problem, "manual bookkeeping");
        assert_eq!(req.business_model, "SaaS");
        assert_eq!(req.ask, "500000");
        assert_eq!(req.competitors, "Xero, QuickBooks");
        assert_eq!(req.financials, r#"{"arr":120000}"#);
        assert_eq!(req.traction, "");
        assert_eq!(req.team, "true");
        assert_eq!(req.solution, "");
        assert_eq!(req.locale, "de");
        assert!(req.full_research);
    }

    #[test]
    fn blank_locale_defaults() {
        let req = PipelineRequest::from_payload(&json!({"solution": "x"}), "  ", false).unwrap();
        assert_eq!(req.locale, DEFAULT_LOCALE);
    }

    #[test]
    fn rejects_non_objects_and_empty_pitches() {
        for payload in [json!([]), json!("pitch"), json!({}), json!({"problem": "  "})] {
            let err = PipelineRequest::from_payload(&payload, "en", false).unwrap_err();
            assert_eq!(err.status_code(), 400);
            assert_eq!(err.code(), "invalid_request");
        }
    }

    #[test]
    fn idea_summary_skips_blank_fields() {
        let req = PipelineRequest::from_payload(
            &json!({"problem": "p", "industry": "health"}),
            "en",
            false,
        )
        .unwrap();
        assert_eq!(req.idea_summary(), "Problem: p\nIndustry: health");
    }
}
