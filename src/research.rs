//! Market research report and the collaborators that produce it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::extract::extract_json;
use crate::gateway::{ChatGateway, ProviderError};
use crate::inference::{Stage, StageParams};
use crate::prompts;

// =============================================================================
// Report
// =============================================================================

/// The seven named sections of a research report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResearchSection {
    CompetitorAnalysis,
    AudienceAnalysis,
    ValuePropositionAnalysis,
    MarketAnalysis,
    CompetitiveAdvantageAnalysis,
    RisksAndChallenges,
    StrategicRecommendations,
}

impl ResearchSection {
    pub const ALL: [ResearchSection; 7] = [
        ResearchSection::CompetitorAnalysis,
        ResearchSection::AudienceAnalysis,
        ResearchSection::ValuePropositionAnalysis,
        ResearchSection::MarketAnalysis,
        ResearchSection::CompetitiveAdvantageAnalysis,
        ResearchSection::RisksAndChallenges,
        ResearchSection::StrategicRecommendations,
    ];

    pub fn key(&self) -> &'static str {
        self.spellings()[0]
    }

    /// Canonical key first, then accepted alternates.
    fn spellings(&self) -> &'static [&'static str] {
        match self {
            ResearchSection::CompetitorAnalysis => {
                &["competitorAnalysis", "competitor_analysis", "competitors"]
            }
            ResearchSection::AudienceAnalysis => {
                &["audienceAnalysis", "audience_analysis", "targetAudience", "target_audience"]
            }
            ResearchSection::ValuePropositionAnalysis => &[
                "valuePropositionAnalysis",
                "value_proposition_analysis",
                "valueProposition",
                "value_proposition",
            ],
            ResearchSection::MarketAnalysis => &["marketAnalysis", "market_analysis", "market"],
            ResearchSection::CompetitiveAdvantageAnalysis => &[
                "competitiveAdvantageAnalysis",
                "competitive_advantage_analysis",
                "competitiveAdvantage",
                "competitive_advantage",
            ],
            ResearchSection::RisksAndChallenges => &[
                "risksAndChallenges",
                "risks_and_challenges",
                "risks",
                "challenges",
            ],
            ResearchSection::StrategicRecommendations => &[
                "strategicRecommendations",
                "strategic_recommendations",
                "recommendations",
            ],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResearchSection::CompetitorAnalysis => "Competitors",
            ResearchSection::AudienceAnalysis => "Audience",
            ResearchSection::ValuePropositionAnalysis => "Value proposition",
            ResearchSection::MarketAnalysis => "Market",
            ResearchSection::CompetitiveAdvantageAnalysis => "Competitive advantage",
            ResearchSection::RisksAndChallenges => "Risks and challenges",
            ResearchSection::StrategicRecommendations => "Strategic recommendations",
        }
    }
}

/// Structured research on the pitch, consumed read-only by later stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_analysis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_analysis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_proposition_analysis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_analysis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitive_advantage_analysis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risks_and_challenges: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategic_recommendations: Option<Value>,
    pub generated_at: DateTime<Utc>,
    pub language: String,
}

impl ResearchReport {
    /// A report with no sections.
    pub fn empty(locale: &str) -> Self {
        Self {
            competitor_analysis: None,
            audience_analysis: None,
            value_proposition_analysis: None,
            market_analysis: None,
            competitive_advantage_analysis: None,
            risks_and_challenges: None,
            strategic_recommendations: None,
            generated_at: Utc::now(),
            language: locale.to_string(),
        }
    }

    /// Canned fast-path report: every section present, nothing researched.
    pub fn placeholder(locale: &str) -> Self {
        let mut report = Self::empty(locale);
        for section in ResearchSection::ALL {
            *report.section_mut(section) = Some(json!({
                "summary": format!("{} was not researched (fast mode).", section.label()),
                "findings": [],
                "source": "placeholder",
            }));
        }
        report
    }

    /// Lenient parse of a collaborator's JSON. Sections that are missing or
    /// not objects stay absent; a bare string becomes `{"summary": ...}`.
    pub fn from_value(value: &Value, locale: &str) -> Self {
        let mut report = Self::empty(locale);
        let Some(map) = value.as_object() else {
            return report;
        };

        for section in ResearchSection::ALL {
            let found = section.spellings().iter().find_map(|k| map.get(*k));
            *report.section_mut(section) = match found {
                Some(obj @ Value::Object(_)) => Some(obj.clone()),
                Some(Value::String(s)) if !s.trim().is_empty() => Some(json!({ "summary": s })),
                _ => None,
            };
        }
        report
    }

    pub fn section(&self, section: ResearchSection) -> Option<&Value> {
        match section {
            ResearchSection::CompetitorAnalysis => self.competitor_analysis.as_ref(),
            ResearchSection::AudienceAnalysis => self.audience_analysis.as_ref(),
            ResearchSection::ValuePropositionAnalysis => self.value_proposition_analysis.as_ref(),
            ResearchSection::MarketAnalysis => self.market_analysis.as_ref(),
            ResearchSection::CompetitiveAdvantageAnalysis => {
                self.competitive_advantage_analysis.as_ref()
            }
            ResearchSection::RisksAndChallenges => self.risks_and_challenges.as_ref(),
            ResearchSection::StrategicRecommendations => self.strategic_recommendations.as_ref(),
        }
    }

    fn section_mut(&mut self, section: ResearchSection) -> &mut Option<Value> {
        match section {
            ResearchSection::CompetitorAnalysis => &mut self.competitor_analysis,
            ResearchSection::AudienceAnalysis => &mut self.audience_analysis,
            ResearchSection::ValuePropositionAnalysis => &mut self.value_proposition_analysis,
            ResearchSection::MarketAnalysis => &mut self.market_analysis,
            ResearchSection::CompetitiveAdvantageAnalysis => {
                &mut self.competitive_advantage_analysis
            }
            ResearchSection::RisksAndChallenges => &mut self.risks_and_challenges,
            ResearchSection::StrategicRecommendations => &mut self.strategic_recommendations,
        }
    }

    pub fn is_complete(&self) -> bool {
        ResearchSection::ALL
            .iter()
            .all(|s| self.section(*s).is_some())
    }
}

// =============================================================================
// Collaborators
// =============================================================================

/// External research capability used on the full-research path.
///
/// Errors are hard failures; the caller bounds the call with its own timer.
/// `request_id` is the run's id, for attribution of any outbound call.
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    async fn research(
        &self,
        idea_summary: &str,
        locale: &str,
        request_id: Uuid,
    ) -> Result<ResearchReport, ProviderError>;
}

/// Research provider that never calls out and returns the canned report.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderResearch;

#[async_trait]
impl ResearchProvider for PlaceholderResearch {
    async fn research(
        &self,
        _idea_summary: &str,
        locale: &str,
        _request_id: Uuid,
    ) -> Result<ResearchReport, ProviderError> {
        Ok(ResearchReport::placeholder(locale))
    }
}

/// Research produced by one more inference call.
pub struct GatewayResearcher {
    gateway: Arc<dyn ChatGateway>,
    params: StageParams,
}

impl GatewayResearcher {
    pub fn new(gateway: Arc<dyn ChatGateway>, params: StageParams) -> Self {
        Self { gateway, params }
    }
}

#[async_trait]
impl ResearchProvider for GatewayResearcher {
    async fn research(
        &self,
        idea_summary: &str,
        locale: &str,
        request_id: Uuid,
    ) -> Result<ResearchReport, ProviderError> {
        let prompt = prompts::research_prompt(idea_summary, locale);
        let req = self
            .params
            .to_request(Stage::Research, request_id, &prompt.system, &prompt.user);

        let resp = self.gateway.chat(req).await?;

        match serde_json::from_str::<Value>(extract_json(&resp.content)) {
            Ok(value) => {
                let report = ResearchReport::from_value(&value, locale);
                if !report.is_complete() {
                    warn!(stage = %Stage::Research, "research answer is missing sections");
                }
                Ok(report)
            }
            Err(err) => {
                warn!(stage = %Stage::Research, error = %err, "research answer was not JSON");
                Ok(ResearchReport::empty(locale))
            }
        }
    }
}
