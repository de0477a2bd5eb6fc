//! Research → two analysts → adjudicator pipeline.
//!
//! The stage order:
//! 1. **Research**: canned placeholder (fast path) or the research collaborator
//! 2. **Analyze**: risk-first and upside-first assessments, concurrently, over
//!    one shared context built from the pitch and the research digest
//! 3. **Adjudicate**: reconcile both assessments into a final verdict
//!
//! Hard failures (timeouts, transport errors) abort the run. Malformed model
//! output never does: each stage substitutes its fallback object and the run
//! continues.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::gateway::ChatGateway;
use crate::inference::{InferenceClient, Stage, StageParams};
use crate::prompts;
use crate::request::PipelineRequest;
use crate::research::{ResearchProvider, ResearchReport};
use crate::schema::{
    interpret, AdjudicationVerdict, Interpreted, PersonalityAssessment, StageSchema,
};
use crate::summarize::{build_context, summarize};

// =============================================================================
// Result
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub request_id: Uuid,
    pub completed_at: DateTime<Utc>,
    /// Company stage echoed from the request.
    pub stage: String,
    pub industry: String,
    pub locale: String,
    pub full_research: bool,
    /// Stages whose answer was replaced by a fallback object.
    pub fallback_stages: Vec<Stage>,
}

/// Everything one run produced. Only built once all four parts exist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub research: ResearchReport,
    pub risk_first: PersonalityAssessment,
    pub upside_first: PersonalityAssessment,
    pub adjudication: AdjudicationVerdict,
    pub metadata: ResultMetadata,
}

#[derive(Debug, Default)]
struct PipelineResultBuilder {
    research: Option<ResearchReport>,
    risk_first: Option<PersonalityAssessment>,
    upside_first: Option<PersonalityAssessment>,
    adjudication: Option<AdjudicationVerdict>,
    fallback_stages: Vec<Stage>,
}

impl PipelineResultBuilder {
    fn note<T>(&mut self, stage: Stage, out: &Interpreted<T>) {
        if out.fallback.is_some() {
            self.fallback_stages.push(stage);
        }
    }

    fn build(
        self,
        request: &PipelineRequest,
        request_id: Uuid,
    ) -> Result<PipelineResult, PipelineError> {
        Ok(PipelineResult {
            research: self.research.ok_or(PipelineError::Assembly("research report"))?,
            risk_first: self
                .risk_first
                .ok_or(PipelineError::Assembly("risk_first assessment"))?,
            upside_first: self
                .upside_first
                .ok_or(PipelineError::Assembly("upside_first assessment"))?,
            adjudication: self
                .adjudication
                .ok_or(PipelineError::Assembly("adjudication verdict"))?,
            metadata: ResultMetadata {
                request_id,
                completed_at: Utc::now(),
                stage: request.stage.clone(),
                industry: request.industry.clone(),
                locale: request.locale.clone(),
                full_research: request.full_research,
                fallback_stages: self.fallback_stages,
            },
        })
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Stage scheduler. Holds injected collaborators; no global state.
pub struct PitchPipeline {
    client: InferenceClient,
    researcher: Arc<dyn ResearchProvider>,
    config: PipelineConfig,
}

impl PitchPipeline {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        researcher: Arc<dyn ResearchProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            client: InferenceClient::new(gateway),
            researcher,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, request: &PipelineRequest) -> Result<PipelineResult, PipelineError> {
        self.run_with_id(request, Uuid::new_v4()).await
    }

    /// Run under a caller-chosen id so boundary logs and stage logs line up.
    pub async fn run_with_id(
        &self,
        request: &PipelineRequest,
        request_id: Uuid,
    ) -> Result<PipelineResult, PipelineError> {
        let start = Instant::now();
        info!(
            %request_id,
            full_research = request.full_research,
            locale = %request.locale,
            "pipeline started"
        );
        let mut parts = PipelineResultBuilder::default();

        // --- Phase 1: Research ---
        let report = self.research(request, request_id).await?;
        let context = build_context(request, &summarize(&report));
        parts.research = Some(report);

        // --- Phase 2: Analyze (fan-out / join) ---
        let params = self.config.personality.params();
        let (risk, upside) = tokio::try_join!(
            self.analyze(Stage::RiskFirst, &context, request, request_id, &params),
            self.analyze(Stage::UpsideFirst, &context, request, request_id, &params),
        )?;
        parts.note(Stage::RiskFirst, &risk);
        parts.note(Stage::UpsideFirst, &upside);

        // --- Phase 3: Adjudicate ---
        let verdict = self
            .adjudicate(&context, &risk.value, &upside.value, request, request_id)
            .await?;
        parts.note(Stage::Adjudication, &verdict);

        parts.risk_first = Some(risk.value);
        parts.upside_first = Some(upside.value);
        parts.adjudication = Some(verdict.value);
        let result = parts.build(request, request_id)?;

        info!(
            %request_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            verdict = %result.adjudication.final_verdict,
            fallbacks = result.metadata.fallback_stages.len(),
            "pipeline finished"
        );
        Ok(result)
    }

    async fn research(
        &self,
        request: &PipelineRequest,
        request_id: Uuid,
    ) -> Result<ResearchReport, PipelineError> {
        if !request.full_research {
            debug!("fast path: using placeholder research");
            return Ok(ResearchReport::placeholder(&request.locale));
        }

        let stage = Stage::Research;
        let limit = self.config.research.params().timeout;
        let summary = request.idea_summary();
        let start = Instant::now();

        let call = self
            .researcher
            .research(&summary, &request.locale, request_id);

        match tokio::time::timeout(limit, call).await {
            Err(_) => {
                let elapsed = start.elapsed();
                warn!(%stage, elapsed_ms = elapsed.as_millis() as u64, "research timed out");
                Err(PipelineError::UpstreamTimeout { stage, elapsed })
            }
            Ok(Err(err)) => {
                warn!(%stage, error = %err, "research failed");
                Err(PipelineError::from_provider(stage, err, start.elapsed()))
            }
            Ok(Ok(report)) => {
                debug!(%stage, elapsed_ms = start.elapsed().as_millis() as u64, "research done");
                Ok(report)
            }
        }
    }

    async fn analyze(
        &self,
        stage: Stage,
        context: &str,
        request: &PipelineRequest,
        request_id: Uuid,
        params: &StageParams,
    ) -> Result<Interpreted<PersonalityAssessment>, PipelineError> {
        let prompt = prompts::personality_prompt(stage, context, &request.locale);
        let raw = self
            .client
            .call(stage, request_id, &prompt.system, &prompt.user, params)
            .await?;
        Ok(interpret_logged(stage, &raw))
    }

    async fn adjudicate(
        &self,
        context: &str,
        risk: &PersonalityAssessment,
        upside: &PersonalityAssessment,
        request: &PipelineRequest,
        request_id: Uuid,
    ) -> Result<Interpreted<AdjudicationVerdict>, PipelineError> {
        let stage = Stage::Adjudication;
        let risk_json = serde_json::to_string(risk)
            .map_err(|_| PipelineError::Assembly("risk_first assessment"))?;
        let upside_json = serde_json::to_string(upside)
            .map_err(|_| PipelineError::Assembly("upside_first assessment"))?;

        let prompt =
            prompts::adjudication_prompt(context, &risk_json, &upside_json, &request.locale);
        let raw = self
            .client
            .call(
                stage,
                request_id,
                &prompt.system,
                &prompt.user,
                &self.config.adjudication.params(),
            )
            .await?;
        Ok(interpret_logged(stage, &raw))
    }
}

fn interpret_logged<T: StageSchema>(stage: Stage, raw: &str) -> Interpreted<T> {
    let out = interpret::<T>(raw);
    if let Some(reason) = out.fallback {
        warn!(%stage, %reason, raw_len = raw.len(), "stage answer unusable; using fallback");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_reports_missing_parts() {
        let request = PipelineRequest {
            problem: "p".into(),
            ..Default::default()
        };

        let err = PipelineResultBuilder::default()
            .build(&request, Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Assembly("research report")));
        assert_eq!(err.status_code(), 500);

        let parts = PipelineResultBuilder {
            research: Some(ResearchReport::placeholder("en")),
            risk_first: Some(PersonalityAssessment::fallback("x")),
            upside_first: Some(PersonalityAssessment::fallback("x")),
            ..Default::default()
        };
        let err = parts.build(&request, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, PipelineError::Assembly("adjudication verdict")));
    }

    #[test]
    fn builder_echoes_request_metadata() {
        let request = PipelineRequest {
            problem: "p".into(),
            stage: "seed".into(),
            industry: "fintech".into(),
            locale: "de".into(),
            ..Default::default()
        };
        let id = Uuid::new_v4();
        let parts = PipelineResultBuilder {
            research: Some(ResearchReport::placeholder("de")),
            risk_first: Some(PersonalityAssessment::fallback("x")),
            upside_first: Some(PersonalityAssessment::fallback("x")),
            adjudication: Some(AdjudicationVerdict::fallback("x")),
            fallback_stages: vec![Stage::Adjudication],
        };
        let result = parts.build(&request, id).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["metadata"]["requestId"], id.to_string());
        assert_eq!(json["metadata"]["stage"], "seed");
        assert_eq!(json["metadata"]["industry"], "fintech");
        assert_eq!(json["metadata"]["fallbackStages"][0], "adjudication");
        assert_eq!(json["research"]["language"], "de");
        assert!(json["riskFirst"]["dimensionScores"].is_object());
        assert!(json["adjudication"]["checklist"].is_object());
    }
}
