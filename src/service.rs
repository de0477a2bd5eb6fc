//! Inbound boundary: payload in, status + JSON body out.
//!
//! Owns the whole-request wall-clock budget, maps pipeline errors to tagged
//! error bodies, and meters successful runs after the fact.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::metering::{spawn_consume, Meter, MeterRecord};
use crate::pipeline::PitchPipeline;
use crate::request::{PipelineRequest, DEFAULT_LOCALE};

/// Metering action recorded per successful evaluation.
pub const EVALUATION_ACTION: &str = "pitch_evaluation";

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

/// Caller payload as received.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRequest {
    /// Pitch facts; validated into a [`PipelineRequest`].
    #[serde(default)]
    pub pitch: Value,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default, alias = "full_research")]
    pub full_research: bool,
    /// Metering subject; runs without one are recorded as anonymous.
    #[serde(default)]
    pub subject: Option<String>,
}

impl InboundRequest {
    pub fn new(pitch: Value) -> Self {
        Self {
            pitch,
            locale: default_locale(),
            full_research: false,
            subject: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: Value,
}

impl ServiceResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn error(err: &PipelineError) -> Self {
        Self {
            status: err.status_code(),
            body: error_body(err),
        }
    }
}

/// Tagged JSON error body for a pipeline error.
pub fn error_body(err: &PipelineError) -> Value {
    let mut body = json!({
        "error": err.code(),
        "message": err.to_string(),
        "retryable": err.is_retryable(),
    });
    if let Some(stage) = err.stage() {
        body["stage"] = json!(stage.as_str());
    }
    if let Some(elapsed) = err.elapsed() {
        body["elapsedMs"] = json!(elapsed.as_millis() as u64);
    }
    body
}

pub struct PitchService {
    pipeline: Arc<PitchPipeline>,
    meter: Arc<dyn Meter>,
    budget: Duration,
}

impl PitchService {
    /// Budget defaults to the pipeline config's request budget.
    pub fn new(pipeline: Arc<PitchPipeline>, meter: Arc<dyn Meter>) -> Self {
        let budget = pipeline.config().request_budget();
        Self {
            pipeline,
            meter,
            budget,
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub async fn handle(&self, inbound: InboundRequest) -> ServiceResponse {
        let request =
            match PipelineRequest::from_payload(&inbound.pitch, &inbound.locale, inbound.full_research)
            {
                Ok(r) => r,
                Err(err) => {
                    warn!(error = %err, "rejected pitch payload");
                    return ServiceResponse::error(&err);
                }
            };

        let request_id = Uuid::new_v4();
        let start = Instant::now();
        let outcome = match tokio::time::timeout(
            self.budget,
            self.pipeline.run_with_id(&request, request_id),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(PipelineError::DeadlineExceeded {
                budget: self.budget,
                elapsed: start.elapsed(),
            }),
        };

        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    %request_id,
                    code = err.code(),
                    stage = err.stage().map(|s| s.as_str()),
                    error = %err,
                    "evaluation failed"
                );
                return ServiceResponse::error(&err);
            }
        };

        let body = match serde_json::to_value(&result) {
            Ok(body) => body,
            Err(_) => return ServiceResponse::error(&PipelineError::Assembly("result body")),
        };

        let subject = inbound.subject.unwrap_or_else(|| "anonymous".to_string());
        spawn_consume(
            self.meter.clone(),
            MeterRecord::new(subject, EVALUATION_ACTION, request_id)
                .full_research(request.full_research),
        );

        info!(
            %request_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "evaluation served"
        );
        ServiceResponse { status: 200, body }
    }
}
