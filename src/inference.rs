//! Inference client adapter: one bounded-time call per stage.
//!
//! The adapter owns nothing global. It wraps an injected [`ChatGateway`],
//! races each call against the stage timer, and hands back the raw text.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest, Message};

/// One unit of pipeline work that issues at most one external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Research,
    RiskFirst,
    UpsideFirst,
    Adjudication,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Research => "research",
            Stage::RiskFirst => "risk_first",
            Stage::UpsideFirst => "upside_first",
            Stage::Adjudication => "adjudication",
        }
    }

    /// Attribution label used on outgoing requests.
    pub fn caller(&self) -> &'static str {
        match self {
            Stage::Research => "pipeline::research",
            Stage::RiskFirst => "pipeline::risk_first",
            Stage::UpsideFirst => "pipeline::upside_first",
            Stage::Adjudication => "pipeline::adjudication",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model and parameter profile for a single call.
#[derive(Debug, Clone)]
pub struct StageParams {
    pub model: String,
    /// `None` leaves the parameter off the wire entirely.
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub json_mode: bool,
    pub timeout: Duration,
}

impl StageParams {
    /// Build the outgoing request for `stage` with this profile.
    pub fn to_request(
        &self,
        stage: Stage,
        request_id: Uuid,
        system: &str,
        user: &str,
    ) -> ChatRequest {
        let req = ChatRequest::new(
            ChatModel::openrouter(&self.model),
            vec![Message::system(system), Message::user(user)],
            Attribution::new(stage.caller()).with_request(request_id),
        )
        .temperature(self.temperature)
        .max_tokens(self.max_tokens);
        if self.json_mode {
            req.json()
        } else {
            req
        }
    }
}

/// Issues stage calls against an injected gateway.
#[derive(Clone)]
pub struct InferenceClient {
    gateway: Arc<dyn ChatGateway>,
}

impl InferenceClient {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self { gateway }
    }

    /// Run one call and return the model's raw text.
    ///
    /// Timer expiry drops the in-flight request and yields
    /// [`PipelineError::UpstreamTimeout`] for `stage`. Provider failures are
    /// passed through inside [`PipelineError::UpstreamCall`].
    pub async fn call(
        &self,
        stage: Stage,
        request_id: Uuid,
        system: &str,
        user: &str,
        params: &StageParams,
    ) -> Result<String, PipelineError> {
        let req = params.to_request(stage, request_id, system, user);

        let start = Instant::now();
        debug!(%stage, model = %params.model, "stage call started");

        match tokio::time::timeout(params.timeout, self.gateway.chat(req)).await {
            Err(_) => {
                let elapsed = start.elapsed();
                warn!(%stage, elapsed_ms = elapsed.as_millis() as u64, "stage call timed out");
                Err(PipelineError::UpstreamTimeout { stage, elapsed })
            }
            Ok(Err(err)) => {
                warn!(%stage, error = %err, code = err.code(), "stage call failed");
                Err(PipelineError::from_provider(stage, err, start.elapsed()))
            }
            Ok(Ok(resp)) => {
                debug!(
                    %stage,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    output_tokens = resp.output_tokens,
                    "stage call finished"
                );
                Ok(resp.content)
            }
        }
    }
}
