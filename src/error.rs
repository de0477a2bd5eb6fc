//! Pipeline error taxonomy.
//!
//! Only hard failures live here. Malformed model output never becomes an
//! error: it is absorbed inside the stage that received it.

use std::time::Duration;

use thiserror::Error;

use crate::gateway::ProviderError;
use crate::inference::Stage;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The inbound payload was unusable; no stage was invoked.
    #[error("invalid request: {0}")]
    RequestValidation(String),

    /// A stage's inference or research call exceeded its time budget.
    #[error("{stage} stage timed out after {elapsed:?}")]
    UpstreamTimeout { stage: Stage, elapsed: Duration },

    /// Any other hard failure from a collaborator call.
    #[error("{stage} stage call failed: {source}")]
    UpstreamCall {
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    /// The whole request exceeded the boundary's wall-clock budget.
    #[error("request exceeded its {budget:?} budget")]
    DeadlineExceeded { budget: Duration, elapsed: Duration },

    /// A required result section was missing at assembly time.
    #[error("pipeline assembly failed: missing {0}")]
    Assembly(&'static str),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::RequestValidation(message.into())
    }

    /// Classify a provider failure for a stage. Transport-level timeouts are
    /// reported the same way as our own stage timer expiring.
    pub fn from_provider(stage: Stage, source: ProviderError, elapsed: Duration) -> Self {
        if source.is_timeout() {
            Self::UpstreamTimeout { stage, elapsed }
        } else {
            Self::UpstreamCall { stage, source }
        }
    }

    /// HTTP-style status code for the inbound boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RequestValidation(_) => 400,
            Self::UpstreamTimeout { .. } | Self::DeadlineExceeded { .. } => 504,
            Self::UpstreamCall { source, .. } => match source.status() {
                Some(status) if status >= 400 => status,
                _ => 502,
            },
            Self::Assembly(_) => 500,
        }
    }

    /// Short tag for error bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RequestValidation(_) => "invalid_request",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::UpstreamCall { .. } => "upstream_error",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
            Self::Assembly(_) => "internal_error",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UpstreamTimeout { .. } | Self::DeadlineExceeded { .. } => true,
            Self::UpstreamCall { source, .. } => source.is_retryable(),
            Self::RequestValidation(_) | Self::Assembly(_) => false,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::UpstreamTimeout { stage, .. } | Self::UpstreamCall { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Self::UpstreamTimeout { elapsed, .. } | Self::DeadlineExceeded { elapsed, .. } => {
                Some(*elapsed)
            }
            _ => None,
        }
    }
}
