//! Scripted collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pitch_verdict::gateway::{
    ChatGateway, ChatRequest, ChatResponse, ErrorContext, ProviderError, Role,
};
use pitch_verdict::{PipelineConfig, ResearchProvider, ResearchReport};
use serde_json::{json, Value};
use uuid::Uuid;

pub const RISK: &str = "pipeline::risk_first";
pub const UPSIDE: &str = "pipeline::upside_first";
pub const ADJUDICATION: &str = "pipeline::adjudication";
pub const RESEARCH: &str = "pipeline::research";

#[derive(Clone)]
pub enum Reply {
    Text(String),
    /// Provider failure carrying this HTTP status.
    Fail(u16),
    /// The provider's own request timeout fired.
    TimedOut,
}

#[derive(Clone)]
pub struct Script {
    pub delay: Duration,
    pub reply: Reply,
}

impl Script {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Reply::Text(body.into()),
        }
    }

    pub fn fail(status: u16) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Reply::Fail(status),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Reply::TimedOut,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Seen {
    pub caller: &'static str,
    pub request_id: Option<Uuid>,
    pub system: String,
    pub user: String,
}

/// Answers by attribution caller; records every call at the moment it starts.
#[derive(Default)]
pub struct ScriptedGateway {
    scripts: HashMap<&'static str, Script>,
    seen: Mutex<Vec<Seen>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, caller: &'static str, script: Script) -> Self {
        self.scripts.insert(caller, script);
        self
    }

    /// Well-formed answers for all three stages.
    pub fn happy() -> Self {
        Self::new()
            .on(RISK, Script::text(personality_json("pass", 3)))
            .on(UPSIDE, Script::text(personality_json("proceed", 8)))
            .on(ADJUDICATION, Script::text(adjudication_json()))
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn callers(&self) -> Vec<&'static str> {
        self.seen().iter().map(|s| s.caller).collect()
    }

    pub fn seen_for(&self, caller: &str) -> Option<Seen> {
        self.seen().into_iter().find(|s| s.caller == caller)
    }
}

#[async_trait]
impl ChatGateway for ScriptedGateway {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.seen.lock().unwrap().push(Seen {
            caller: req.attribution.caller,
            request_id: req.attribution.request_id,
            system: req.content_for(Role::System).unwrap_or_default().to_string(),
            user: req.content_for(Role::User).unwrap_or_default().to_string(),
        });

        let Some(script) = self.scripts.get(req.attribution.caller).cloned() else {
            return Err(ProviderError::invalid_request(format!(
                "no script for {}",
                req.attribution.caller
            )));
        };

        tokio::time::sleep(script.delay).await;
        match script.reply {
            Reply::Text(body) => Ok(ChatResponse::text(body)),
            Reply::Fail(status) => Err(ProviderError::provider_with_context(
                "openrouter",
                "scripted failure",
                status >= 500,
                ErrorContext::new().with_status(status),
            )),
            Reply::TimedOut => Err(ProviderError::Timeout(Duration::from_secs(30), None)),
        }
    }
}

/// Research collaborator with a call counter.
pub struct ScriptedResearch {
    pub calls: AtomicUsize,
    pub delay: Duration,
    pub fail: bool,
    pub report: Value,
}

impl ScriptedResearch {
    pub fn ok(report: Value) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: false,
            report,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok(Value::Null)
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::ok(Value::Null)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResearchProvider for ScriptedResearch {
    async fn research(
        &self,
        _idea_summary: &str,
        locale: &str,
        _request_id: Uuid,
    ) -> Result<ResearchReport, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(ProviderError::provider("research", "search backend down", true));
        }
        Ok(ResearchReport::from_value(&self.report, locale))
    }
}

/// Default profiles with timeouts the tests can reason about.
pub fn config() -> PipelineConfig {
    PipelineConfig::default()
}

pub fn pitch() -> Value {
    json!({
        "problem": "Small clinics lose hours reconciling insurance claims",
        "solution": "Automated claim matching for clinic billing systems",
        "market": "40k independent clinics in the EU",
        "traction": "3 paying pilots",
        "stage": "seed",
        "industry": "healthtech"
    })
}

pub fn personality_json(verdict: &str, score: u32) -> String {
    let dim = json!({
        "score": score,
        "evidence": ["pilot data"],
        "reasoning": "based on pitch",
        "strongestCounterArgument": "small sample",
        "responseToCounterArgument": "pilots are paying",
        "confidence": "medium"
    });
    json!({
        "chainOfReasoning": ["read pitch", "weigh evidence"],
        "dimensionScores": {
            "marketOpportunity": dim,
            "problemSolutionFit": dim,
            "teamExecution": dim,
            "businessModel": dim,
            "competitiveMoat": dim,
            "tractionEvidence": dim
        },
        "overallScore": score,
        "overallReasoning": "overall",
        "verdict": verdict,
        "verdictReasoning": "because",
        "criticalRisks": [{"label": "sales cycle", "reasoning": "clinics are slow", "confidence": "high"}],
        "upsideDrivers": [{"label": "regulation", "reasoning": "e-invoicing mandate", "confidence": "medium"}],
        "biasCheck": "none noted"
    })
    .to_string()
}

pub fn adjudication_json() -> String {
    json!({
        "chainOfReasoning": ["compare"],
        "agreements": [{"point": "real pain", "evidence": ["pilots"]}],
        "disagreements": [{
            "topic": "market size",
            "riskFirstView": "niche",
            "upsideFirstView": "expanding",
            "resolution": "niche today",
            "reasoning": "research"
        }],
        "researchUsage": "used market section",
        "finalScore": 6,
        "finalReasoning": "promising but early",
        "finalVerdict": "maybe",
        "confidence": "medium",
        "biasCheck": "balanced",
        "checklist": {
            "ideaImprovements": [{"priority": 1, "text": "prove retention"}],
            "pitchImprovements": [{"priority": 1, "text": "show pilot ROI"}]
        }
    })
    .to_string()
}
