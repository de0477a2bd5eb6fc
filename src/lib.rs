#![forbid(unsafe_code)]

//! # pitch-verdict
//!
//! Turns a startup pitch into one adjudicated investment verdict.
//!
//! Two language-model analysts read the same pitch and research digest, one
//! arguing from risk and one from upside, and an adjudicator reconciles them.
//! Model output is free-form text that is supposed to be JSON and often is
//! not, so every stage answer goes through extraction, key normalization and
//! schema completion. A malformed answer degrades to a neutral fallback
//! object; only timeouts and transport failures abort a run.

pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod inference;
pub mod metering;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod request;
pub mod research;
pub mod schema;
pub mod service;
pub mod summarize;

pub use config::{ConfigError, PipelineConfig, StageProfile};
pub use error::PipelineError;
pub use gateway::{Attribution, ChatGateway, OpenRouterAdapter, ProviderError};
pub use inference::{InferenceClient, Stage, StageParams};
pub use metering::{LogMeter, Meter, MeterError, MeterRecord, NoopMeter};
pub use pipeline::{PipelineResult, PitchPipeline, ResultMetadata};
pub use request::PipelineRequest;
pub use research::{GatewayResearcher, PlaceholderResearch, ResearchProvider, ResearchReport};
pub use schema::{
    parse_stage_output, AdjudicationVerdict, Confidence, FallbackReason, PersonalityAssessment,
    StageKind, Verdict,
};
pub use service::{InboundRequest, PitchService, ServiceResponse};
