//! Usage metering via the Meter trait.
//!
//! The service records one unit of consumption after each successful run.
//! Metering is detached from the response: a slow or failing meter never
//! delays or fails the request.
//! - Hosted deployments plug in a billing-backed meter
//! - The CLI uses LogMeter
//! - Tests use NoopMeter or a recording fake

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MeterError {
    #[error("meter rejected record: {0}")]
    Rejected(String),
    #[error("meter unavailable: {0}")]
    Unavailable(String),
}

/// One unit of consumption.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterRecord {
    /// Who is charged, as identified by the caller.
    pub subject: String,
    /// What was consumed, e.g. "pitch_evaluation".
    pub action: &'static str,
    pub request_id: Uuid,
    pub full_research: bool,
    pub timestamp: DateTime<Utc>,
}

impl MeterRecord {
    pub fn new(subject: impl Into<String>, action: &'static str, request_id: Uuid) -> Self {
        Self {
            subject: subject.into(),
            action,
            request_id,
            full_research: false,
            timestamp: Utc::now(),
        }
    }

    pub fn full_research(mut self, full: bool) -> Self {
        self.full_research = full;
        self
    }
}

#[async_trait]
pub trait Meter: Send + Sync {
    async fn consume(&self, record: MeterRecord) -> Result<(), MeterError>;
}

/// Discards all records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMeter;

#[async_trait]
impl Meter for NoopMeter {
    async fn consume(&self, _record: MeterRecord) -> Result<(), MeterError> {
        Ok(())
    }
}

/// Emits each record as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMeter;

#[async_trait]
impl Meter for LogMeter {
    async fn consume(&self, record: MeterRecord) -> Result<(), MeterError> {
        info!(
            subject = %record.subject,
            action = record.action,
            request_id = %record.request_id,
            full_research = record.full_research,
            "usage recorded"
        );
        Ok(())
    }
}

/// Record consumption on a detached task. Failures are logged only.
pub fn spawn_consume(meter: Arc<dyn Meter>, record: MeterRecord) -> JoinHandle<()> {
    tokio::spawn(async move {
        let request_id = record.request_id;
        if let Err(err) = meter.consume(record).await {
            warn!(%request_id, error = %err, "metering failed");
        }
    })
}
