//! Pipeline configuration: per-stage model profiles and the request budget.
//!
//! Loaded from a JSON file, from `PITCH_*` environment variables, or built in
//! code. Every field has a default, so `{}` is a valid config file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inference::StageParams;

pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_REQUEST_BUDGET_SECS: u64 = 300;

pub const ENV_PERSONALITY_MODEL: &str = "PITCH_PERSONALITY_MODEL";
pub const ENV_ADJUDICATION_MODEL: &str = "PITCH_ADJUDICATION_MODEL";
pub const ENV_RESEARCH_MODEL: &str = "PITCH_RESEARCH_MODEL";
pub const ENV_STAGE_TIMEOUT: &str = "PITCH_STAGE_TIMEOUT_SECONDS";
pub const ENV_REQUEST_BUDGET: &str = "PITCH_REQUEST_BUDGET_SECONDS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Model and parameter profile for one stage family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageProfile {
    pub model: String,
    /// `None` means the parameter is not sent (some models reject it).
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub json_mode: bool,
}

impl Default for StageProfile {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-sonnet-4".to_string(),
            temperature: Some(0.7),
            max_tokens: 4000,
            timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
            json_mode: true,
        }
    }
}

impl StageProfile {
    pub fn params(&self) -> StageParams {
        StageParams {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_mode: self.json_mode,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{name}.model is empty")));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(format!("{name}.timeout_secs must be > 0")));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid(format!("{name}.max_tokens must be > 0")));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::Invalid(format!(
                    "{name}.temperature {t} is outside 0..=2"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Shared by both analyst stages.
    pub personality: StageProfile,
    pub adjudication: StageProfile,
    pub research: StageProfile,
    pub request_budget_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            personality: StageProfile::default(),
            adjudication: StageProfile {
                temperature: Some(0.3),
                ..StageProfile::default()
            },
            research: StageProfile {
                model: "perplexity/sonar-pro".to_string(),
                temperature: None,
                json_mode: false,
                ..StageProfile::default()
            },
            request_budget_secs: DEFAULT_REQUEST_BUDGET_SECS,
        }
    }
}

impl PipelineConfig {
    pub fn request_budget(&self) -> Duration {
        Duration::from_secs(self.request_budget_secs)
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overlaid with `PITCH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`. Blank values are ignored.
    pub fn overlay(
        mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(model) = get(ENV_PERSONALITY_MODEL) {
            self.personality.model = model;
        }
        if let Some(model) = get(ENV_ADJUDICATION_MODEL) {
            self.adjudication.model = model;
        }
        if let Some(model) = get(ENV_RESEARCH_MODEL) {
            self.research.model = model;
        }
        if let Some(raw) = get(ENV_STAGE_TIMEOUT) {
            let secs = parse_secs(ENV_STAGE_TIMEOUT, &raw)?;
            self.personality.timeout_secs = secs;
            self.adjudication.timeout_secs = secs;
            self.research.timeout_secs = secs;
        }
        if let Some(raw) = get(ENV_REQUEST_BUDGET) {
            self.request_budget_secs = parse_secs(ENV_REQUEST_BUDGET, &raw)?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.personality.validate("personality")?;
        self.adjudication.validate("adjudication")?;
        self.research.validate("research")?;
        if self.request_budget_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_budget_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_secs(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidEnv {
            var,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = PipelineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.request_budget(), Duration::from_secs(300));
        assert_eq!(cfg.personality.params().timeout, Duration::from_secs(120));
        assert!(cfg.research.temperature.is_none());
    }

    #[test]
    fn env_overlay() {
        let cfg = PipelineConfig::default()
            .overlay(lookup(&[
                (ENV_PERSONALITY_MODEL, "openai/gpt-4o"),
                (ENV_STAGE_TIMEOUT, "45"),
                (ENV_REQUEST_BUDGET, " 90 "),
                (ENV_RESEARCH_MODEL, "   "),
            ]))
            .unwrap();

        assert_eq!(cfg.personality.model, "openai/gpt-4o");
        assert_eq!(cfg.adjudication.timeout_secs, 45);
        assert_eq!(cfg.research.timeout_secs, 45);
        assert_eq!(cfg.request_budget_secs, 90);
        assert_eq!(cfg.research.model, PipelineConfig::default().research.model);
    }

    #[test]
    fn env_overlay_rejects_bad_numbers() {
        for bad in ["soon", "0", "-5"] {
            let err = PipelineConfig::default()
                .overlay(lookup(&[(ENV_STAGE_TIMEOUT, bad)]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_STAGE_TIMEOUT, .. }));
        }
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"adjudication": {{"model": "openai/o3", "temperature": null}}, "request_budget_secs": 200}}"#
        )
        .unwrap();

        let cfg = PipelineConfig::from_path(file.path()).unwrap();
        assert_eq!(cfg.adjudication.model, "openai/o3");
        assert!(cfg.adjudication.temperature.is_none());
        assert_eq!(cfg.adjudication.timeout_secs, DEFAULT_STAGE_TIMEOUT_SECS);
        assert_eq!(cfg.request_budget_secs, 200);
        assert_eq!(cfg.personality, StageProfile::default());
    }

    #[test]
    fn invalid_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            PipelineConfig::from_path(file.path()),
            Err(ConfigError::Parse { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"personality": {{"timeout_secs": 0}}}}"#).unwrap();
        assert!(matches!(
            PipelineConfig::from_path(file.path()),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            PipelineConfig::from_path("/definitely/not/here.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
