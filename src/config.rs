use anyhow::{bail, Result};
use serde::Serialize;
use std::time::Duration;

use crate::environment::{get_env_flag, get_env_var, get_env_var_or};

/// Placeholder shipped in sample configs; treated the same as a missing key.
pub const PLACEHOLDER_API_KEY: &str = "your-openai-api-key-here";

pub const DEFAULT_API_ENDPOINT: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-preview";

/// Upper bound for `time_window_hours`, one year.
pub const MAX_TIME_WINDOW_HOURS: i64 = 24 * 366;

/// Settings for one pipeline run. Read once at the start of the run and never mutated.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineConfig {
    pub enabled: bool,
    pub confidence_threshold: f64,
    pub min_news_count: usize,
    pub time_window_hours: i64,
    /// 0 means every unlinked news item is considered.
    pub max_news_limit: usize,
    pub linking_threshold: f64,
    pub require_confidence_gate: bool,
    pub event_lookback_days: i64,
    pub max_candidate_events: usize,
    #[serde(with = "duration_secs")]
    pub inter_call_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_threshold: 0.7,
            min_news_count: 3,
            time_window_hours: 72,
            max_news_limit: 0,
            linking_threshold: 0.1,
            require_confidence_gate: false,
            event_lookback_days: 30,
            max_candidate_events: 100,
            inter_call_delay: Duration::from_secs(2),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            enabled: get_env_flag("EVENT_GENERATION_ENABLED", defaults.enabled)?,
            confidence_threshold: get_env_var_or(
                "EVENT_CONFIDENCE_THRESHOLD",
                defaults.confidence_threshold,
            )?,
            min_news_count: get_env_var_or("EVENT_MIN_NEWS_COUNT", defaults.min_news_count)?,
            time_window_hours: get_env_var_or(
                "EVENT_TIME_WINDOW_HOURS",
                defaults.time_window_hours,
            )?,
            max_news_limit: get_env_var_or("EVENT_MAX_NEWS_LIMIT", defaults.max_news_limit)?,
            linking_threshold: get_env_var_or(
                "EVENT_LINKING_THRESHOLD",
                defaults.linking_threshold,
            )?,
            require_confidence_gate: get_env_flag(
                "EVENT_REQUIRE_CONFIDENCE_GATE",
                defaults.require_confidence_gate,
            )?,
            inter_call_delay: Duration::from_secs(get_env_var_or(
                "EVENT_INTER_CALL_DELAY_SECS",
                defaults.inter_call_delay.as_secs(),
            )?),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            bail!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.linking_threshold) {
            bail!(
                "linking_threshold must be within [0, 1], got {}",
                self.linking_threshold
            );
        }
        if !(1..=MAX_TIME_WINDOW_HOURS).contains(&self.time_window_hours) {
            bail!(
                "time_window_hours must be within [1, {}], got {}",
                MAX_TIME_WINDOW_HOURS,
                self.time_window_hours
            );
        }
        if self.min_news_count == 0 {
            bail!("min_news_count must be at least 1");
        }
        Ok(())
    }

    /// Grouping window, clamped to the range `validate` accepts.
    pub fn time_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.time_window_hours.clamp(1, MAX_TIME_WINDOW_HOURS))
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_min_news_count(mut self, count: usize) -> Self {
        self.min_news_count = count;
        self
    }

    pub fn with_time_window_hours(mut self, hours: i64) -> Self {
        self.time_window_hours = hours;
        self
    }

    pub fn with_max_news_limit(mut self, limit: usize) -> Self {
        self.max_news_limit = limit;
        self
    }

    pub fn with_linking_threshold(mut self, threshold: f64) -> Self {
        self.linking_threshold = threshold;
        self
    }

    pub fn with_confidence_gate(mut self, required: bool) -> Self {
        self.require_confidence_gate = required;
        self
    }

    pub fn with_inter_call_delay(mut self, delay: Duration) -> Self {
        self.inter_call_delay = delay;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Ollama,
}

impl std::str::FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" | "openrouter" => Ok(Provider::OpenAI),
            "ollama" => Ok(Provider::Ollama),
            other => bail!("Unknown AI provider '{}'", other),
        }
    }
}

/// Connection settings for the external text-generation endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct GeneratorConfig {
    pub provider: Provider,
    #[serde(skip)]
    pub api_key: Option<String>,
    pub api_endpoint: String,
    pub model: String,
    pub ollama_host: String,
    pub ollama_port: u16,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAI,
            api_key: None,
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            ollama_host: "http://localhost".to_string(),
            ollama_port: 11434,
            max_tokens: 2000,
            timeout_secs: 30,
            temperature: 0.2,
        }
    }
}

impl GeneratorConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let provider = match get_env_var("AI_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => defaults.provider,
        };

        Ok(Self {
            provider,
            api_key: get_env_var("OPENAI_API_KEY"),
            api_endpoint: get_env_var("OPENAI_API_ENDPOINT").unwrap_or(defaults.api_endpoint),
            model: get_env_var("OPENAI_MODEL").unwrap_or(defaults.model),
            ollama_host: get_env_var("OLLAMA_HOST").unwrap_or(defaults.ollama_host),
            ollama_port: get_env_var_or("OLLAMA_PORT", defaults.ollama_port)?,
            max_tokens: get_env_var_or("AI_MAX_TOKENS", defaults.max_tokens)?,
            timeout_secs: get_env_var_or("AI_TIMEOUT_SECS", defaults.timeout_secs)?,
            temperature: get_env_var_or("AI_TEMPERATURE", defaults.temperature)?,
        })
    }

    /// The API key, unless it is missing or still the sample placeholder.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }

    /// Whether delegated generation can be attempted at all.
    pub fn has_credentials(&self) -> bool {
        match self.provider {
            Provider::OpenAI => self.usable_api_key().is_some(),
            Provider::Ollama => true,
        }
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_defaults() {
        let config = PipelineConfig::default();
        assert!(config.enabled);
        assert_eq!(config.min_news_count, 3);
        assert_eq!(config.time_window_hours, 72);
        assert_eq!(config.max_news_limit, 0);
        assert_eq!(config.linking_threshold, 0.1);
        assert!(!config.require_confidence_gate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(PipelineConfig::new().with_time_window_hours(0).validate().is_err());
        assert!(PipelineConfig::new()
            .with_time_window_hours(MAX_TIME_WINDOW_HOURS + 1)
            .validate()
            .is_err());
        assert!(PipelineConfig::new()
            .with_time_window_hours(MAX_TIME_WINDOW_HOURS)
            .validate()
            .is_ok());
        assert!(PipelineConfig::new().with_min_news_count(0).validate().is_err());
        assert!(PipelineConfig::new()
            .with_confidence_threshold(1.5)
            .validate()
            .is_err());
    }

    #[test]
    fn test_huge_time_window_does_not_overflow() {
        let config = PipelineConfig::new().with_time_window_hours(i64::MAX);
        assert!(config.validate().is_err());
        assert_eq!(
            config.time_window(),
            chrono::Duration::hours(MAX_TIME_WINDOW_HOURS)
        );
    }

    #[test]
    fn test_placeholder_key_is_not_a_credential() {
        let mut config = GeneratorConfig::default();
        assert!(!config.has_credentials());

        config.api_key = Some(PLACEHOLDER_API_KEY.to_string());
        assert!(!config.has_credentials());

        config.api_key = Some("sk-live".to_string());
        assert!(config.has_credentials());

        let ollama = GeneratorConfig {
            provider: Provider::Ollama,
            ..GeneratorConfig::default()
        };
        assert!(ollama.has_credentials());
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("OpenRouter".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert_eq!("ollama".parse::<Provider>().unwrap(), Provider::Ollama);
        assert!("bard".parse::<Provider>().is_err());
    }
}
