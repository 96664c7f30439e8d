use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{MigrateError, Result};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Which text-generation backend drives the model-assisted paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Ollama,
    OpenAi,
    /// Deterministic fallback only.
    Disabled,
}

impl LlmProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "llama3.2",
            LlmProvider::OpenAi => "gpt-3.5-turbo",
            LlmProvider::Disabled => "",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" | "gpt" => Ok(LlmProvider::OpenAi),
            "none" | "off" | "disabled" => Ok(LlmProvider::Disabled),
            other => Err(MigrateError::InvalidConfiguration(format!(
                "unknown LLM provider '{}' (expected ollama, openai or none)",
                other
            ))),
        }
    }
}

/// Everything the pipeline needs from its environment, resolved once at
/// startup and passed in explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: LlmProvider,
    pub model: String,
    pub ollama_url: String,
    pub openai_url: String,
    pub openai_api_key: Option<String>,
    pub sample_schema_path: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl Config {
    /// Config that never talks to a model.
    pub fn offline() -> Self {
        Self {
            provider: LlmProvider::Disabled,
            model: String::new(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            openai_url: DEFAULT_OPENAI_URL.to_string(),
            openai_api_key: None,
            sample_schema_path: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds and validates a config from any key lookup.
    ///
    /// Model-assisted providers need a sample schema path, and OpenAI needs
    /// an API key. Either one missing is fatal here rather than a silent
    /// downgrade later.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("MIGRATOR_PROVIDER") {
            Some(p) => p.parse()?,
            None => LlmProvider::Ollama,
        };

        let request_timeout = match get("MIGRATOR_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| {
                    MigrateError::InvalidConfiguration(format!(
                        "MIGRATOR_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                        raw
                    ))
                })?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let config = Self {
            provider,
            model: get("MIGRATOR_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            ollama_url: get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            openai_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            openai_api_key: get("OPENAI_API_KEY"),
            sample_schema_path: get("SAMPLE_SCHEMA_PATH").map(PathBuf::from),
            request_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider == LlmProvider::Disabled {
            return Ok(());
        }
        if self.provider == LlmProvider::OpenAi {
            self.openai_key()?;
        }
        if self.sample_schema_path.is_none() {
            return Err(MigrateError::ConfigurationMissing(
                "SAMPLE_SCHEMA_PATH is required for model-assisted mapping".to_string(),
            ));
        }
        Ok(())
    }

    pub fn openai_key(&self) -> Result<&str> {
        self.openai_api_key.as_deref().ok_or_else(|| {
            MigrateError::ConfigurationMissing(
                "OPENAI_API_KEY is required when MIGRATOR_PROVIDER=openai".to_string(),
            )
        })
    }

    pub fn uses_llm(&self) -> bool {
        self.provider != LlmProvider::Disabled
    }
}
