use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::config::{Config, LlmProvider};
use crate::error::MigrateError;

/// A remote model that turns a prompt into free text.
///
/// Both pipeline stages talk to the model through this seam, so tests can
/// swap in a canned responder without touching the fallback logic.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Ollama-style `/api/generate` backend.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Ollama error ({})", status));
        }

        let json_resp: serde_json::Value = response.json().await?;
        let content = json_resp["response"]
            .as_str()
            .ok_or_else(|| anyhow!("No response text from Ollama: {}", json_resp))?;

        debug!(model = %self.model, chars = content.len(), "Ollama replied");
        Ok(content.to_string())
    }
}

/// OpenAI chat-completions backend.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(client: Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": 0,
            }))
            .send()
            .await?;

        let status = response.status();
        let json_resp: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let err_msg = json_resp["error"]["message"]
                .as_str()
                .unwrap_or("Unknown API error");
            return Err(anyhow!("OpenAI API error ({}): {}", status, err_msg));
        }

        let content = json_resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("No content in LLM response: {}", json_resp))?;

        debug!(model = %self.model, chars = content.len(), "OpenAI replied");
        Ok(content.to_string())
    }
}

/// Builds the configured backend, or `None` when model assistance is off.
pub fn connect(config: &Config) -> Result<Option<Arc<dyn TextGenerator>>, MigrateError> {
    let client = || Client::builder().timeout(config.request_timeout).build();

    let generator: Arc<dyn TextGenerator> = match config.provider {
        LlmProvider::Disabled => return Ok(None),
        LlmProvider::Ollama => Arc::new(OllamaClient::new(
            client()?,
            &config.ollama_url,
            &config.model,
        )),
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(
            client()?,
            &config.openai_url,
            config.openai_key()?,
            &config.model,
        )),
    };

    Ok(Some(generator))
}

/// Finds the first `open`..`close` span whose brackets balance.
///
/// Models like to wrap JSON in prose or markdown fences. Scanning starts at
/// the first `open`; brackets inside JSON string literals are skipped.
pub fn first_balanced_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                let end = start + offset + ch.len_utf8();
                return Some(&text[start..end]);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_inside_prose() {
        let reply = "Sure! Here you go:\n```json\n[{\"action\": \"click\"}]\n```\nAnything else?";
        assert_eq!(
            first_balanced_span(reply, '[', ']'),
            Some("[{\"action\": \"click\"}]")
        );
    }

    #[test]
    fn test_span_is_first_not_widest() {
        let reply = "{\"a\": 1} and later {\"b\": 2}";
        assert_eq!(first_balanced_span(reply, '{', '}'), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_span_nested() {
        let reply = "x {\"command\": {\"name\": \"click\", \"fields\": []}} y";
        assert_eq!(
            first_balanced_span(reply, '{', '}'),
            Some("{\"command\": {\"name\": \"click\", \"fields\": []}}")
        );
    }

    #[test]
    fn test_span_ignores_brackets_in_strings() {
        let reply = r#"[{"selector": "input[name='x]']", "value": "a\"]"}] trailing ]"#;
        assert_eq!(
            first_balanced_span(reply, '[', ']'),
            Some(r#"[{"selector": "input[name='x]']", "value": "a\"]"}]"#)
        );
    }

    #[test]
    fn test_span_missing_or_unbalanced() {
        assert_eq!(first_balanced_span("no json here", '[', ']'), None);
        assert_eq!(first_balanced_span("[1, [2, 3]", '[', ']'), None);
    }

    #[test]
    fn test_connect_disabled_returns_none() {
        let generator = connect(&Config::offline()).unwrap();
        assert!(generator.is_none());
    }

    #[test]
    fn test_connect_ollama() {
        let mut config = Config::offline();
        config.provider = LlmProvider::Ollama;
        config.model = "llama3.2".to_string();
        assert!(connect(&config).unwrap().is_some());
    }

    #[test]
    fn test_connect_openai_without_key_fails() {
        let mut config = Config::offline();
        config.provider = LlmProvider::OpenAi;
        let err = connect(&config).err().expect("missing key must fail");
        assert!(matches!(err, MigrateError::ConfigurationMissing(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY is required"));
    }

    #[test]
    fn test_connect_openai_with_key() {
        let mut config = Config::offline();
        config.provider = LlmProvider::OpenAi;
        config.model = "gpt-4o-mini".to_string();
        config.openai_api_key = Some("sk-test".to_string());
        assert!(connect(&config).unwrap().is_some());
    }
}
