//! Reasoning-model backend abstraction and implementations.
//!
//! Defines an enum-based dispatch for backends, avoiding the
//! dyn-compatibility issues with async trait methods. Concrete
//! implementations exist for OpenAI-compatible APIs and the Anthropic
//! Messages API. All backends communicate over HTTP via `reqwest`.
//!
//! The client does not care which model is behind the API -- it sends a
//! prompt and expects a text response containing JSON.

use crate::error::RunnerError;
use crate::prompt::RenderedPrompt;

/// Connection settings for one backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base API URL.
    pub api_url: String,
    /// API key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// A reasoning backend that can process a prompt and return text.
///
/// Uses enum dispatch instead of trait objects because async methods are
/// not dyn-compatible in Rust.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Build a backend from its flavor name and config.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] for an unknown flavor.
    pub fn from_flavor(flavor: &str, config: &BackendConfig) -> Result<Self, RunnerError> {
        match flavor.to_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(Self::OpenAi(OpenAiBackend::new(config))),
            "anthropic" => Ok(Self::Anthropic(AnthropicBackend::new(config))),
            other => Err(RunnerError::Config(format!("unknown backend flavor: {other}"))),
        }
    }

    /// Send a prompt and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Backend`] if the HTTP call fails or the
    /// response cannot be extracted.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt).await,
            Self::Anthropic(backend) => backend.complete(prompt).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Works with `OpenAI`, `DeepSeek`, and Ollama endpoints. Sends requests
/// to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let url = format!("{}/chat/completions", self.api_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": 0.7,
            "max_tokens": 512,
            "response_format": {"type": "json_object"}
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::Backend(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unable to read error body"));
            return Err(RunnerError::Backend(format!(
                "OpenAI returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RunnerError::Backend(format!("OpenAI response parse failed: {e}")))?;

        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                RunnerError::Backend(String::from("OpenAI response missing choices[0].message.content"))
            })
    }
}

// ---------------------------------------------------------------------------
// Anthropic backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Sends requests to `{api_url}/v1/messages`.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic backend.
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let url = format!("{}/v1/messages", self.api_url);
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 512,
            "system": prompt.system,
            "messages": [
                {"role": "user", "content": prompt.user}
            ]
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::Backend(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unable to read error body"));
            return Err(RunnerError::Backend(format!(
                "Anthropic returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RunnerError::Backend(format!("Anthropic response parse failed: {e}")))?;

        json.get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(|t| t.as_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                RunnerError::Backend(String::from("Anthropic response missing content[0].text"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BackendConfig {
        BackendConfig {
            api_url: String::from("http://localhost:9"),
            api_key: String::from("test-key"),
            model: String::from("test-model"),
        }
    }

    #[test]
    fn flavors_resolve_to_backends() {
        let openai = LlmBackend::from_flavor("openai", &config());
        assert!(matches!(openai, Ok(LlmBackend::OpenAi(_))));
        let anthropic = LlmBackend::from_flavor("Anthropic", &config());
        assert!(matches!(anthropic, Ok(LlmBackend::Anthropic(_))));
        assert!(LlmBackend::from_flavor("carrier-pigeon", &config()).is_err());
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_backend_error() {
        let backend = OpenAiBackend::new(&config());
        let prompt = RenderedPrompt {
            system: String::from("s"),
            user: String::from("u"),
        };
        let result = backend.complete(&prompt).await;
        assert!(matches!(result, Err(RunnerError::Backend(_))));
    }
}
