// src/memory/llm_provider.rs
// Text generation backends behind one trait.
// Gemini is the default; Ollama serves local models.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A text generation backend. One prompt in, one completion out.
#[async_trait::async_trait]
pub trait LLMProvider: Send + Sync {
    /// Single-turn generation; any conversation memory is already in `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, LLMError>;
    fn model_name(&self) -> &str;
}

/// Which generation backend to build
#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum LLMConfig {
    /// Gemini via the Generative Language API
    Gemini {
        base_url: String,
        api_key: String,
        model: String,
    },
    /// Any local model served by Ollama
    Ollama { ollama_url: String, model: String },
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self::Ollama {
            ollama_url: "http://localhost:11434".to_string(),
            model: "phi:latest".to_string(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum LLMError {
    #[error("LLM connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, LLMError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LLMError::ConfigError(format!("failed to build HTTP client: {}", e)))
}

/// `/api/generate` on a local Ollama server
pub struct OllamaProvider {
    url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaProvider {
    pub fn new(url: String, model: String, timeout: Duration) -> Result<Self, LLMError> {
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            model,
            client: build_client(timeout)?,
        })
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        let health_url = format!("{}/api/tags", self.url);
        self.client.get(&health_url).send().await.map_err(|e| {
            LLMError::ConnectionFailed(format!("Cannot reach Ollama at {}: {}", self.url, e))
        })?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl LLMProvider for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Generating with Ollama");

        let url = format!("{}/api/generate", self.url);
        let req = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| LLMError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::GenerationFailed(format!("{}: {}", status, body)));
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;
        let text = parsed.response.trim().to_string();

        info!(model = %self.model, response_len = text.len(), "Generation complete");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Gemini `generateContent` provider
pub struct GeminiProvider {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String, LLMError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::InvalidResponse("no candidates returned".to_string()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(LLMError::GenerationFailed(format!(
                "empty response (finish reason: {})",
                reason
            )));
        }
        Ok(text.trim().to_string())
    }
}

impl GeminiProvider {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LLMError> {
        if api_key.trim().is_empty() {
            return Err(LLMError::ConfigError("missing Gemini API key".to_string()));
        }
        let endpoint = format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        );
        Ok(Self {
            endpoint,
            api_key,
            model,
            client: build_client(timeout)?,
        })
    }
}

#[async_trait::async_trait]
impl LLMProvider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Generating with Gemini");

        let req = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| LLMError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::GenerationFailed(format!("{}: {}", status, body)));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;
        let text = parsed.into_text()?;

        info!(model = %self.model, response_len = text.len(), "Generation complete");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Build the configured provider. An unreachable Ollama only logs a warning.
pub async fn create_llm_provider(
    config: LLMConfig,
    timeout: Duration,
) -> Result<Box<dyn LLMProvider>, LLMError> {
    match config {
        LLMConfig::Gemini {
            base_url,
            api_key,
            model,
        } => {
            info!("Initializing Gemini model {}", model);
            Ok(Box::new(GeminiProvider::new(&base_url, api_key, model, timeout)?))
        }
        LLMConfig::Ollama { ollama_url, model } => {
            info!("Initializing {} via Ollama at {}", model, ollama_url);
            let provider = OllamaProvider::new(ollama_url, model, timeout)?;
            if let Err(e) = provider.health_check().await {
                warn!("Ollama health check failed, make sure it's running (ollama serve): {}", e);
            }
            Ok(Box::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        match LLMConfig::default() {
            LLMConfig::Ollama { model, .. } => assert_eq!(model, "phi:latest"),
            _ => panic!("Default should be Ollama"),
        }
    }

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new(
            "http://localhost:11434/".to_string(),
            "phi:latest".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(provider.model_name(), "phi:latest");
        assert_eq!(provider.url, "http://localhost:11434");
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let result = GeminiProvider::new(
            "https://example.test",
            "  ".to_string(),
            "gemini-2.0-flash".to_string(),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(LLMError::ConfigError(_))));
    }

    #[test]
    fn test_gemini_response_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"there"}]},"finishReason":"STOP"}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_text().unwrap(), "Hello there");
    }

    #[test]
    fn test_gemini_blocked_response() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(body).unwrap();
        let err = parsed.into_text().unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_gemini_no_candidates() {
        let parsed: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            parsed.into_text(),
            Err(LLMError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_llm_error_display() {
        let err = LLMError::ConnectionFailed("test".to_string());
        assert!(format!("{}", err).contains("connection failed"));
    }
}
