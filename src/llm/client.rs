//! `LlmError` and the shared OpenAI-compatible HTTP client.
//!
//! [`OpenAiClient`] speaks two endpoints:
//! * `/v1/chat/completions` (sentence generation, answer scoring)
//! * `/v1/audio/speech` (text-to-speech, mp3 bytes)
//!
//! All connection details come from [`LlmConfig`]; nothing is hardcoded.

use std::time::Duration;

use thiserror::Error;

use crate::config::LlmConfig;
use crate::llm::prompt::Prompt;

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors from any remote provider call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP transport, connection, or non-success status.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be parsed as expected.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The provider returned no usable content.
    #[error("provider returned an empty response")]
    EmptyResponse,

    /// Neither the config nor `OPENAI_API_KEY` provides a key.
    #[error("no API key configured (set llm.api_key or OPENAI_API_KEY)")]
    MissingApiKey,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAiClient
// ---------------------------------------------------------------------------

/// Thin wrapper over `reqwest::Client` for OpenAI-compatible providers.
///
/// Cheap to clone; the inner `reqwest::Client` is reference counted.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: LlmConfig,
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.config.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Build a client from application config.
    ///
    /// The key is taken from `config.api_key`, else from `OPENAI_API_KEY`.
    /// A missing key is not an error here: local providers need none.
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().unwrap_or_else(|_| reqwest::Client::new());

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty());

        Self {
            http,
            config: config.clone(),
            api_key,
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The hosted OpenAI API always needs a key; other providers may not.
    fn ensure_key(&self) -> Result<(), LlmError> {
        if self.api_key.is_none() && self.config.base_url.contains("api.openai.com") {
            return Err(LlmError::MissingApiKey);
        }
        Ok(())
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        let req = self.http.post(url);
        // Attach Authorization header only when a non-empty key exists.
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// Run one chat completion and return the trimmed message content.
    ///
    /// With `json_mode` the provider is asked for a JSON object response.
    pub async fn chat(&self, model: &str, prompt: &Prompt, json_mode: bool) -> Result<String, LlmError> {
        self.ensure_key()?;

        let mut body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user",   "content": prompt.user   }
            ],
            "stream": false
        });
        if json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let response = self
            .post("/v1/chat/completions")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(LlmError::EmptyResponse)?
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(content)
    }

    /// Synthesize `input` with `voice` at `speed` and return mp3 bytes.
    pub async fn speech(&self, input: &str, voice: &str, speed: f32) -> Result<Vec<u8>, LlmError> {
        self.ensure_key()?;

        let body = serde_json::json!({
            "model": self.config.tts_model,
            "voice": voice,
            "input": input,
            "speed": speed,
            "response_format": "mp3"
        });

        let response = self
            .post("/v1/audio/speech")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(bytes.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            base_url: "http://localhost:11434/".into(),
            api_key: api_key.map(str::to_string),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn explicit_key_is_used() {
        let client = OpenAiClient::from_config(&make_config(Some("sk-test-1234")));
        assert!(client.has_api_key());
    }

    #[test]
    fn builds_with_timeout() {
        let mut config = make_config(Some("sk"));
        config.timeout_secs = Some(5);
        let client = OpenAiClient::from_config(&config);
        assert_eq!(client.config().timeout_secs, Some(5));
    }

    #[tokio::test]
    async fn hosted_api_without_key_fails_fast() {
        let mut client = OpenAiClient::from_config(&LlmConfig::default());
        client.api_key = None;
        let prompt = Prompt::scoring("a", "b", crate::locale::UiLanguage::English);
        let err = client.chat("gpt-4o-mini", &prompt, true).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[test]
    fn debug_output_hides_key() {
        let client = OpenAiClient::from_config(&make_config(Some("sk-secret")));
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("has_api_key"));
    }
}
