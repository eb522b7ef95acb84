use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::LlmConfig;
use crate::fetch::decode::walk_json_path;
use crate::fetch::{Credential, HttpRequest, HttpTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            prompt: prompt.into(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("model API returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("model response could not be decoded: {0}")]
    Decode(String),
    #[error("model returned no text")]
    Empty,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError>;
}

/// Gemini `generateContent` over the shared transport. The key travels in a
/// header so it never appears in a URL.
pub struct GeminiClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    api_key: Credential,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &LlmConfig, api_key: Credential) -> Self {
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: config.request_timeout,
        }
    }

    fn request_body(request: &GenerationRequest) -> Value {
        let mut body = json!({
            "contents": [
                { "role": "user", "parts": [ { "text": request.prompt } ] }
            ]
        });
        if let Some(instruction) = &request.system_instruction {
            body["systemInstruction"] = json!({ "parts": [ { "text": instruction } ] });
        }
        body
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let http = HttpRequest::post_json(url, &Self::request_body(&request))
            .with_header("x-goog-api-key", self.api_key.expose())
            .with_timeout(self.timeout);

        debug!("Calling model {} ({} prompt chars)", request.model, request.prompt.len());

        let reply = tokio::time::timeout(self.timeout, self.transport.execute(http))
            .await
            .map_err(|_| LlmError::Transport(format!("timed out after {} s", self.timeout.as_secs())))?
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        let payload: Option<Value> = serde_json::from_str(&reply.body).ok();

        if !reply.is_success() {
            let message = payload
                .as_ref()
                .and_then(|payload| walk_json_path(payload, &["error", "message"]))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", reply.status));
            return Err(LlmError::Status {
                status: reply.status,
                message,
            });
        }

        let payload = payload.ok_or_else(|| LlmError::Decode("body is not JSON".to_string()))?;
        response_text(&payload)
    }
}

fn response_text(payload: &Value) -> Result<String, LlmError> {
    let parts = walk_json_path(payload, &["candidates", "0", "content", "parts"])
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::Decode("missing candidates[0].content.parts".to_string()))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        Err(LlmError::Empty)
    } else {
        Ok(text)
    }
}
