//! LLM Client: the single point of entry for calls to the text-generation server.
//!
//! Speaks the OpenAI-compatible chat-completions protocol, which local runtimes
//! (llama.cpp server, vLLM, TGI, Ollama) expose. The model is addressed by the
//! `MODEL_URL` / `MODEL_NAME` pair supplied at startup.
//!
//! No retries and no parsing of the generated text happen here.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Generation returned no candidate")]
    EmptyContent,
}

/// The generation capability: one system directive plus one user message in,
/// free-form text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError>;

    /// Identifier of the backing model, for logs.
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Text of the first candidate, if the server produced one.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// HTTP client for the generation server. Built once at startup and shared.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(base_url: &str, model: String, api_key: Option<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: chat_endpoint(base_url),
            model,
            api_key,
        })
    }

    /// Makes a raw call to the generation server, returning the full response object.
    pub async fn call(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<ChatResponse, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            max_tokens,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let mut request = self.client.post(&self.endpoint).json(&request_body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse error message
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response.json().await?;

        if let Some(usage) = &chat_response.usage {
            debug!(
                "Generation succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(chat_response)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let response = self.call(system, user, max_tokens).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Accepts either a bare server root or a URL already ending in the chat path.
fn chat_endpoint(base_url: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    if base.ends_with(CHAT_COMPLETIONS_PATH) {
        base.to_string()
    } else if let Some(root) = base.strip_suffix("/v1") {
        format!("{root}{CHAT_COMPLETIONS_PATH}")
    } else {
        format!("{base}{CHAT_COMPLETIONS_PATH}")
    }
}
