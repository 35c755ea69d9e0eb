use crate::config::Config;
use crate::conversation::Turn;
use crate::error::ChatError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Transport to an inference service.
///
/// Implementations are stateless: the caller owns the conversation and
/// passes the full message list on every call.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Base address of the service
    fn endpoint(&self) -> &str;

    /// Names of the models the service can run, in service order
    async fn list_models(&self) -> Result<Vec<String>, ChatError>;

    /// One non-streaming completion over `messages`.
    ///
    /// Returns `EmptyModelResponse` when the service answers without content.
    async fn chat(&self, model: &str, messages: &[Turn]) -> Result<String, ChatError>;
}

/// Body of `POST /api/chat`
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    stream: bool,
}

/// Response of `POST /api/chat`
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Response of `GET /api/tags`
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

/// A model as listed by the service; only the name is kept
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
}

/// Error body the service sends with non-2xx statuses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for an Ollama-compatible server
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    discovery_timeout: Duration,
    chat_timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url().to_string(),
            discovery_timeout: config.discovery_timeout(),
            chat_timeout: config.chat_timeout(),
        }
    }

    /// Stateless completion: `history` followed by one new user message.
    ///
    /// Nothing is recorded; callers that keep a conversation pass it back in.
    pub async fn complete(
        &self,
        model: &str,
        history: &[Turn],
        message: &str,
    ) -> Result<String, ChatError> {
        let mut messages = history.to_vec();
        messages.push(Turn::user(message));
        self.chat(model, &messages).await
    }

    fn unavailable(&self) -> ChatError {
        ChatError::ServiceUnavailable {
            endpoint: self.base_url.clone(),
        }
    }

    /// Map a transport error from the chat call; timeouts win over connect errors
    fn classify(&self, err: reqwest::Error) -> ChatError {
        if err.is_timeout() {
            ChatError::RequestTimedOut
        } else if err.is_connect() {
            self.unavailable()
        } else {
            ChatError::upstream(err.to_string())
        }
    }
}

/// Human-readable detail for a failed status, preferring the service's own message
fn status_detail(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => format!("{}: {}", status, parsed.error),
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => format!("{}: {}", status, body.trim()),
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn list_models(&self) -> Result<Vec<String>, ChatError> {
        let url = format!("{}/api/tags", self.base_url);
        debug!(%url, "listing models");

        // Every discovery failure, timeouts and bad responses included, is reported the same way
        let response = self
            .client
            .get(&url)
            .timeout(self.discovery_timeout)
            .send()
            .await
            .map_err(|_| self.unavailable())?;

        let status = response.status();
        let body = response.text().await.map_err(|_| self.unavailable())?;

        if !status.is_success() {
            warn!(%url, detail = %status_detail(status, &body), "model listing failed");
            return Err(self.unavailable());
        }

        let tags: TagsResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(%url, error = %e, "malformed model list");
            self.unavailable()
        })?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn chat(&self, model: &str, messages: &[Turn]) -> Result<String, ChatError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(%url, model, turns = messages.len(), "sending chat request");

        let payload = ChatRequest {
            model,
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.chat_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if status == StatusCode::NOT_FOUND {
            return Err(ChatError::ModelNotFound {
                model: model.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ChatError::upstream(status_detail(status, &body)));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            ChatError::upstream(format!("Malformed chat response from {}: {}", url, e))
        })?;

        let content = parsed
            .message
            .and_then(|m| m.content)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(ChatError::EmptyModelResponse);
        }

        Ok(content)
    }
}
