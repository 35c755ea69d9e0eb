use crate::config::Config;
use crate::error::ChatError;
use crate::ollama::{ChatBackend, OllamaClient};
use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use tracing::{debug, info, warn};

/// Reply given for blank input instead of calling the service.
pub const EMPTY_PROMPT_REPLY: &str = "Please enter a message.";

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation, as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Conversation state owned by one client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    endpoint: String,
    active_model: Option<String>,
    history: Vec<Turn>,
}

impl Session {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            active_model: None,
            history: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn active_model(&self) -> Option<&str> {
        self.active_model.as_deref()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }
}

/// A single chat session against an inference service.
///
/// History only ever holds complete user/assistant exchanges once a call
/// returns: a failed `send_message` removes the user turn it appended.
pub struct ConversationClient<B = OllamaClient> {
    backend: B,
    session: Session,
}

impl ConversationClient<OllamaClient> {
    /// Client over HTTP; selects `config.default_model` if one is set
    pub fn new(config: &Config) -> Self {
        let mut client = Self::with_backend(OllamaClient::new(config));
        if let Some(model) = &config.default_model {
            client.session.active_model = Some(model.clone());
        }
        client
    }

    /// Like `new`, then falls back to the first discovered model.
    ///
    /// An unreachable service is not an error here; the session just starts
    /// without a model.
    pub async fn connect(config: &Config) -> Self {
        let mut client = Self::new(config);
        if let Err(e) = client.auto_select_model().await {
            warn!(error = %e, "model auto-selection failed");
        }
        client
    }
}

impl<B: ChatBackend> ConversationClient<B> {
    pub fn with_backend(backend: B) -> Self {
        let session = Session::new(backend.endpoint());
        Self { backend, session }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn endpoint(&self) -> &str {
        self.session.endpoint()
    }

    pub fn active_model(&self) -> Option<&str> {
        self.session.active_model()
    }

    pub fn history(&self) -> &[Turn] {
        self.session.history()
    }

    /// List the models the service offers; leaves the session untouched
    pub async fn discover_models(&self) -> Result<Vec<String>, ChatError> {
        self.backend.list_models().await
    }

    /// Select the first discovered model when none is active.
    ///
    /// Returns the model now active, if any.
    pub async fn auto_select_model(&mut self) -> Result<Option<&str>, ChatError> {
        if self.session.active_model.is_none() {
            let models = self.discover_models().await?;
            if let Some(first) = models.into_iter().next() {
                self.select_model(first);
            }
        }
        Ok(self.active_model())
    }

    /// Switch models. History is always cleared, even when `name` is already active.
    pub fn select_model(&mut self, name: impl Into<String>) {
        let name = name.into();
        info!(model = %name, "selecting model");
        self.session.active_model = Some(name);
        self.clear_history();
    }

    pub fn clear_history(&mut self) {
        if !self.session.history.is_empty() {
            info!(turns = self.session.history.len(), "clearing history");
        }
        self.session.history.clear();
    }

    /// Send one user message and return the assistant's reply.
    ///
    /// Blank input gets `EMPTY_PROMPT_REPLY` without touching history or the
    /// network. On success exactly two turns are appended; on failure history
    /// is left as it was before the call.
    pub async fn send_message(&mut self, text: &str) -> Result<String, ChatError> {
        if text.trim().is_empty() {
            return Ok(EMPTY_PROMPT_REPLY.to_string());
        }

        let model = self
            .session
            .active_model
            .clone()
            .ok_or(ChatError::NoModelSelected)?;

        self.session.history.push(Turn::user(text));
        debug!(model = %model, turns = self.session.history.len(), "sending message");

        let result = self.backend.chat(&model, &self.session.history).await;
        match result {
            Ok(reply) => {
                self.session.history.push(Turn::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.session.history.pop();
                warn!(model = %model, error = %e, "chat request failed, user turn rolled back");
                Err(e)
            }
        }
    }
}
