use thiserror::Error;

/// Failures surfaced by the conversation client.
///
/// Every variant is non-fatal to the session: history has already been
/// restored by the time one of these reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("No model selected. Please select a model first.")]
    NoModelSelected,

    #[error("Cannot connect to the inference service at {endpoint}. Ensure it's running: ollama serve")]
    ServiceUnavailable { endpoint: String },

    #[error("Request timed out. Model may be loading (first request can take 1-2 minutes).")]
    RequestTimedOut,

    #[error("Model '{model}' not found. Pull it with: ollama pull {model}")]
    ModelNotFound { model: String },

    #[error("Error: {detail}")]
    UpstreamError { detail: String },

    #[error("Empty response from model")]
    EmptyModelResponse,
}

impl ChatError {
    pub fn upstream(detail: impl Into<String>) -> Self {
        ChatError::UpstreamError {
            detail: detail.into(),
        }
    }

    /// Whether sending the same message again can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChatError::RequestTimedOut
                | ChatError::ServiceUnavailable { .. }
                | ChatError::EmptyModelResponse
        )
    }
}
