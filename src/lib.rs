//! Conversation client for a local Ollama-compatible inference server.
//!
//! [`ConversationClient`] owns one chat session: it discovers models, keeps
//! a linear history of user/assistant turns, and sends that history with
//! every message. Failures come back as [`ChatError`] with the history
//! already restored to its pre-call state.
//!
//! ```ignore
//! use ollama_chat::{Config, ConversationClient};
//!
//! let mut client = ConversationClient::connect(&Config::load()?).await;
//! let reply = client.send_message("Say hi").await?;
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod ollama;

pub use config::{Config, DEFAULT_ENDPOINT};
pub use conversation::{ConversationClient, EMPTY_PROMPT_REPLY, Role, Session, Turn};
pub use error::ChatError;
pub use ollama::{ChatBackend, ModelDescriptor, OllamaClient};
