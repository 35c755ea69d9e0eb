//! Session behaviour of `ConversationClient` against a scripted backend.
//!
//! The backend replays queued results and records every call, so these tests
//! can assert both what the session sent and how history looks afterwards.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use ollama_chat::{ChatBackend, ChatError, ConversationClient, EMPTY_PROMPT_REPLY, Turn};

// ============================================================================
// Scripted backend
// ============================================================================

struct ScriptedBackend {
    models: Result<Vec<String>, ChatError>,
    replies: Mutex<VecDeque<Result<String, ChatError>>>,
    requests: Mutex<Vec<(String, Vec<Turn>)>>,
    list_calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(models: &[&str]) -> Self {
        Self {
            models: Ok(models.iter().map(|m| m.to_string()).collect()),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        }
    }

    fn unreachable() -> Self {
        Self {
            models: Err(ChatError::ServiceUnavailable {
                endpoint: "http://mock".to_string(),
            }),
            ..Self::new(&[])
        }
    }

    fn reply(self, result: Result<&str, ChatError>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(result.map(|s| s.to_string()));
        self
    }

    fn chat_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> (String, Vec<Turn>) {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn endpoint(&self) -> &str {
        "http://mock"
    }

    async fn list_models(&self) -> Result<Vec<String>, ChatError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.models.clone()
    }

    async fn chat(&self, model: &str, messages: &[Turn]) -> Result<String, ChatError> {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ChatError::EmptyModelResponse))
    }
}

fn client_with(backend: ScriptedBackend, model: &str) -> ConversationClient<ScriptedBackend> {
    let mut client = ConversationClient::with_backend(backend);
    client.select_model(model);
    client
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_discover_select_send_then_timeout() {
    let backend = ScriptedBackend::new(&["llama3.2:latest", "mistral:latest"])
        .reply(Ok("Hi there!"))
        .reply(Err(ChatError::RequestTimedOut));
    let mut client = ConversationClient::with_backend(backend);

    let models = client.discover_models().await.unwrap();
    assert_eq!(models, vec!["llama3.2:latest", "mistral:latest"]);

    client.select_model("llama3.2:latest");
    let reply = client.send_message("Say hi").await.unwrap();
    assert_eq!(reply, "Hi there!");
    assert_eq!(
        client.history(),
        &[Turn::user("Say hi"), Turn::assistant("Hi there!")]
    );

    let err = client.send_message("And again?").await.unwrap_err();
    assert_eq!(err, ChatError::RequestTimedOut);
    assert_eq!(client.history().len(), 2);
    assert_eq!(
        client.history(),
        &[Turn::user("Say hi"), Turn::assistant("Hi there!")]
    );
}

#[tokio::test]
async fn test_no_model_selected_makes_no_call() {
    let mut client = ConversationClient::with_backend(ScriptedBackend::new(&["llama3.2:latest"]));

    let err = client.send_message("hello").await.unwrap_err();
    assert_eq!(err, ChatError::NoModelSelected);
    assert!(client.history().is_empty());
    assert_eq!(client.backend().chat_calls(), 0);
    assert_eq!(client.backend().list_calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// sendMessage
// ============================================================================

#[tokio::test]
async fn test_blank_input_is_a_soft_reply() {
    let backend = ScriptedBackend::new(&[]).reply(Ok("first"));
    let mut client = client_with(backend, "llama3.2:latest");
    client.send_message("hello").await.unwrap();
    let before = client.history().to_vec();

    for blank in ["", "   ", "\n\t  \n"] {
        let reply = client.send_message(blank).await.unwrap();
        assert_eq!(reply, EMPTY_PROMPT_REPLY);
        assert_eq!(client.history(), before.as_slice());
    }
    assert_eq!(client.backend().chat_calls(), 1);
}

#[tokio::test]
async fn test_blank_input_without_model_is_still_soft() {
    let mut client = ConversationClient::with_backend(ScriptedBackend::new(&[]));
    assert_eq!(client.send_message(" ").await.unwrap(), EMPTY_PROMPT_REPLY);
}

#[tokio::test]
async fn test_request_carries_model_and_full_history() {
    let backend = ScriptedBackend::new(&[])
        .reply(Ok("Hi there!"))
        .reply(Ok("Paris."));
    let mut client = client_with(backend, "llama3.2:latest");

    client.send_message("Say hi").await.unwrap();
    client.send_message("Capital of France?").await.unwrap();

    let (model, messages) = client.backend().last_request();
    assert_eq!(model, "llama3.2:latest");
    assert_eq!(
        messages,
        vec![
            Turn::user("Say hi"),
            Turn::assistant("Hi there!"),
            Turn::user("Capital of France?"),
        ]
    );
    assert_eq!(client.history().len(), 4);
}

#[tokio::test]
async fn test_every_failure_rolls_back() {
    let failures = vec![
        ChatError::RequestTimedOut,
        ChatError::ServiceUnavailable {
            endpoint: "http://mock".to_string(),
        },
        ChatError::ModelNotFound {
            model: "llama3.2:latest".to_string(),
        },
        ChatError::upstream("500 Internal Server Error: boom"),
        ChatError::EmptyModelResponse,
    ];

    let mut backend = ScriptedBackend::new(&[]).reply(Ok("Hi there!"));
    for failure in &failures {
        backend = backend.reply(Err(failure.clone()));
    }
    let mut client = client_with(backend, "llama3.2:latest");
    client.send_message("Say hi").await.unwrap();
    let before = client.history().to_vec();

    for expected in failures {
        let err = client.send_message("this will fail").await.unwrap_err();
        assert_eq!(err, expected);
        assert_eq!(client.history(), before.as_slice());
    }
}

#[tokio::test]
async fn test_retry_after_failure_pairs_normally() {
    let backend = ScriptedBackend::new(&[])
        .reply(Err(ChatError::RequestTimedOut))
        .reply(Ok("Loaded now."));
    let mut client = client_with(backend, "llama3.2:latest");

    assert!(client.send_message("hello").await.is_err());
    assert!(client.history().is_empty());

    let reply = client.send_message("hello").await.unwrap();
    assert_eq!(reply, "Loaded now.");
    assert_eq!(
        client.history(),
        &[Turn::user("hello"), Turn::assistant("Loaded now.")]
    );

    // The retry must not carry the rolled-back turn
    let (_, messages) = client.backend().last_request();
    assert_eq!(messages, vec![Turn::user("hello")]);
}

// ============================================================================
// selectModel / clearHistory
// ============================================================================

#[tokio::test]
async fn test_select_model_clears_history_even_for_same_model() {
    let backend = ScriptedBackend::new(&[]).reply(Ok("one")).reply(Ok("two"));
    let mut client = client_with(backend, "llama3.2:latest");

    client.send_message("a").await.unwrap();
    client.select_model("mistral:latest");
    assert_eq!(client.active_model(), Some("mistral:latest"));
    assert!(client.history().is_empty());

    client.send_message("b").await.unwrap();
    client.select_model("mistral:latest");
    assert_eq!(client.active_model(), Some("mistral:latest"));
    assert!(client.history().is_empty());
}

#[tokio::test]
async fn test_clear_history_is_idempotent() {
    let backend = ScriptedBackend::new(&[]).reply(Ok("one"));
    let mut client = client_with(backend, "llama3.2:latest");
    client.send_message("a").await.unwrap();

    client.clear_history();
    let once = client.session().clone();
    client.clear_history();
    assert_eq!(client.session(), &once);
    assert!(client.history().is_empty());
    assert_eq!(client.active_model(), Some("llama3.2:latest"));
}

// ============================================================================
// Discovery
// ============================================================================

#[tokio::test]
async fn test_discover_leaves_session_untouched() {
    let backend = ScriptedBackend::new(&["a", "b"]).reply(Ok("one"));
    let mut client = client_with(backend, "b");
    client.send_message("x").await.unwrap();
    let before = client.session().clone();

    client.discover_models().await.unwrap();
    assert_eq!(client.session(), &before);
}

#[tokio::test]
async fn test_discover_failure_is_service_unavailable() {
    let client = ConversationClient::with_backend(ScriptedBackend::unreachable());
    let err = client.discover_models().await.unwrap_err();
    assert!(matches!(err, ChatError::ServiceUnavailable { .. }));
    assert!(err.to_string().contains("ollama serve"));
}

#[tokio::test]
async fn test_auto_select_picks_first_model() {
    let mut client =
        ConversationClient::with_backend(ScriptedBackend::new(&["llama3.2:latest", "mistral:latest"]));
    let selected = client.auto_select_model().await.unwrap();
    assert_eq!(selected, Some("llama3.2:latest"));
}

#[tokio::test]
async fn test_auto_select_keeps_existing_choice() {
    let mut client = client_with(ScriptedBackend::new(&["llama3.2:latest"]), "mistral:latest");
    let selected = client.auto_select_model().await.unwrap();
    assert_eq!(selected, Some("mistral:latest"));
    assert_eq!(client.backend().list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_auto_select_with_no_models_or_no_service() {
    let mut client = ConversationClient::with_backend(ScriptedBackend::new(&[]));
    assert_eq!(client.auto_select_model().await.unwrap(), None);

    let mut client = ConversationClient::with_backend(ScriptedBackend::unreachable());
    assert!(client.auto_select_model().await.is_err());
    assert_eq!(client.active_model(), None);
}
