//! Shared harness: a fake chat-completion provider and a live QuestGenie server.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use questgenie_core::{create_router, AppState, Config};
use questgenie_llm::OpenAiClient;
use serde_json::{json, Value};

/// What the fake provider saw.
#[derive(Debug, Default)]
pub struct ProviderLog {
    pub prompts: Vec<String>,
    pub models: Vec<String>,
    pub authorized: Vec<bool>,
}

/// How the fake provider behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// Answers every prompt with a canned reply chosen by template.
    Healthy,
    /// Fails every call with the given status.
    Failing(u16),
}

#[derive(Clone)]
struct Provider {
    mode: ProviderMode,
    log: Arc<Mutex<ProviderLog>>,
}

/// Path to the fixtures directory.
pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Canned reply for a prompt, keyed on the template it was built from.
pub fn reply_for(prompt: &str) -> String {
    if prompt.starts_with("Generate a") {
        "Write a Python function that reverses a list.".to_string()
    } else if prompt.starts_with("Provide a hint") {
        "Think about slicing with a negative step.".to_string()
    } else if prompt.starts_with("User doesn't know") {
        "It's okay not to know! The answer is lst[::-1].".to_string()
    } else if prompt.starts_with("Provide precise") {
        if prompt.contains("[::-1]") {
            "Correct! Slicing with a step of -1 reverses the list.".to_string()
        } else {
            "Wrong: this mutates the input in place.".to_string()
        }
    } else if prompt.starts_with("Write an optimal code solution") {
        "def reverse(lst):\n    return lst[::-1]".to_string()
    } else {
        "unexpected prompt".to_string()
    }
}

async fn chat_completions(
    State(provider): State<Provider>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let prompt = body["messages"][0]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer integration-key");

    if let Ok(mut log) = provider.log.lock() {
        log.prompts.push(prompt.clone());
        log.models
            .push(body["model"].as_str().unwrap_or_default().to_string());
        log.authorized.push(authorized);
    }

    match provider.mode {
        ProviderMode::Healthy => (
            StatusCode::OK,
            Json(json!({
                "choices": [{"message": {"role": "assistant", "content": reply_for(&prompt)}}]
            })),
        ),
        ProviderMode::Failing(status) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({"error": {"message": "provider unavailable"}})),
        ),
    }
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });
    addr
}

/// A running QuestGenie server backed by a fake provider.
pub struct TestApp {
    pub base: String,
    pub http: reqwest::Client,
    pub provider_log: Arc<Mutex<ProviderLog>>,
}

impl TestApp {
    /// Starts a fake provider and a QuestGenie server talking to it.
    pub async fn spawn(mode: ProviderMode) -> Self {
        let provider_log = Arc::new(Mutex::new(ProviderLog::default()));
        let provider = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(Provider {
                mode,
                log: Arc::clone(&provider_log),
            });
        let provider_addr = serve(provider).await;

        let config = Config {
            base_url: format!("http://{provider_addr}/v1"),
            ..Config::default()
        };
        let client = OpenAiClient::new(config.client_settings("integration-key".to_string()));
        let app_addr = serve(create_router(AppState::new(config, Arc::new(client)))).await;

        Self {
            base: format!("http://{app_addr}/api"),
            http: reqwest::Client::new(),
            provider_log,
        }
    }

    /// Opens a session and returns its id.
    pub async fn new_session(&self) -> String {
        let response = self
            .http
            .post(format!("{}/sessions", self.base))
            .send()
            .await
            .expect("Failed to create session");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid session body");
        body["sessionId"]
            .as_str()
            .expect("Missing session id")
            .to_string()
    }

    /// Sends an action and returns status and body.
    pub async fn act(&self, session: &str, action: Value) -> (reqwest::StatusCode, Value) {
        let response = self
            .http
            .post(format!("{}/sessions/{session}/actions", self.base))
            .json(&action)
            .send()
            .await
            .expect("Failed to send action");
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Current view of a session.
    pub async fn view(&self, session: &str) -> Value {
        self.http
            .get(format!("{}/sessions/{session}", self.base))
            .send()
            .await
            .expect("Failed to fetch session")
            .json()
            .await
            .expect("Invalid view body")
    }

    /// Number of calls the fake provider received.
    pub fn provider_calls(&self) -> usize {
        self.provider_log
            .lock()
            .map(|log| log.prompts.len())
            .unwrap_or_default()
    }

    /// Prompts the fake provider received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.provider_log
            .lock()
            .map(|log| log.prompts.clone())
            .unwrap_or_default()
    }
}
