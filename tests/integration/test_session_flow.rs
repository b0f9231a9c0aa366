//! End-to-end tests for a single QuestGenie session.
//!
//! Each test runs a real QuestGenie server whose completion client talks to
//! an in-process fake of the chat-completion API.

mod common;

use common::{fixture_path, ProviderMode, TestApp};
use questgenie_core::Config;
use reqwest::StatusCode;
use serde_json::json;

/// Tests that the sample config loads successfully.
#[test]
fn test_sample_config_loads() {
    let config_path = fixture_path().join("questgenie.json");
    assert!(
        config_path.exists(),
        "Config fixture not found at: {config_path:?}"
    );

    let config = Config::load_from_file(&config_path).expect("Failed to load config");

    assert_eq!(config.model, "gpt-4o-mini");
    assert_eq!(config.max_tokens, 512);
    assert_eq!(config.api_key_env, "QUESTGENIE_TEST_KEY");
    assert_eq!(config.port, 8600);
    // Not in the file
    assert_eq!(config.host, "127.0.0.1");
}

/// Walks through question, hint, code and two feedback rounds.
#[tokio::test]
async fn test_full_question_round() {
    let app = TestApp::spawn(ProviderMode::Healthy).await;
    let session = app.new_session().await;

    let (status, body) = app
        .act(
            &session,
            json!({"action": "generate_question", "topic": "Python", "difficulty": "hard", "question_type": "Core"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["view"]["question"],
        "Write a Python function that reverses a list."
    );
    assert_eq!(
        body["view"]["questionTypes"],
        json!(["Syntax", "Real-World Problems", "Core"])
    );

    let (status, body) = app.act(&session, json!({"action": "show_hint"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notice"]["message"], "Hint Generated!");
    assert_eq!(body["view"]["hint"], "Think about slicing with a negative step.");

    let (status, body) = app.act(&session, json!({"action": "generate_code"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"]["generatedCode"]["language"], "python");

    let (_, body) = app
        .act(
            &session,
            json!({"action": "get_feedback", "answer": "lst.reverse()"}),
        )
        .await;
    assert_eq!(body["view"]["progressLabel"], "Progress: 0/1 correct answers");

    let (_, body) = app
        .act(
            &session,
            json!({"action": "get_feedback", "answer": "lst[::-1]"}),
        )
        .await;
    assert_eq!(body["view"]["progress"]["correct"], 1);
    assert_eq!(body["view"]["progress"]["attempted"], 2);
    assert_eq!(body["view"]["progressLabel"], "Progress: 1/2 correct answers");

    let prompts = app.prompts();
    assert_eq!(prompts.len(), 5);
    assert_eq!(
        prompts[0],
        "Generate a Hard level Core question on the topic of Python."
    );
    assert!(prompts[1].contains("'Write a Python function that reverses a list.'"));

    let log = app.provider_log.lock().expect("provider log poisoned");
    assert!(log.authorized.iter().all(|ok| *ok));
    assert!(log.models.iter().all(|m| m == "gpt-4o-mini"));
}

/// A new question wipes the hint, code, answer and feedback of the old one.
#[tokio::test]
async fn test_new_question_resets_question_state() {
    let app = TestApp::spawn(ProviderMode::Healthy).await;
    let session = app.new_session().await;

    app.act(
        &session,
        json!({"action": "generate_question", "topic": "Algorithms"}),
    )
    .await;
    app.act(&session, json!({"action": "show_hint"})).await;
    app.act(&session, json!({"action": "get_feedback", "answer": "idk"}))
        .await;

    let before = app.view(&session).await;
    assert!(before["hint"].is_string());
    assert!(before["feedback"].is_string());

    let (status, body) = app
        .act(
            &session,
            json!({"action": "generate_question", "topic": "Algorithms", "difficulty": "expert"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let view = &body["view"];
    assert!(view["hint"].is_null());
    assert!(view["generatedCode"].is_null());
    assert!(view["lastAnswer"].is_null());
    assert!(view["feedback"].is_null());
    assert_eq!(view["progress"]["attempted"], 1);
}

/// Refused and failed actions never reach the provider or change the session.
#[tokio::test]
async fn test_refusals_leave_session_unchanged() {
    let app = TestApp::spawn(ProviderMode::Healthy).await;
    let session = app.new_session().await;
    let initial = app.view(&session).await;

    let (status, body) = app.act(&session, json!({"action": "show_hint"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["level"], "warning");

    let (status, body) = app
        .act(&session, json!({"action": "generate_question", "topic": "  "}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "topic");

    let (status, body) = app
        .act(
            &session,
            json!({"action": "generate_question", "topic": "Statistics", "question_type": "Poetry"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "question_type");

    assert_eq!(app.provider_calls(), 0);
    assert_eq!(app.view(&session).await, initial);
}

/// Provider failures surface as one generic message and roll nothing forward.
#[tokio::test]
async fn test_provider_failure_is_generic_and_harmless() {
    for status_code in [401, 429, 503] {
        let app = TestApp::spawn(ProviderMode::Failing(status_code)).await;
        let session = app.new_session().await;
        let initial = app.view(&session).await;

        let (status, body) = app
            .act(
                &session,
                json!({"action": "generate_question", "topic": "Rust"}),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body["error"],
            "Could not generate a response. Please try again."
        );
        assert_eq!(body["level"], "error");
        assert_eq!(app.provider_calls(), 1);
        assert_eq!(app.view(&session).await, initial);
    }
}

/// The code page keeps its own problem and solution.
#[tokio::test]
async fn test_code_page_round_trip() {
    let app = TestApp::spawn(ProviderMode::Healthy).await;
    let session = app.new_session().await;

    app.act(
        &session,
        json!({"action": "generate_question", "topic": "Python"}),
    )
    .await;
    let question_view = app.view(&session).await;

    let (status, body) = app
        .act(&session, json!({"action": "switch_to_code_mode"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"]["title"], "CodeGuru");

    let (status, body) = app
        .act(
            &session,
            json!({"action": "generate_code", "problem": "Reverse a list", "language": "JavaScript"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let view = &body["view"];
    assert_eq!(view["codeProblem"], "Reverse a list");
    assert_eq!(view["codeLanguage"], "javascript");
    assert_eq!(view["codeSolution"]["language"], "javascript");
    assert_eq!(view["question"], question_view["question"]);
    assert!(view["generatedCode"].is_null());

    let prompts = app.prompts();
    assert!(prompts
        .last()
        .is_some_and(|p| p.starts_with("Write an optimal code solution in JavaScript")));

    let (status, _) = app
        .act(&session, json!({"action": "get_feedback", "answer": "x"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .act(&session, json!({"action": "switch_to_question_mode"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"]["title"], "QuestGenie");
    assert_eq!(body["view"]["codeSolution"]["code"], view["codeSolution"]["code"]);
}

/// Ending a session discards it.
#[tokio::test]
async fn test_deleted_session_is_gone() {
    let app = TestApp::spawn(ProviderMode::Healthy).await;
    let session = app.new_session().await;

    let response = app
        .http
        .delete(format!("{}/sessions/{session}", app.base))
        .send()
        .await
        .expect("Failed to delete session");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (status, _) = app.act(&session, json!({"action": "show_hint"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
