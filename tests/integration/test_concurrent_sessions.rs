//! Integration tests for several sessions sharing one server.

mod common;

use common::{ProviderMode, TestApp};
use futures::future::join_all;
use reqwest::StatusCode;
use serde_json::json;

/// Sessions running at the same time never see each other's state.
#[tokio::test]
async fn test_parallel_sessions_are_isolated() {
    let app = TestApp::spawn(ProviderMode::Healthy).await;

    let sessions = join_all((0..8).map(|_| app.new_session())).await;

    let results = join_all(sessions.iter().enumerate().map(|(i, session)| {
        let app = &app;
        async move {
            let topic = format!("Topic {i}");
            let (status, _) = app
                .act(
                    session,
                    json!({"action": "generate_question", "topic": topic}),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            if i % 2 == 0 {
                let (status, _) = app
                    .act(
                        session,
                        json!({"action": "get_feedback", "answer": "lst[::-1]"}),
                    )
                    .await;
                assert_eq!(status, StatusCode::OK);
            }
            (i, app.view(session).await)
        }
    }))
    .await;

    for (i, view) in results {
        assert_eq!(view["topic"], format!("Topic {i}"));
        if i % 2 == 0 {
            assert_eq!(view["progressLabel"], "Progress: 1/1 correct answers");
        } else {
            assert!(view["progress"].is_null());
        }
    }
}

/// Actions sent at once to the same session are applied one after another.
#[tokio::test]
async fn test_same_session_actions_are_serialized() {
    let app = TestApp::spawn(ProviderMode::Healthy).await;
    let session = app.new_session().await;
    app.act(
        &session,
        json!({"action": "generate_question", "topic": "Python"}),
    )
    .await;

    let statuses = join_all((0..6).map(|_| {
        app.act(
            &session,
            json!({"action": "get_feedback", "answer": "lst[::-1]"}),
        )
    }))
    .await;
    assert!(statuses.iter().all(|(status, _)| *status == StatusCode::OK));

    let view = app.view(&session).await;
    assert_eq!(view["progress"]["attempted"], 6);
    assert_eq!(view["progress"]["correct"], 6);
}
