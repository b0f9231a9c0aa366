//! HTTP API for the QuestGenie front end.
//!
//! Each browser connection opens a session, sends its button presses as
//! actions, and closes the session when it goes away.
//!
//! # Endpoints
//!
//! - `GET /api/health` - Liveness check
//! - `GET /api/catalog` - Difficulties, languages and question types
//! - `GET /api/question-types?topic=` - Question types for one topic
//! - `POST /api/sessions` - Start a session
//! - `GET /api/sessions/:id` - Current view of a session
//! - `DELETE /api/sessions/:id` - End a session
//! - `POST /api/sessions/:id/actions` - Run an action
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use questgenie_core::{create_router, AppState, Config};
//! use questgenie_llm::OpenAiClient;
//!
//! # async fn example() {
//! let config = Config::default();
//! let client = OpenAiClient::new(config.client_settings("sk-...".to_string()));
//! let router = create_router(AppState::new(config, Arc::new(client)));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8501").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use questgenie_llm::CompletionService;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::controller::{dispatch, Action, Notice, NoticeLevel, View};
use crate::prompt::{question_types_for, Difficulty, Language, TOPIC_QUESTION_TYPES};
use crate::store::{SessionId, SessionStore};
use crate::{Config, QuizError};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response body for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// A selectable option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Value to send back in actions.
    pub value: String,
    /// Text shown to the user.
    pub label: String,
}

/// Question types offered for one topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicQuestionTypes {
    /// Topic name, matched exactly.
    pub topic: String,
    /// Available question types; empty means no selector.
    pub question_types: Vec<String>,
}

/// Response body for the catalog endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    /// Difficulty levels in selector order.
    pub difficulties: Vec<Choice>,
    /// Code languages in selector order.
    pub languages: Vec<Choice>,
    /// Topics that offer a question-type selector.
    pub topics: Vec<TopicQuestionTypes>,
}

/// Query string for the question-types endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionTypesQuery {
    /// Topic as typed by the user.
    #[serde(default)]
    pub topic: String,
}

/// Response body for a new session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedResponse {
    /// Id to use in further requests.
    pub session_id: SessionId,
    /// Initial view.
    pub view: View,
}

/// Response body for a successful action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    /// Message to flash, if any.
    pub notice: Option<Notice>,
    /// View after the action.
    pub view: View,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Message safe to show to the user.
    pub error: String,
    /// How to display the message.
    pub level: NoticeLevel,
    /// Input field the error refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Live sessions.
    pub sessions: Arc<SessionStore>,
    /// Backend for every prompt.
    pub completion: Arc<dyn CompletionService>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates a new `AppState` with no sessions.
    #[must_use]
    pub fn new(config: Config, completion: Arc<dyn CompletionService>) -> Self {
        Self {
            config,
            sessions: Arc::new(SessionStore::new()),
            completion,
        }
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Wrapper turning a `QuizError` into an HTTP response.
#[derive(Debug)]
struct ApiError(QuizError);

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            QuizError::Precondition { .. } | QuizError::InvalidPageTransition { .. } => {
                StatusCode::CONFLICT
            }
            QuizError::EmptyInput { .. } | QuizError::InvalidInput { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            QuizError::CompletionFailed { .. } => StatusCode::BAD_GATEWAY,
            QuizError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            other => {
                error!(
                    error = %other,
                    fatal = other.is_fatal(),
                    "Unexpected error while handling request"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let field = match &self.0 {
            QuizError::EmptyInput { field, .. } | QuizError::InvalidInput { field, .. } => {
                Some((*field).to_string())
            }
            _ => None,
        };
        let notice = Notice::from_error(&self.0);

        let body = Json(ErrorResponse {
            error: notice.message,
            level: notice.level,
            field,
        });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
///
/// Routes live under `/api`, with permissive CORS for a separately served
/// front end and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handle_health))
        .route("/catalog", get(handle_catalog))
        .route("/question-types", get(handle_question_types))
        .route("/sessions", post(handle_create_session))
        .route(
            "/sessions/:id",
            get(handle_get_session).delete(handle_delete_session),
        )
        .route("/sessions/:id/actions", post(handle_action));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_catalog() -> Json<CatalogResponse> {
    let difficulties = Difficulty::ALL
        .iter()
        .map(|d| Choice {
            value: d.wire_name().to_string(),
            label: d.label().to_string(),
        })
        .collect();
    let languages = Language::ALL
        .iter()
        .map(|l| Choice {
            value: l.highlight_tag().to_string(),
            label: l.label().to_string(),
        })
        .collect();
    let topics = TOPIC_QUESTION_TYPES
        .iter()
        .map(|(topic, types)| TopicQuestionTypes {
            topic: (*topic).to_string(),
            question_types: types.iter().map(|t| (*t).to_string()).collect(),
        })
        .collect();

    Json(CatalogResponse {
        difficulties,
        languages,
        topics,
    })
}

async fn handle_question_types(
    Query(query): Query<QuestionTypesQuery>,
) -> Json<TopicQuestionTypes> {
    Json(TopicQuestionTypes {
        question_types: question_types_for(&query.topic)
            .iter()
            .map(|t| (*t).to_string())
            .collect(),
        topic: query.topic,
    })
}

async fn handle_create_session(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SessionCreatedResponse>) {
    let (session_id, session) = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(SessionCreatedResponse {
            session_id,
            view: View::from(&session),
        }),
    )
}

async fn handle_get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<View>, ApiError> {
    let id = SessionId::parse(&id)?;
    let session = state.sessions.snapshot(id).await?;
    Ok(Json(View::from(&session)))
}

async fn handle_delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = SessionId::parse(&id)?;
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(action): Json<Action>,
) -> Result<Json<ActionResponse>, ApiError> {
    let id = SessionId::parse(&id)?;
    info!(session_id = %id, action = action.name(), "Received action");

    let completion = Arc::clone(&state.completion);
    let render = state
        .sessions
        .run(id, |session| async move {
            dispatch(&session, action, completion.as_ref()).await
        })
        .await?;

    Ok(Json(ActionResponse {
        notice: render.notice,
        view: render.view,
    }))
}

// ============================================================================
// Tests
// ============================================================================
