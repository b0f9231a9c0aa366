//! QuestGenie core
//!
//! Prompt construction, per-connection session state, the page controller
//! that turns user actions into completion calls, and the HTTP API that
//! exposes it all to the browser.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod prompt;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{
    create_router, ActionResponse, AppState, CatalogResponse, Choice, ErrorResponse,
    HealthResponse, SessionCreatedResponse, TopicQuestionTypes,
};
pub use config::Config;
pub use controller::{dispatch, Action, CodeBlock, Notice, NoticeLevel, Render, View};
pub use error::{QuizError, Result};
pub use prompt::{
    build_code_prompt, build_feedback_prompt, build_hint_prompt, build_question_prompt,
    detect_language, is_dont_know, question_types_for, resolve_question_type, Difficulty,
    Language, PromptKind, PromptRequest, DONT_KNOW_ANSWERS, TOPIC_QUESTION_TYPES,
};
pub use session::{
    is_correct_feedback, Page, Progress, Session, SessionField, QUESTION_SCOPED_FIELDS,
};
pub use store::{SessionId, SessionStore};
