//! Error types for QuestGenie.
//!
//! Fatal errors (configuration) stop the process at startup. Everything
//! raised while handling a user action is recoverable: it is reported to the
//! user and the session is left exactly as it was.

use std::path::PathBuf;

use questgenie_llm::{CompletionError, LlmErrorKind};

/// A specialized `Result` type for QuestGenie operations.
pub type Result<T> = std::result::Result<T, QuizError>;

/// Errors that can occur while configuring or running QuestGenie.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    // ========================================================================
    // Configuration Errors (fatal)
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your questgenie.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The completion-service API key is missing or blank.
    #[error("Missing API key: environment variable '{env_var}' is not set\n\nSuggestion: Export {env_var} or add it to a .env file next to questgenie.json")]
    MissingApiKey {
        /// Name of the environment variable that was consulted.
        env_var: String,
    },

    // ========================================================================
    // Action Errors (recoverable, session untouched)
    // ========================================================================
    /// The action needs state the session does not have yet.
    #[error("{message}")]
    Precondition {
        /// Warning shown to the user.
        message: String,
    },

    /// A required text field was left blank.
    #[error("{message}")]
    EmptyInput {
        /// Name of the offending field.
        field: &'static str,
        /// Error shown next to the field.
        message: String,
    },

    /// A field holds a value outside its allowed set.
    #[error("{message}")]
    InvalidInput {
        /// Name of the offending field.
        field: &'static str,
        /// Error shown next to the field.
        message: String,
    },

    /// Page switch to the page that is already active.
    #[error("Invalid page transition: cannot go from {from} to {to}")]
    InvalidPageTransition {
        /// The current page.
        from: String,
        /// The requested page.
        to: String,
    },

    /// The completion service failed.
    #[error("Completion failed ({kind}): {message}")]
    CompletionFailed {
        /// Category of the failure.
        kind: LlmErrorKind,
        /// Details for the logs.
        message: String,
    },

    /// No session with the given id exists (never created or already ended).
    #[error("Session not found: {id}")]
    SessionNotFound {
        /// The requested session id.
        id: String,
    },
}

impl From<CompletionError> for QuizError {
    fn from(err: CompletionError) -> Self {
        Self::CompletionFailed {
            kind: err.kind,
            message: err.message,
        }
    }
}

impl QuizError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `MissingApiKey` error.
    #[must_use]
    pub fn missing_api_key(env_var: impl Into<String>) -> Self {
        Self::MissingApiKey {
            env_var: env_var.into(),
        }
    }

    /// Creates a new `Precondition` error.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Creates a new `EmptyInput` error for `field`.
    #[must_use]
    pub fn empty_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::EmptyInput {
            field,
            message: message.into(),
        }
    }

    /// Creates a new `InvalidInput` error for `field`.
    #[must_use]
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Creates a new `InvalidPageTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidPageTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Creates a new `SessionNotFound` error.
    #[must_use]
    pub fn session_not_found(id: impl std::fmt::Display) -> Self {
        Self::SessionNotFound { id: id.to_string() }
    }

    /// Returns `true` if this error is fatal and requires immediate termination.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::MissingApiKey { .. }
        )
    }

    /// Text safe to show to the user.
    ///
    /// Completion failures all collapse into one generic message; their
    /// details only go to the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::CompletionFailed { .. } => questgenie_llm::GENERIC_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}
