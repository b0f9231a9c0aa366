//! QuestGenie Completion Client
//!
//! Boundary to the hosted language model: text prompt in, text completion out.
//!
//! Everything the rest of the workspace knows about the model goes through the
//! [`CompletionService`] trait, so handlers can be driven by the real
//! [`OpenAiClient`] in production and by scripted fakes in tests.

pub mod client;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{ClientSettings, OpenAiClient};

/// Message shown to the user whenever a completion fails, whatever the cause.
pub const GENERIC_FAILURE_MESSAGE: &str = "Could not generate a response. Please try again.";

/// A text-completion backend.
///
/// Calls are not idempotent: the model may return different text for the same
/// prompt, and nothing is cached or retried.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends `prompt` to the model and returns the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Categories of completion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmErrorKind {
    /// Authentication failure (invalid or revoked API key).
    Authentication,
    /// Rate limit exceeded.
    RateLimit,
    /// Account quota or billing limit exhausted.
    Quota,
    /// Server error (5xx responses).
    Server,
    /// Network connectivity issues.
    Network,
    /// The service answered but returned no text.
    EmptyResponse,
    /// Other unclassified errors.
    Other,
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Quota => write!(f, "quota"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::EmptyResponse => write!(f, "empty_response"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl LlmErrorKind {
    /// Returns a suggestion for the operator reading the logs.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Authentication => "Check the API key configured for the completion service",
            Self::RateLimit => "Wait and retry, or reduce request frequency",
            Self::Quota => "Check the billing and quota settings of the API account",
            Self::Server => "Retry later; the completion service may be experiencing issues",
            Self::Network => "Check the network connection and the configured base URL",
            Self::EmptyResponse => "Retry; the model returned no text for this prompt",
            Self::Other => "Check the completion provider's status page",
        }
    }
}

/// A failed completion call.
///
/// The detailed `message` is for logs; users only ever see
/// [`GENERIC_FAILURE_MESSAGE`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("completion failed ({kind}): {message}")]
pub struct CompletionError {
    /// What went wrong.
    pub kind: LlmErrorKind,
    /// Details from the transport or the service.
    pub message: String,
}

impl CompletionError {
    /// Creates a new `CompletionError`.
    #[must_use]
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The single user-facing failure text.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }

    /// Returns `true` if repeating the same action later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            LlmErrorKind::RateLimit
                | LlmErrorKind::Server
                | LlmErrorKind::Network
                | LlmErrorKind::EmptyResponse
        )
    }
}
