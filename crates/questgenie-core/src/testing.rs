//! Test doubles shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use questgenie_llm::{CompletionError, CompletionService, LlmErrorKind};

/// A completion service that replays canned replies in order and records
/// every prompt it receives.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(text.to_string()));
        self
    }

    pub fn fail(self, kind: LlmErrorKind) -> Self {
        self.push(Err(CompletionError::new(kind, "scripted failure")));
        self
    }

    pub fn push(&self, reply: Result<String, CompletionError>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.prompts().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| {
                Err(CompletionError::new(
                    LlmErrorKind::Other,
                    "no scripted reply left",
                ))
            })
    }
}
