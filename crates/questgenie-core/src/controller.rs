//! Page controller.
//!
//! Every user action is one call to [`dispatch`]. The handler works on a
//! copy of the session and hands back the new session together with what to
//! render; the caller stores the new session only when the action succeeded.
//!
//! ```text
//!   Action ──► dispatch ──► prompt builder ──► CompletionService
//!                 │                                   │
//!                 └──────── (Session', Render) ◄──────┘
//! ```

use std::time::Instant;

use questgenie_llm::CompletionService;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{QuizError, Result};
use crate::prompt::{
    build_code_prompt, build_feedback_prompt, build_hint_prompt, build_question_prompt,
    detect_language, question_types_for, resolve_question_type, Difficulty, Language,
    PromptRequest,
};
use crate::session::{
    is_correct_feedback, Page, Progress, Session, SessionField, QUESTION_SCOPED_FIELDS,
};

// ============================================================================
// Actions
// ============================================================================

/// A user interaction, tagged by `action` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Generate a new question, clearing everything tied to the old one.
    GenerateQuestion {
        /// Subject topic (required).
        topic: String,
        /// Difficulty level.
        #[serde(default)]
        difficulty: Difficulty,
        /// Question type, only used for topics that offer one.
        #[serde(default)]
        question_type: Option<String>,
    },
    /// Generate a hint for the active question.
    ///
    /// A sidebar action: allowed on both pages, and always writes the
    /// question page's hint.
    ShowHint,
    /// Critique an answer to the active question.
    GetFeedback {
        /// The user's answer.
        answer: String,
    },
    /// Generate a code solution.
    ///
    /// On the question page this solves the active question; on the code
    /// page it solves `problem`.
    GenerateCode {
        /// Problem statement (code page only).
        #[serde(default)]
        problem: Option<String>,
        /// Target language; detected from the question when omitted.
        #[serde(default)]
        language: Option<Language>,
    },
    /// Go to the code page.
    SwitchToCodeMode,
    /// Go back to the question page.
    SwitchToQuestionMode,
}

impl Action {
    /// Wire name of the action.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GenerateQuestion { .. } => "generate_question",
            Self::ShowHint => "show_hint",
            Self::GetFeedback { .. } => "get_feedback",
            Self::GenerateCode { .. } => "generate_code",
            Self::SwitchToCodeMode => "switch_to_code_mode",
            Self::SwitchToQuestionMode => "switch_to_question_mode",
        }
    }
}

// ============================================================================
// Render instructions
// ============================================================================

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// The action worked.
    Success,
    /// The action was refused; nothing changed.
    Warning,
    /// The action failed; nothing changed.
    Error,
}

/// A one-off message shown after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notice {
    /// A success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// The notice for a failed action.
    ///
    /// Refusals (missing question, wrong page) are warnings; everything else
    /// is an error.
    #[must_use]
    pub fn from_error(err: &QuizError) -> Self {
        let level = match err {
            QuizError::Precondition { .. } | QuizError::InvalidPageTransition { .. } => {
                NoticeLevel::Warning
            }
            _ => NoticeLevel::Error,
        };
        Self {
            level,
            message: err.user_message(),
        }
    }
}

/// A code block together with its highlighting language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    /// Source text as returned by the completion service.
    pub code: String,
    /// Highlighting language.
    pub language: Language,
}

/// Everything needed to draw the current page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    /// Active page.
    pub page: Page,
    /// Heading of the active page.
    pub title: &'static str,
    /// Topic of the active question.
    pub topic: String,
    /// Difficulty of the active question.
    pub difficulty: Difficulty,
    /// Question type of the active question.
    pub question_type: Option<String>,
    /// Selector entries for the current topic; empty hides the selector.
    pub question_types: Vec<&'static str>,
    /// The active question.
    pub question: Option<String>,
    /// Hint for the active question.
    pub hint: Option<String>,
    /// Last submitted answer.
    pub last_answer: Option<String>,
    /// Feedback on the last answer.
    pub feedback: Option<String>,
    /// Solution to the active question.
    pub generated_code: Option<CodeBlock>,
    /// Problem statement on the code page.
    pub code_problem: Option<String>,
    /// Language selected on the code page.
    pub code_language: Language,
    /// Solution generated on the code page.
    pub code_solution: Option<CodeBlock>,
    /// Counters, hidden until the first attempt.
    pub progress: Option<Progress>,
    /// Progress line, hidden until the first attempt.
    pub progress_label: Option<String>,
}

impl From<&Session> for View {
    fn from(session: &Session) -> Self {
        let text = |field: SessionField| session.get(field).map(str::to_string);
        let progress = session.progress();
        Self {
            page: session.active_page(),
            title: session.active_page().title(),
            topic: session.topic().to_string(),
            difficulty: session.difficulty(),
            question_type: text(SessionField::QuestionType),
            question_types: question_types_for(session.topic()).to_vec(),
            question: text(SessionField::CurrentQuestion),
            hint: text(SessionField::Hint),
            last_answer: text(SessionField::LastAnswer),
            feedback: text(SessionField::LastFeedback),
            generated_code: session
                .get(SessionField::GeneratedCode)
                .zip(session.generated_code_language())
                .map(|(code, language)| CodeBlock {
                    code: code.to_string(),
                    language,
                }),
            code_problem: text(SessionField::CodeProblem),
            code_language: session.code_language(),
            code_solution: session
                .get(SessionField::CodeSolution)
                .map(|code| CodeBlock {
                    code: code.to_string(),
                    language: session.code_language(),
                }),
            progress_label: progress.as_ref().map(Progress::label),
            progress,
        }
    }
}

/// Result of a successful action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Render {
    /// Message to flash, if any.
    pub notice: Option<Notice>,
    /// The page after the action.
    pub view: View,
}

// ============================================================================
// Dispatch
// ============================================================================

/// Runs one action against a copy of `session`.
///
/// # Errors
///
/// Returns the action's error; `session` itself is never modified, so the
/// caller keeps the old state by simply discarding the error.
pub async fn dispatch(
    session: &Session,
    action: Action,
    completion: &dyn CompletionService,
) -> Result<(Session, Render)> {
    let name = action.name();
    let page = session.active_page();
    debug!(action = name, page = %page, "Dispatching action");

    let mut next = session.clone();
    let outcome = apply(&mut next, action, completion).await;
    match outcome {
        Ok(notice) => {
            next.touch();
            info!(
                action = name,
                page = %next.active_page(),
                attempted = next.questions_attempted(),
                correct = next.correct_answers(),
                "Action completed"
            );
            let view = View::from(&next);
            Ok((next, Render { notice, view }))
        }
        Err(err) => {
            warn!(action = name, page = %page, error = %err, "Action rejected");
            Err(err)
        }
    }
}

async fn apply(
    session: &mut Session,
    action: Action,
    completion: &dyn CompletionService,
) -> Result<Option<Notice>> {
    match action {
        Action::GenerateQuestion {
            topic,
            difficulty,
            question_type,
        } => {
            require_page(session, Page::QuestionMode, "generate a question")?;
            generate_question(session, &topic, difficulty, question_type.as_deref(), completion)
                .await
        }
        Action::ShowHint => show_hint(session, completion).await,
        Action::GetFeedback { answer } => {
            require_page(session, Page::QuestionMode, "get feedback")?;
            get_feedback(session, &answer, completion).await
        }
        Action::GenerateCode { problem, language } => match session.active_page() {
            Page::QuestionMode => solve_question(session, language, completion).await,
            Page::CodeMode => solve_problem(session, problem.as_deref(), language, completion).await,
        },
        Action::SwitchToCodeMode => {
            session.switch_to(Page::CodeMode)?;
            Ok(None)
        }
        Action::SwitchToQuestionMode => {
            session.switch_to(Page::QuestionMode)?;
            Ok(None)
        }
    }
}

fn require_page(session: &Session, page: Page, what: &str) -> Result<()> {
    if session.active_page() == page {
        Ok(())
    } else {
        Err(QuizError::precondition(format!(
            "Go back to {} to {what}.",
            page.title()
        )))
    }
}

fn non_blank<'a>(value: Option<&'a str>, field: &'static str, message: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| QuizError::empty_input(field, message))
}

async fn complete(completion: &dyn CompletionService, prompt: &PromptRequest) -> Result<String> {
    let started = Instant::now();
    let result = completion.complete(prompt.as_str()).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match result {
        Ok(text) => {
            debug!(
                prompt = ?prompt.kind,
                prompt_len = prompt.as_str().len(),
                reply_len = text.len(),
                elapsed_ms,
                "Completion received"
            );
            Ok(text)
        }
        Err(err) => {
            warn!(
                prompt = ?prompt.kind,
                kind = %err.kind,
                elapsed_ms,
                transient = err.is_transient(),
                suggestion = err.kind.suggestion(),
                "Completion failed"
            );
            Err(err.into())
        }
    }
}

async fn generate_question(
    session: &mut Session,
    topic: &str,
    difficulty: Difficulty,
    question_type: Option<&str>,
    completion: &dyn CompletionService,
) -> Result<Option<Notice>> {
    let topic = non_blank(Some(topic), "topic", "Please enter a subject topic.")?;
    let question_type = resolve_question_type(topic, question_type)?;

    let prompt = build_question_prompt(topic, difficulty, question_type.as_deref());
    let question = complete(completion, &prompt).await?;

    session.set_question_inputs(topic, difficulty, question_type);
    session.set(SessionField::CurrentQuestion, question);
    session.reset(&QUESTION_SCOPED_FIELDS);
    Ok(Some(Notice::success("Question Generated!")))
}

async fn show_hint(
    session: &mut Session,
    completion: &dyn CompletionService,
) -> Result<Option<Notice>> {
    let prompt = build_hint_prompt(session.get(SessionField::CurrentQuestion))?;
    let hint = complete(completion, &prompt).await?;
    session.set(SessionField::Hint, hint);
    Ok(Some(Notice::success("Hint Generated!")))
}

async fn get_feedback(
    session: &mut Session,
    answer: &str,
    completion: &dyn CompletionService,
) -> Result<Option<Notice>> {
    let question = session
        .get(SessionField::CurrentQuestion)
        .ok_or_else(|| {
            QuizError::precondition("Please generate a question first before requesting feedback.")
        })?
        .to_string();
    if answer.trim().is_empty() {
        return Err(QuizError::empty_input("answer", "Please enter your answer."));
    }

    let prompt = build_feedback_prompt(answer, &question);
    let feedback = complete(completion, &prompt).await?;

    session.record_attempt(is_correct_feedback(&feedback));
    session.set(SessionField::LastAnswer, answer);
    session.set(SessionField::LastFeedback, feedback);
    Ok(None)
}

async fn solve_question(
    session: &mut Session,
    language: Option<Language>,
    completion: &dyn CompletionService,
) -> Result<Option<Notice>> {
    let question = session
        .get(SessionField::CurrentQuestion)
        .ok_or_else(|| {
            QuizError::precondition("Please generate a question first before requesting code.")
        })?
        .to_string();
    let language = language.unwrap_or_else(|| detect_language(&question, session.topic()));

    let prompt = build_code_prompt(&question, language);
    let code = complete(completion, &prompt).await?;

    session.set_generated_code(code, language);
    Ok(Some(Notice::success("Code Generated!")))
}

async fn solve_problem(
    session: &mut Session,
    problem: Option<&str>,
    language: Option<Language>,
    completion: &dyn CompletionService,
) -> Result<Option<Notice>> {
    let problem = non_blank(problem, "problem", "Please enter a prompt.")?.to_string();
    let language = language.unwrap_or_else(|| session.code_language());

    let prompt = build_code_prompt(&problem, language);
    let code = complete(completion, &prompt).await?;

    session.set(SessionField::CodeProblem, problem);
    session.set_code_language(language);
    session.set(SessionField::CodeSolution, code);
    Ok(Some(Notice::success("Code Generated!")))
}
