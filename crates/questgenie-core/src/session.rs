//! Per-connection session state.
//!
//! A [`Session`] is the only mutable state in QuestGenie. It is created when a
//! connection starts, mutated by page actions, and discarded when the
//! connection ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{QuizError, Result};
use crate::prompt::{Difficulty, Language};

/// Fields cleared whenever a new question is generated.
pub const QUESTION_SCOPED_FIELDS: [SessionField; 4] = [
    SessionField::Hint,
    SessionField::GeneratedCode,
    SessionField::LastAnswer,
    SessionField::LastFeedback,
];

// ============================================================================
// Page
// ============================================================================

/// The two mutually exclusive pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    /// Question, hint and feedback page (default).
    #[default]
    QuestionMode,
    /// Free-form code generation page.
    CodeMode,
}

impl Page {
    /// Page heading.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::QuestionMode => "QuestGenie",
            Self::CodeMode => "CodeGuru",
        }
    }
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuestionMode => write!(f, "question_mode"),
            Self::CodeMode => write!(f, "code_mode"),
        }
    }
}

// ============================================================================
// SessionField
// ============================================================================

/// Named optional text slots of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    /// Question type chosen for the active question.
    QuestionType,
    /// The active question.
    CurrentQuestion,
    /// Hint for the active question.
    Hint,
    /// The answer last submitted for feedback.
    LastAnswer,
    /// Feedback on the last answer.
    LastFeedback,
    /// Code solution for the active question.
    GeneratedCode,
    /// Problem statement typed on the code page.
    CodeProblem,
    /// Solution generated on the code page.
    CodeSolution,
}

impl SessionField {
    /// Every field, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::QuestionType,
        Self::CurrentQuestion,
        Self::Hint,
        Self::LastAnswer,
        Self::LastFeedback,
        Self::GeneratedCode,
        Self::CodeProblem,
        Self::CodeSolution,
    ];

    /// The page whose actions own this field.
    #[must_use]
    pub const fn page(&self) -> Page {
        match self {
            Self::CodeProblem | Self::CodeSolution => Page::CodeMode,
            _ => Page::QuestionMode,
        }
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Attempted/correct counters as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Answers judged correct.
    pub correct: u32,
    /// Answers submitted for feedback.
    pub attempted: u32,
    /// `correct / attempted`, in `[0, 1]`.
    pub ratio: f64,
}

impl Progress {
    /// The progress line shown under the question.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "Progress: {}/{} correct answers",
            self.correct, self.attempted
        )
    }
}

/// Whether feedback text counts as a correct answer.
///
/// Naive on purpose: any case-insensitive occurrence of "correct" counts,
/// including "not correct" and "incorrect".
#[must_use]
pub fn is_correct_feedback(feedback: &str) -> bool {
    feedback.to_lowercase().contains("correct")
}

// ============================================================================
// Session
// ============================================================================

/// State of one user connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    topic: String,
    difficulty: Difficulty,
    question_type: Option<String>,
    current_question: Option<String>,
    hint: Option<String>,
    last_answer: Option<String>,
    last_feedback: Option<String>,
    generated_code: Option<String>,
    generated_code_language: Option<Language>,
    code_problem: Option<String>,
    code_solution: Option<String>,
    code_language: Language,
    questions_attempted: u32,
    correct_answers: u32,
    active_page: Page,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an empty session on the question page.
    ///
    /// # Examples
    ///
    /// ```
    /// use questgenie_core::{Page, Session};
    ///
    /// let session = Session::new();
    /// assert_eq!(session.active_page(), Page::QuestionMode);
    /// assert!(!session.has_question());
    /// assert!(session.progress().is_none());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            topic: String::new(),
            difficulty: Difficulty::default(),
            question_type: None,
            current_question: None,
            hint: None,
            last_answer: None,
            last_feedback: None,
            generated_code: None,
            generated_code_language: None,
            code_problem: None,
            code_solution: None,
            code_language: Language::default(),
            questions_attempted: 0,
            correct_answers: 0,
            active_page: Page::default(),
            created_at: now,
            updated_at: now,
        }
    }

    const fn slot(&self, field: SessionField) -> &Option<String> {
        match field {
            SessionField::QuestionType => &self.question_type,
            SessionField::CurrentQuestion => &self.current_question,
            SessionField::Hint => &self.hint,
            SessionField::LastAnswer => &self.last_answer,
            SessionField::LastFeedback => &self.last_feedback,
            SessionField::GeneratedCode => &self.generated_code,
            SessionField::CodeProblem => &self.code_problem,
            SessionField::CodeSolution => &self.code_solution,
        }
    }

    fn slot_mut(&mut self, field: SessionField) -> &mut Option<String> {
        match field {
            SessionField::QuestionType => &mut self.question_type,
            SessionField::CurrentQuestion => &mut self.current_question,
            SessionField::Hint => &mut self.hint,
            SessionField::LastAnswer => &mut self.last_answer,
            SessionField::LastFeedback => &mut self.last_feedback,
            SessionField::GeneratedCode => &mut self.generated_code,
            SessionField::CodeProblem => &mut self.code_problem,
            SessionField::CodeSolution => &mut self.code_solution,
        }
    }

    /// Reads a text field.
    #[must_use]
    pub fn get(&self, field: SessionField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Writes a text field.
    pub fn set(&mut self, field: SessionField, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    /// Clears a text field.
    pub fn clear(&mut self, field: SessionField) {
        *self.slot_mut(field) = None;
        if field == SessionField::GeneratedCode {
            self.generated_code_language = None;
        }
    }

    /// Clears several text fields.
    pub fn reset(&mut self, fields: &[SessionField]) {
        for field in fields {
            self.clear(*field);
        }
    }

    /// Returns `true` while a question is active.
    #[must_use]
    pub const fn has_question(&self) -> bool {
        self.current_question.is_some()
    }

    /// Topic of the active question (empty before the first one).
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Difficulty of the active question.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Records the inputs a question was generated from.
    pub fn set_question_inputs(
        &mut self,
        topic: impl Into<String>,
        difficulty: Difficulty,
        question_type: Option<String>,
    ) {
        self.topic = topic.into();
        self.difficulty = difficulty;
        self.question_type = question_type;
    }

    /// Language of the solution for the active question, if one was generated.
    #[must_use]
    pub const fn generated_code_language(&self) -> Option<Language> {
        self.generated_code_language
    }

    /// Stores a solution for the active question.
    pub fn set_generated_code(&mut self, code: impl Into<String>, language: Language) {
        self.generated_code = Some(code.into());
        self.generated_code_language = Some(language);
    }

    /// Language selected on the code page.
    #[must_use]
    pub const fn code_language(&self) -> Language {
        self.code_language
    }

    /// Selects the code-page language.
    pub fn set_code_language(&mut self, language: Language) {
        self.code_language = language;
    }

    /// Answers submitted for feedback.
    #[must_use]
    pub const fn questions_attempted(&self) -> u32 {
        self.questions_attempted
    }

    /// Answers whose feedback was judged correct.
    #[must_use]
    pub const fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    /// Counts one feedback round.
    ///
    /// Both counters move together, so `correct_answers <= questions_attempted`
    /// always holds.
    pub fn record_attempt(&mut self, correct: bool) {
        self.questions_attempted = self.questions_attempted.saturating_add(1);
        if correct {
            self.correct_answers = self
                .correct_answers
                .saturating_add(1)
                .min(self.questions_attempted);
        }
    }

    /// Progress so far, or `None` before the first attempt.
    #[must_use]
    pub fn progress(&self) -> Option<Progress> {
        (self.questions_attempted > 0).then(|| Progress {
            correct: self.correct_answers,
            attempted: self.questions_attempted,
            ratio: f64::from(self.correct_answers) / f64::from(self.questions_attempted),
        })
    }

    /// The page currently shown.
    #[must_use]
    pub const fn active_page(&self) -> Page {
        self.active_page
    }

    /// Moves to the other page.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidPageTransition` if `target` is already active.
    pub fn switch_to(&mut self, target: Page) -> Result<()> {
        if self.active_page == target {
            return Err(QuizError::invalid_transition(self.active_page, target));
        }
        self.active_page = target;
        Ok(())
    }

    /// When the session was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the session last changed.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Updates the `updated_at` timestamp to the current time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Returns the duration since the session started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }

    /// Returns the duration since the session last changed.
    #[must_use]
    pub fn idle_for(&self) -> chrono::Duration {
        Utc::now() - self.updated_at
    }

    #[cfg(test)]
    pub(crate) fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}
