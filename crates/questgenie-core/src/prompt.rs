//! Prompt construction.
//!
//! Every function here is pure: the same inputs always give the same
//! instruction text. User text is interpolated verbatim inside single quotes;
//! nothing is escaped, so a quote in user text can close the quoted span.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{QuizError, Result};

/// Answers treated as "I don't know" after trimming and lowercasing.
pub const DONT_KNOW_ANSWERS: [&str; 6] = ["don't know", "no", "-", "n/a", "none", "idk"];

/// Topics that offer a question-type selector, with their types.
pub const TOPIC_QUESTION_TYPES: [(&str, &[&str]); 3] = [
    ("Python", &["Syntax", "Real-World Problems", "Core"]),
    ("Machine Learning", &["Theory", "Coding", "Real-World Applications"]),
    ("Statistics", &["Theory", "Coding", "Real-World Problems"]),
];

static LANGUAGE_MENTION: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:(javascript|java|python|cpp)\d*\b|(c\+\+))").ok());

// ============================================================================
// Difficulty
// ============================================================================

/// Difficulty level requested for a question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Difficulty {
    /// Entry level (default).
    #[default]
    Easy,
    /// Intermediate.
    Medium,
    /// Advanced.
    Hard,
    /// Beyond advanced.
    VeryHard,
    /// Expert level.
    Expert,
}

impl Difficulty {
    /// All levels in selector order.
    pub const ALL: [Self; 5] = [
        Self::Easy,
        Self::Medium,
        Self::Hard,
        Self::VeryHard,
        Self::Expert,
    ];

    /// Label shown to the user and interpolated into prompts.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::VeryHard => "Very Hard",
            Self::Expert => "Expert",
        }
    }

    /// Name used on the wire.
    #[must_use]
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::VeryHard => "very_hard",
            Self::Expert => "expert",
        }
    }

    /// Parses a wire name or label, ignoring case, spaces, hyphens and underscores.
    fn from_str_loose(s: &str) -> Option<Self> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            "veryhard" => Some(Self::VeryHard),
            "expert" => Some(Self::Expert),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_loose(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid difficulty '{s}': expected one of 'easy', 'medium', 'hard', 'very_hard', 'expert'"
            ))
        })
    }
}

impl Serialize for Difficulty {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.wire_name())
    }
}

// ============================================================================
// Language
// ============================================================================

/// Target language for generated code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Language {
    /// Python (default).
    #[default]
    Python,
    /// Java.
    Java,
    /// C++.
    Cpp,
    /// JavaScript.
    JavaScript,
}

impl Language {
    /// All languages in selector order.
    pub const ALL: [Self; 4] = [Self::Python, Self::Java, Self::Cpp, Self::JavaScript];

    /// Name used in prompts and selectors.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::Java => "Java",
            Self::Cpp => "C++",
            Self::JavaScript => "JavaScript",
        }
    }

    /// Lowercase tag for syntax highlighting of the rendered code block.
    #[must_use]
    pub const fn highlight_tag(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::JavaScript => "javascript",
        }
    }

    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "python" => Some(Self::Python),
            "java" => Some(Self::Java),
            "c++" | "cpp" => Some(Self::Cpp),
            "javascript" | "js" => Some(Self::JavaScript),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid language '{s}': expected one of 'python', 'java', 'cpp', 'javascript'"
            ))
        })
    }
}

impl Serialize for Language {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.highlight_tag())
    }
}

/// Finds the language a question is about.
///
/// Looks for the first whole-word mention in `question`, then in `topic`,
/// and falls back to Python. A version number glued to the name still
/// counts, so "Python3" and "Java8" are mentions.
#[must_use]
pub fn detect_language(question: &str, topic: &str) -> Language {
    let Some(re) = LANGUAGE_MENTION.as_ref() else {
        return Language::default();
    };
    [question, topic]
        .into_iter()
        .find_map(|text| {
            let caps = re.captures(text)?;
            let name = caps.get(1).or_else(|| caps.get(2))?;
            Language::from_str_case_insensitive(name.as_str())
        })
        .unwrap_or_default()
}

// ============================================================================
// Question types
// ============================================================================

/// Question types offered for `topic`; empty when the topic has no selector.
#[must_use]
pub fn question_types_for(topic: &str) -> &'static [&'static str] {
    let topic = topic.trim();
    TOPIC_QUESTION_TYPES
        .iter()
        .find(|(name, _)| *name == topic)
        .map(|(_, types)| *types)
        .unwrap_or_default()
}

/// Checks a requested question type against the topic's selector.
///
/// Topics without a selector drop the type. For topics with one, the
/// requested type must be listed (compared case-insensitively) and the
/// canonical spelling is returned.
pub fn resolve_question_type(topic: &str, requested: Option<&str>) -> Result<Option<String>> {
    let types = question_types_for(topic);
    if types.is_empty() {
        return Ok(None);
    }
    let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };

    types
        .iter()
        .find(|t| t.eq_ignore_ascii_case(requested))
        .map(|t| Some((*t).to_string()))
        .ok_or_else(|| {
            QuizError::invalid_input(
                "question_type",
                format!(
                    "'{requested}' is not a question type for {}; choose one of: {}",
                    topic.trim(),
                    types.join(", ")
                ),
            )
        })
}

// ============================================================================
// Prompts
// ============================================================================

/// Which template produced a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Question generation.
    Question,
    /// Hint for the active question.
    Hint,
    /// Critique of a submitted answer.
    Feedback,
    /// Encouragement plus the correct answer, for "don't know" answers.
    Encouragement,
    /// Optimal code solution.
    Code,
}

/// An instruction for the completion service, built fresh for each action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// Template used.
    pub kind: PromptKind,
    /// The literal instruction text.
    pub instruction: String,
}

impl PromptRequest {
    fn new(kind: PromptKind, instruction: String) -> Self {
        Self { kind, instruction }
    }

    /// The instruction text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.instruction
    }
}

impl std::fmt::Display for PromptRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.instruction)
    }
}

/// Builds the question-generation prompt.
#[must_use]
pub fn build_question_prompt(
    topic: &str,
    difficulty: Difficulty,
    question_type: Option<&str>,
) -> PromptRequest {
    let instruction = match question_type {
        Some(question_type) => format!(
            "Generate a {difficulty} level {question_type} question on the topic of {topic}."
        ),
        None => format!(
            "Generate a {difficulty} level technical question (coding question if possible) on the topic of {topic}."
        ),
    };
    PromptRequest::new(PromptKind::Question, instruction)
}

/// Builds the hint prompt for the active question.
///
/// # Errors
///
/// Returns `QuizError::Precondition` when there is no active question.
pub fn build_hint_prompt(question: Option<&str>) -> Result<PromptRequest> {
    let question = question.ok_or_else(|| {
        QuizError::precondition("Please generate a question first before requesting a hint.")
    })?;
    Ok(PromptRequest::new(
        PromptKind::Hint,
        format!(
            "Provide a hint for the following question: '{question}'. Make the hint informative but not give away the entire answer."
        ),
    ))
}

/// Returns `true` if `answer` is one of the "don't know" tokens.
///
/// Exact match after trimming and lowercasing: `"  IDK "` matches, `"idk?"` does not.
#[must_use]
pub fn is_dont_know(answer: &str) -> bool {
    let normalized = answer.trim().to_lowercase();
    DONT_KNOW_ANSWERS.contains(&normalized.as_str())
}

/// Builds the feedback prompt for `answer`.
///
/// "Don't know" answers get the encouragement template; anything else gets
/// the critique template with the answer as typed.
#[must_use]
pub fn build_feedback_prompt(answer: &str, question: &str) -> PromptRequest {
    if is_dont_know(answer) {
        PromptRequest::new(
            PromptKind::Encouragement,
            format!(
                "User doesn't know the answer to the question: '{question}'. Respond with encouragement, explain that it's okay not to know, and provide the correct answer along with some tips on how to learn this topic."
            ),
        )
    } else {
        PromptRequest::new(
            PromptKind::Feedback,
            format!(
                "Provide precise and professional feedback on the following answer: '{answer}' to the question: '{question}'. If the answer is wrong, tell it directly. Highlight areas for improvement in 50 words, if there is scope provide the correct code."
            ),
        )
    }
}

/// Builds the optimal-code prompt.
#[must_use]
pub fn build_code_prompt(problem: &str, language: Language) -> PromptRequest {
    PromptRequest::new(
        PromptKind::Code,
        format!(
            "Write an optimal code solution in {language} for the following problem: '{problem}'. Provide the code with comments explaining each step."
        ),
    )
}
