//! Answer choices, answer keys, and scoring results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of options per question (`A` through `H`).
pub const MAX_OPTIONS: usize = 8;

/// A single option of a question, shown as a letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Choice(u8);

impl Choice {
    /// Creates a choice from a zero-based option index.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < MAX_OPTIONS {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Parses a letter (case-insensitive).
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            Self::from_index(usize::from(upper as u8 - b'A'))
        } else {
            None
        }
    }

    /// Zero-based option index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Upper-case letter for this option.
    #[must_use]
    pub const fn letter(self) -> char {
        (b'A' + self.0) as char
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl TryFrom<String> for Choice {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut chars = value.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_letter(c).ok_or(KeyParseError::InvalidChoice(c)),
            _ => Err(KeyParseError::NotALetter(value)),
        }
    }
}

impl From<Choice> for String {
    fn from(choice: Choice) -> Self {
        choice.letter().to_string()
    }
}

/// Errors raised while parsing an answer key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    /// The key has no entries.
    #[error("answer key is empty")]
    Empty,
    /// A character is not an option letter in range.
    #[error("'{0}' is not an option letter (A-H)")]
    InvalidChoice(char),
    /// An entry is not a single letter.
    #[error("'{0}' is not a single option letter")]
    NotALetter(String),
}

/// Ordered list of correct choices, one per question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Choice>", into = "Vec<Choice>")]
pub struct AnswerKey(Vec<Choice>);

impl AnswerKey {
    /// Creates a key from choices.
    ///
    /// # Errors
    ///
    /// Returns [`KeyParseError::Empty`] if `choices` is empty.
    pub fn new(choices: Vec<Choice>) -> Result<Self, KeyParseError> {
        if choices.is_empty() {
            return Err(KeyParseError::Empty);
        }
        Ok(Self(choices))
    }

    /// Number of questions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; keys are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Correct choices in question order.
    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.0
    }

    /// Highest option index used by the key, plus one.
    #[must_use]
    pub fn options_used(&self) -> usize {
        self.0.iter().map(|c| c.index() + 1).max().unwrap_or(0)
    }
}

impl FromStr for AnswerKey {
    type Err = KeyParseError;

    /// Parses letters, optionally separated by commas or whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let choices = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(|c| Choice::from_letter(c).ok_or(KeyParseError::InvalidChoice(c)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(choices)
    }
}

impl TryFrom<Vec<Choice>> for AnswerKey {
    type Error = KeyParseError;

    fn try_from(value: Vec<Choice>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AnswerKey> for Vec<Choice> {
    fn from(key: AnswerKey) -> Self {
        key.0
    }
}

/// Marks detected for one question row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    /// Question number (1-based).
    pub question: usize,
    /// Fraction of dark pixels per option cell (0.0 to 1.0).
    pub fills: Vec<f32>,
    /// The single marked option, if exactly one was marked.
    pub selected: Option<Choice>,
    /// Gap between the strongest and second-strongest fill (0.0 to 1.0).
    pub confidence: f32,
    /// No option crossed the fill threshold.
    pub no_mark: bool,
    /// More than one option crossed the fill threshold.
    pub multiple_marks: bool,
}

/// Classification of a question after comparison with the key.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkStatus {
    /// The marked option matches the key.
    Correct,
    /// A single option was marked but it is wrong.
    Incorrect,
    /// Nothing was marked.
    Unanswered,
    /// Several options were marked.
    MultipleMarks,
}

/// Per-question grading detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOutcome {
    /// Question number (1-based).
    pub question: usize,
    /// Correct choice from the key.
    pub expected: Choice,
    /// Detected choice, if determined.
    pub detected: Option<Choice>,
    /// Classification.
    pub status: MarkStatus,
    /// Detection confidence (0.0 to 1.0).
    pub confidence: f32,
}

impl QuestionOutcome {
    /// True when the question counts towards the score.
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.status == MarkStatus::Correct
    }
}

/// Scoring result for one sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeResult {
    /// Student identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    /// Score as a whole percentage (0 to 100).
    pub score: u32,
    /// Number of questions in the key.
    pub total: usize,
    /// Questions answered correctly.
    pub correct: usize,
    /// Questions answered with a single wrong option.
    pub incorrect: usize,
    /// Questions left blank.
    pub unanswered: usize,
    /// Questions with more than one mark.
    pub multiple_marked: usize,
    /// Per-question detail.
    pub questions: Vec<QuestionOutcome>,
}
