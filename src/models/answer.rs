// src/models/answer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::person::EssayField;

/// Sentinel stored in `correct_answer` when no key exists for a question.
pub const NO_KEY: &str = "N/A";

/// One scored quiz submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub question_id: String,
    pub selected_options: Vec<String>,
    pub is_correct: bool,
    pub correct_answer: String,
    pub timestamp: DateTime<Utc>,
}

/// One free-text essay submission. Never scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EssayAnswer {
    pub question_id: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// A ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SubmittedAnswer {
    Quiz(QuizAnswer),
    Essay(EssayAnswer),
}

impl SubmittedAnswer {
    pub fn question_id(&self) -> &str {
        match self {
            SubmittedAnswer::Quiz(a) => &a.question_id,
            SubmittedAnswer::Essay(a) => &a.question_id,
        }
    }

    pub fn as_quiz(&self) -> Option<&QuizAnswer> {
        match self {
            SubmittedAnswer::Quiz(a) => Some(a),
            SubmittedAnswer::Essay(_) => None,
        }
    }

    pub fn as_essay(&self) -> Option<&EssayAnswer> {
        match self {
            SubmittedAnswer::Essay(a) => Some(a),
            SubmittedAnswer::Quiz(_) => None,
        }
    }
}

/// Options picked for a question: a bare token or a list of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    One(String),
    Many(Vec<String>),
}

impl Selection {
    /// Always a sequence; a bare token becomes a one-element list.
    pub fn into_options(self) -> Vec<String> {
        match self {
            Selection::One(option) => vec![option],
            Selection::Many(options) => options,
        }
    }
}

impl From<&str> for Selection {
    fn from(option: &str) -> Self {
        Selection::One(option.to_string())
    }
}

impl From<Vec<&str>> for Selection {
    fn from(options: Vec<&str>) -> Self {
        Selection::Many(options.into_iter().map(str::to_string).collect())
    }
}

/// DTO for submitting one quiz answer.
#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    /// UI component that raised the answer, e.g. "logical-1".
    #[validate(length(min = 1, max = 100))]
    pub component: String,
    pub selected: Selection,
}

/// DTO for submitting an essay.
#[derive(Debug, Deserialize, Validate)]
pub struct EssayRequest {
    pub essay: EssayField,
    #[validate(length(max = 20000))]
    pub answer: String,
}
