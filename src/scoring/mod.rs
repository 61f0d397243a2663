// src/scoring/mod.rs

//! Answer scoring.
//!
//! Every quiz submission is resolved to a question id, checked against the
//! [`AnswerKey`] and filed in the session's [`AnswerLedger`]. Quiz totals are
//! always recomputed from the ledger, never stored alongside it.

pub mod answer_key;
pub mod ledger;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{
    answer::{EssayAnswer, NO_KEY, QuizAnswer, Selection, SubmittedAnswer},
    person::EssayField,
};

pub use answer_key::{AnswerKey, QuestionMap, QuestionRef};
pub use ledger::AnswerLedger;

/// One of the three scored quizzes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QuizNumber {
    One,
    Two,
    Three,
}

impl QuizNumber {
    pub const ALL: [QuizNumber; 3] = [QuizNumber::One, QuizNumber::Two, QuizNumber::Three];

    pub fn number(self) -> u8 {
        match self {
            QuizNumber::One => 1,
            QuizNumber::Two => 2,
            QuizNumber::Three => 3,
        }
    }

    /// Question count of the quiz. Fixed, so a skipped question still counts
    /// against the participant.
    pub fn total(self) -> u32 {
        match self {
            QuizNumber::One | QuizNumber::Two => 5,
            QuizNumber::Three => 4,
        }
    }

    /// Question id prefix, e.g. `Quiz2Q`.
    pub fn prefix(self) -> String {
        format!("Quiz{}Q", self.number())
    }
}

impl TryFrom<u8> for QuizNumber {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(QuizNumber::One),
            2 => Ok(QuizNumber::Two),
            3 => Ok(QuizNumber::Three),
            other => Err(format!("quiz number must be 1, 2 or 3, got {}", other)),
        }
    }
}

impl From<QuizNumber> for u8 {
    fn from(quiz: QuizNumber) -> Self {
        quiz.number()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    pub score: u32,
    pub total: u32,
}

/// Results screen payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalScores {
    pub quiz1_score: QuizScore,
    pub quiz2_score: QuizScore,
    pub quiz3_score: QuizScore,
    pub total_score: u32,
}

/// Scores answer submissions against a fixed key and question map.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    key: AnswerKey,
    questions: QuestionMap,
}

impl ScoringEngine {
    pub fn new(key: AnswerKey, questions: QuestionMap) -> Self {
        Self { key, questions }
    }

    /// Engine loaded with the production key and component map.
    pub fn standard() -> Self {
        Self::new(AnswerKey::standard(), QuestionMap::standard())
    }

    pub fn resolve(&self, component_name: &str) -> QuestionRef {
        self.questions.resolve(component_name)
    }

    /// Scores one submission and files it in `ledger`, replacing any earlier
    /// answer to the same question.
    pub fn record_answer(
        &self,
        ledger: &mut AnswerLedger,
        component_name: &str,
        selection: impl Into<Selection>,
    ) -> QuizAnswer {
        let options = selection.into().into_options();

        let reference = self.resolve(component_name);
        if !reference.is_resolved() {
            tracing::debug!(component = component_name, "component has no question mapping, using name as id");
        }
        let question_id = reference.into_question_id();

        let key = self.key.get(&question_id);
        let is_correct = is_correct(key, &options);
        if key.is_none() {
            tracing::warn!(
                question_id = %question_id,
                is_correct,
                "no correct answer defined for question"
            );
        }

        let answer = QuizAnswer {
            question_id: question_id.clone(),
            selected_options: options,
            is_correct,
            correct_answer: key.unwrap_or(NO_KEY).to_string(),
            timestamp: Utc::now(),
        };

        ledger.upsert(question_id, SubmittedAnswer::Quiz(answer.clone()));
        answer
    }
}

/// Correctness of a selection.
///
/// With a key: any option that, trimmed and lowercased, equals the lowercased
/// key. A selection holding the right option plus wrong ones still counts.
/// Without a key: any non-empty selection.
pub fn is_correct(key: Option<&str>, options: &[String]) -> bool {
    match key {
        Some(key) => {
            let key = key.to_lowercase();
            options.iter().any(|o| o.trim().to_lowercase() == key)
        }
        None => !options.is_empty(),
    }
}

/// Files an essay in the ledger under `essay1` / `essay2`.
pub fn record_essay(ledger: &mut AnswerLedger, field: EssayField, text: String) -> EssayAnswer {
    let answer = EssayAnswer {
        question_id: field.key().to_string(),
        answer: text,
        timestamp: Utc::now(),
    };
    ledger.upsert(field.key(), SubmittedAnswer::Essay(answer.clone()));
    answer
}

pub fn compute_quiz_score(quiz: QuizNumber, ledger: &AnswerLedger) -> QuizScore {
    let prefix = quiz.prefix();
    let score = ledger
        .quiz_answers()
        .filter(|(key, answer)| key.starts_with(&prefix) || answer.question_id.starts_with(&prefix))
        .filter(|(_, answer)| answer.is_correct)
        .count() as u32;

    QuizScore {
        score,
        total: quiz.total(),
    }
}

pub fn compute_grand_total(ledger: &AnswerLedger) -> u32 {
    QuizNumber::ALL
        .into_iter()
        .map(|quiz| compute_quiz_score(quiz, ledger).score)
        .sum()
}

pub fn final_scores(ledger: &AnswerLedger) -> FinalScores {
    let quiz1_score = compute_quiz_score(QuizNumber::One, ledger);
    let quiz2_score = compute_quiz_score(QuizNumber::Two, ledger);
    let quiz3_score = compute_quiz_score(QuizNumber::Three, ledger);

    FinalScores {
        quiz1_score,
        quiz2_score,
        quiz3_score,
        total_score: quiz1_score.score + quiz2_score.score + quiz3_score.score,
    }
}
