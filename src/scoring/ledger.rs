// src/scoring/ledger.rs

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{
    answer::{EssayAnswer, QuizAnswer, SubmittedAnswer},
    person::EssayField,
};

/// A session's answers keyed by question id. One entry per key; a new
/// submission replaces the previous one.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct AnswerLedger {
    entries: BTreeMap<String, SubmittedAnswer>,
}

impl AnswerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `answer` under `key`, returning whatever it replaced.
    pub fn upsert(&mut self, key: impl Into<String>, answer: SubmittedAnswer) -> Option<SubmittedAnswer> {
        self.entries.insert(key.into(), answer)
    }

    pub fn get(&self, key: &str) -> Option<&SubmittedAnswer> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SubmittedAnswer)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Quiz entries with their ledger keys. Essays are skipped.
    pub fn quiz_answers(&self) -> impl Iterator<Item = (&str, &QuizAnswer)> {
        self.iter().filter_map(|(k, v)| v.as_quiz().map(|a| (k, a)))
    }

    pub fn essay(&self, field: EssayField) -> Option<&EssayAnswer> {
        self.get(field.key()).and_then(SubmittedAnswer::as_essay)
    }
}
