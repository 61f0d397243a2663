// src/scoring/answer_key.rs

use std::collections::HashMap;

/// Correct option per question id. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct AnswerKey {
    answers: HashMap<String, String>,
}

impl AnswerKey {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            answers: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The production key for the three quizzes.
    pub fn standard() -> Self {
        Self::new([
            ("Quiz1Q1", "a"),
            ("Quiz1Q2", "d"),
            ("Quiz1Q3", "d"),
            ("Quiz1Q4", "a"),
            ("Quiz1Q5", "e"),
            ("Quiz2Q1", "d"),
            ("Quiz2Q2", "b"),
            ("Quiz2Q3", "a"),
            ("Quiz2Q4", "a"),
            ("Quiz2Q5", "c"),
            ("Quiz3Q1", "d"),
            ("Quiz3Q2", "b"),
            ("Quiz3Q3", "b"),
            ("Quiz3Q4", "a"),
        ])
    }

    pub fn get(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

/// Outcome of looking a component name up in the [`QuestionMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionRef {
    Resolved(String),
    Unmapped(String),
}

impl QuestionRef {
    /// The id to file the answer under. Unmapped names are used verbatim.
    pub fn into_question_id(self) -> String {
        match self {
            QuestionRef::Resolved(id) | QuestionRef::Unmapped(id) => id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, QuestionRef::Resolved(_))
    }
}

/// Maps UI component names onto canonical question ids.
#[derive(Debug, Clone, Default)]
pub struct QuestionMap {
    ids: HashMap<String, String>,
}

impl QuestionMap {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            ids: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// logical-N → Quiz1QN, numerical-N → Quiz2QN,
    /// data-interpretation-N → Quiz3QN.
    pub fn standard() -> Self {
        let sections = [("logical", 1, 5), ("numerical", 2, 5), ("data-interpretation", 3, 4)];
        Self::new(sections.into_iter().flat_map(|(prefix, quiz, count)| {
            (1..=count).map(move |n| (format!("{}-{}", prefix, n), format!("Quiz{}Q{}", quiz, n)))
        }))
    }

    pub fn resolve(&self, component_name: &str) -> QuestionRef {
        match self.ids.get(component_name) {
            Some(id) => QuestionRef::Resolved(id.clone()),
            None => QuestionRef::Unmapped(component_name.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_key_covers_fourteen_questions() {
        let key = AnswerKey::standard();
        assert_eq!(key.len(), 14);
        assert_eq!(key.get("Quiz1Q5"), Some("e"));
        assert_eq!(key.get("Quiz3Q4"), Some("a"));
        assert_eq!(key.get("essay1"), None);
    }

    #[test]
    fn standard_map_resolves_every_section() {
        let map = QuestionMap::standard();
        assert_eq!(map.resolve("logical-1"), QuestionRef::Resolved("Quiz1Q1".to_string()));
        assert_eq!(map.resolve("numerical-5"), QuestionRef::Resolved("Quiz2Q5".to_string()));
        assert_eq!(
            map.resolve("data-interpretation-4"),
            QuestionRef::Resolved("Quiz3Q4".to_string())
        );
        assert_eq!(map.resolve("data-interpretation-5"), QuestionRef::Unmapped("data-interpretation-5".to_string()));
    }

    #[test]
    fn unmapped_name_is_used_verbatim() {
        let map = QuestionMap::standard();
        let reference = map.resolve("Quiz2Q3");
        assert!(!reference.is_resolved());
        assert_eq!(reference.into_question_id(), "Quiz2Q3");
    }
}
