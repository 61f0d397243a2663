// src/store/memory.rs

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{
        person::{NewPerson, PersonFieldsUpdate, PersonRecord},
        score::{ScoreRecord, ScoreSubmission},
    },
    store::FunnelStore,
};

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    CreatePerson,
    FindPersonsByEmail,
    ListDuplicateEmails,
    FindScoreByPerson,
    ReassignScoreOwner,
    UpdatePersonFields,
    DeletePerson,
    UpsertScore,
}

#[derive(Debug, Default)]
struct Tables {
    persons: Vec<PersonRecord>,
    scores: Vec<ScoreRecord>,
    failing: HashSet<StoreOp>,
}

impl Tables {
    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.failing.contains(&op) {
            return Err(StoreError::Database(format!("injected failure on {:?}", op)));
        }
        Ok(())
    }

    fn person_mut(&mut self, id: Uuid) -> Result<&mut PersonRecord, StoreError> {
        self.persons
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("person {}", id)))
    }
}

/// In-process `FunnelStore`. Holds both tables behind one lock and mirrors
/// the PostgreSQL semantics: no unique email, no enforced score foreign key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_person(&self, person: PersonRecord) {
        self.tables.lock().await.persons.push(person);
    }

    pub async fn insert_score(&self, score: ScoreRecord) {
        self.tables.lock().await.scores.push(score);
    }

    pub async fn persons(&self) -> Vec<PersonRecord> {
        self.tables.lock().await.persons.clone()
    }

    pub async fn scores(&self) -> Vec<ScoreRecord> {
        self.tables.lock().await.scores.clone()
    }

    pub async fn person(&self, id: Uuid) -> Option<PersonRecord> {
        self.tables
            .lock()
            .await
            .persons
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    /// Every later call to `op` fails with a database error.
    pub async fn fail(&self, op: StoreOp) {
        self.tables.lock().await.failing.insert(op);
    }

    pub async fn recover(&self, op: StoreOp) {
        self.tables.lock().await.failing.remove(&op);
    }
}

#[async_trait]
impl FunnelStore for MemoryStore {
    async fn create_person(&self, person: NewPerson) -> Result<PersonRecord, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.check(StoreOp::CreatePerson)?;

        let record = PersonRecord {
            id: Uuid::new_v4(),
            name: person.name,
            email: Some(person.email),
            created_at: Utc::now(),
            essay1_answer: None,
            essay2_answer: None,
        };
        tables.persons.push(record.clone());
        Ok(record)
    }

    async fn find_persons_by_email(&self, email: &str) -> Result<Vec<PersonRecord>, StoreError> {
        let tables = self.tables.lock().await;
        tables.check(StoreOp::FindPersonsByEmail)?;

        let mut persons: Vec<PersonRecord> = tables
            .persons
            .iter()
            .filter(|p| p.email.as_deref() == Some(email))
            .cloned()
            .collect();
        persons.sort_by_key(|p| p.created_at);
        Ok(persons)
    }

    async fn list_duplicate_emails(&self) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.lock().await;
        tables.check(StoreOp::ListDuplicateEmails)?;

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for email in tables.persons.iter().filter_map(|p| p.email.as_deref()) {
            if !email.is_empty() {
                *counts.entry(email).or_default() += 1;
            }
        }

        Ok(counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(email, _)| email.to_string())
            .collect())
    }

    async fn find_score_by_person(&self, person_id: Uuid) -> Result<Option<ScoreRecord>, StoreError> {
        let tables = self.tables.lock().await;
        tables.check(StoreOp::FindScoreByPerson)?;

        let mut matches = tables.scores.iter().filter(|s| s.person == person_id);
        let first = matches.next().cloned();
        if matches.next().is_some() {
            return Err(StoreError::Database(format!(
                "multiple score rows for person {}",
                person_id
            )));
        }
        Ok(first)
    }

    async fn reassign_score_owner(&self, from: Uuid, to: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.check(StoreOp::ReassignScoreOwner)?;

        let mut moved = 0;
        for score in tables.scores.iter_mut().filter(|s| s.person == from) {
            score.person = to;
            moved += 1;
        }
        Ok(moved)
    }

    async fn update_person_fields(
        &self,
        person_id: Uuid,
        fields: &PersonFieldsUpdate,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.check(StoreOp::UpdatePersonFields)?;

        if fields.is_empty() {
            return Ok(());
        }
        let person = tables.person_mut(person_id)?;
        for field in fields.fields() {
            if let Some(value) = fields.get(field) {
                person.set_essay(field, value.to_string());
            }
        }
        Ok(())
    }

    async fn delete_person(&self, person_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.check(StoreOp::DeletePerson)?;

        let before = tables.persons.len();
        tables.persons.retain(|p| p.id != person_id);
        if tables.persons.len() == before {
            return Err(StoreError::NotFound(format!("person {}", person_id)));
        }
        Ok(())
    }

    async fn upsert_score(
        &self,
        person_id: Uuid,
        submission: &ScoreSubmission,
    ) -> Result<ScoreRecord, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.check(StoreOp::UpsertScore)?;

        let person = tables.person_mut(person_id)?;
        if let Some(essay) = &submission.essay1_answer {
            person.essay1_answer = Some(essay.clone());
        }
        if let Some(essay) = &submission.essay2_answer {
            person.essay2_answer = Some(essay.clone());
        }

        // Same row the PostgreSQL store picks: the oldest one for the person.
        let oldest = tables
            .scores
            .iter_mut()
            .filter(|s| s.person == person_id)
            .min_by_key(|s| s.created_at);
        if let Some(score) = oldest {
            score.quiz_one_score = submission.quiz1_score;
            score.quiz_two_score = submission.quiz2_score;
            score.quiz_three_score = submission.quiz3_score;
            return Ok(score.clone());
        }

        let record = ScoreRecord {
            id: Uuid::new_v4(),
            person: person_id,
            quiz_one_score: submission.quiz1_score,
            quiz_two_score: submission.quiz2_score,
            quiz_three_score: submission.quiz3_score,
            created_at: Utc::now(),
        };
        tables.scores.push(record.clone());
        Ok(record)
    }
}
