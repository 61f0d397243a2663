// src/models/score.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'da_score' table in the database.
/// `person` is a plain foreign key; nothing stops two rows pointing at the
/// same person.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: Uuid,
    pub person: Uuid,
    pub quiz_one_score: i32,
    pub quiz_two_score: i32,
    pub quiz_three_score: i32,
    pub created_at: DateTime<Utc>,
}

/// End-of-session payload persisted through `FunnelStore::upsert_score`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub quiz1_score: i32,
    pub quiz2_score: i32,
    pub quiz3_score: i32,
    pub essay1_answer: Option<String>,
    pub essay2_answer: Option<String>,
}
