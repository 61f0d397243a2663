// src/store/mod.rs

//! Repository interface over the person and score tables.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{
        person::{NewPerson, PersonFieldsUpdate, PersonRecord},
        score::{ScoreRecord, ScoreSubmission},
    },
};

pub use memory::{MemoryStore, StoreOp};
pub use postgres::PgStore;

/// Shared handle to whichever store backs the app.
pub type DynStore = Arc<dyn FunnelStore>;

#[async_trait]
pub trait FunnelStore: Send + Sync {
    async fn create_person(&self, person: NewPerson) -> Result<PersonRecord, StoreError>;

    /// Every person with exactly this email, oldest first.
    async fn find_persons_by_email(&self, email: &str) -> Result<Vec<PersonRecord>, StoreError>;

    /// Non-empty emails held by more than one person. Compared as stored,
    /// so `A@x.com` and `a@x.com` are different emails.
    async fn list_duplicate_emails(&self) -> Result<Vec<String>, StoreError>;

    /// Point lookup. More than one matching row is an error.
    async fn find_score_by_person(&self, person_id: Uuid) -> Result<Option<ScoreRecord>, StoreError>;

    /// Moves every score row owned by `from` onto `to`. Returns the number of
    /// rows moved.
    async fn reassign_score_owner(&self, from: Uuid, to: Uuid) -> Result<u64, StoreError>;

    async fn update_person_fields(
        &self,
        person_id: Uuid,
        fields: &PersonFieldsUpdate,
    ) -> Result<(), StoreError>;

    async fn delete_person(&self, person_id: Uuid) -> Result<(), StoreError>;

    /// Writes the end-of-session scores and essays for a person, updating
    /// their score row if one exists.
    async fn upsert_score(
        &self,
        person_id: Uuid,
        submission: &ScoreSubmission,
    ) -> Result<ScoreRecord, StoreError>;
}
