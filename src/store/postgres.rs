// src/store/postgres.rs

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use uuid::Uuid;

use crate::{
    config::StoreConfig,
    error::StoreError,
    models::{
        person::{NewPerson, PersonFieldsUpdate, PersonRecord},
        score::{ScoreRecord, ScoreSubmission},
    },
    store::FunnelStore,
};

const CONNECT_RETRIES: u32 = 5;

// A NULL parameter leaves the column as it is.
const UPDATE_ESSAYS_SQL: &str = r#"
    UPDATE da_personal_details
    SET essay1_answer = COALESCE($2, essay1_answer),
        essay2_answer = COALESCE($3, essay2_answer)
    WHERE id = $1
"#;

/// `FunnelStore` over PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with the configured credentials, retrying while the database
    /// comes up.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| StoreError::Unavailable(format!("invalid STORE_URL: {}", e)))?
            .password(&config.access_key);

        let mut retry_count = 0;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect_with(options.clone())
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    retry_count += 1;
                    if retry_count > CONNECT_RETRIES {
                        return Err(StoreError::Unavailable(format!(
                            "failed to connect after {} retries: {}",
                            CONNECT_RETRIES, e
                        )));
                    }
                    tracing::warn!("Store not ready, retrying in 2s... (Attempt {})", retry_count);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };

        tracing::info!("Store connected...");
        Ok(Self::new(pool))
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[async_trait]
impl FunnelStore for PgStore {
    async fn create_person(&self, person: NewPerson) -> Result<PersonRecord, StoreError> {
        let record = sqlx::query_as::<_, PersonRecord>(
            r#"
            INSERT INTO da_personal_details (id, name, email, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, created_at, essay1_answer, essay2_answer
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&person.name)
        .bind(&person.email)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create person: {:?}", e);
            StoreError::from(e)
        })?;

        Ok(record)
    }

    async fn find_persons_by_email(&self, email: &str) -> Result<Vec<PersonRecord>, StoreError> {
        let persons = sqlx::query_as::<_, PersonRecord>(
            r#"
            SELECT id, name, email, created_at, essay1_answer, essay2_answer
            FROM da_personal_details
            WHERE email = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        Ok(persons)
    }

    async fn list_duplicate_emails(&self) -> Result<Vec<String>, StoreError> {
        let emails = sqlx::query_scalar::<_, String>(
            r#"
            SELECT email
            FROM da_personal_details
            WHERE email IS NOT NULL AND email <> ''
            GROUP BY email
            HAVING COUNT(*) > 1
            ORDER BY email
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(emails)
    }

    async fn find_score_by_person(&self, person_id: Uuid) -> Result<Option<ScoreRecord>, StoreError> {
        let mut rows = sqlx::query_as::<_, ScoreRecord>(
            r#"
            SELECT id, person, quiz_one_score, quiz_two_score, quiz_three_score, created_at
            FROM da_score
            WHERE person = $1
            ORDER BY created_at ASC
            LIMIT 2
            "#,
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.len() > 1 {
            return Err(StoreError::Database(format!(
                "multiple score rows for person {}",
                person_id
            )));
        }
        Ok(rows.pop())
    }

    async fn reassign_score_owner(&self, from: Uuid, to: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE da_score SET person = $1 WHERE person = $2")
            .bind(to)
            .bind(from)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn update_person_fields(
        &self,
        person_id: Uuid,
        fields: &PersonFieldsUpdate,
    ) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }

        let result = sqlx::query(UPDATE_ESSAYS_SQL)
            .bind(person_id)
            .bind(&fields.essay1_answer)
            .bind(&fields.essay2_answer)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("person {}", person_id)));
        }
        Ok(())
    }

    async fn delete_person(&self, person_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM da_personal_details WHERE id = $1")
            .bind(person_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("person {}", person_id)));
        }
        Ok(())
    }

    async fn upsert_score(
        &self,
        person_id: Uuid,
        submission: &ScoreSubmission,
    ) -> Result<ScoreRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Locking the person row serializes concurrent saves for one person,
        // so the score lookup below cannot race another insert.
        let locked = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM da_personal_details WHERE id = $1 FOR UPDATE",
        )
        .bind(person_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(StoreError::NotFound(format!("person {}", person_id)));
        }

        let essays = PersonFieldsUpdate {
            essay1_answer: submission.essay1_answer.clone(),
            essay2_answer: submission.essay2_answer.clone(),
        };
        if !essays.is_empty() {
            sqlx::query(UPDATE_ESSAYS_SQL)
                .bind(person_id)
                .bind(&essays.essay1_answer)
                .bind(&essays.essay2_answer)
                .execute(&mut *tx)
                .await?;
        }

        // No unique constraint on `person`, so look before writing.
        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM da_score WHERE person = $1 ORDER BY created_at ASC LIMIT 1",
        )
        .bind(person_id)
        .fetch_optional(&mut *tx)
        .await?;

        let record = match existing {
            Some(score_id) => {
                sqlx::query_as::<_, ScoreRecord>(
                    r#"
                    UPDATE da_score
                    SET quiz_one_score = $2, quiz_two_score = $3, quiz_three_score = $4
                    WHERE id = $1
                    RETURNING id, person, quiz_one_score, quiz_two_score, quiz_three_score, created_at
                    "#,
                )
                .bind(score_id)
                .bind(submission.quiz1_score)
                .bind(submission.quiz2_score)
                .bind(submission.quiz3_score)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, ScoreRecord>(
                    r#"
                    INSERT INTO da_score (id, person, quiz_one_score, quiz_two_score, quiz_three_score, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING id, person, quiz_one_score, quiz_two_score, quiz_three_score, created_at
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(person_id)
                .bind(submission.quiz1_score)
                .bind(submission.quiz2_score)
                .bind(submission.quiz3_score)
                .bind(Utc::now())
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(record)
    }
}
