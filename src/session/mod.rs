// src/session/mod.rs

//! Live participant sessions: where each participant is in the funnel and
//! what they have answered so far.

pub mod scene;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{person::EssayField, score::ScoreSubmission},
    scoring::{AnswerLedger, FinalScores, final_scores},
};

pub use scene::Scene;

/// Where a session stands with the final write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Unsaved,
    /// A `finish` request is writing right now.
    Saving,
    Saved,
}

/// What `begin_save` decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStart {
    /// The caller owns the write and must report back via `end_save`.
    Write(ScoreSubmission),
    AlreadySaved,
}

#[derive(Debug, Clone)]
pub struct FunnelSession {
    pub id: Uuid,
    pub person_id: Uuid,
    pub name: String,
    pub scene: Scene,
    pub ledger: AnswerLedger,
    pub save: SaveState,
    pub started_at: Instant,
}

impl FunnelSession {
    pub fn new(person_id: Uuid, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            person_id,
            name,
            scene: Scene::AFTER_REGISTRATION,
            ledger: AnswerLedger::new(),
            save: SaveState::Unsaved,
            started_at: Instant::now(),
        }
    }

    pub fn scores(&self) -> FinalScores {
        final_scores(&self.ledger)
    }

    /// Payload for `FunnelStore::upsert_score`.
    pub fn submission(&self) -> ScoreSubmission {
        let scores = self.scores();
        let essay = |field| self.ledger.essay(field).map(|e| e.answer.clone());
        ScoreSubmission {
            quiz1_score: scores.quiz1_score.score as i32,
            quiz2_score: scores.quiz2_score.score as i32,
            quiz3_score: scores.quiz3_score.score as i32,
            essay1_answer: essay(EssayField::Essay1),
            essay2_answer: essay(EssayField::Essay2),
        }
    }

    /// Answers are frozen once the session reaches the closing screen or a
    /// save has started.
    pub fn ensure_open(&self) -> Result<(), AppError> {
        if self.scene.is_terminal() || self.save != SaveState::Unsaved {
            return Err(AppError::Conflict(
                "The funnel is complete, answers can no longer change".to_string(),
            ));
        }
        Ok(())
    }

    pub fn advance(&mut self) -> Result<Scene, AppError> {
        let next = self
            .scene
            .next()
            .ok_or_else(|| AppError::Conflict("The funnel is already complete".to_string()))?;
        self.scene = next;
        Ok(next)
    }

    /// Steps back one screen. Registration is not reachable again from a
    /// session, it already happened.
    pub fn retreat(&mut self) -> Result<Scene, AppError> {
        match self.scene.back() {
            Some(previous) if previous != Scene::Registration => {
                self.scene = previous;
                Ok(previous)
            }
            _ => Err(AppError::Conflict(format!("Cannot go back from {}", self.scene))),
        }
    }

    /// Moves the session to the closing screen and claims the final write.
    /// A second caller while a write is in flight gets a conflict.
    pub fn begin_save(&mut self) -> Result<SaveStart, AppError> {
        self.scene = Scene::Closing;
        match self.save {
            SaveState::Saved => Ok(SaveStart::AlreadySaved),
            SaveState::Saving => Err(AppError::Conflict(
                "Your scores are already being saved".to_string(),
            )),
            SaveState::Unsaved => {
                self.save = SaveState::Saving;
                Ok(SaveStart::Write(self.submission()))
            }
        }
    }

    /// Records how the write claimed by `begin_save` ended. A failed write
    /// can be retried.
    pub fn end_save(&mut self, saved: bool) {
        self.save = if saved {
            SaveState::Saved
        } else {
            SaveState::Unsaved
        };
    }
}

/// In-memory session table shared by the HTTP handlers.
///
/// Entries live as long as the token that reaches them; older ones are
/// dropped on every insert and by `sweep_expired`.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, FunnelSession>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn insert(&self, session: FunnelSession) {
        let mut sessions = self.sessions.lock().await;
        let ttl = self.ttl;
        sessions.retain(|_, s| s.started_at.elapsed() < ttl);
        sessions.insert(session.id, session);
    }

    /// Drops sessions older than the token lifetime. Returns how many went.
    pub async fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, s| s.started_at.elapsed() < ttl);
        before - sessions.len()
    }

    /// Runs `f` against the session under the registry lock. Keep `f` free of
    /// I/O.
    pub async fn with<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut FunnelSession) -> R,
    ) -> Result<R, AppError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        Ok(f(session))
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{ScoringEngine, record_essay};

    fn session() -> FunnelSession {
        FunnelSession::new(Uuid::new_v4(), "Rina".to_string())
    }

    #[test]
    fn submission_carries_scores_and_essays() {
        let engine = ScoringEngine::standard();
        let mut session = session();
        engine.record_answer(&mut session.ledger, "logical-1", "a");
        engine.record_answer(&mut session.ledger, "data-interpretation-2", "b");
        record_essay(&mut session.ledger, EssayField::Essay2, "because".to_string());

        let submission = session.submission();
        assert_eq!(submission.quiz1_score, 1);
        assert_eq!(submission.quiz2_score, 0);
        assert_eq!(submission.quiz3_score, 1);
        assert_eq!(submission.essay1_answer, None);
        assert_eq!(submission.essay2_answer.as_deref(), Some("because"));
    }

    #[test]
    fn cannot_step_back_into_registration() {
        let mut session = session();
        assert_eq!(session.scene, Scene::SqlTutorial);

        match session.retreat() {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "Cannot go back from sqlTutorial"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(session.advance().unwrap(), Scene::Quiz1Cover);
        assert_eq!(session.retreat().unwrap(), Scene::SqlTutorial);
    }

    #[test]
    fn save_is_claimed_once() {
        let mut session = session();
        assert!(session.ensure_open().is_ok());

        assert!(matches!(session.begin_save(), Ok(SaveStart::Write(_))));
        assert_eq!(session.scene, Scene::Closing);
        assert!(matches!(session.begin_save(), Err(AppError::Conflict(_))));
        assert!(session.ensure_open().is_err());

        session.end_save(true);
        assert_eq!(session.begin_save().unwrap(), SaveStart::AlreadySaved);
    }

    #[test]
    fn failed_save_can_be_retried() {
        let mut session = session();
        session.begin_save().unwrap();
        session.end_save(false);

        assert_eq!(session.save, SaveState::Unsaved);
        // Still on the closing screen, so the ledger stays frozen.
        assert!(session.ensure_open().is_err());
        assert!(matches!(session.begin_save(), Ok(SaveStart::Write(_))));
    }

    #[tokio::test]
    async fn registry_reports_missing_session() {
        let registry = SessionRegistry::new(Duration::from_secs(600));
        let result = registry.with(Uuid::new_v4(), |s| s.scene).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let session = session();
        let id = session.id;
        registry.insert(session).await;
        assert_eq!(registry.with(id, |s| s.advance()).await.unwrap().unwrap(), Scene::Quiz1Cover);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped() {
        let registry = SessionRegistry::new(Duration::ZERO);
        let first = session();
        let first_id = first.id;
        registry.insert(first).await;
        registry.insert(session()).await;

        assert_eq!(registry.len().await, 1);
        assert!(registry.with(first_id, |_| ()).await.is_err());
        assert_eq!(registry.sweep_expired().await, 1);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn live_sessions_survive_a_sweep() {
        let registry = SessionRegistry::new(Duration::from_secs(600));
        registry.insert(session()).await;
        registry.insert(session()).await;

        assert_eq!(registry.sweep_expired().await, 0);
        assert_eq!(registry.len().await, 2);
    }
}
