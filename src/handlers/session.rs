// src/handlers/session.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        answer::{AnswerRequest, EssayRequest},
        person::RegisterRequest,
    },
    scoring::{FinalScores, ScoringEngine, record_essay},
    session::{FunnelSession, SaveStart, SessionRegistry},
    store::DynStore,
    utils::{html::clean_html, jwt::{Claims, sign_jwt}},
};

/// Shown on the results screen when the final write fails.
pub const SAVE_FAILED_WARNING: &str = "Failed to save your scores. Please try again.";

/// Registers a participant and opens their funnel session.
///
/// Creates the person record, starts the session at the SQL tutorial and
/// returns a bearer token for the rest of the funnel.
pub async fn register(
    State(store): State<DynStore>,
    State(sessions): State<Arc<SessionRegistry>>,
    State(config): State<Config>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.email = payload.email.trim().to_string();
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let person = store
        .create_person(payload.into_new_person())
        .await
        .map_err(|e| {
            tracing::error!("Failed to register participant: {:?}", e);
            AppError::from(e)
        })?;

    let session = FunnelSession::new(person.id, person.name.clone());
    let token = sign_jwt(session.id, person.id, &config.jwt_secret, config.jwt_expiration)?;
    let session_id = session.id;
    let scene = session.scene;
    sessions.insert(session).await;

    tracing::info!(session = %session_id, person = %person.id, "Participant registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "type": "Bearer",
            "session_id": session_id,
            "person_id": person.id,
            "scene": scene,
        })),
    ))
}

/// Scores one quiz answer and files it in the session ledger.
pub async fn submit_answer(
    State(engine): State<Arc<ScoringEngine>>,
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let session_id = claims.session_id()?;
    let answer = sessions
        .with(session_id, |s| {
            s.ensure_open()?;
            Ok::<_, AppError>(engine.record_answer(&mut s.ledger, &req.component, req.selected))
        })
        .await??;

    tracing::debug!(
        session = %session_id,
        question = %answer.question_id,
        correct = answer.is_correct,
        "Answer recorded"
    );

    Ok(Json(answer))
}

/// Stores an essay answer. The text is sanitized first.
pub async fn submit_essay(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EssayRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let session_id = claims.session_id()?;
    let text = clean_html(&req.answer);
    let answer = sessions
        .with(session_id, |s| {
            s.ensure_open()?;
            Ok::<_, AppError>(record_essay(&mut s.ledger, req.essay, text))
        })
        .await??;

    Ok(Json(answer))
}

pub async fn next_scene(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let scene = sessions.with(claims.session_id()?, |s| s.advance()).await??;
    Ok(Json(json!({ "scene": scene })))
}

pub async fn previous_scene(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let scene = sessions.with(claims.session_id()?, |s| s.retreat()).await??;
    Ok(Json(json!({ "scene": scene })))
}

/// Current quiz subtotals and grand total.
pub async fn get_scores(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let scores = sessions.with(claims.session_id()?, |s| s.scores()).await?;
    Ok(Json(scores))
}

#[derive(Debug, Serialize)]
pub struct FinishResponse {
    pub scores: FinalScores,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Persists the final scores and essays and moves the session to the
/// closing screen.
///
/// A failed write never blocks the participant: the response still carries
/// the scores, with `saved: false` and a warning to show inline. Only one
/// write per session runs at a time; a concurrent finish gets 409.
pub async fn finish(
    State(store): State<DynStore>,
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = claims.session_id()?;
    let (person_id, start, scores) = sessions
        .with(session_id, |s| {
            let start = s.begin_save()?;
            Ok::<_, AppError>((s.person_id, start, s.scores()))
        })
        .await??;

    let submission = match start {
        SaveStart::AlreadySaved => {
            return Ok(Json(FinishResponse {
                scores,
                saved: true,
                warning: None,
            }));
        }
        SaveStart::Write(submission) => submission,
    };

    let result = store.upsert_score(person_id, &submission).await;
    sessions.with(session_id, |s| s.end_save(result.is_ok())).await?;

    match result {
        Ok(record) => {
            tracing::info!(session = %session_id, score = %record.id, "Final scores saved");
            Ok(Json(FinishResponse {
                scores,
                saved: true,
                warning: None,
            }))
        }
        Err(e) => {
            tracing::error!(session = %session_id, person = %person_id, "Failed to save scores: {}", e);
            Ok(Json(FinishResponse {
                scores,
                saved: false,
                warning: Some(SAVE_FAILED_WARNING.to_string()),
            }))
        }
    }
}
