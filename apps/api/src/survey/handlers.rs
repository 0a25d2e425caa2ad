//! Axum route handlers for the Survey API.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::catalog::ReferenceData;
use crate::models::profile::ProfileDraft;
use crate::survey::machine::SurveyFlow;
use crate::survey::session::SurveyView;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSurveyRequest {
    pub flow: Option<SurveyFlow>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    #[serde(deserialize_with = "crate::models::question::deserialize_id")]
    pub option_id: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/reference
pub async fn handle_reference(
    State(state): State<AppState>,
) -> Result<Json<ReferenceData>, AppError> {
    let reference = state.reference().await?;
    Ok(Json(reference.as_ref().clone()))
}

/// POST /api/v1/surveys
///
/// Opens a session at the intro step. The body is optional; when present it
/// must be a valid `CreateSurveyRequest`. The flow defaults to `SURVEY_FLOW`.
pub async fn handle_create_survey(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SurveyView>), AppError> {
    let request = parse_create_request(&body)?;
    let flow = request.flow.unwrap_or(state.config.survey_flow);
    let user_id = request
        .user_id
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let reference = state.reference().await?;
    let handle = state.sessions.create(flow, user_id).await;
    let session = handle.lock().await;
    Ok((StatusCode::CREATED, Json(session.view(&reference))))
}

fn parse_create_request(body: &[u8]) -> Result<CreateSurveyRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateSurveyRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(vec![format!("Invalid survey request: {e}")]))
}

/// GET /api/v1/surveys/:id
pub async fn handle_get_survey(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SurveyView>, AppError> {
    let handle = state.sessions.get(id).await?;
    let reference = state.reference().await?;
    let session = handle.lock().await;
    Ok(Json(session.view(&reference)))
}

/// DELETE /api/v1/surveys/:id
pub async fn handle_delete_survey(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/surveys/:id/start
pub async fn handle_start(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SurveyView>, AppError> {
    let handle = state.sessions.get(id).await?;
    let reference = state.reference().await?;
    let mut session = handle.lock().await;
    session.start()?;
    Ok(Json(session.view(&reference)))
}

/// POST /api/v1/surveys/:id/intake
///
/// Validates the profile form and loads the first question round.
/// Every missing field is reported in `error.details`.
pub async fn handle_intake(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<ProfileDraft>,
) -> Result<Json<SurveyView>, AppError> {
    let handle = state.sessions.get(id).await?;
    let reference = state.reference().await?;
    let mut session = handle.lock().await;
    session
        .submit_intake(&draft, state.scorer.as_ref(), &reference)
        .await?;
    Ok(Json(session.view(&reference)))
}

/// POST /api/v1/surveys/:id/answers
///
/// The session lock is held across any scoring call this answer triggers,
/// so a second request for the same survey waits for the first to settle.
pub async fn handle_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<SurveyView>, AppError> {
    let handle = state.sessions.get(id).await?;
    let reference = state.reference().await?;
    let mut session = handle.lock().await;
    session
        .answer(&request.option_id, state.scorer.as_ref(), &reference)
        .await?;
    Ok(Json(session.view(&reference)))
}

/// POST /api/v1/surveys/:id/back
pub async fn handle_back(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SurveyView>, AppError> {
    let handle = state.sessions.get(id).await?;
    let reference = state.reference().await?;
    let mut session = handle.lock().await;
    session.back()?;
    Ok(Json(session.view(&reference)))
}

/// POST /api/v1/surveys/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SurveyView>, AppError> {
    let handle = state.sessions.get(id).await?;
    let reference = state.reference().await?;
    let mut session = handle.lock().await;
    session.reset();
    Ok(Json(session.view(&reference)))
}
