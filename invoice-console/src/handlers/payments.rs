//! Payment session endpoints driven by the browser's payment dialog.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use console_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{SessionView, SetAmountRequest};
use crate::payments::CardSubmission;
use crate::AppState;

pub async fn open_session(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let view = state.workflow.open(&invoice_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.workflow.view(session_id).await?))
}

/// Partial-payment toggle and amount field. Bound violations come back inline as 422.
pub async fn set_amount(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SetAmountRequest>,
) -> Result<Json<SessionView>, AppError> {
    let view = state
        .workflow
        .set_amount(session_id, payload.partial, payload.amount)
        .await?;
    Ok(Json(view))
}

pub async fn pay(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.workflow.pay(session_id).await?))
}

pub async fn confirm(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    payload: Option<Json<CardSubmission>>,
) -> Result<Json<SessionView>, AppError> {
    let submission = payload.map(|Json(submission)| submission).unwrap_or_default();
    Ok(Json(state.workflow.confirm(session_id, submission).await?))
}

pub async fn retry(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.workflow.retry(session_id).await?))
}

pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.workflow.close(session_id).await?))
}
