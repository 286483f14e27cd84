//! CRUD handlers shared by invoices, customers and business owners.
//!
//! Mounted once per collection with the record type fixed, e.g.
//! `get(records::list::<Customer>)`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use console_core::error::AppError;
use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

use crate::dtos::TransactionResponse;
use crate::services::Resource;
use crate::AppState;

pub async fn list<R: Resource>(State(state): State<AppState>) -> Result<Json<Vec<R>>, AppError> {
    let records = state.records.list::<R>().await?;
    Ok(Json(records))
}

pub async fn get<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<R>, AppError> {
    let record = state.records.get::<R>(&id).await?;
    Ok(Json(record))
}

pub async fn create<R, B>(
    State(state): State<AppState>,
    Json(payload): Json<B>,
) -> Result<(StatusCode, Json<R>), AppError>
where
    R: Resource,
    B: DeserializeOwned + Serialize + Validate + Send + Sync,
{
    payload.validate()?;
    tracing::info!(kind = R::SINGULAR, "Creating record");

    let created = state.records.create::<R, B>(&payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update<R, B>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<B>,
) -> Result<Json<R>, AppError>
where
    R: Resource,
    B: DeserializeOwned + Serialize + Validate + Send + Sync,
{
    payload.validate()?;
    tracing::info!(kind = R::SINGULAR, id = %id, "Updating record");

    let updated = state.records.update::<R, B>(&id, &payload).await?;
    Ok(Json(updated))
}

pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    tracing::info!(kind = R::SINGULAR, id = %id, "Deleting record");
    state.records.delete::<R>(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Payment history scoped to one record.
pub async fn payment_history<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let history = state.records.payment_history_for::<R>(&id).await?;
    Ok(Json(history.into_iter().map(TransactionResponse::from).collect()))
}
