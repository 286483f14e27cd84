use axum::{
    extract::{Path, State},
    Json,
};
use console_core::error::AppError;

use crate::models::InvoiceStats;
use crate::AppState;

pub async fn customer_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceStats>, AppError> {
    let stats = state.records.customer_stats(&id).await?;
    Ok(Json(stats))
}

pub async fn business_owner_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceStats>, AppError> {
    let stats = state.records.business_owner_stats(&id).await?;
    Ok(Json(stats))
}
