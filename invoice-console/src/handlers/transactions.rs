//! Payment history and refunds.

use axum::{
    extract::{Path, State},
    Json,
};
use console_core::error::AppError;

use crate::dtos::TransactionResponse;
use crate::payments::RefundReceipt;
use crate::AppState;

pub async fn list_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let history = state.records.payment_history().await?;
    Ok(Json(history.into_iter().map(TransactionResponse::from).collect()))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = state.records.payment_history_item(&id).await?;
    Ok(Json(TransactionResponse::from(transaction)))
}

/// Refund a settled payment. Ineligible transactions are refused with 422 before the
/// backend is contacted.
pub async fn refund_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RefundReceipt>, AppError> {
    tracing::info!(transaction_id = %id, "Refund requested");

    let transaction = state.records.payment_history_item(&id).await?;
    let receipt = state.refunds.refund(&transaction).await?;
    Ok(Json(receipt))
}
