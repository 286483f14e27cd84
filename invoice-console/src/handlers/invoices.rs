use axum::{
    extract::{Path, State},
    Json,
};
use console_core::error::AppError;

use crate::dtos::PaymentLinkResponse;
use crate::models::Invoice;
use crate::services::formatting::{payment_link, payment_request_message};
use crate::AppState;

/// Shareable link and message for requesting payment on an invoice.
pub async fn get_payment_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentLinkResponse>, AppError> {
    let invoice: Invoice = state.records.get(&id).await?;
    let public_url = &state.settings.server.public_url;

    Ok(Json(PaymentLinkResponse {
        link: payment_link(public_url, &invoice.id),
        message: payment_request_message(&invoice, public_url),
        invoice_id: invoice.id,
    }))
}
