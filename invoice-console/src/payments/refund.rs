//! Refunds of settled card payments.

use async_trait::async_trait;
use console_core::error::AppError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::invalidation::CacheInvalidationCoordinator;
use crate::models::amount::lenient;
use crate::models::invoice::DEFAULT_CURRENCY;
use crate::models::{PaymentStatus, PaymentTransaction, TransactionType};
use crate::services::api_client::ApiError;
use crate::services::formatting::format_currency;
use crate::services::metrics;
use crate::services::notifications::{Notifier, REFUND_FAILED_TITLE, REFUND_SUCCESS_TITLE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundReceipt {
    #[serde(default)]
    pub payment_id: String,
    #[serde(default, with = "lenient")]
    pub amount_refunded: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub invoice_id: String,
    #[serde(default)]
    pub invoice_number: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Why a transaction cannot be refunded. Checked before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RefundRejection {
    #[error("Only payments can be refunded")]
    NotAPayment,
    #[error("Payment has no processor reference")]
    MissingReference,
    #[error("Payment has no amount to refund")]
    NothingToRefund,
    #[error("Only succeeded payments can be refunded")]
    NotSucceeded,
}

#[derive(Debug, Error)]
pub enum RefundError {
    #[error(transparent)]
    Rejected(#[from] RefundRejection),
    #[error(transparent)]
    Backend(#[from] ApiError),
}

impl From<RefundError> for AppError {
    fn from(err: RefundError) -> Self {
        match err {
            RefundError::Rejected(rejection) => AppError::Unprocessable(rejection.to_string()),
            RefundError::Backend(e) => e.into(),
        }
    }
}

/// Returns the processor reference to refund against.
pub fn refund_eligibility(transaction: &PaymentTransaction) -> Result<&str, RefundRejection> {
    if transaction.transaction_type != TransactionType::Payment {
        return Err(RefundRejection::NotAPayment);
    }
    let reference = transaction
        .payment_reference()
        .ok_or(RefundRejection::MissingReference)?;
    if transaction.amount_paid <= Decimal::ZERO {
        return Err(RefundRejection::NothingToRefund);
    }
    if transaction.status != PaymentStatus::Succeeded {
        return Err(RefundRejection::NotSucceeded);
    }
    Ok(reference)
}

pub fn is_refundable(transaction: &PaymentTransaction) -> bool {
    refund_eligibility(transaction).is_ok()
}

#[async_trait]
pub trait RefundRequester: Send + Sync {
    async fn refund_payment(&self, payment_reference: &str) -> Result<RefundReceipt, ApiError>;
}

#[derive(Clone)]
pub struct RefundCoordinator {
    requester: Arc<dyn RefundRequester>,
    invalidation: CacheInvalidationCoordinator,
    notifier: Notifier,
}

impl RefundCoordinator {
    pub fn new(
        requester: Arc<dyn RefundRequester>,
        invalidation: CacheInvalidationCoordinator,
        notifier: Notifier,
    ) -> Self {
        Self {
            requester,
            invalidation,
            notifier,
        }
    }

    #[tracing::instrument(skip(self, transaction), fields(transaction_id = %transaction.id))]
    pub async fn refund(&self, transaction: &PaymentTransaction) -> Result<RefundReceipt, RefundError> {
        let reference = match refund_eligibility(transaction) {
            Ok(reference) => reference,
            Err(rejection) => {
                tracing::info!(reason = %rejection, "Refund refused");
                metrics::record_refund("refused");
                return Err(rejection.into());
            }
        };

        match self.requester.refund_payment(reference).await {
            Ok(receipt) => {
                metrics::record_refund("succeeded");
                let invoice_id = if receipt.invoice_id.is_empty() {
                    transaction.invoice.as_str()
                } else {
                    receipt.invoice_id.as_str()
                };
                self.invalidation.refund_succeeded(invoice_id);

                let message = format!(
                    "Refunded {} for invoice {}",
                    format_currency(receipt.amount_refunded, &receipt.currency),
                    receipt.invoice_number
                );
                self.notifier.success(REFUND_SUCCESS_TITLE, &message);
                Ok(receipt)
            }
            Err(e) => {
                metrics::record_refund("failed");
                tracing::warn!(kind = e.kind(), error = %e, "Refund failed");
                self.notifier.error(REFUND_FAILED_TITLE, &e.to_string());
                Err(e.into())
            }
        }
    }
}
