//! Payment history records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amount::lenient;
use super::invoice::DEFAULT_CURRENCY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Payment,
    Refund,
}

/// Mirrors the processor's payment intent states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::RequiresPaymentMethod => "requires_payment_method",
            PaymentStatus::RequiresConfirmation => "requires_confirmation",
            PaymentStatus::RequiresAction => "requires_action",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "requires_payment_method" => Some(PaymentStatus::RequiresPaymentMethod),
            "requires_confirmation" => Some(PaymentStatus::RequiresConfirmation),
            "requires_action" => Some(PaymentStatus::RequiresAction),
            "processing" => Some(PaymentStatus::Processing),
            "succeeded" => Some(PaymentStatus::Succeeded),
            "canceled" => Some(PaymentStatus::Canceled),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    /// Display label used in payment history listings.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::RequiresPaymentMethod => "Requires Payment Method",
            PaymentStatus::RequiresConfirmation => "Requires Confirmation",
            PaymentStatus::RequiresAction => "Requires Action",
            PaymentStatus::Processing => "Processing",
            PaymentStatus::Succeeded => "Completed",
            PaymentStatus::Canceled => "Canceled",
            PaymentStatus::Refunded => "Refunded",
        }
    }
}

/// A payment or refund against an invoice. `amount_paid` is stored as a positive
/// magnitude; the type tag decides its sign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: String,
    #[serde(default)]
    pub transaction_time: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient")]
    pub amount_paid: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub business_owner: String,
    #[serde(default)]
    pub business_owner_name: String,
    #[serde(default)]
    pub invoice: String,
    #[serde(default)]
    pub invoice_number: String,
    pub transaction_type: TransactionType,
    /// Processor payment reference, used as the refund handle.
    #[serde(default)]
    pub stripe_payment: Option<String>,
    pub status: PaymentStatus,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl PaymentTransaction {
    /// Contribution to paid-to-date: refunds count negatively.
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Payment => self.amount_paid.abs(),
            TransactionType::Refund => -self.amount_paid.abs(),
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.transaction_type {
            TransactionType::Refund => PaymentStatus::Refunded.label(),
            TransactionType::Payment => self.status.label(),
        }
    }

    pub fn payment_reference(&self) -> Option<&str> {
        self.stripe_payment.as_deref().filter(|r| !r.trim().is_empty())
    }
}
