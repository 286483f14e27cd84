//! Payment intent creation against the backend.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::amount::lenient;
use crate::models::invoice::DEFAULT_CURRENCY;
use crate::models::Invoice;
use crate::services::api_client::ApiError;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreatePaymentIntentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub payment_amount: Option<Decimal>,
}

impl CreatePaymentIntentRequest {
    /// Full payments leave the amount to the backend; partial ones name it.
    pub fn for_invoice(invoice: &Invoice, partial: bool, amount: Decimal) -> Self {
        Self {
            customer_email: invoice.customer_email.clone(),
            payment_amount: (partial && amount > Decimal::ZERO).then_some(amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub client_secret: String,
    #[serde(rename = "payment_intent_id")]
    pub intent_id: String,
    #[serde(default, with = "lenient")]
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// One network call per invocation. Callers check amount bounds first; the requester
/// does not retry.
#[async_trait]
pub trait PaymentIntentRequester: Send + Sync {
    async fn create_payment_intent(
        &self,
        invoice_id: &str,
        request: &CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, ApiError>;
}
