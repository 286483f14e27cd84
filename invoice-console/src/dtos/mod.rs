use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::amount::{lenient, lenient_option};
use crate::models::PaymentTransaction;
use crate::payments::refund::is_refundable;
use crate::payments::{PaymentFormStatus, PaymentSession};
use crate::services::formatting::{format_currency, pay_button_label};

/// What the browser renders for an open payment dialog.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub invoice_id: String,
    pub invoice_number: String,
    pub status: PaymentFormStatus,
    pub stage: &'static str,
    pub partial: bool,
    #[serde(with = "lenient")]
    pub amount: Decimal,
    #[serde(with = "lenient")]
    pub remaining: Decimal,
    pub currency: String,
    pub can_pay: bool,
    pub button_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<String>,
    /// Handed to the hosted widget; present only while the card form is mounted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_key: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,
    pub awaiting_action: bool,
    pub provisional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionView {
    pub fn from_session(session: &PaymentSession) -> Self {
        use crate::payments::PaymentFormState;

        let state = session.state();
        let invoice = session.invoice();
        let remaining = session.remaining();
        let status = if session.is_open() {
            state.status()
        } else {
            PaymentFormStatus::Cancelled
        };
        let (awaiting_action, provisional, success_intent) = match state {
            PaymentFormState::Processing {
                awaiting_action, ..
            } => (*awaiting_action, false, None),
            PaymentFormState::Success {
                intent_id,
                provisional,
                ..
            } => (false, *provisional, Some(intent_id.clone())),
            _ => (false, false, None),
        };

        Self {
            session_id: session.id(),
            invoice_id: invoice.id.clone(),
            invoice_number: invoice.invoice_number.clone(),
            status,
            stage: state.stage(),
            partial: session.partial(),
            amount: session.amount(),
            remaining,
            currency: invoice.currency_code().to_string(),
            can_pay: invoice.can_accept_payment(),
            button_label: pay_button_label(session.partial(), session.amount(), remaining),
            amount_error: session.amount_error().map(|e| e.to_string()),
            attempt_id: state.attempt_id().map(|id| id.to_string()),
            client_secret: state.intent().map(|intent| intent.client_secret.clone()),
            form_key: state.form().map(|form| form.form_key),
            intent_id: state
                .intent()
                .map(|intent| intent.intent_id.clone())
                .or(success_intent),
            awaiting_action,
            provisional,
            error: state.error_message().map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetAmountRequest {
    #[serde(default)]
    pub partial: bool,
    #[serde(default, with = "lenient_option")]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct PaymentLinkResponse {
    pub invoice_id: String,
    pub link: String,
    pub message: String,
}

/// Browser bootstrap: the publishable key the hosted widget is initialized with.
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub publishable_key: String,
    pub public_url: String,
}

/// A payment history row with the labels the console shows.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    #[serde(flatten)]
    pub transaction: PaymentTransaction,
    pub status_label: &'static str,
    pub display_amount: String,
    pub refundable: bool,
}

impl From<PaymentTransaction> for TransactionResponse {
    fn from(transaction: PaymentTransaction) -> Self {
        Self {
            status_label: transaction.status_label(),
            display_amount: format_currency(transaction.signed_amount(), &transaction.currency),
            refundable: is_refundable(&transaction),
            transaction,
        }
    }
}
