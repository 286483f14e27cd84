//! Hosted card form boundary.
//!
//! The card processor renders the card fields itself; the console only ever sees the
//! client secret, the payer's tokenized payment method and the confirmation result.
//! [`HostedCardForm`] is the narrow seam the payment workflow talks to, and
//! [`classify`] turns a confirmation result into the outcome the session applies.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ProcessorSettings;
use crate::models::PaymentStatus;

pub const CARD_DECLINED_MESSAGE: &str =
    "Your card was declined. Please try a different payment method.";
pub const INSUFFICIENT_FUNDS_MESSAGE: &str =
    "Insufficient funds. Please try a different card or payment method.";
pub const EXPIRED_CARD_MESSAGE: &str = "Your card has expired. Please use a different card.";
pub const INCORRECT_CVC_MESSAGE: &str = "Your card's security code is incorrect. Please try again.";
pub const SETUP_FAILED_MESSAGE: &str =
    "Payment setup failed. Please close this window and try again.";
pub const PROCESSING_FAILED_MESSAGE: &str = "Payment processing failed";
pub const INCOMPLETE_MESSAGE: &str = "Payment could not be completed";
pub const CARD_INCOMPLETE_MESSAGE: &str = "Your card details are incomplete.";

const AUTHENTICATION_FAILURE_CODE: &str = "payment_intent_authentication_failure";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorErrorType {
    CardError,
    ValidationError,
    ApiError,
    InvalidRequestError,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorErrorBody {
    #[serde(rename = "type")]
    pub kind: ProcessorErrorType,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ProcessorErrorBody {
    fn raw_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmedIntent {
    pub id: String,
    pub status: String,
}

/// What the processor answered to a confirmation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmationResponse {
    #[serde(default)]
    pub error: Option<ProcessorErrorBody>,
    #[serde(default)]
    pub payment_intent: Option<ConfirmedIntent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Succeeded { intent_id: String },
    /// `processing`: reported as success, settlement still pending.
    Provisional { intent_id: String },
    /// `requires_action`: the payer must finish an authentication step.
    RequiresAction { intent_id: String },
    Failed { message: String },
}

impl ConfirmationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ConfirmationOutcome::Succeeded { .. } => "succeeded",
            ConfirmationOutcome::Provisional { .. } => "provisional",
            ConfirmationOutcome::RequiresAction { .. } => "requires_action",
            ConfirmationOutcome::Failed { .. } => "failed",
        }
    }
}

/// Map a processor error to the message shown to the payer.
pub fn classify_error(error: &ProcessorErrorBody) -> String {
    let code = error.code.as_deref();
    let message = match error.kind {
        ProcessorErrorType::CardError => match code {
            Some("card_declined") => CARD_DECLINED_MESSAGE,
            Some("insufficient_funds") => INSUFFICIENT_FUNDS_MESSAGE,
            Some("expired_card") => EXPIRED_CARD_MESSAGE,
            Some("incorrect_cvc") => INCORRECT_CVC_MESSAGE,
            _ => error.raw_message().unwrap_or(CARD_DECLINED_MESSAGE),
        },
        ProcessorErrorType::ValidationError => {
            error.raw_message().unwrap_or(PROCESSING_FAILED_MESSAGE)
        }
        ProcessorErrorType::ApiError => SETUP_FAILED_MESSAGE,
        _ if code == Some(AUTHENTICATION_FAILURE_CODE) => SETUP_FAILED_MESSAGE,
        _ => error.raw_message().unwrap_or(PROCESSING_FAILED_MESSAGE),
    };
    message.to_string()
}

pub fn classify(response: &ConfirmationResponse) -> ConfirmationOutcome {
    if let Some(error) = &response.error {
        return ConfirmationOutcome::Failed {
            message: classify_error(error),
        };
    }

    let Some(intent) = &response.payment_intent else {
        return ConfirmationOutcome::Failed {
            message: PROCESSING_FAILED_MESSAGE.to_string(),
        };
    };

    let intent_id = intent.id.clone();
    match PaymentStatus::from_string(&intent.status) {
        Some(PaymentStatus::Succeeded) => ConfirmationOutcome::Succeeded { intent_id },
        Some(PaymentStatus::Processing) => ConfirmationOutcome::Provisional { intent_id },
        Some(PaymentStatus::RequiresAction) => ConfirmationOutcome::RequiresAction { intent_id },
        _ => ConfirmationOutcome::Failed {
            message: INCOMPLETE_MESSAGE.to_string(),
        },
    }
}

/// Card form mounted for one client secret. A new secret always gets a new key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountedForm {
    pub form_key: Uuid,
    pub intent_id: String,
    #[serde(skip)]
    pub client_secret: String,
}

/// Payer input collected by the hosted fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardSubmission {
    /// Tokenized payment method (`pm_...`) produced by the hosted fields.
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub return_url: Option<String>,
}

/// Client-side validation failure raised before confirmation.
#[derive(Debug, Clone)]
pub struct SubmissionError {
    pub message: Option<String>,
}

impl std::fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.user_message())
    }
}

impl std::error::Error for SubmissionError {}

impl SubmissionError {
    pub fn user_message(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(PROCESSING_FAILED_MESSAGE)
    }
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Client secret does not name a payment intent")]
    InvalidClientSecret,

    #[error("Processor rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Processor request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Processor response could not be read: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait HostedCardForm: Send + Sync {
    /// Attach a card form to the intent named by `client_secret`.
    async fn mount(&self, client_secret: &str) -> Result<MountedForm, ProcessorError>;

    async fn submit(
        &self,
        form: &MountedForm,
        submission: &CardSubmission,
    ) -> Result<(), SubmissionError>;

    async fn confirm(
        &self,
        form: &MountedForm,
        submission: &CardSubmission,
    ) -> Result<ConfirmationResponse, ProcessorError>;
}

/// Stripe payment intents, called with the publishable key the same way the browser
/// SDK does.
#[derive(Clone)]
pub struct StripeCardForm {
    client: Client,
    api_base_url: String,
    publishable_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: ProcessorErrorBody,
}

/// `pi_123_secret_abc` -> `pi_123`.
pub fn intent_id_from_secret(client_secret: &str) -> Option<&str> {
    client_secret
        .split_once("_secret_")
        .map(|(id, _)| id)
        .filter(|id| id.starts_with("pi_") && id.len() > 3)
}

impl StripeCardForm {
    pub fn new(settings: &ProcessorSettings) -> Result<Self, ProcessorError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            publishable_key: settings.publishable_key.clone(),
        })
    }

    fn intent_url(&self, intent_id: &str) -> String {
        format!("{}/payment_intents/{}", self.api_base_url, intent_id)
    }
}

#[async_trait]
impl HostedCardForm for StripeCardForm {
    async fn mount(&self, client_secret: &str) -> Result<MountedForm, ProcessorError> {
        let intent_id =
            intent_id_from_secret(client_secret).ok_or(ProcessorError::InvalidClientSecret)?;

        let response = self
            .client
            .get(self.intent_url(intent_id))
            .bearer_auth(&self.publishable_key)
            .query(&[("client_secret", client_secret)])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<StripeErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(ProcessorError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let intent: ConfirmedIntent = serde_json::from_slice(&body)?;
        tracing::debug!(intent_id = %intent.id, status = %intent.status, "Card form mounted");

        Ok(MountedForm {
            form_key: Uuid::new_v4(),
            intent_id: intent.id,
            client_secret: client_secret.to_string(),
        })
    }

    async fn submit(
        &self,
        _form: &MountedForm,
        submission: &CardSubmission,
    ) -> Result<(), SubmissionError> {
        let has_method = submission
            .payment_method
            .as_deref()
            .is_some_and(|pm| !pm.trim().is_empty());
        if !has_method {
            return Err(SubmissionError {
                message: Some(CARD_INCOMPLETE_MESSAGE.to_string()),
            });
        }
        Ok(())
    }

    async fn confirm(
        &self,
        form: &MountedForm,
        submission: &CardSubmission,
    ) -> Result<ConfirmationResponse, ProcessorError> {
        let mut params = vec![("client_secret", form.client_secret.as_str())];
        if let Some(payment_method) = submission.payment_method.as_deref() {
            params.push(("payment_method", payment_method));
        }
        if let Some(return_url) = submission.return_url.as_deref() {
            params.push(("return_url", return_url));
        }

        let response = self
            .client
            .post(format!("{}/confirm", self.intent_url(&form.intent_id)))
            .bearer_auth(&self.publishable_key)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            let intent: ConfirmedIntent = serde_json::from_slice(&body)?;
            return Ok(ConfirmationResponse {
                error: None,
                payment_intent: Some(intent),
            });
        }

        match serde_json::from_slice::<StripeErrorEnvelope>(&body) {
            Ok(envelope) => Ok(ConfirmationResponse {
                error: Some(envelope.error),
                payment_intent: None,
            }),
            Err(_) => Err(ProcessorError::Rejected {
                status: status.as_u16(),
                message: status.to_string(),
            }),
        }
    }
}
