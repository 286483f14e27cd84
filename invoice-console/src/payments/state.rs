//! Payment form state.
//!
//! The form is one tagged union: every payload a state needs travels with it, so a
//! session cannot be "successful" while an attempt is still loading.

use rust_decimal::Decimal;
use serde::Serialize;

use super::attempt::{AttemptId, PaymentAttempt};
use super::intent::PaymentIntent;
use super::processor::MountedForm;

/// Flat status reported to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFormStatus {
    Initial,
    Loading,
    Processing,
    Success,
    Error,
    Cancelled,
}

#[derive(Debug, Clone)]
pub enum PaymentFormState {
    Initial,
    AwaitingIntent {
        attempt: PaymentAttempt,
    },
    AwaitingConfirmation {
        attempt: PaymentAttempt,
        intent: PaymentIntent,
        form: MountedForm,
    },
    Processing {
        attempt: PaymentAttempt,
        intent: PaymentIntent,
        form: MountedForm,
        /// Set while the processor waits on the payer (3-D Secure and similar).
        awaiting_action: bool,
    },
    Success {
        intent_id: String,
        amount: Decimal,
        provisional: bool,
    },
    Error {
        message: String,
    },
}

impl PaymentFormState {
    /// The card form is on screen but untouched while awaiting confirmation, which the
    /// browser renders as `initial`.
    pub fn status(&self) -> PaymentFormStatus {
        match self {
            PaymentFormState::Initial | PaymentFormState::AwaitingConfirmation { .. } => {
                PaymentFormStatus::Initial
            }
            PaymentFormState::AwaitingIntent { .. } => PaymentFormStatus::Loading,
            PaymentFormState::Processing { .. } => PaymentFormStatus::Processing,
            PaymentFormState::Success { .. } => PaymentFormStatus::Success,
            PaymentFormState::Error { .. } => PaymentFormStatus::Error,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            PaymentFormState::Initial => "initial",
            PaymentFormState::AwaitingIntent { .. } => "awaiting_intent",
            PaymentFormState::AwaitingConfirmation { .. } => "awaiting_confirmation",
            PaymentFormState::Processing { .. } => "processing",
            PaymentFormState::Success { .. } => "success",
            PaymentFormState::Error { .. } => "error",
        }
    }

    pub fn attempt(&self) -> Option<&PaymentAttempt> {
        match self {
            PaymentFormState::AwaitingIntent { attempt }
            | PaymentFormState::AwaitingConfirmation { attempt, .. }
            | PaymentFormState::Processing { attempt, .. } => Some(attempt),
            _ => None,
        }
    }

    pub fn attempt_id(&self) -> Option<&AttemptId> {
        self.attempt().map(|attempt| &attempt.id)
    }

    pub fn intent(&self) -> Option<&PaymentIntent> {
        match self {
            PaymentFormState::AwaitingConfirmation { intent, .. }
            | PaymentFormState::Processing { intent, .. } => Some(intent),
            _ => None,
        }
    }

    pub fn form(&self) -> Option<&MountedForm> {
        match self {
            PaymentFormState::AwaitingConfirmation { form, .. }
            | PaymentFormState::Processing { form, .. } => Some(form),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PaymentFormState::Error { message } => Some(message),
            _ => None,
        }
    }
}
