//! One payer's payment session for one invoice.
//!
//! Pure, synchronous transitions. The async workflow owns the session behind a lock
//! and feeds network results back in; every result carries the attempt id it was
//! started for and is dropped when that attempt is no longer the active one.

use rust_decimal::Decimal;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::attempt::{AttemptId, AttemptTracker, PaymentAttempt};
use super::balance::{validate_partial_amount, AmountError};
use super::intent::{CreatePaymentIntentRequest, PaymentIntent};
use super::processor::{ConfirmationOutcome, MountedForm};
use super::state::PaymentFormState;
use crate::models::Invoice;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Payment session is closed")]
    Closed,

    #[error("Invoice {0} cannot accept a payment")]
    NotPayable(String),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error("Cannot {action} while the payment is {stage}")]
    InvalidTransition {
        action: &'static str,
        stage: &'static str,
    },
}

/// Whether a network result was applied or discarded as belonging to an abandoned
/// attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    Stale,
}

#[derive(Debug)]
pub struct PaymentSession {
    id: Uuid,
    invoice: Invoice,
    open: bool,
    partial: bool,
    amount: Decimal,
    state: PaymentFormState,
    cancel: CancellationToken,
}

impl PaymentSession {
    pub fn open(invoice: Invoice) -> Self {
        let amount = invoice.remaining();
        Self {
            id: Uuid::new_v4(),
            invoice,
            open: true,
            partial: false,
            amount,
            state: PaymentFormState::Initial,
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn invoice(&self) -> &Invoice {
        &self.invoice
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn partial(&self) -> bool {
        self.partial
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn remaining(&self) -> Decimal {
        self.invoice.remaining()
    }

    pub fn state(&self) -> &PaymentFormState {
        &self.state
    }

    /// Token cancelled the next time the session re-enters `Initial`.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Enter `Initial`: full balance, no attempt, pending timers cancelled.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.partial = false;
        self.amount = self.invoice.remaining();
        self.state = PaymentFormState::Initial;
    }

    /// Reopen with a freshly read invoice.
    pub fn reopen(&mut self, invoice: Invoice) {
        self.invoice = invoice;
        self.open = true;
        self.reset();
    }

    pub fn close(&mut self) {
        self.reset();
        self.open = false;
    }

    pub fn set_amount(&mut self, partial: bool, amount: Option<Decimal>) -> Result<(), SessionError> {
        self.ensure_open()?;
        if !matches!(self.state, PaymentFormState::Initial) {
            return Err(self.invalid("change the amount"));
        }

        self.partial = partial;
        self.amount = if partial {
            amount.unwrap_or(self.amount)
        } else {
            self.invoice.remaining()
        };
        Ok(())
    }

    /// Inline amount feedback shown while the payer types a partial amount.
    pub fn amount_error(&self) -> Option<AmountError> {
        if !self.partial || self.amount <= Decimal::ZERO {
            return None;
        }
        validate_partial_amount(self.amount, self.remaining()).err()
    }

    /// Payer pressed pay: mint a fresh attempt and wait for its intent.
    pub fn begin_payment(&mut self, tracker: &AttemptTracker) -> Result<PaymentAttempt, SessionError> {
        self.ensure_open()?;
        if !matches!(self.state, PaymentFormState::Initial) {
            return Err(self.invalid("start a payment"));
        }
        if !self.invoice.can_accept_payment() {
            return Err(SessionError::NotPayable(self.invoice.id.clone()));
        }
        if self.partial {
            validate_partial_amount(self.amount, self.remaining())?;
        }

        let attempt = PaymentAttempt::new(
            tracker.new_attempt(),
            &self.invoice.id,
            self.partial,
            self.amount,
        );
        self.state = PaymentFormState::AwaitingIntent {
            attempt: attempt.clone(),
        };
        Ok(attempt)
    }

    /// The intent request for `attempt_id` may fire only while it is the attempt the
    /// open session is waiting on, with an amount still in bounds.
    pub fn may_request_intent(&self, attempt_id: &AttemptId) -> bool {
        let awaiting = matches!(
            &self.state,
            PaymentFormState::AwaitingIntent { attempt } if &attempt.id == attempt_id
        );
        let amount_ok =
            !self.partial || validate_partial_amount(self.amount, self.remaining()).is_ok();
        self.open && awaiting && amount_ok
    }

    pub fn intent_request(&self) -> CreatePaymentIntentRequest {
        CreatePaymentIntentRequest::for_invoice(&self.invoice, self.partial, self.amount)
    }

    pub fn intent_resolved(
        &mut self,
        attempt_id: &AttemptId,
        result: Result<(PaymentIntent, MountedForm), String>,
    ) -> Resolution {
        let attempt = match &self.state {
            PaymentFormState::AwaitingIntent { attempt } if self.open && &attempt.id == attempt_id => {
                attempt.clone()
            }
            _ => return Resolution::Stale,
        };

        self.state = match result {
            Ok((intent, form)) => PaymentFormState::AwaitingConfirmation {
                attempt,
                intent,
                form,
            },
            Err(message) => PaymentFormState::Error { message },
        };
        Resolution::Applied
    }

    /// Payer submitted the card form. Also re-entered after the payer finishes an
    /// authentication step.
    pub fn begin_confirmation(&mut self) -> Result<(AttemptId, MountedForm), SessionError> {
        self.ensure_open()?;
        let state = std::mem::replace(&mut self.state, PaymentFormState::Initial);
        match state {
            PaymentFormState::AwaitingConfirmation {
                attempt,
                intent,
                form,
            }
            | PaymentFormState::Processing {
                attempt,
                intent,
                form,
                awaiting_action: true,
            } => {
                let handle = (attempt.id.clone(), form.clone());
                self.state = PaymentFormState::Processing {
                    attempt,
                    intent,
                    form,
                    awaiting_action: false,
                };
                Ok(handle)
            }
            other => {
                self.state = other;
                Err(self.invalid("submit the card form"))
            }
        }
    }

    pub fn confirmation_resolved(
        &mut self,
        attempt_id: &AttemptId,
        outcome: &ConfirmationOutcome,
    ) -> Resolution {
        let (attempt, intent, form) = match &self.state {
            PaymentFormState::Processing {
                attempt,
                intent,
                form,
                ..
            } if self.open && &attempt.id == attempt_id => {
                (attempt.clone(), intent.clone(), form.clone())
            }
            _ => return Resolution::Stale,
        };

        self.state = match outcome {
            ConfirmationOutcome::Succeeded { intent_id } => PaymentFormState::Success {
                intent_id: intent_id.clone(),
                amount: attempt.amount,
                provisional: false,
            },
            ConfirmationOutcome::Provisional { intent_id } => PaymentFormState::Success {
                intent_id: intent_id.clone(),
                amount: attempt.amount,
                provisional: true,
            },
            ConfirmationOutcome::RequiresAction { .. } => PaymentFormState::Processing {
                attempt,
                intent,
                form,
                awaiting_action: true,
            },
            ConfirmationOutcome::Failed { message } => PaymentFormState::Error {
                message: message.clone(),
            },
        };
        Resolution::Applied
    }

    /// Leave `Error` for `Initial`. The caller mints the next attempt.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if !matches!(self.state, PaymentFormState::Error { .. }) {
            return Err(self.invalid("retry"));
        }
        self.reset();
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.open {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            stage: self.state.stage(),
        }
    }
}
