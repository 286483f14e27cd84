//! Async driver for payment sessions.
//!
//! Sessions live behind a `tokio::sync::Mutex` that is only held around the pure
//! transitions in [`PaymentSession`], never across a network call. Each network
//! result is handed back with the attempt id it was started for; the session drops it
//! when that attempt has since been closed, retried or replaced.

use console_core::error::AppError;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::attempt::{AttemptId, AttemptTracker, PaymentAttempt};
use super::intent::{CreatePaymentIntentRequest, PaymentIntentRequester};
use super::invalidation::CacheInvalidationCoordinator;
use super::processor::{
    classify, CardSubmission, ConfirmationOutcome, HostedCardForm, PROCESSING_FAILED_MESSAGE,
    SETUP_FAILED_MESSAGE,
};
use super::session::{PaymentSession, Resolution, SessionError};
use crate::config::{PaymentSettings, Settings};
use crate::dtos::SessionView;
use crate::models::Invoice;
use crate::services::metrics;
use crate::services::notifications::{
    Notifier, PAYMENT_ERROR_TITLE, PAYMENT_READY_MESSAGE, PAYMENT_READY_TITLE,
    PAYMENT_SETUP_ERROR_TITLE, PAYMENT_SUCCESS_MESSAGE, PAYMENT_SUCCESS_TITLE,
};
use crate::services::query_cache::{CacheError, CacheKey, QueryCache};
use crate::services::Records;

pub type SharedSession = Arc<Mutex<PaymentSession>>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Payment session {0} not found")]
    SessionNotFound(Uuid),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Load(#[from] CacheError),
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::SessionNotFound(id) => {
                AppError::NotFound(anyhow::anyhow!("Payment session {} not found", id))
            }
            WorkflowError::Session(SessionError::Amount(e)) => AppError::Unprocessable(e.to_string()),
            WorkflowError::Session(e) => AppError::Conflict(anyhow::Error::new(e)),
            WorkflowError::Load(e) => e.into(),
        }
    }
}

fn purge_intents(cache: &QueryCache, session_id: Uuid) {
    let removed = cache.remove_where(|key| {
        matches!(key, CacheKey::PaymentIntent { session_id: owner, .. } if *owner == session_id)
    });
    if !removed.is_empty() {
        tracing::debug!(session_id = %session_id, count = removed.len(), "Purged cached intents");
    }
}

#[derive(Clone)]
pub struct PaymentWorkflow {
    sessions: Arc<DashMap<Uuid, SharedSession>>,
    by_invoice: Arc<DashMap<String, Uuid>>,
    tracker: AttemptTracker,
    intents: Arc<dyn PaymentIntentRequester>,
    card_form: Arc<dyn HostedCardForm>,
    records: Records,
    invalidation: CacheInvalidationCoordinator,
    notifier: Notifier,
    timings: PaymentSettings,
    public_url: String,
}

impl PaymentWorkflow {
    pub fn new(
        records: Records,
        intents: Arc<dyn PaymentIntentRequester>,
        card_form: Arc<dyn HostedCardForm>,
        invalidation: CacheInvalidationCoordinator,
        notifier: Notifier,
        settings: &Settings,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            by_invoice: Arc::new(DashMap::new()),
            tracker: AttemptTracker::new(),
            intents,
            card_form,
            records,
            invalidation,
            notifier,
            timings: settings.payment.clone(),
            public_url: settings.server.public_url.trim_end_matches('/').to_string(),
        }
    }

    fn cache(&self) -> &QueryCache {
        self.records.cache()
    }

    fn session(&self, session_id: Uuid) -> Result<SharedSession, WorkflowError> {
        self.sessions
            .get(&session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(WorkflowError::SessionNotFound(session_id))
    }

    fn session_for_invoice(&self, invoice_id: &str) -> Option<SharedSession> {
        let session_id = self.by_invoice.get(invoice_id).map(|entry| *entry.value())?;
        self.session(session_id).ok()
    }

    async fn snapshot(&self, session: &SharedSession) -> SessionView {
        SessionView::from_session(&*session.lock().await)
    }

    /// Open the payment UI for an invoice, reusing and resetting a session that is
    /// already open for it.
    #[tracing::instrument(skip(self))]
    pub async fn open(&self, invoice_id: &str) -> Result<SessionView, WorkflowError> {
        let invoice: Invoice = self.records.get(invoice_id).await?;

        if let Some(session) = self.session_for_invoice(invoice_id) {
            let mut guard = session.lock().await;
            guard.reopen(invoice);
            purge_intents(self.cache(), guard.id());
            tracing::info!(session_id = %guard.id(), "Payment session reopened");
            return Ok(SessionView::from_session(&guard));
        }

        let session = PaymentSession::open(invoice);
        let session_id = session.id();
        let view = SessionView::from_session(&session);
        self.sessions
            .insert(session_id, Arc::new(Mutex::new(session)));
        self.by_invoice.insert(invoice_id.to_string(), session_id);

        tracing::info!(session_id = %session_id, "Payment session opened");
        Ok(view)
    }

    pub async fn view(&self, session_id: Uuid) -> Result<SessionView, WorkflowError> {
        let session = self.session(session_id)?;
        Ok(self.snapshot(&session).await)
    }

    pub async fn set_amount(
        &self,
        session_id: Uuid,
        partial: bool,
        amount: Option<rust_decimal::Decimal>,
    ) -> Result<SessionView, WorkflowError> {
        let session = self.session(session_id)?;
        let mut guard = session.lock().await;
        guard.set_amount(partial, amount)?;
        Ok(SessionView::from_session(&guard))
    }

    /// Payer pressed pay.
    #[tracing::instrument(skip(self))]
    pub async fn pay(&self, session_id: Uuid) -> Result<SessionView, WorkflowError> {
        let session = self.session(session_id)?;
        if let Some((attempt, request)) = self.start_attempt(&session).await? {
            self.request_intent(&session, attempt, request).await;
        }
        Ok(self.snapshot(&session).await)
    }

    /// Mint an attempt and, if the gate still holds, hand back what the intent request
    /// needs. Runs under the session lock.
    async fn start_attempt(
        &self,
        session: &SharedSession,
    ) -> Result<Option<(PaymentAttempt, CreatePaymentIntentRequest)>, WorkflowError> {
        let mut guard = session.lock().await;
        let attempt = guard.begin_payment(&self.tracker)?;
        tracing::info!(
            session_id = %guard.id(),
            attempt_id = %attempt.id,
            partial = attempt.partial,
            amount = %attempt.amount,
            "Payment attempt started"
        );

        if !guard.may_request_intent(&attempt.id) {
            return Ok(None);
        }
        let request = guard.intent_request();
        Ok(Some((attempt, request)))
    }

    async fn request_intent(
        &self,
        session: &SharedSession,
        attempt: PaymentAttempt,
        request: CreatePaymentIntentRequest,
    ) {
        let result = match self
            .intents
            .create_payment_intent(&attempt.invoice_id, &request)
            .await
        {
            Ok(intent) => {
                metrics::record_intent_request("created");
                match self.card_form.mount(&intent.client_secret).await {
                    Ok(form) => Ok((intent, form)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Card form could not be mounted");
                        Err(SETUP_FAILED_MESSAGE.to_string())
                    }
                }
            }
            Err(e) => {
                metrics::record_intent_request(e.kind());
                tracing::warn!(kind = e.kind(), error = ?e, "Payment intent request failed");
                Err(e.to_string())
            }
        };

        let created = match &result {
            Ok((intent, _)) => Ok(intent.clone()),
            Err(message) => Err(message.clone()),
        };

        let mut guard = session.lock().await;
        let session_id = guard.id();
        if guard.intent_resolved(&attempt.id, result) == Resolution::Stale {
            tracing::debug!(attempt_id = %attempt.id, "Discarding intent for abandoned attempt");
            return;
        }

        match created {
            Ok(intent) => {
                self.cache().set(
                    CacheKey::PaymentIntent {
                        session_id,
                        attempt_id: attempt.id.to_string(),
                    },
                    &intent,
                );
                self.notifier.success(PAYMENT_READY_TITLE, PAYMENT_READY_MESSAGE);
            }
            Err(message) => {
                purge_intents(self.cache(), session_id);
                self.notifier.error(PAYMENT_SETUP_ERROR_TITLE, &message);
            }
        }
    }

    /// Payer submitted the hosted card form.
    #[tracing::instrument(skip(self, submission))]
    pub async fn confirm(
        &self,
        session_id: Uuid,
        mut submission: CardSubmission,
    ) -> Result<SessionView, WorkflowError> {
        let session = self.session(session_id)?;
        let (attempt_id, form, invoice_id) = {
            let mut guard = session.lock().await;
            let (attempt_id, form) = guard.begin_confirmation()?;
            (attempt_id, form, guard.invoice().id.clone())
        };

        if submission.return_url.is_none() {
            submission.return_url = Some(format!(
                "{}/invoices/{}?payment=success",
                self.public_url, invoice_id
            ));
        }

        let outcome = match self.card_form.submit(&form, &submission).await {
            Err(e) => ConfirmationOutcome::Failed {
                message: e.user_message().to_string(),
            },
            Ok(()) => match self.card_form.confirm(&form, &submission).await {
                Ok(response) => classify(&response),
                Err(e) => {
                    tracing::warn!(error = %e, "Payment confirmation failed");
                    ConfirmationOutcome::Failed {
                        message: PROCESSING_FAILED_MESSAGE.to_string(),
                    }
                }
            },
        };
        metrics::record_payment_outcome(outcome.label());

        self.apply_confirmation(&session, &attempt_id, outcome).await;
        Ok(self.snapshot(&session).await)
    }

    async fn apply_confirmation(
        &self,
        session: &SharedSession,
        attempt_id: &AttemptId,
        outcome: ConfirmationOutcome,
    ) {
        let mut guard = session.lock().await;
        if guard.confirmation_resolved(attempt_id, &outcome) == Resolution::Stale {
            tracing::debug!(attempt_id = %attempt_id, "Discarding confirmation for abandoned attempt");
            return;
        }

        match outcome {
            ConfirmationOutcome::Succeeded { intent_id } => {
                tracing::info!(intent_id = %intent_id, "Payment succeeded");
                self.on_success(session, &guard);
            }
            ConfirmationOutcome::Provisional { intent_id } => {
                tracing::info!(intent_id = %intent_id, "Payment processing; reporting provisional success");
                self.on_success(session, &guard);
            }
            ConfirmationOutcome::RequiresAction { intent_id } => {
                tracing::info!(intent_id = %intent_id, "Payment requires payer action");
            }
            ConfirmationOutcome::Failed { message } => {
                tracing::info!(reason = %message, "Payment failed");
                purge_intents(self.cache(), guard.id());
                self.notifier.error(PAYMENT_ERROR_TITLE, &message);
            }
        }
    }

    /// Refresh invoice reads, tell the payer, and close the session once the
    /// acknowledgment has been visible for `success_delay`. Closing or reopening the
    /// session first cancels the auto-close; the settlement refresh always runs.
    fn on_success(&self, shared: &SharedSession, session: &PaymentSession) {
        let session_id = session.id();
        purge_intents(self.cache(), session_id);
        self.invalidation.payment_succeeded(&session.invoice().id);
        self.notifier.success(PAYMENT_SUCCESS_TITLE, PAYMENT_SUCCESS_MESSAGE);

        let token = session.cancellation();
        let shared = Arc::clone(shared);
        let workflow = self.clone();
        let delay = self.timings.success_delay();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let mut guard = shared.lock().await;
                    if !token.is_cancelled() {
                        guard.close();
                        workflow.forget(&guard);
                        tracing::info!(session_id = %session_id, "Payment session closed after success");
                    }
                }
            }
        });
    }

    /// Back to `Initial`, then a fresh attempt after `retry_delay`.
    #[tracing::instrument(skip(self))]
    pub async fn retry(&self, session_id: Uuid) -> Result<SessionView, WorkflowError> {
        let session = self.session(session_id)?;
        let token = {
            let mut guard = session.lock().await;
            guard.retry()?;
            purge_intents(self.cache(), guard.id());
            guard.cancellation()
        };

        tokio::select! {
            _ = token.cancelled() => return Ok(self.snapshot(&session).await),
            _ = tokio::time::sleep(self.timings.retry_delay()) => {}
        }

        if let Some((attempt, request)) = self.start_attempt(&session).await? {
            self.request_intent(&session, attempt, request).await;
        }
        Ok(self.snapshot(&session).await)
    }

    /// Close the payment UI. Pending timers are cancelled and any in-flight result is
    /// discarded when it lands.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self, session_id: Uuid) -> Result<SessionView, WorkflowError> {
        let session = self.session(session_id)?;
        let mut guard = session.lock().await;
        guard.close();
        self.forget(&guard);
        tracing::info!("Payment session closed");
        Ok(SessionView::from_session(&guard))
    }

    fn forget(&self, session: &PaymentSession) {
        let session_id = session.id();
        purge_intents(self.cache(), session_id);
        self.sessions.remove(&session_id);
        self.by_invoice
            .remove_if(&session.invoice().id, |_, owner| *owner == session_id);
    }
}
