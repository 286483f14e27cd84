//! Payment collection: balance rules, attempts, intents, the hosted card form, the
//! per-session state machine and the follow-up work after a payment or refund.

pub mod attempt;
pub mod balance;
pub mod intent;
pub mod invalidation;
pub mod processor;
pub mod refund;
pub mod session;
pub mod state;
pub mod workflow;

pub use attempt::{AttemptId, AttemptTracker, PaymentAttempt};
pub use intent::{CreatePaymentIntentRequest, PaymentIntent, PaymentIntentRequester};
pub use invalidation::CacheInvalidationCoordinator;
pub use processor::{CardSubmission, HostedCardForm, StripeCardForm};
pub use refund::{RefundCoordinator, RefundError, RefundReceipt, RefundRequester};
pub use session::{PaymentSession, SessionError};
pub use state::{PaymentFormState, PaymentFormStatus};
pub use workflow::{PaymentWorkflow, WorkflowError};
