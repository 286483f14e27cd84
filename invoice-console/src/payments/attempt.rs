//! Attempt ids scope one explicit pay action.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `<unix-millis>-<9 base36 chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(String);

impl AttemptId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mints attempt ids. Never touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptTracker;

impl AttemptTracker {
    pub fn new() -> Self {
        Self
    }

    pub fn new_attempt(&self) -> AttemptId {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        AttemptId(format!("{}-{}", Utc::now().timestamp_millis(), suffix))
    }
}

/// One pay click. Ephemeral; lives only inside a payment session.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentAttempt {
    pub id: AttemptId,
    pub invoice_id: String,
    pub partial: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl PaymentAttempt {
    pub fn new(id: AttemptId, invoice_id: &str, partial: bool, amount: Decimal) -> Self {
        Self {
            id,
            invoice_id: invoice_id.to_string(),
            partial,
            amount,
            created_at: Utc::now(),
        }
    }
}
