//! Toast-style notifications raised by payment and refund outcomes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 50;

pub const PAYMENT_READY_TITLE: &str = "Payment Ready";
pub const PAYMENT_READY_MESSAGE: &str = "Please complete your payment details";
pub const PAYMENT_SETUP_ERROR_TITLE: &str = "Payment Setup Error";
pub const PAYMENT_SUCCESS_TITLE: &str = "Payment Success";
pub const PAYMENT_SUCCESS_MESSAGE: &str = "Your payment has been processed successfully";
pub const PAYMENT_ERROR_TITLE: &str = "Payment Error";
pub const REFUND_SUCCESS_TITLE: &str = "Refund Processed Successfully";
pub const REFUND_FAILED_TITLE: &str = "Refund Failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
    pub created_at: DateTime<Utc>,
}

/// Fan-out of notifications to live subscribers plus a bounded backlog for polling.
#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
    recent: Arc<Mutex<VecDeque<Notification>>>,
    capacity: usize,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            recent: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn notify(&self, title: &str, message: &str, level: NotificationLevel) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            title: title.to_string(),
            message: message.to_string(),
            level,
            created_at: Utc::now(),
        };

        tracing::info!(title = %title, level = ?level, "{}", message);

        {
            let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
            if recent.len() == self.capacity {
                recent.pop_back();
            }
            recent.push_front(notification.clone());
        }

        // No subscribers is fine; the backlog still has it.
        let _ = self.sender.send(notification.clone());
        notification
    }

    pub fn success(&self, title: &str, message: &str) -> Notification {
        self.notify(title, message, NotificationLevel::Success)
    }

    pub fn error(&self, title: &str, message: &str) -> Notification {
        self.notify(title, message, NotificationLevel::Error)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Newest first.
    pub fn recent(&self) -> Vec<Notification> {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backlog_is_bounded_and_newest_first() {
        let notifier = Notifier::new(2);
        notifier.success("a", "1");
        notifier.success("b", "2");
        notifier.error("c", "3");

        let titles: Vec<_> = notifier.recent().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn subscribers_receive_notifications() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        notifier.success(PAYMENT_SUCCESS_TITLE, PAYMENT_SUCCESS_MESSAGE);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.title, "Payment Success");
        assert_eq!(received.level, NotificationLevel::Success);
    }
}
