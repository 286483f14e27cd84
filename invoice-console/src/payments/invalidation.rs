//! Refresh of invoice reads after money moves.
//!
//! Each pass marks the planned keys stale and refetches the ones that are cached. A
//! second pass runs after `settle_delay` to pick up state the backend only settles
//! asynchronously (processor webhooks).

use std::time::Duration;
use tokio::task::JoinHandle;

use crate::services::metrics;
use crate::services::query_cache::{CacheKey, QueryCache};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub keys: Vec<CacheKey>,
    /// Also cover every cached payment-history collection, whatever it is scoped to.
    pub all_history: bool,
}

impl InvalidationPlan {
    pub fn payment(invoice_id: &str) -> Self {
        Self {
            keys: vec![
                CacheKey::Invoices,
                CacheKey::Invoice(invoice_id.to_string()),
                CacheKey::InvoicePaymentHistory(invoice_id.to_string()),
            ],
            all_history: false,
        }
    }

    pub fn refund(invoice_id: &str) -> Self {
        Self {
            all_history: true,
            ..Self::payment(invoice_id)
        }
    }

    fn apply(&self, cache: &QueryCache) -> Vec<CacheKey> {
        let mut marked = cache.invalidate(&self.keys);
        if self.all_history {
            for key in cache.invalidate_where(|key| key.history_scope().is_some()) {
                if !marked.contains(&key) {
                    marked.push(key);
                }
            }
        }
        marked
    }
}

#[derive(Clone)]
pub struct CacheInvalidationCoordinator {
    cache: QueryCache,
    settle_delay: Duration,
}

impl CacheInvalidationCoordinator {
    pub fn new(cache: QueryCache, settle_delay: Duration) -> Self {
        Self {
            cache,
            settle_delay,
        }
    }

    pub fn payment_succeeded(&self, invoice_id: &str) -> JoinHandle<()> {
        self.run(InvalidationPlan::payment(invoice_id), "payment")
    }

    pub fn refund_succeeded(&self, invoice_id: &str) -> JoinHandle<()> {
        self.run(InvalidationPlan::refund(invoice_id), "refund")
    }

    /// Marks the plan stale before returning; refetches and the delayed pass run on the
    /// returned task.
    pub fn run(&self, plan: InvalidationPlan, reason: &'static str) -> JoinHandle<()> {
        let marked = plan.apply(&self.cache);
        metrics::record_invalidation(reason, marked.len());
        tracing::debug!(reason, keys = ?marked, "Cache invalidated");

        let cache = self.cache.clone();
        let settle_delay = self.settle_delay;
        tokio::spawn(async move {
            cache.refetch(&marked).await;

            tokio::time::sleep(settle_delay).await;

            let marked = plan.apply(&cache);
            metrics::record_invalidation(reason, marked.len());
            tracing::debug!(reason, keys = ?marked, "Settlement invalidation pass");
            cache.refetch(&marked).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::api_client::ApiError;
    use crate::services::query_cache::CacheLoader;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingLoader {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl CacheLoader for CountingLoader {
        async fn load(&self, _key: &CacheKey) -> Result<Value, ApiError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Array(vec![]))
        }
    }

    fn seeded(keys: &[CacheKey]) -> QueryCache {
        let cache = QueryCache::new(Arc::new(CountingLoader::default()), Duration::from_secs(300));
        for key in keys {
            cache.set(key.clone(), &Value::Array(vec![]));
        }
        cache
    }

    #[test]
    fn payment_plan_targets_invoice_reads_only() {
        let cache = seeded(&[
            CacheKey::Invoices,
            CacheKey::Invoice("inv-1".into()),
            CacheKey::InvoicePaymentHistory("inv-1".into()),
            CacheKey::Invoice("inv-2".into()),
            CacheKey::CustomerPaymentHistory("cus-1".into()),
            CacheKey::PaymentHistory,
        ]);

        let marked = InvalidationPlan::payment("inv-1").apply(&cache);
        assert_eq!(marked.len(), 3);
        assert!(!cache.is_fresh(&CacheKey::Invoice("inv-1".into())));
        assert!(cache.is_fresh(&CacheKey::Invoice("inv-2".into())));
        assert!(cache.is_fresh(&CacheKey::CustomerPaymentHistory("cus-1".into())));
        assert!(cache.is_fresh(&CacheKey::PaymentHistory));
    }

    #[test]
    fn refund_plan_reaches_every_history_listing() {
        let cache = seeded(&[
            CacheKey::Invoices,
            CacheKey::Invoice("inv-1".into()),
            CacheKey::InvoicePaymentHistory("inv-1".into()),
            CacheKey::InvoicePaymentHistory("inv-9".into()),
            CacheKey::CustomerPaymentHistory("cus-1".into()),
            CacheKey::BusinessOwnerPaymentHistory("own-1".into()),
            CacheKey::PaymentHistory,
            CacheKey::PaymentHistoryItem("tx-1".into()),
            CacheKey::Customers,
        ]);

        InvalidationPlan::refund("inv-1").apply(&cache);

        for key in [
            CacheKey::Invoices,
            CacheKey::Invoice("inv-1".into()),
            CacheKey::InvoicePaymentHistory("inv-9".into()),
            CacheKey::CustomerPaymentHistory("cus-1".into()),
            CacheKey::BusinessOwnerPaymentHistory("own-1".into()),
            CacheKey::PaymentHistory,
            CacheKey::PaymentHistoryItem("tx-1".into()),
        ] {
            assert!(!cache.is_fresh(&key), "{:?} should be stale", key);
        }
        assert!(cache.is_fresh(&CacheKey::Customers));
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_and_again_after_settle_delay() {
        let loader = Arc::new(CountingLoader::default());
        let cache = QueryCache::new(loader.clone(), Duration::from_secs(300));
        cache.set(CacheKey::Invoices, &Value::Array(vec![]));
        cache.set(CacheKey::Invoice("inv-1".into()), &Value::Array(vec![]));

        let coordinator = CacheInvalidationCoordinator::new(cache.clone(), Duration::from_millis(1_000));
        let handle = coordinator.payment_succeeded("inv-1");

        // Stale the moment success is reported.
        assert!(!cache.is_fresh(&CacheKey::Invoices));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        assert!(cache.is_fresh(&CacheKey::Invoices));

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        handle.await.unwrap();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 4);
    }
}
