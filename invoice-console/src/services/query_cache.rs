//! Read-through cache for backend reads.
//!
//! Entries are keyed by a typed [`CacheKey`]. A read is served from the cache while the
//! entry is younger than the staleness window and has not been invalidated; otherwise
//! it is reloaded through the [`CacheLoader`]. Invalidation marks entries stale and
//! refetches the ones that are present, the same way a browser query client refreshes
//! active queries.

use async_trait::async_trait;
use console_core::error::AppError;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use super::api_client::ApiError;

/// Entity a history listing is scoped under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HistoryScope {
    Invoice(String),
    Customer(String),
    BusinessOwner(String),
    Global,
    Item(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheRegion {
    Invoices,
    Customers,
    BusinessOwners,
    PaymentHistory,
    PaymentIntents,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Invoices,
    Invoice(String),
    InvoicePaymentHistory(String),
    Customers,
    Customer(String),
    CustomerPaymentHistory(String),
    BusinessOwners,
    BusinessOwner(String),
    BusinessOwnerPaymentHistory(String),
    PaymentHistory,
    PaymentHistoryItem(String),
    /// Intent created for one attempt of one payment session. Written by the payment
    /// workflow only; never loaded from the backend.
    PaymentIntent { session_id: Uuid, attempt_id: String },
}

impl CacheKey {
    pub fn region(&self) -> CacheRegion {
        match self {
            CacheKey::Invoices | CacheKey::Invoice(_) => CacheRegion::Invoices,
            CacheKey::Customers | CacheKey::Customer(_) => CacheRegion::Customers,
            CacheKey::BusinessOwners | CacheKey::BusinessOwner(_) => CacheRegion::BusinessOwners,
            CacheKey::InvoicePaymentHistory(_)
            | CacheKey::CustomerPaymentHistory(_)
            | CacheKey::BusinessOwnerPaymentHistory(_)
            | CacheKey::PaymentHistory
            | CacheKey::PaymentHistoryItem(_) => CacheRegion::PaymentHistory,
            CacheKey::PaymentIntent { .. } => CacheRegion::PaymentIntents,
        }
    }

    /// Registry of every payment-history collection and the entity it hangs off.
    pub fn history_scope(&self) -> Option<HistoryScope> {
        match self {
            CacheKey::InvoicePaymentHistory(id) => Some(HistoryScope::Invoice(id.clone())),
            CacheKey::CustomerPaymentHistory(id) => Some(HistoryScope::Customer(id.clone())),
            CacheKey::BusinessOwnerPaymentHistory(id) => {
                Some(HistoryScope::BusinessOwner(id.clone()))
            }
            CacheKey::PaymentHistory => Some(HistoryScope::Global),
            CacheKey::PaymentHistoryItem(id) => Some(HistoryScope::Item(id.clone())),
            _ => None,
        }
    }

    pub fn is_loadable(&self) -> bool {
        self.region() != CacheRegion::PaymentIntents
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0:?} is not loaded from the backend")]
    NotLoadable(CacheKey),

    #[error("Cached value for {key:?} has an unexpected shape: {source}")]
    Shape {
        key: CacheKey,
        #[source]
        source: serde_json::Error,
    },
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Api(api) => api.into(),
            other => AppError::InternalError(anyhow::Error::new(other)),
        }
    }
}

/// Loads the backend payload for a key.
#[async_trait]
pub trait CacheLoader: Send + Sync {
    async fn load(&self, key: &CacheKey) -> Result<Value, ApiError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    fetched_at: Instant,
    stale: bool,
}

#[derive(Clone)]
pub struct QueryCache {
    entries: Arc<DashMap<CacheKey, CacheEntry>>,
    loader: Arc<dyn CacheLoader>,
    stale_time: Duration,
}

impl QueryCache {
    pub fn new(loader: Arc<dyn CacheLoader>, stale_time: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            loader,
            stale_time,
        }
    }

    /// Serve `key` from the cache when fresh, otherwise load and store it.
    pub async fn fetch<T: DeserializeOwned>(&self, key: CacheKey) -> Result<T, CacheError> {
        let cached = self
            .entries
            .get(&key)
            .filter(|entry| self.is_entry_fresh(entry))
            .map(|entry| entry.value.clone());

        let value = match cached {
            Some(value) => value,
            None => self.load(&key).await?,
        };

        serde_json::from_value(value).map_err(|source| CacheError::Shape { key, source })
    }

    pub fn set<T: Serialize>(&self, key: CacheKey, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.store(key, value),
            Err(e) => tracing::warn!(key = ?key, error = %e, "Skipping unserializable cache write"),
        }
    }

    pub fn is_fresh(&self, key: &CacheKey) -> bool {
        self.entries
            .get(key)
            .map(|entry| self.is_entry_fresh(&entry))
            .unwrap_or(false)
    }

    pub fn remove(&self, key: &CacheKey) {
        self.entries.remove(key);
    }

    /// Drop every entry matching `predicate`. Returns the removed keys.
    pub fn remove_where<F>(&self, predicate: F) -> Vec<CacheKey>
    where
        F: Fn(&CacheKey) -> bool,
    {
        let keys = self.keys_where(predicate);
        for key in &keys {
            self.entries.remove(key);
        }
        keys
    }

    /// Mark `keys` stale. Keys that are not cached are ignored.
    pub fn invalidate(&self, keys: &[CacheKey]) -> Vec<CacheKey> {
        let mut marked = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(mut entry) = self.entries.get_mut(key) {
                entry.stale = true;
                marked.push(key.clone());
            }
        }
        marked
    }

    /// Mark every cached key matching `predicate` stale.
    pub fn invalidate_where<F>(&self, predicate: F) -> Vec<CacheKey>
    where
        F: Fn(&CacheKey) -> bool,
    {
        let keys = self.keys_where(predicate);
        self.invalidate(&keys)
    }

    /// Reload each key that is still cached and stale. Failures leave the entry stale so
    /// the next read retries the load.
    pub async fn refetch(&self, keys: &[CacheKey]) {
        let pending: Vec<CacheKey> = keys
            .iter()
            .filter(|key| key.is_loadable())
            .filter(|key| self.entries.get(*key).map(|e| e.stale).unwrap_or(false))
            .cloned()
            .collect();

        let loads = pending.iter().map(|key| async move {
            if let Err(e) = self.load(key).await {
                tracing::warn!(key = ?key, error = %e, "Background refetch failed");
            }
        });
        futures::future::join_all(loads).await;
    }

    fn keys_where<F>(&self, predicate: F) -> Vec<CacheKey>
    where
        F: Fn(&CacheKey) -> bool,
    {
        self.entries
            .iter()
            .filter(|entry| predicate(entry.key()))
            .map(|entry| entry.key().clone())
            .collect()
    }

    async fn load(&self, key: &CacheKey) -> Result<Value, CacheError> {
        if !key.is_loadable() {
            return Err(CacheError::NotLoadable(key.clone()));
        }
        let value = self.loader.load(key).await?;
        self.store(key.clone(), value.clone());
        Ok(value)
    }

    fn store(&self, key: CacheKey, value: Value) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: Instant::now(),
                stale: false,
            },
        );
    }

    fn is_entry_fresh(&self, entry: &CacheEntry) -> bool {
        !entry.stale && entry.fetched_at.elapsed() < self.stale_time
    }
}
