//! Invoice, customer and business owner reads and writes routed through the query cache.

use serde::Serialize;

use super::api_client::{ApiError, BackendClient};
use super::query_cache::{CacheError, CacheKey, QueryCache};
use super::resource::Resource;
use crate::models::{BusinessOwner, Customer, Invoice, InvoiceStats, PaymentTransaction};

#[derive(Clone)]
pub struct Records {
    api: BackendClient,
    cache: QueryCache,
}

impl Records {
    pub fn new(api: BackendClient, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub async fn list<R: Resource>(&self) -> Result<Vec<R>, CacheError> {
        self.cache.fetch(R::list_key()).await
    }

    pub async fn get<R: Resource>(&self, id: &str) -> Result<R, CacheError> {
        self.cache.fetch(R::item_key(id)).await
    }

    pub async fn create<R: Resource, B: Serialize + Sync>(&self, body: &B) -> Result<R, ApiError> {
        let created: R = self.api.create(body).await?;
        tracing::info!(kind = R::SINGULAR, id = %created.id(), "Record created");

        self.cache.set(R::item_key(created.id()), &created);
        self.cache.invalidate(&[R::list_key()]);
        Ok(created)
    }

    /// Writes the backend's answer straight into the item entry so the next read needs
    /// no round trip.
    pub async fn update<R: Resource, B: Serialize + Sync>(
        &self,
        id: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let updated: R = self.api.update(id, body).await?;
        tracing::info!(kind = R::SINGULAR, id = %id, "Record updated");

        self.cache.set(R::item_key(id), &updated);
        self.cache.invalidate(&[R::list_key()]);
        Ok(updated)
    }

    pub async fn delete<R: Resource>(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete::<R>(id).await?;
        tracing::info!(kind = R::SINGULAR, id = %id, "Record deleted");

        self.cache.remove(&R::item_key(id));
        self.cache.remove(&R::history_key(id));
        self.cache.invalidate(&[R::list_key()]);
        Ok(())
    }

    pub async fn payment_history_for<R: Resource>(
        &self,
        id: &str,
    ) -> Result<Vec<PaymentTransaction>, CacheError> {
        self.cache.fetch(R::history_key(id)).await
    }

    pub async fn payment_history(&self) -> Result<Vec<PaymentTransaction>, CacheError> {
        self.cache.fetch(CacheKey::PaymentHistory).await
    }

    pub async fn payment_history_item(&self, id: &str) -> Result<PaymentTransaction, CacheError> {
        self.cache
            .fetch(CacheKey::PaymentHistoryItem(id.to_string()))
            .await
    }

    pub async fn customer_stats(&self, customer_id: &str) -> Result<InvoiceStats, CacheError> {
        self.get::<Customer>(customer_id).await?;
        let invoices = self.list::<Invoice>().await?;
        let owned: Vec<Invoice> = invoices
            .into_iter()
            .filter(|invoice| invoice.customer == customer_id)
            .collect();
        Ok(InvoiceStats::from_invoices(&owned))
    }

    pub async fn business_owner_stats(&self, owner_id: &str) -> Result<InvoiceStats, CacheError> {
        self.get::<BusinessOwner>(owner_id).await?;
        let invoices = self.list::<Invoice>().await?;
        let owned: Vec<Invoice> = invoices
            .into_iter()
            .filter(|invoice| invoice.owner == owner_id)
            .collect();
        Ok(InvoiceStats::from_invoices(&owned))
    }
}
