//! Backend collections the console reads and writes through the same generic client.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::query_cache::CacheKey;
use crate::models::{BusinessOwner, Customer, Invoice};

pub trait Resource: DeserializeOwned + Serialize + Send + Sync + 'static {
    /// Collection segment under `/api/`.
    const PATH: &'static str;
    const SINGULAR: &'static str;
    const PLURAL: &'static str;

    fn id(&self) -> &str;
    fn list_key() -> CacheKey;
    fn item_key(id: &str) -> CacheKey;
    fn history_key(id: &str) -> CacheKey;
}

impl Resource for Invoice {
    const PATH: &'static str = "invoices";
    const SINGULAR: &'static str = "invoice";
    const PLURAL: &'static str = "invoices";

    fn id(&self) -> &str {
        &self.id
    }

    fn list_key() -> CacheKey {
        CacheKey::Invoices
    }

    fn item_key(id: &str) -> CacheKey {
        CacheKey::Invoice(id.to_string())
    }

    fn history_key(id: &str) -> CacheKey {
        CacheKey::InvoicePaymentHistory(id.to_string())
    }
}

impl Resource for Customer {
    const PATH: &'static str = "customers";
    const SINGULAR: &'static str = "customer";
    const PLURAL: &'static str = "customers";

    fn id(&self) -> &str {
        &self.id
    }

    fn list_key() -> CacheKey {
        CacheKey::Customers
    }

    fn item_key(id: &str) -> CacheKey {
        CacheKey::Customer(id.to_string())
    }

    fn history_key(id: &str) -> CacheKey {
        CacheKey::CustomerPaymentHistory(id.to_string())
    }
}

impl Resource for BusinessOwner {
    const PATH: &'static str = "business-owners";
    const SINGULAR: &'static str = "business owner";
    const PLURAL: &'static str = "business owners";

    fn id(&self) -> &str {
        &self.id
    }

    fn list_key() -> CacheKey {
        CacheKey::BusinessOwners
    }

    fn item_key(id: &str) -> CacheKey {
        CacheKey::BusinessOwner(id.to_string())
    }

    fn history_key(id: &str) -> CacheKey {
        CacheKey::BusinessOwnerPaymentHistory(id.to_string())
    }
}
