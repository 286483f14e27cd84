//! Client for the invoicing REST backend.
//!
//! Every successful response is wrapped as `{ "data": ... }`. Non-2xx responses are
//! failures; their body is searched for a `message`, `detail` or `error` string and
//! otherwise replaced by a fixed per-operation message.

use async_trait::async_trait;
use console_core::error::AppError;
use console_core::observability::{TracedClientExt, TracedRequest};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use super::query_cache::{CacheKey, CacheLoader};
use super::resource::Resource;
use crate::config::ApiSettings;
use crate::models::{BusinessOwner, Customer, Invoice};
use crate::payments::intent::{CreatePaymentIntentRequest, PaymentIntent, PaymentIntentRequester};
use crate::payments::refund::{RefundReceipt, RefundRequester};

pub const PAYMENT_HISTORY_ERROR: &str = "Failed to load payment history";
pub const PAYMENT_INTENT_ERROR: &str = "Failed to create payment intent";
pub const REFUND_ERROR: &str = "Refund processing failed";

/// Failure talking to the backend. `Display` is the message shown to the payer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response.
    #[error("{fallback}")]
    Transport {
        fallback: String,
        #[source]
        source: reqwest::Error,
    },

    /// A 2xx response whose body could not be read as the expected payload.
    #[error("{fallback}")]
    Decode {
        fallback: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Rejected { .. } => "rejected",
            ApiError::Transport { .. } => "transport",
            ApiError::Decode { .. } => "decode",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match &err {
            ApiError::Rejected { status, message } if *status == StatusCode::NOT_FOUND.as_u16() => {
                AppError::NotFound(anyhow::anyhow!(message.clone()))
            }
            _ => {
                tracing::warn!(kind = err.kind(), error = ?err, "Backend call failed");
                AppError::BadGateway(err.to_string())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    data: T,
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "detail", "error"]
        .iter()
        .filter_map(|field| value.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_string)
}

fn load_error(plural: &str) -> String {
    format!("Failed to load {}", plural)
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|e| AppError::ConfigError(e.into()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn execute(&self, request: TracedRequest, fallback: &str) -> Result<Vec<u8>, ApiError> {
        let transport = |source| ApiError::Transport {
            fallback: fallback.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| fallback.to_string());
            tracing::debug!(status = status.as_u16(), reason = %message, "Backend rejected request");
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body.to_vec())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: TracedRequest,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let body = self.execute(request, fallback).await?;
        serde_json::from_slice::<ApiEnvelope<T>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|source| ApiError::Decode {
                fallback: fallback.to_string(),
                source,
            })
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str, fallback: &str) -> Result<T, ApiError> {
        self.send(self.client.traced_get(&self.url(path)), fallback)
            .await
    }

    pub async fn create<R: Resource, B: Serialize + Sync>(&self, body: &B) -> Result<R, ApiError> {
        let request = self
            .client
            .traced_post(&self.url(&format!("{}/", R::PATH)))
            .json(body);
        self.send(request, &format!("Failed to create {}", R::SINGULAR))
            .await
    }

    pub async fn update<R: Resource, B: Serialize + Sync>(
        &self,
        id: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let request = self
            .client
            .traced_put(&self.url(&format!("{}/{}/", R::PATH, id)))
            .json(body);
        self.send(request, &format!("Failed to update {}", R::SINGULAR))
            .await
    }

    pub async fn delete<R: Resource>(&self, id: &str) -> Result<(), ApiError> {
        let request = self
            .client
            .traced_delete(&self.url(&format!("{}/{}/", R::PATH, id)));
        self.execute(request, &format!("Failed to delete {}", R::SINGULAR))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PaymentIntentRequester for BackendClient {
    #[tracing::instrument(skip(self, request), fields(partial = request.payment_amount.is_some()))]
    async fn create_payment_intent(
        &self,
        invoice_id: &str,
        request: &CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, ApiError> {
        let url = self.url(&format!("invoices/{}/create-payment-intent/", invoice_id));
        let intent: PaymentIntent = self
            .send(self.client.traced_post(&url).json(request), PAYMENT_INTENT_ERROR)
            .await?;
        tracing::info!(intent_id = %intent.intent_id, "Payment intent created");
        Ok(intent)
    }
}

#[async_trait]
impl RefundRequester for BackendClient {
    #[tracing::instrument(skip(self))]
    async fn refund_payment(&self, payment_reference: &str) -> Result<RefundReceipt, ApiError> {
        let url = self.url(&format!("payments/{}/refund/", payment_reference));
        let body = serde_json::json!({});
        self.send(self.client.traced_post(&url).json(&body), REFUND_ERROR)
            .await
    }
}

#[async_trait]
impl CacheLoader for BackendClient {
    async fn load(&self, key: &CacheKey) -> Result<Value, ApiError> {
        match key {
            CacheKey::Invoices => self.list_value::<Invoice>().await,
            CacheKey::Invoice(id) => self.item_value::<Invoice>(id).await,
            CacheKey::InvoicePaymentHistory(id) => self.history_value::<Invoice>(id).await,
            CacheKey::Customers => self.list_value::<Customer>().await,
            CacheKey::Customer(id) => self.item_value::<Customer>(id).await,
            CacheKey::CustomerPaymentHistory(id) => self.history_value::<Customer>(id).await,
            CacheKey::BusinessOwners => self.list_value::<BusinessOwner>().await,
            CacheKey::BusinessOwner(id) => self.item_value::<BusinessOwner>(id).await,
            CacheKey::BusinessOwnerPaymentHistory(id) => {
                self.history_value::<BusinessOwner>(id).await
            }
            CacheKey::PaymentHistory => self.get_data("transactions/", PAYMENT_HISTORY_ERROR).await,
            CacheKey::PaymentHistoryItem(id) => {
                self.get_data(&format!("transactions/{}/", id), PAYMENT_HISTORY_ERROR)
                    .await
            }
            CacheKey::PaymentIntent { .. } => Err(ApiError::Rejected {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: "Payment intents are not served by the backend".to_string(),
            }),
        }
    }
}

impl BackendClient {
    async fn list_value<R: Resource>(&self) -> Result<Value, ApiError> {
        self.get_data(&format!("{}/", R::PATH), &load_error(R::PLURAL))
            .await
    }

    async fn item_value<R: Resource>(&self, id: &str) -> Result<Value, ApiError> {
        self.get_data(&format!("{}/{}/", R::PATH, id), &load_error(R::PLURAL))
            .await
    }

    async fn history_value<R: Resource>(&self, id: &str) -> Result<Value, ApiError> {
        self.get_data(&format!("{}/{}/transactions/", R::PATH, id), PAYMENT_HISTORY_ERROR)
            .await
    }
}
