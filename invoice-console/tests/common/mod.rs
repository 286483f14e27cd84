#![allow(dead_code)]

use invoice_console::config::{
    ApiSettings, CacheSettings, PaymentSettings, ProcessorSettings, ServerSettings, Settings,
    TelemetrySettings,
};
use invoice_console::startup::Application;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const PUBLIC_URL: &str = "http://console.test";

/// A running console wired to a mock REST backend and a mock card processor.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub backend: MockServer,
    pub processor: MockServer,
    pub client: Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let backend = MockServer::start().await;
        let processor = MockServer::start().await;

        let settings = test_settings(&backend.uri(), &processor.uri());

        let app = Application::build(settings)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            backend,
            processor,
            client,
        }
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, body: Value) -> Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, body: Value) -> Response {
        self.client
            .put(format!("{}{}", self.address, path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Backend requests whose path matches exactly.
    pub async fn backend_requests(&self, http_method: &str, request_path: &str) -> Vec<Request> {
        received(&self.backend, http_method, request_path).await
    }

    pub async fn processor_requests(&self, http_method: &str, request_path: &str) -> Vec<Request> {
        received(&self.processor, http_method, request_path).await
    }

    pub async fn mount_invoice(&self, invoice: Value) {
        let id = invoice["id"].as_str().expect("invoice id").to_string();
        Mock::given(method("GET"))
            .and(path(format!("/api/invoices/{}/", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": invoice })))
            .mount(&self.backend)
            .await;
    }

    pub async fn mount_intent(&self, invoice_id: &str, intent_id: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/api/invoices/{}/create-payment-intent/", invoice_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "client_secret": format!("{}_secret_test", intent_id),
                    "payment_intent_id": intent_id,
                    "amount": 70.0,
                    "currency": "CAD"
                }
            })))
            .mount(&self.backend)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/payment_intents/{}", intent_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": intent_id,
                "status": "requires_payment_method"
            })))
            .mount(&self.processor)
            .await;
    }

    /// Confirmation answers only calls authorized with the publishable key.
    pub async fn mount_confirmation(&self, intent_id: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(format!("/payment_intents/{}/confirm", intent_id)))
            .and(header("authorization", "Bearer pk_test_console"))
            .respond_with(response)
            .mount(&self.processor)
            .await;
    }
}

pub fn test_settings(backend_uri: &str, processor_uri: &str) -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            public_url: PUBLIC_URL.to_string(),
            allowed_origins: vec![PUBLIC_URL.to_string()],
        },
        api: ApiSettings {
            base_url: backend_uri.to_string(),
            timeout_ms: 2_000,
        },
        processor: ProcessorSettings {
            publishable_key: "pk_test_console".to_string(),
            api_base_url: processor_uri.to_string(),
            timeout_ms: 2_000,
        },
        cache: CacheSettings::default(),
        payment: PaymentSettings {
            success_delay_ms: 300,
            settle_delay_ms: 100,
            retry_delay_ms: 10,
        },
        telemetry: TelemetrySettings::default(),
    }
}

async fn received(server: &MockServer, http_method: &str, request_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.to_string() == http_method && r.url.path() == request_path)
        .collect()
}

pub fn invoice(id: &str, total: &str, paid: &str, status: &str) -> Value {
    json!({
        "id": id,
        "invoice_number": "INV-0001",
        "owner": "own-1",
        "owner_name": "Acme Renovations",
        "customer": "cus-1",
        "customer_name": "Jane Doe",
        "customer_email": "jane@example.com",
        "total_amount": total,
        "amount_paid": paid,
        "status": status,
        "due_date": "2026-11-30"
    })
}

pub fn payment_transaction(id: &str, kind: &str, status: &str, reference: Option<&str>) -> Value {
    json!({
        "id": id,
        "transaction_time": "2026-10-03T10:00:00Z",
        "amount_paid": "25.00",
        "currency": "CAD",
        "customer": "cus-1",
        "customer_name": "Jane Doe",
        "business_owner": "own-1",
        "business_owner_name": "Acme Renovations",
        "invoice": "inv-1",
        "invoice_number": "INV-0001",
        "transaction_type": kind,
        "stripe_payment": reference,
        "status": status
    })
}
