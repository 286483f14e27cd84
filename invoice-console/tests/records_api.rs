mod common;

use common::{invoice, payment_transaction, TestApp};
use reqwest::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn invoice_reads_are_served_from_cache_within_the_staleness_window() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/api/invoices/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [invoice("inv-1", "100.00", "30.00", "partial")]
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    for _ in 0..2 {
        let response = app.get("/api/invoices").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Vec<Value> = response.json().await.unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0]["invoice_number"], "INV-0001");
        assert_eq!(body[0]["amount_paid"], 30.0);
    }
}

#[tokio::test]
async fn backend_rejection_message_is_surfaced() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/api/customers/"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "detail": "Database unavailable" })),
        )
        .mount(&app.backend)
        .await;

    let response = app.get("/api/customers").await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Database unavailable");
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/api/business-owners/own-404/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.backend)
        .await;

    let response = app.get("/api/business-owners/own-404").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_customer_is_rejected_before_reaching_the_backend() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/customers", json!({ "name": "Jane", "email": "not-an-email" }))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.backend_requests("POST", "/api/customers/").await.is_empty());
}

#[tokio::test]
async fn created_customer_is_readable_without_a_round_trip() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/api/customers/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": "cus-9", "name": "Jane", "email": "jane@example.com" }
        })))
        .mount(&app.backend)
        .await;

    let response = app
        .post("/api/customers", json!({ "name": "Jane", "email": "jane@example.com" }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.get("/api/customers/cus-9").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Jane");
    assert!(app.backend_requests("GET", "/api/customers/cus-9/").await.is_empty());
}

#[tokio::test]
async fn payment_link_uses_the_public_origin() {
    let app = TestApp::spawn().await;
    app.mount_invoice(invoice("inv-1", "1250.00", "0", "sent")).await;

    let body: Value = app.get("/api/invoices/inv-1/payment-link").await.json().await.unwrap();

    assert_eq!(body["link"], "http://console.test/pay/inv-1");
    assert_eq!(
        body["message"],
        "Payment Request - Invoice #INV-0001\n\nAmount Due: $1,250.00\n\nPay securely online: http://console.test/pay/inv-1"
    );
}

#[tokio::test]
async fn customer_stats_count_only_their_invoices() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/api/customers/cus-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": "cus-1", "name": "Jane Doe", "email": "jane@example.com" }
        })))
        .mount(&app.backend)
        .await;
    let mut other = invoice("inv-3", "500.00", "0", "sent");
    other["customer"] = json!("cus-2");
    Mock::given(method("GET"))
        .and(path("/api/invoices/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                invoice("inv-1", "100.00", "100.00", "paid"),
                invoice("inv-2", "50.00", "0", "overdue"),
                other
            ]
        })))
        .mount(&app.backend)
        .await;

    let body: Value = app.get("/api/customers/cus-1/stats").await.json().await.unwrap();

    assert_eq!(body["total_invoices"], 2);
    assert_eq!(body["paid_invoices"], 1);
    assert_eq!(body["overdue_invoices"], 1);
    assert_eq!(body["paid_percentage"], 50);
}

#[tokio::test]
async fn payment_history_rows_carry_labels() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                payment_transaction("tx-1", "payment", "succeeded", Some("pi_1")),
                payment_transaction("tx-2", "refund", "succeeded", Some("pi_1"))
            ]
        })))
        .mount(&app.backend)
        .await;

    let body: Vec<Value> = app.get("/api/transactions").await.json().await.unwrap();

    assert_eq!(body[0]["status_label"], "Completed");
    assert_eq!(body[0]["display_amount"], "$25.00");
    assert_eq!(body[0]["refundable"], true);
    assert_eq!(body[1]["status_label"], "Refunded");
    assert_eq!(body[1]["display_amount"], "-$25.00");
    assert_eq!(body[1]["refundable"], false);
}
