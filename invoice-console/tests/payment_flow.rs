mod common;

use common::{invoice, TestApp};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn open_session(app: &TestApp, invoice_id: &str) -> Value {
    let response = app
        .post(&format!("/api/invoices/{}/payment-sessions", invoice_id), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

fn session_path(session: &Value, action: &str) -> String {
    let id = session["session_id"].as_str().unwrap();
    if action.is_empty() {
        format!("/api/payment-sessions/{}", id)
    } else {
        format!("/api/payment-sessions/{}/{}", id, action)
    }
}

async fn notification_titles(app: &TestApp) -> Vec<String> {
    let body: Vec<Value> = app.get("/api/notifications").await.json().await.unwrap();
    body.iter()
        .map(|n| n["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn full_payment_succeeds_and_refreshes_the_invoice() {
    let app = TestApp::spawn().await;
    app.mount_invoice(invoice("inv-1", "100.00", "30.00", "partial")).await;
    app.mount_intent("inv-1", "pi_test1").await;
    app.mount_confirmation(
        "pi_test1",
        ResponseTemplate::new(200).set_body_json(json!({ "id": "pi_test1", "status": "succeeded" })),
    )
    .await;

    let session = open_session(&app, "inv-1").await;
    assert_eq!(session["status"], "initial");
    assert_eq!(session["button_label"], "Pay Full Amount ($70.00)");

    let ready: Value = app.post(&session_path(&session, "pay"), json!({})).await.json().await.unwrap();
    assert_eq!(ready["stage"], "awaiting_confirmation");
    assert_eq!(ready["client_secret"], "pi_test1_secret_test");

    let intent_calls = app
        .backend_requests("POST", "/api/invoices/inv-1/create-payment-intent/")
        .await;
    assert_eq!(intent_calls.len(), 1);
    let sent: Value = serde_json::from_slice(&intent_calls[0].body).unwrap();
    assert_eq!(sent, json!({ "customer_email": "jane@example.com" }));

    let done: Value = app
        .post(&session_path(&session, "confirm"), json!({ "payment_method": "pm_card_visa" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(done["status"], "success");
    assert_eq!(done["intent_id"], "pi_test1");

    let confirmations = app
        .processor_requests("POST", "/payment_intents/pi_test1/confirm")
        .await;
    assert_eq!(confirmations.len(), 1);
    let form = String::from_utf8_lossy(&confirmations[0].body).to_string();
    assert!(form.contains("payment_method=pm_card_visa"));
    assert!(form.contains("return_url=http%3A%2F%2Fconsole.test%2Finvoices%2Finv-1%3Fpayment%3Dsuccess"));

    assert_eq!(notification_titles(&app).await[0], "Payment Success");

    // Immediate refetch of the invoice, then the session closes itself.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(app.backend_requests("GET", "/api/invoices/inv-1/").await.len() >= 2);
    let response = app.get(&session_path(&session, "")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn partial_amount_outside_bounds_is_rejected_inline() {
    let app = TestApp::spawn().await;
    app.mount_invoice(invoice("inv-1", "100.00", "30.00", "partial")).await;
    app.mount_intent("inv-1", "pi_test1").await;
    let session = open_session(&app, "inv-1").await;

    let view: Value = app
        .put(&session_path(&session, "amount"), json!({ "partial": true, "amount": "80.00" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view["amount_error"], "Amount must be between $1.00 and $70.00");
    assert_eq!(view["button_label"], "Pay $80.00");

    let response = app.post(&session_path(&session, "pay"), json!({})).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Amount must be between $1.00 and $70.00");

    assert!(app
        .backend_requests("POST", "/api/invoices/inv-1/create-payment-intent/")
        .await
        .is_empty());
    assert!(notification_titles(&app).await.is_empty());
}

#[tokio::test]
async fn partial_amount_in_bounds_is_sent_to_the_backend() {
    let app = TestApp::spawn().await;
    app.mount_invoice(invoice("inv-1", "100.00", "30.00", "partial")).await;
    app.mount_intent("inv-1", "pi_test1").await;
    let session = open_session(&app, "inv-1").await;

    app.put(&session_path(&session, "amount"), json!({ "partial": true, "amount": 25 }))
        .await;
    app.post(&session_path(&session, "pay"), json!({})).await;

    let intent_calls = app
        .backend_requests("POST", "/api/invoices/inv-1/create-payment-intent/")
        .await;
    let sent: Value = serde_json::from_slice(&intent_calls[0].body).unwrap();
    assert_eq!(sent["payment_amount"], 25.0);
}

#[tokio::test]
async fn declined_card_moves_to_error_and_retry_starts_over() {
    let app = TestApp::spawn().await;
    app.mount_invoice(invoice("inv-1", "100.00", "0", "sent")).await;
    app.mount_intent("inv-1", "pi_test1").await;
    app.mount_confirmation(
        "pi_test1",
        ResponseTemplate::new(402).set_body_json(json!({
            "error": {
                "type": "card_error",
                "code": "card_declined",
                "message": "Your card was declined."
            }
        })),
    )
    .await;

    let session = open_session(&app, "inv-1").await;
    app.post(&session_path(&session, "pay"), json!({})).await;
    let failed: Value = app
        .post(&session_path(&session, "confirm"), json!({ "payment_method": "pm_card_declined" }))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(failed["status"], "error");
    assert_eq!(
        failed["error"],
        "Your card was declined. Please try a different payment method."
    );
    assert_eq!(notification_titles(&app).await[0], "Payment Error");

    let retried: Value = app.post(&session_path(&session, "retry"), json!({})).await.json().await.unwrap();
    assert_eq!(retried["stage"], "awaiting_confirmation");
    assert_eq!(retried["partial"], false);
    assert_ne!(retried["attempt_id"], failed["attempt_id"]);
    assert_eq!(
        app.backend_requests("POST", "/api/invoices/inv-1/create-payment-intent/")
            .await
            .len(),
        2
    );
}

#[tokio::test]
async fn incomplete_card_details_never_reach_the_processor() {
    let app = TestApp::spawn().await;
    app.mount_invoice(invoice("inv-1", "100.00", "0", "sent")).await;
    app.mount_intent("inv-1", "pi_test1").await;

    let session = open_session(&app, "inv-1").await;
    app.post(&session_path(&session, "pay"), json!({})).await;
    let failed: Value = app
        .post(&session_path(&session, "confirm"), json!({}))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(failed["status"], "error");
    assert_eq!(failed["error"], "Your card details are incomplete.");
    assert!(app
        .processor_requests("POST", "/payment_intents/pi_test1/confirm")
        .await
        .is_empty());
}

#[tokio::test]
async fn intent_rejection_surfaces_the_backend_message() {
    let app = TestApp::spawn().await;
    app.mount_invoice(invoice("inv-1", "100.00", "0", "sent")).await;
    Mock::given(method("POST"))
        .and(path("/api/invoices/inv-1/create-payment-intent/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Invoice already paid" })),
        )
        .mount(&app.backend)
        .await;

    let session = open_session(&app, "inv-1").await;
    let view: Value = app.post(&session_path(&session, "pay"), json!({})).await.json().await.unwrap();

    assert_eq!(view["status"], "error");
    assert_eq!(view["error"], "Invoice already paid");
    assert_eq!(notification_titles(&app).await[0], "Payment Setup Error");
}

#[tokio::test]
async fn paid_invoice_cannot_start_a_payment() {
    let app = TestApp::spawn().await;
    app.mount_invoice(invoice("inv-1", "100.00", "100.00", "paid")).await;

    let session = open_session(&app, "inv-1").await;
    assert_eq!(session["can_pay"], false);

    let response = app.post(&session_path(&session, "pay"), json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(app
        .backend_requests("POST", "/api/invoices/inv-1/create-payment-intent/")
        .await
        .is_empty());
}

#[tokio::test]
async fn closed_session_reports_cancelled_and_is_released() {
    let app = TestApp::spawn().await;
    app.mount_invoice(invoice("inv-1", "100.00", "0", "sent")).await;
    let session = open_session(&app, "inv-1").await;

    let closed: Value = app.delete(&session_path(&session, "")).await.json().await.unwrap();
    assert_eq!(closed["status"], "cancelled");

    let response = app.get(&session_path(&session, "")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let reopened = open_session(&app, "inv-1").await;
    assert_ne!(reopened["session_id"], session["session_id"]);
    assert_eq!(reopened["status"], "initial");
}
