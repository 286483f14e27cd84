mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use invoice_console::startup::{build_router, build_state, Collaborators};
use tower::ServiceExt;

fn router() -> axum::Router {
    let settings = common::test_settings("http://127.0.0.1:9", "http://127.0.0.1:9");
    let collaborators = Collaborators::from_settings(&settings).unwrap();
    build_router(build_state(settings, collaborators))
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/api/payment-sessions/7f1c3c3e-94a4-4d4e-9c51-1c7f0f0d1a11")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn unreachable_backend_is_a_bad_gateway() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/api/invoices")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Failed to load invoices");
}

#[tokio::test]
async fn preflight_allows_the_console_origin() {
    let response = router()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/invoices")
                .header(header::ORIGIN, common::PUBLIC_URL)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        common::PUBLIC_URL
    );
}
