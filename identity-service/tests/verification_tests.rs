mod common;

use chrono::Duration;
use common::TestApp;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_send_code_delivers_one_mail() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/auth/email/code")
        .json(&json!({ "email": "a@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.mail.sent().len(), 1);
    assert_eq!(app.issued_code("a@example.com").len(), 6);
}

#[tokio::test]
async fn test_send_code_twice_conflicts() {
    let app = TestApp::spawn().await;

    app.post("/auth/email/code")
        .json(&json!({ "email": "a@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    let response = app
        .post("/auth/email/code")
        .json(&json!({ "email": "a@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "DUPLICATE_EMAIL");
    // The rejected issuance did not overwrite the first code.
    assert_eq!(app.mail.sent().len(), 1);
}

#[tokio::test]
async fn test_send_code_rejects_invalid_email() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/auth/email/code")
        .json(&json!({ "email": "not-an-email" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "INVALID_EMAIL");
}

#[tokio::test]
async fn test_verify_unknown_email() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/auth/email/verify")
        .json(&json!({ "email": "missing@example.com", "code": "123456" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "EMAIL_NOT_FOUND");
}

#[tokio::test]
async fn test_verify_wrong_code_keeps_record_unverified() {
    let app = TestApp::spawn().await;

    app.post("/auth/email/code")
        .json(&json!({ "email": "a@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    let code = app.issued_code("a@example.com");
    let wrong = if code == "999999" { "000000" } else { "999999" };

    let response = app
        .post("/auth/email/verify")
        .json(&json!({ "email": "a@example.com", "code": wrong }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "ILLEGAL_CODE");

    // The record stayed unverified, so sign-up is still gated.
    let response = app
        .post("/auth/signup")
        .json(&json!({ "email": "a@example.com", "password": "P@ssw0rd1" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "NOT_VERIFIED");
}

#[tokio::test]
async fn test_verify_expired_code() {
    let app = TestApp::spawn().await;

    app.post("/auth/email/code")
        .json(&json!({ "email": "a@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");
    let code = app.issued_code("a@example.com");

    app.clock.advance(Duration::minutes(6));

    let response = app
        .post("/auth/email/verify")
        .json(&json!({ "email": "a@example.com", "code": code }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::GONE);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "EXPIRED");
}

#[tokio::test]
async fn test_expired_code_can_be_reissued() {
    let app = TestApp::spawn().await;

    app.post("/auth/email/code")
        .json(&json!({ "email": "a@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    app.clock.advance(Duration::minutes(6));

    // The stale record does not block a fresh issuance.
    let response = app
        .post("/auth/email/code")
        .json(&json!({ "email": "a@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let code = app.issued_code("a@example.com");
    let response = app
        .post("/auth/email/verify")
        .json(&json!({ "email": "a@example.com", "code": code }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_send_code_for_registered_email_conflicts() {
    let app = TestApp::spawn().await;

    app.verify_email("a@example.com").await;
    let response = app
        .post("/auth/signup")
        .json(&json!({ "email": "a@example.com", "password": "P@ssw0rd1" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    // The address now belongs to a user; issuance is refused.
    let response = app
        .post("/auth/email/code")
        .json(&json!({ "email": "a@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "DUPLICATE_EMAIL");
}
