use chrono::DateTime;
use reqwest::{Method, Response};

use crate::helpers::TestApp;

fn assert_cors_headers(response: &Response) {
    let headers = response.headers();

    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
}

#[tokio::test]
async fn subscribe_returns_200_with_success_status_for_a_new_email() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "a@b.com" }))
        .await;

    assert_eq!(200, response.status().as_u16());
    assert_cors_headers(&response);
    assert_eq!(response.headers()["content-type"], "application/json");

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Successfully subscribed!");
}

#[tokio::test]
async fn subscribe_persists_the_new_subscriber() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_subscription(serde_json::json!({ "email": "a@b.com" }))
        .await;

    let rows = test_app.subscriber_rows().await;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "a@b.com");
    assert!(DateTime::parse_from_rfc3339(&rows[0][1]).is_ok());
    assert!(rows[0][1].ends_with('Z'));
    assert_eq!(rows[0][2], "unknown");
}

#[tokio::test]
async fn subscribe_creates_the_worksheet_with_its_header_once() {
    let test_app = TestApp::spawn_app().await;

    for email in ["a@b.com", "c@d.com"] {
        test_app
            .post_subscription(serde_json::json!({ "email": email }))
            .await;
    }

    let values = test_app.store.values("Subscribers").await.unwrap();

    assert_eq!(values[0], vec!["Email", "Subscribed At", "IP Address"]);
    assert_eq!(values.len(), 3);
}

#[tokio::test]
async fn subscribing_twice_stores_a_single_row() {
    let test_app = TestApp::spawn_app().await;
    let body = serde_json::json!({ "email": "a@b.com" });

    test_app.post_subscription(body.clone()).await;
    let response = test_app.post_subscription(body).await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "existing");
    assert_eq!(body["message"], "Already subscribed");
    assert_eq!(test_app.subscriber_rows().await.len(), 1);
}

#[tokio::test]
async fn subscribe_records_the_forwarded_address() {
    let test_app = TestApp::spawn_app().await;

    reqwest::Client::new()
        .post(&format!("{}/subscribe", test_app.address))
        .header("X-Forwarded-For", "203.0.113.7")
        .header("X-Real-IP", "198.51.100.2")
        .json(&serde_json::json!({ "email": "a@b.com" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(test_app.subscriber_rows().await[0][2], "203.0.113.7");
}

#[tokio::test]
async fn subscribe_is_served_on_the_functions_path() {
    let test_app = TestApp::spawn_app().await;

    let response = reqwest::Client::new()
        .post(&format!("{}/.netlify/functions/subscribe", test_app.address))
        .json(&serde_json::json!({ "email": "a@b.com" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(test_app.subscriber_rows().await.len(), 1);
}

#[tokio::test]
async fn subscribe_returns_400_when_email_is_missing_or_invalid() {
    let test_app = TestApp::spawn_app().await;

    // This is a common practice and it is called table-driven tests. In this case, it simulates different kind of possible request bodies
    // where API should return 400.
    let test_cases = vec![
        (serde_json::json!({}), "missing email"),
        (serde_json::json!({ "email": "" }), "empty email"),
        (serde_json::json!({ "email": "invalid" }), "email without @"),
        (serde_json::json!({ "email": 42 }), "email is not a string"),
        (serde_json::json!({ "name": "a@b.com" }), "email under another key"),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_subscription(invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );
        assert_cors_headers(&response);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Valid email address required");
    }

    assert!(test_app.store.values("Subscribers").await.is_none());
}

#[tokio::test]
async fn subscribe_returns_500_when_body_is_not_a_json_object() {
    let test_app = TestApp::spawn_app().await;

    for body in ["", "email=a@b.com", "{\"email\":", "null", "[\"a@b.com\"]"] {
        let response = test_app.post_raw_subscription(body).await;

        assert_eq!(
            500,
            response.status().as_u16(),
            "The API did not fail with 500 status when body was {:?}",
            body
        );
        assert_cors_headers(&response);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "error": "Failed to subscribe. Please try again." })
        );
    }

    assert!(test_app.store.values("Subscribers").await.is_none());
}

#[tokio::test]
async fn subscribe_accepts_any_string_containing_an_at_sign() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "not really@" }))
        .await;

    assert_eq!(200, response.status().as_u16());
    assert_eq!(test_app.subscriber_rows().await[0][0], "not really@");
}

#[tokio::test]
async fn subscribe_returns_500_without_details_when_the_store_fails() {
    let test_app = TestApp::spawn_app().await;
    test_app.store.set_unavailable(true);

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "a@b.com" }))
        .await;

    assert_eq!(500, response.status().as_u16());
    assert_cors_headers(&response);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "error": "Failed to subscribe. Please try again." })
    );
}

#[tokio::test]
async fn preflight_returns_200_with_an_empty_body() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .request_subscription(Method::OPTIONS, "/subscribe")
        .await;

    assert_eq!(200, response.status().as_u16());
    assert_cors_headers(&response);
    assert_eq!(response.text().await.unwrap(), "");
}

#[tokio::test]
async fn preflight_never_touches_the_store() {
    let test_app = TestApp::spawn_app().await;
    test_app.store.set_unavailable(true);

    let response = reqwest::Client::new()
        .request(Method::OPTIONS, &format!("{}/subscribe", test_app.address))
        .header("Access-Control-Request-Method", "POST")
        .header("Origin", "https://timeline.example.com")
        .body(r#"{"email":"a@b.com"}"#)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn other_methods_return_405() {
    let test_app = TestApp::spawn_app().await;

    for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
        let response = test_app
            .request_subscription(method.clone(), "/subscribe")
            .await;

        assert_eq!(
            405,
            response.status().as_u16(),
            "The API did not fail with 405 status for {}",
            method
        );
        assert_cors_headers(&response);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Method not allowed");
    }
}
