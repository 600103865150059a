use std::sync::Arc;

use anyhow::Result;
use chrono::DateTime;
use reqwest::StatusCode;
use serde_json::{json, Value};
use sitehooks::{
    config::{StatusMode, SubmissionConfig},
    web::{types::STORE_HEADERS, REQUEST_ID_HEADER},
};

use sitehooks::{lock::ProcessLock, store::MemoryStore};

use crate::helpers::{FailingStore, FlakyStore, NeverLock, TestApp, STORE_ID};

fn signup(email: &str, lang: &str) -> Value {
    json!({
        "storeId": STORE_ID,
        "record": { "email": email, "page": "/p", "lang": lang }
    })
}

async fn assert_rejected(res: reqwest::Response, status: StatusCode, error: &str) -> Result<()> {
    assert_eq!(res.status(), status, "Wrong response StatusCode");
    let body: Value = res.json().await?;
    assert_eq!(body, json!({ "ok": false, "error": error }));
    Ok(())
}

#[tokio::test]
async fn submit_appends_normalized_row() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app
        .post_submission(&json!({
            "storeId": STORE_ID,
            "record": { "email": "  USER@Example.com ", "page": "/p", "lang": "en" }
        }))
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body, json!({ "ok": true }));

    let rows = app.stored_rows()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], STORE_HEADERS);
    assert_eq!(rows[1][1..], ["user@example.com", "/p", "en", "", "newsletter"]);
    assert!(rows[1][0].ends_with('Z'), "{}", rows[1][0]);
    assert!(DateTime::parse_from_rfc3339(&rows[1][0]).is_ok());

    Ok(())
}

#[tokio::test]
async fn submit_keeps_optional_fields() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app
        .post_submission(&json!({
            "sheetId": STORE_ID,
            "record": {
                "timestamp": "2025-09-28T10:00:00.000Z",
                "email": "a@x.com",
                "page": "/fr/blog/",
                "lang": "fr",
                "utm": { "utm_source": "newsletter-footer", "utm_medium": "web" },
                "consent": "newsletter+offers"
            }
        }))
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let rows = app.stored_rows()?;
    assert_eq!(
        rows[1],
        [
            "2025-09-28T10:00:00.000Z",
            "a@x.com",
            "/fr/blog/",
            "fr",
            "newsletter-footer",
            "newsletter+offers"
        ]
    );

    Ok(())
}

#[tokio::test]
async fn submit_answers_on_any_path() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app
        .http_client
        .post(app.url("/api/newsletter"))
        .json(&signup("a@x.com", "en"))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(app.stored_rows()?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn submit_invalid_email_400() -> Result<()> {
    let app = TestApp::spawn().await?;

    for email in ["not-an-email", "a@b", "a b@x.com", "@x.com"] {
        let res = app.post_submission(&signup(email, "en")).await?;
        assert_rejected(res, StatusCode::BAD_REQUEST, "Invalid email").await?;
    }

    assert!(app.stored_rows()?.is_empty(), "A row was appended");

    Ok(())
}

#[tokio::test]
async fn submit_missing_fields_400() -> Result<()> {
    let app = TestApp::spawn().await?;

    let tests = [
        (json!({ "record": { "email": "a@x.com" } }), "Missing storeId"),
        (json!({ "storeId": STORE_ID }), "Missing record"),
        (json!({ "storeId": STORE_ID, "record": { "page": "/" } }), "Missing email"),
        (json!({ "storeId": "", "record": { "email": "a@x.com" } }), "Empty storeId"),
    ];

    for (body, description) in tests {
        let res = app.post_submission(&body).await?;
        assert_eq!(
            res.status(),
            StatusCode::BAD_REQUEST,
            "Wrong StatusCode for: {description}"
        );
        let body: Value = res.json().await?;
        assert_eq!(body["error"], "Missing storeId or record.email", "{description}");
    }

    assert!(app.stored_rows()?.is_empty(), "A row was appended");

    Ok(())
}

#[tokio::test]
async fn submit_invalid_json_400() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.post_raw(Some("application/json"), "{\"storeId\": ").await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["ok"], false);
    let error = body["error"].as_str().unwrap_or_default();
    assert!(error.starts_with("Invalid JSON"), "{error}");
    assert!(app.stored_rows()?.is_empty());

    Ok(())
}

#[tokio::test]
async fn submit_wrong_content_type_400() -> Result<()> {
    let app = TestApp::spawn().await?;
    let body = r#"{"storeId":"S1","record":{"email":"a@x.com"}}"#;

    let res = app.post_raw(Some("text/plain"), body).await?;
    assert_rejected(res, StatusCode::BAD_REQUEST, "Content-Type must be application/json").await?;

    let res = app.post_raw(None, body).await?;
    assert_rejected(res, StatusCode::BAD_REQUEST, "Content-Type must be application/json").await?;

    Ok(())
}

#[tokio::test]
async fn submit_empty_body_400() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.post_raw(Some("application/json"), "").await?;

    assert_rejected(res, StatusCode::BAD_REQUEST, "Empty body").await
}

#[tokio::test]
async fn header_is_written_once() -> Result<()> {
    let app = TestApp::spawn().await?;

    for email in ["a@x.com", "b@x.com", "c@x.com"] {
        let res = app.post_submission(&signup(email, "en")).await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let rows = app.stored_rows()?;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], STORE_HEADERS);
    let headers = rows.iter().filter(|row| **row == STORE_HEADERS).count();
    assert_eq!(headers, 1);

    Ok(())
}

#[tokio::test]
async fn submit_carries_request_id() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.post_submission(&signup("a@x.com", "en")).await?;

    assert!(res.headers().contains_key(REQUEST_ID_HEADER));

    Ok(())
}

#[tokio::test]
async fn embedded_status_mode_always_200() -> Result<()> {
    let app = TestApp::spawn_with_config(SubmissionConfig {
        status_mode: StatusMode::Embedded,
        ..Default::default()
    })
    .await?;

    let res = app.post_submission(&signup("invalid", "en")).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(
        body,
        json!({ "ok": false, "status": 400, "error": "Invalid email" })
    );

    let res = app.post_submission(&signup("a@x.com", "en")).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body, json!({ "ok": true, "status": 200 }));

    Ok(())
}

#[tokio::test]
async fn lock_timeout_proceeds_by_default() -> Result<()> {
    let app = TestApp::spawn_with_lock(
        Arc::new(NeverLock),
        SubmissionConfig {
            lock_timeout_millis: 10,
            ..Default::default()
        },
    )
    .await?;

    let res = app.post_submission(&signup("a@x.com", "en")).await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(app.stored_rows()?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn lock_timeout_fails_when_strict() -> Result<()> {
    let app = TestApp::spawn_with_lock(
        Arc::new(NeverLock),
        SubmissionConfig {
            lock_timeout_millis: 10,
            strict_lock: true,
            ..Default::default()
        },
    )
    .await?;

    let res = app.post_submission(&signup("a@x.com", "en")).await?;

    assert_rejected(
        res,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Timed out waiting for the store lock",
    )
    .await?;
    assert!(app.stored_rows()?.is_empty());

    Ok(())
}

#[tokio::test]
async fn store_failure_500() -> Result<()> {
    let app = TestApp::spawn_with_store(Arc::new(FailingStore)).await?;

    let res = app.post_submission(&signup("a@x.com", "en")).await?;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await?;
    assert_eq!(body["ok"], false);
    let error = body["error"].as_str().unwrap_or_default();
    assert!(error.contains("503"), "{error}");

    Ok(())
}

#[tokio::test]
async fn concurrent_submissions_all_land() -> Result<()> {
    let app = TestApp::spawn().await?;

    let requests = (0..10).map(|i| {
        let body = signup(&format!("user{i}@x.com"), "en");
        let req = app.http_client.post(app.url("/")).json(&body);
        async move { req.send().await }
    });

    let responses = futures_join_all(requests).await?;
    assert_eq!(responses.len(), 10);
    for res in responses {
        assert_eq!(res?.status(), StatusCode::OK);
    }

    let rows = app.stored_rows()?;
    assert_eq!(rows.len(), 11);
    assert_eq!(rows.iter().filter(|row| **row == STORE_HEADERS).count(), 1);

    Ok(())
}

/// Drives every future to completion on its own task.
async fn futures_join_all<F, T>(futures: impl Iterator<Item = F>) -> Result<Vec<T>>
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = futures.map(tokio::spawn).collect();
    let mut out = Vec::with_capacity(handles.len());
    for handle in handles {
        out.push(handle.await?);
    }
    Ok(out)
}

#[tokio::test]
async fn dedupe_keeps_first_signup_per_language() -> Result<()> {
    let app = TestApp::spawn_with_config(SubmissionConfig {
        dedupe: true,
        ..Default::default()
    })
    .await?;

    for (email, lang) in [("a@x.com", "en"), ("A@X.com", "en"), ("a@x.com", "fr")] {
        let res = app.post_submission(&signup(email, lang)).await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let rows = app.stored_rows()?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][3], "en");
    assert_eq!(rows[2][3], "fr");

    Ok(())
}

#[tokio::test]
async fn lock_is_released_after_store_failure() -> Result<()> {
    let store = MemoryStore::new();
    let app = TestApp::spawn_with(
        Arc::new(FlakyStore::new(store.clone())),
        Arc::new(ProcessLock::new()),
        SubmissionConfig {
            lock_timeout_millis: 500,
            strict_lock: true,
            ..Default::default()
        },
        store,
    )
    .await?;

    let res = app.post_submission(&signup("a@x.com", "en")).await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let res = app.post_submission(&signup("a@x.com", "en")).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body, json!({ "ok": true }));
    assert_eq!(app.stored_rows()?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn oversized_body_gets_json_error() -> Result<()> {
    let app = TestApp::spawn().await?;
    let body = format!(
        r#"{{"storeId":"S1","record":{{"email":"a@x.com","page":"{}"}}}}"#,
        "x".repeat(3 * 1024 * 1024)
    );

    let res = app
        .http_client
        .post(app.url("/"))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = res.json().await?;
    assert_eq!(body["ok"], false);
    let error = body["error"].as_str().unwrap_or_default();
    assert!(error.contains("length limit exceeded"), "{error}");
    assert!(app.stored_rows()?.is_empty());

    Ok(())
}
