use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use livora::api::models::WalletResponse;
use livora::api::router;
use livora::api::state::AppState;
use livora::config::Config;
use livora::engine::{EngineSettings, JobEngine};
use livora::notify::LogDispatcher;
use livora::store::MemoryStore;

/// Builds a test app backed by an in-memory store
async fn build_test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = JobEngine::open(
        store.clone(),
        Arc::new(LogDispatcher::new()),
        EngineSettings::default(),
    )
    .await
    .expect("Failed to open engine");

    let state = AppState::new(Config::default(), Arc::new(engine));
    (router(state), store)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn register(app: &Router, wallet: Value) {
    let (status, _) = send(
        app,
        json_request(
            "POST",
            "/employer",
            json!({
                "id": "emp-1",
                "name": "Karim Traders",
                "phone": "01712345678",
                "verified": true,
                "wallet": wallet,
                "smsCredits": 10
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

fn job_body(payment: Value, candidates: &[&str]) -> Value {
    json!({
        "jobType": "electrician",
        "location": "Dhaka, Mirpur",
        "numberOfWorkers": 1,
        "urgency": "urgent",
        "paymentAmount": payment,
        "selectedCandidates": candidates
    })
}

async fn wallet(app: &Router) -> WalletResponse {
    let (status, body) = send(app, empty_request("GET", "/wallet")).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _store) = build_test_app().await;

    let (status, body) = send(&app, empty_request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["store"], "healthy");
}

#[tokio::test]
async fn test_create_job_debits_wallet() {
    let (app, _store) = build_test_app().await;
    register(&app, json!(100)).await;

    let (status, job) = send(
        &app,
        json_request("POST", "/jobs", job_body(json!(500), &["w1", "w2", "w3"])),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(job["status"], "pending_confirmation");
    assert_eq!(job["employerId"], "emp-1");
    assert_eq!(job["urgency"], "urgent");

    let wallet = wallet(&app).await;
    assert_eq!(wallet.wallet.to_string(), "73.50");
    assert_eq!(wallet.sms_credits, 10);

    let job_id = job["id"].as_str().unwrap();
    let (status, fetched) = send(&app, empty_request("GET", &format!("/jobs/{job_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], job["id"]);

    let (_, list) = send(&app, empty_request("GET", "/jobs")).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_job_accepts_string_amount() {
    let (app, _store) = build_test_app().await;
    register(&app, json!("100.00")).await;

    let (status, _) = send(
        &app,
        json_request("POST", "/jobs", job_body(json!("999.995"), &[])),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(wallet(&app).await.wallet.to_string(), "50.00");
}

#[tokio::test]
async fn test_insufficient_balance_returns_402() {
    let (app, _store) = build_test_app().await;
    register(&app, json!(20)).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/jobs", job_body(json!(500), &["w1", "w2", "w3"])),
    )
    .await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["code"], "INSUFFICIENT_BALANCE");
    assert_eq!(wallet(&app).await.wallet.to_string(), "20");
}

#[tokio::test]
async fn test_invalid_amount_returns_400() {
    let (app, _store) = build_test_app().await;
    register(&app, json!(100)).await;

    for payment in [json!(0), json!(-10), json!("abc"), json!(null)] {
        let (status, body) = send(&app, json_request("POST", "/jobs", job_body(payment, &[]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_AMOUNT");
    }
}

#[tokio::test]
async fn test_malformed_body_returns_400() {
    let (app, _store) = build_test_app().await;

    let (status, body) = send(&app, json_request("POST", "/jobs", json!({"location": "Dhaka"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PAYLOAD");
}

#[tokio::test]
async fn test_job_without_employer_returns_409() {
    let (app, _store) = build_test_app().await;

    let (status, body) = send(&app, json_request("POST", "/jobs", job_body(json!(500), &[]))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NO_EMPLOYER_PROFILE");
}

#[tokio::test]
async fn test_confirm_refund_and_status_flow() {
    let (app, _store) = build_test_app().await;
    register(&app, json!(100)).await;

    let (_, first) = send(&app, json_request("POST", "/jobs", job_body(json!(500), &["w1"]))).await;
    let (_, second) = send(&app, json_request("POST", "/jobs", job_body(json!(500), &[]))).await;
    let first_id = first["id"].as_str().unwrap().to_string();
    let second_id = second["id"].as_str().unwrap().to_string();

    // Confirm the first, refund the second
    let (status, confirmed) = send(
        &app,
        json_request("POST", &format!("/jobs/{first_id}/confirm"), json!({"workerId": "w1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["confirmedWorkerId"], "w1");

    let (status, refund) = send(&app, empty_request("POST", &format!("/jobs/{second_id}/refund"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refund["outcome"], "refunded");

    let (status, again) = send(&app, empty_request("POST", &format!("/jobs/{second_id}/refund"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["outcome"], "already_refunded");

    // 100 - 25.50 - 25 + 25
    assert_eq!(wallet(&app).await.wallet.to_string(), "74.50");

    // Refunding a confirmed job is a conflict
    let (status, body) = send(&app, empty_request("POST", &format!("/jobs/{first_id}/refund"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let (status, completed) = send(
        &app,
        json_request("PUT", &format!("/jobs/{first_id}/status"), json!({"status": "completed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");

    let (status, _) = send(
        &app,
        json_request("PUT", &format!("/jobs/{first_id}/status"), json!({"status": "finished"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_job_returns_404() {
    let (app, _store) = build_test_app().await;

    let (status, body) = send(&app, empty_request("GET", "/jobs/nonexistent")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "JOB_NOT_FOUND");

    let (status, _) = send(&app, empty_request("POST", "/jobs/nonexistent/refund")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_second_registration_rejected() {
    let (app, _store) = build_test_app().await;
    register(&app, json!(100)).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/employer",
            json!({"name": "Other", "phone": "01800000000", "wallet": 9999}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EMPLOYER_ALREADY_REGISTERED");
    assert_eq!(wallet(&app).await.wallet.to_string(), "100");
}

#[tokio::test]
async fn test_purchase_package() {
    let (app, _store) = build_test_app().await;
    register(&app, json!(100)).await;

    let (status, body) = send(&app, empty_request("POST", "/packages/emergency")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["smsCredits"], 20);

    let (status, _) = send(&app, empty_request("POST", "/packages/platinum")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_persistence_failure_returns_503() {
    let (app, store) = build_test_app().await;
    register(&app, json!(100)).await;
    store.set_fail_writes(true);

    let (status, body) = send(&app, json_request("POST", "/jobs", job_body(json!(500), &[]))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "PERSISTENCE_FAILURE");
    assert_eq!(wallet(&app).await.wallet.to_string(), "100");

    let (_, metrics) = send(&app, empty_request("GET", "/operators/metrics")).await;
    assert_eq!(metrics["persistence_failures"], 1);
}

#[tokio::test]
async fn test_session_update_and_clear() {
    let (app, store) = build_test_app().await;
    register(&app, json!(100)).await;

    let (status, session) = send(
        &app,
        json_request(
            "PATCH",
            "/session",
            json!({"userRole": "employer", "isFirstLaunch": false, "hasCompletedOnboarding": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["userRole"], "employer");
    assert_eq!(session["isFirstLaunch"], false);
    assert_eq!(session["hasCompletedOnboarding"], true);

    let (status, _) = send(&app, empty_request("DELETE", "/session")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(store.is_empty().await);

    let (_, session) = send(&app, empty_request("GET", "/session")).await;
    assert_eq!(session["isFirstLaunch"], true);
    assert!(session["employerProfile"].is_null());
    assert!(session["userRole"].is_null());
}

#[tokio::test]
async fn test_expire_sweep_with_nothing_lapsed() {
    let (app, _store) = build_test_app().await;
    register(&app, json!(100)).await;
    send(&app, json_request("POST", "/jobs", job_body(json!(500), &[]))).await;

    let (status, body) = send(&app, empty_request("POST", "/jobs/expire")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["refunded"], json!([]));
}

#[tokio::test]
async fn test_session_patch_is_all_or_nothing() {
    let (app, store) = build_test_app().await;
    store.set_fail_writes(true);

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            "/session",
            json!({"userRole": "worker", "isFirstLaunch": false, "hasCompletedOnboarding": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "PERSISTENCE_FAILURE");

    store.set_fail_writes(false);
    let (_, session) = send(&app, empty_request("GET", "/session")).await;
    assert!(session["userRole"].is_null());
    assert_eq!(session["isFirstLaunch"], true);
    assert_eq!(session["hasCompletedOnboarding"], false);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_session_patch_null_role_clears_it() {
    let (app, _store) = build_test_app().await;

    send(
        &app,
        json_request("PATCH", "/session", json!({"userRole": "worker", "isFirstLaunch": false})),
    )
    .await;

    // Missing fields are left alone
    let (_, session) = send(
        &app,
        json_request("PATCH", "/session", json!({"hasCompletedOnboarding": true})),
    )
    .await;
    assert_eq!(session["userRole"], "worker");
    assert_eq!(session["isFirstLaunch"], false);

    let (status, session) = send(&app, json_request("PATCH", "/session", json!({"userRole": null}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(session["userRole"].is_null());
    assert_eq!(session["hasCompletedOnboarding"], true);
}

#[tokio::test]
async fn test_worker_profile_put_and_delete() {
    let (app, store) = build_test_app().await;
    let worker = json!({
        "id": "wrk-1",
        "name": "Rahim",
        "age": "29",
        "skills": ["plumbing"],
        "experience": "5 years",
        "jobType": "plumber",
        "location": "Dhaka, Mirpur",
        "phone": "01911111111",
        "verified": false,
        "rating": 4.5,
        "badge": "green",
        "createdAt": "2026-01-05T09:30:00Z"
    });

    let (status, _) = send(&app, json_request("PUT", "/worker", worker)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, session) = send(&app, empty_request("GET", "/session")).await;
    assert_eq!(session["workerProfile"]["id"], "wrk-1");

    let (status, _) = send(&app, empty_request("DELETE", "/worker")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, session) = send(&app, empty_request("GET", "/session")).await;
    assert!(session["workerProfile"].is_null());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_fee_schedule() {
    let (app, _store) = build_test_app().await;

    let (status, body) = send(&app, empty_request("GET", "/fees")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["platformFeeRate"], "0.05");
    assert_eq!(body["smsUnitCost"], "0.5");
    assert_eq!(body["maxSelectedCandidates"], 50);
    assert_eq!(body["jobTtl"], "7d");
}
