//! HTTP API integration tests
//!
//! Exercises the full route table against a temporary SQLite database.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use serde_json::{Value, json};

use mediremind::api::AppServices;
use mediremind::api::middleware::RateLimiters;
use mediremind::api::services::{ErrorCode, configure_routes, extractor_config};
use mediremind::config::RateLimitConfig;
use mediremind::errors::MediRemindError;
use mediremind::services::ai::GenerativeModel;
use mediremind::storage::ReminderStatus;

use common::{MockModel, RecordingEmail, RecordingPush, app_services, notifiers, test_db};

fn generous_limits() -> RateLimiters {
    RateLimiters::from_config(&RateLimitConfig {
        login_per_minute: 1000,
        ocr_per_minute: 1000,
        risk_per_minute: 1000,
        trusted_proxies: Vec::new(),
    })
    .unwrap()
}

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

macro_rules! init_app {
    ($services:expr, $limiters:expr) => {{
        let services: AppServices = $services.clone();
        let limiters: Arc<RateLimiters> = $limiters.clone();
        test::init_service(
            App::new()
                .configure(|cfg| services.configure(cfg))
                .configure(|cfg| extractor_config(cfg, 1024 * 1024))
                .configure(|cfg| configure_routes(cfg, &limiters)),
        )
        .await
    }};
}

fn services_with(
    storage: Arc<mediremind::storage::SeaOrmStorage>,
    model: Option<Arc<dyn GenerativeModel>>,
    push: Arc<RecordingPush>,
) -> AppServices {
    app_services(
        storage,
        notifiers(Arc::new(RecordingEmail::default()), push),
        model,
    )
}

/// 注册并登录，返回 access token
macro_rules! signup_and_login {
    ($app:expr, $email:expr) => {{
        let req = TestRequest::post()
            .uri("/auth/signup")
            .set_json(json!({"email": $email, "password": "s3cret-pass", "full_name": "Test User"}))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::post()
            .uri("/auth/token")
            .peer_addr(peer())
            .set_form([("username", $email), ("password", "s3cret-pass")])
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        body["data"]["access_token"]
            .as_str()
            .expect("access token")
            .to_string()
    }};
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

// =============================================================================
// Auth & users
// =============================================================================

#[actix_web::test]
async fn test_signup_login_and_profile() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);

    let token = signup_and_login!(app, "alice@example.com");

    let req = TestRequest::get()
        .uri("/users/me")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert_eq!(body["data"]["full_name"], "Test User");
    assert!(body["data"].get("hashed_password").is_none());

    let req = TestRequest::put()
        .uri("/users/me")
        .insert_header(bearer(&token))
        .set_json(json!({"phone_number": "+91 98765 43210", "email_notifications": true}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["phone_number"], "+91 98765 43210");
    assert_eq!(body["data"]["email_notifications"], true);
    assert_eq!(body["data"]["full_name"], "Test User");
}

#[actix_web::test]
async fn test_duplicate_signup_conflicts() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);

    let _ = signup_and_login!(app, "dup@example.com");

    let req = TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({"email": "dup@example.com", "password": "another-pass"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], ErrorCode::EmailAlreadyRegistered as i32);
}

#[actix_web::test]
async fn test_invalid_full_name_does_not_create_account() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);

    let req = TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({
            "email": "long@example.com",
            "password": "s3cret-pass",
            "full_name": "x".repeat(101)
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(
        db.storage
            .find_user_by_email("long@example.com")
            .await
            .unwrap()
            .is_none()
    );

    let req = TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({
            "email": "long@example.com",
            "password": "s3cret-pass",
            "full_name": "Priya Sharma"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["full_name"], "Priya Sharma");
}

#[actix_web::test]
async fn test_wrong_password_is_unauthorized_with_challenge() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);

    let _ = signup_and_login!(app, "bob@example.com");

    for (username, password) in [
        ("bob@example.com", "wrong-pass"),
        ("nobody@example.com", "s3cret-pass"),
    ] {
        let req = TestRequest::post()
            .uri("/auth/token")
            .peer_addr(peer())
            .set_form([("username", username), ("password", password)])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers()
                .get("WWW-Authenticate")
                .and_then(|v| v.to_str().ok()),
            Some("Bearer")
        );
    }
}

#[actix_web::test]
async fn test_refresh_issues_new_access_token() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);

    let _ = signup_and_login!(app, "carol@example.com");
    let req = TestRequest::post()
        .uri("/auth/token")
        .peer_addr(peer())
        .set_form([("username", "carol@example.com"), ("password", "s3cret-pass")])
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();
    let access = body["data"]["access_token"].as_str().unwrap().to_string();

    let req = TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({"refresh_token": refresh}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["token_type"], "bearer");

    // access token 不能当 refresh token 用
    let req = TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({"refresh_token": access}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_protected_routes_require_bearer() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);

    for uri in ["/users/me", "/medications", "/reminders"] {
        let req = TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let req = TestRequest::get()
        .uri("/medications")
        .insert_header(bearer("not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Medications & reminders
// =============================================================================

#[actix_web::test]
async fn test_medication_crud_is_scoped_to_owner() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);

    let alice = signup_and_login!(app, "alice@example.com");
    let mallory = signup_and_login!(app, "mallory@example.com");

    let req = TestRequest::post()
        .uri("/medications")
        .insert_header(bearer(&alice))
        .set_json(json!({
            "name": "Metformin",
            "dosage": "500mg",
            "frequency": "Twice daily",
            "start_date": "2025-01-01",
            "reminders": ["08:00", "20:00", "08:00"]
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], 0);
    let med_id = body["data"]["id"].as_i64().unwrap();
    // 重复时间只生成一次
    assert_eq!(body["data"]["reminders"].as_array().unwrap().len(), 2);

    let req = TestRequest::get()
        .uri("/medications")
        .insert_header(bearer(&alice))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["instructions"], "Take as directed");

    let uri = format!("/medications/{}", med_id);
    let req = TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&mallory))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], ErrorCode::MedicationNotFound as i32);

    let req = TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&mallory))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    let req = TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = TestRequest::get()
        .uri("/reminders")
        .insert_header(bearer(&alice))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_invalid_medication_payloads_are_rejected() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);
    let token = signup_and_login!(app, "dave@example.com");

    let bad_time = json!({
        "name": "Aspirin", "dosage": "75mg", "frequency": "Daily",
        "start_date": "2025-01-01", "reminders": ["25:00"]
    });
    let req = TestRequest::post()
        .uri("/medications")
        .insert_header(bearer(&token))
        .set_json(bad_time)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // 缺少必填字段由 extractor 拒绝
    let req = TestRequest::post()
        .uri("/medications")
        .insert_header(bearer(&token))
        .set_json(json!({"name": "Aspirin"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], ErrorCode::BadRequest as i32);
}

#[actix_web::test]
async fn test_reminder_status_update_and_history() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);
    let token = signup_and_login!(app, "erin@example.com");

    let req = TestRequest::post()
        .uri("/medications/test-trigger?minutes=0&high_risk=true")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], 0);
    let reminder_id = body["data"]["reminder_id"].as_i64().unwrap();

    let status_uri = format!("/reminders/{}/status", reminder_id);

    let req = TestRequest::put()
        .uri(&status_uri)
        .insert_header(bearer(&token))
        .set_json(json!({"status": "DUE"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], ErrorCode::InvalidReminderStatus as i32);

    let req = TestRequest::put()
        .uri(&status_uri)
        .insert_header(bearer(&token))
        .set_json(json!({"status": "TAKEN"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "TAKEN");

    // 相同状态幂等，改成另一个终态冲突
    let req = TestRequest::put()
        .uri(&status_uri)
        .insert_header(bearer(&token))
        .set_json(json!({"status": "TAKEN"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = TestRequest::put()
        .uri(&status_uri)
        .insert_header(bearer(&token))
        .set_json(json!({"status": "SKIPPED"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CONFLICT
    );

    for uri in ["/users/me/reminders/history", "/reminders/history"] {
        let req = TestRequest::get()
            .uri(uri)
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let history = body["data"].as_array().unwrap();
        assert_eq!(history.len(), 1, "{}", uri);
        assert_eq!(history[0]["status"], "TAKEN");
    }

    let req = TestRequest::get()
        .uri("/reminders?status=TAKEN")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let detail = db
        .storage
        .find_reminder_detail(reminder_id as i32)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.reminder.status, ReminderStatus::Taken);
    assert!(detail.medication.is_high_risk());
}

#[actix_web::test]
async fn test_other_users_reminder_is_not_found() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);
    let owner = signup_and_login!(app, "owner@example.com");
    let other = signup_and_login!(app, "other@example.com");

    let req = TestRequest::post()
        .uri("/medications/test-trigger?minutes=5")
        .insert_header(bearer(&owner))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let reminder_id = body["data"]["reminder_id"].as_i64().unwrap();

    let req = TestRequest::put()
        .uri(&format!("/reminders/{}/status", reminder_id))
        .insert_header(bearer(&other))
        .set_json(json!({"status": "SKIPPED"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], ErrorCode::ReminderNotFound as i32);
}

// =============================================================================
// Notifications
// =============================================================================

#[actix_web::test]
async fn test_subscribe_upserts_and_unsubscribes() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);
    let token = signup_and_login!(app, "frank@example.com");

    let endpoint = "https://fcm.googleapis.com/fcm/send/abc123";
    for auth in ["auth-one", "auth-two"] {
        let req = TestRequest::post()
            .uri("/subscribe")
            .insert_header(bearer(&token))
            .set_json(json!({"endpoint": endpoint, "keys": {"p256dh": "BPk3", "auth": auth}}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    let user = db
        .storage
        .find_user_by_email("frank@example.com")
        .await
        .unwrap()
        .unwrap();
    let subs = db.storage.subscriptions_for_user(user.id).await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].auth_key, "auth-two");

    let req = TestRequest::delete()
        .uri(&format!(
            "/subscribe?endpoint={}",
            url_encode(endpoint)
        ))
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert!(
        db.storage
            .subscriptions_for_user(user.id)
            .await
            .unwrap()
            .is_empty()
    );
}

fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[actix_web::test]
async fn test_subscribe_rejects_invalid_endpoint() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);
    let token = signup_and_login!(app, "grace@example.com");

    let req = TestRequest::post()
        .uri("/subscribe")
        .insert_header(bearer(&token))
        .set_json(json!({"endpoint": "ftp://example.com/push", "keys": {"p256dh": "k", "auth": "a"}}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[actix_web::test]
async fn test_vapid_public_key_availability() {
    let db = test_db().await;
    let limiters = Arc::new(generous_limits());

    let unconfigured = services_with(db.storage.clone(), None, Arc::default());
    let app = init_app!(unconfigured, limiters);
    let req = TestRequest::get().uri("/vapid-public-key").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], ErrorCode::PushNotConfigured as i32);

    let push = Arc::new(RecordingPush {
        public_key: Some("BPublicKey".into()),
        ..Default::default()
    });
    let configured = services_with(db.storage.clone(), None, push);
    let app = init_app!(configured, limiters);
    let req = TestRequest::get().uri("/vapid-public-key").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["publicKey"], "BPublicKey");
}

#[actix_web::test]
async fn test_stream_without_valid_token_sends_unauthorized_event() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);

    for uri in ["/notifications/stream", "/notifications/stream?token=bogus"] {
        let req = TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("Content-Type")
                .and_then(|v| v.to_str().ok()),
            Some("text/event-stream")
        );
        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"data: {\"error\": \"Unauthorized\"}\n\n");
    }
}

// =============================================================================
// AI endpoints
// =============================================================================

fn jpeg_payload() -> String {
    use base64::Engine;
    let bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[actix_web::test]
async fn test_process_medication_uses_model() {
    let db = test_db().await;
    let model = MockModel::replying(
        "```json\n{\"name\": \"Amoxicillin\", \"dosage\": \"500mg\", \"frequency\": \"Three times daily\"}\n```",
    );
    let services = services_with(db.storage.clone(), Some(model.clone() as Arc<dyn GenerativeModel>), Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);
    let token = signup_and_login!(app, "henry@example.com");

    let req = TestRequest::post()
        .uri("/process-medication")
        .peer_addr(peer())
        .insert_header(bearer(&token))
        .set_json(json!({"image": jpeg_payload()}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["name"], "Amoxicillin");
    assert_eq!(body["data"]["instructions"], "Take as directed");

    let requests = model.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].image.as_ref().map(|i| i.mime_type.as_str()),
        Some("image/jpeg")
    );
}

#[actix_web::test]
async fn test_process_medication_errors() {
    let db = test_db().await;
    let limiters = Arc::new(generous_limits());

    let unconfigured = services_with(db.storage.clone(), None, Arc::default());
    let app = init_app!(unconfigured, limiters);
    let token = signup_and_login!(app, "ivy@example.com");

    let req = TestRequest::post()
        .uri("/process-medication")
        .peer_addr(peer())
        .insert_header(bearer(&token))
        .set_json(json!({"image": jpeg_payload()}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );

    let req = TestRequest::post()
        .uri("/process-medication")
        .peer_addr(peer())
        .insert_header(bearer(&token))
        .set_json(json!({"image": "bm90IGFuIGltYWdl"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let unparseable = MockModel::replying("I could not read this prescription.");
    let services = services_with(db.storage.clone(), Some(unparseable as Arc<dyn GenerativeModel>), Arc::default());
    let app = init_app!(services, limiters);
    let req = TestRequest::post()
        .uri("/process-medication")
        .peer_addr(peer())
        .insert_header(bearer(&token))
        .set_json(json!({"image": jpeg_payload()}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

fn health_data() -> Value {
    json!({
        "age": 62,
        "gender": "Male",
        "systolicBP": 165,
        "diastolicBP": 100,
        "heartRate": 88,
        "weight": 95.0,
        "height": 170.0,
        "smokingStatus": "Current",
        "diabetesStatus": "Type 2",
        "familyHistory": ["Heart disease"],
        "currentMedications": ["Amlodipine"],
        "recentSymptoms": ["chest pain"]
    })
}

#[actix_web::test]
async fn test_predict_risk_falls_back_to_rules() {
    let db = test_db().await;
    let model = MockModel::failing(MediRemindError::ai_service("upstream unavailable"));
    let services = services_with(db.storage.clone(), Some(model as Arc<dyn GenerativeModel>), Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);
    let token = signup_and_login!(app, "jack@example.com");

    let req = TestRequest::post()
        .uri("/predict-risk")
        .peer_addr(peer())
        .insert_header(bearer(&token))
        .set_json(health_data())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["riskCategory"], "HIGH");
    assert!(!body["data"]["contributingFactors"].as_array().unwrap().is_empty());
    assert!(
        body["data"]["disclaimer"]
            .as_str()
            .unwrap()
            .contains("CDSCO")
    );
}

#[actix_web::test]
async fn test_predict_risk_uses_model_answer_and_validates_input() {
    let db = test_db().await;
    let model = MockModel::replying(
        r#"{"riskScore": 0.35, "riskCategory": "MODERATE", "contributingFactors": ["Elevated BP"], "recommendations": ["Amlodipine 5 mg"]}"#,
    );
    let services = services_with(db.storage.clone(), Some(model as Arc<dyn GenerativeModel>), Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);
    let token = signup_and_login!(app, "kate@example.com");

    let req = TestRequest::post()
        .uri("/predict-risk")
        .peer_addr(peer())
        .insert_header(bearer(&token))
        .set_json(health_data())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["riskCategory"], "MODERATE");
    assert_eq!(body["data"]["recommendations"][0], "Amlodipine 5 mg");

    let mut invalid = health_data();
    invalid["age"] = json!(0);
    let req = TestRequest::post()
        .uri("/predict-risk")
        .peer_addr(peer())
        .insert_header(bearer(&token))
        .set_json(invalid)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );
}

// =============================================================================
// Rate limiting
// =============================================================================

#[actix_web::test]
async fn test_risk_limit_applies_after_auth() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(
        RateLimiters::from_config(&RateLimitConfig {
            login_per_minute: 1000,
            ocr_per_minute: 1000,
            risk_per_minute: 2,
            trusted_proxies: Vec::new(),
        })
        .unwrap(),
    );
    let app = init_app!(services, limiters);
    let token = signup_and_login!(app, "lena@example.com");

    // 未认证的请求在限流之前被拒绝，不消耗额度
    for _ in 0..3 {
        let req = TestRequest::post()
            .uri("/predict-risk")
            .peer_addr(peer())
            .set_json(health_data())
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    for _ in 0..2 {
        let req = TestRequest::post()
            .uri("/predict-risk")
            .peer_addr(peer())
            .insert_header(bearer(&token))
            .set_json(health_data())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    let req = TestRequest::post()
        .uri("/predict-risk")
        .peer_addr(peer())
        .insert_header(bearer(&token))
        .set_json(health_data())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    // 其他 IP 独立计数
    let req = TestRequest::post()
        .uri("/predict-risk")
        .peer_addr("127.0.0.2:40000".parse().unwrap())
        .insert_header(bearer(&token))
        .set_json(health_data())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_login_limit_counts_failed_attempts() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(
        RateLimiters::from_config(&RateLimitConfig {
            login_per_minute: 3,
            ocr_per_minute: 1000,
            risk_per_minute: 1000,
            trusted_proxies: Vec::new(),
        })
        .unwrap(),
    );
    let app = init_app!(services, limiters);
    let _ = signup_and_login!(app, "milo@example.com");

    for _ in 0..2 {
        let req = TestRequest::post()
            .uri("/auth/token")
            .peer_addr(peer())
            .set_form([("username", "milo@example.com"), ("password", "wrong-pass")])
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    let req = TestRequest::post()
        .uri("/auth/token")
        .peer_addr(peer())
        .set_form([("username", "milo@example.com"), ("password", "s3cret-pass")])
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

// =============================================================================
// Health
// =============================================================================

#[actix_web::test]
async fn test_root_and_health() {
    let db = test_db().await;
    let services = services_with(db.storage.clone(), None, Arc::default());
    let limiters = Arc::new(generous_limits());
    let app = init_app!(services, limiters);

    let req = TestRequest::get().uri("/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["app"], "MediRemind API");

    let req = TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "connected");
    assert_eq!(body["data"]["backend"], "sqlite");

    for uri in ["/health/ready", "/health/live"] {
        let req = TestRequest::get().uri(uri).to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
    }
}

#[actix_web::test]
async fn test_oversized_json_is_unprocessable() {
    let app = test::init_service(
        App::new()
            .configure(|cfg| extractor_config(cfg, 16))
            .route(
                "/echo",
                web::post().to(|body: web::Json<Value>| async move { web::Json(body.into_inner()) }),
            ),
    )
    .await;
    let req = TestRequest::post()
        .uri("/echo")
        .set_json(json!({"payload": "longer than sixteen bytes"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}
