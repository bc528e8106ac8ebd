//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use slip_core::ai::MockBackend;
use slip_core::dispatcher::replies;
use slip_core::messaging::MockMessenger;
use slip_core::models::{Category, ExpenseStatus, NewExpense, NewUser};
use slip_core::ocr::MockOcrBackend;

struct TestApp {
    router: Router,
    db: Database,
    messenger: MockMessenger,
    ocr: MockOcrBackend,
}

fn setup_test_app() -> TestApp {
    let db = Database::in_memory().unwrap();
    let ocr = MockOcrBackend::new();
    let messenger = MockMessenger::new();
    let dispatcher = Dispatcher::new(
        db.clone(),
        Some(OcrClient::Mock(ocr.clone())),
        Some(AiClient::Mock(MockBackend::new())),
        Some(Messenger::Mock(messenger.clone())),
    );
    TestApp {
        router: create_router(dispatcher, ServerConfig::default()),
        db,
        messenger,
        ocr,
    }
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn seed_user(db: &Database, phone: &str) -> i64 {
    db.create_user(&NewUser {
        phone: phone.to_string(),
        name: "Sam".to_string(),
        email: Some("sam@example.com".to_string()),
        company_id: None,
    })
    .unwrap()
    .id
}

fn seed_expense(db: &Database, user_id: i64, amount: f64, category: Category) {
    db.create_expense(&NewExpense {
        user_id,
        image_url: None,
        merchant: "Fresh Mart".to_string(),
        amount,
        date: chrono::Utc::now().date_naive(),
        category,
        currency: "USD".to_string(),
        language: "en".to_string(),
        status: ExpenseStatus::Pending,
    })
    .unwrap();
}

fn webhook_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ========== Webhook Tests ==========

#[tokio::test]
async fn test_webhook_join_acks_and_prompts() {
    let app = setup_test_app();

    let response = app
        .router
        .clone()
        .oneshot(webhook_request(
            "From=whatsapp%3A%2B15551234567&Body=join&NumMedia=0",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);

    // Channel prefix is stripped before dispatch
    let sent = app.messenger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "+15551234567");
    assert!(sent[0].body.contains("name"));
    assert_eq!(app.db.count_users().unwrap(), 0);
}

#[tokio::test]
async fn test_webhook_status_callback_ignored() {
    let app = setup_test_app();

    let response = app
        .router
        .clone()
        .oneshot(webhook_request(
            "From=whatsapp%3A%2B15551234567&MessageStatus=delivered&MessageSid=SM123&NumMedia=0",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.messenger.sent().is_empty());
}

#[tokio::test]
async fn test_webhook_receipt_records_expense() {
    let app = setup_test_app();
    let user_id = seed_user(&app.db, "+15551234567");
    app.ocr
        .set_text("https://media.example.com/r1", "FRESH MART\nTOTAL 42.50");

    let response = app
        .router
        .clone()
        .oneshot(webhook_request(
            "From=whatsapp%3A%2B15551234567&Body=&NumMedia=1\
             &MediaUrl0=https%3A%2F%2Fmedia.example.com%2Fr1\
             &MediaContentType0=image%2Fjpeg",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let expenses = app.db.list_expenses_for_user(user_id).unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].merchant, "FRESH MART");
}

#[tokio::test]
async fn test_webhook_acks_when_registration_collides() {
    let app = setup_test_app();

    app.router
        .clone()
        .oneshot(webhook_request(
            "From=whatsapp%3A%2B15551234567&Body=join&NumMedia=0",
        ))
        .await
        .unwrap();
    app.router
        .clone()
        .oneshot(webhook_request(
            "From=whatsapp%3A%2B15551234567&Body=Sam&NumMedia=0",
        ))
        .await
        .unwrap();

    // Registered out of band mid-onboarding; the final step's insert fails
    seed_user(&app.db, "+15551234567");

    let response = app
        .router
        .clone()
        .oneshot(webhook_request(
            "From=whatsapp%3A%2B15551234567&Body=a%40b.co&NumMedia=0",
        ))
        .await
        .unwrap();

    // The provider still gets its ack; the failure becomes an apology reply
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);

    let sent = app.messenger.sent();
    assert_eq!(sent.last().unwrap().body, replies::APOLOGY);
}

// ========== Expense API Tests ==========

#[tokio::test]
async fn test_create_expense() {
    let app = setup_test_app();
    seed_user(&app.db, "+15551234567");

    let body = serde_json::json!({
        "phone": "+15551234567",
        "merchant": "Corner Cafe",
        "amount": 12.75,
        "date": "2025-06-10",
        "category": "food"
    });

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/expenses")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    assert_eq!(json["merchant"], "Corner Cafe");
    assert_eq!(json["category"], "food");
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn test_create_expense_unknown_phone() {
    let app = setup_test_app();

    let body = serde_json::json!({
        "phone": "+15559999999",
        "merchant": "Corner Cafe",
        "amount": 12.75,
        "date": "2025-06-10"
    });

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/expenses")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_expense_invalid_date() {
    let app = setup_test_app();
    seed_user(&app.db, "+15551234567");

    let body = serde_json::json!({
        "phone": "+15551234567",
        "merchant": "Corner Cafe",
        "amount": 12.75,
        "date": "June 10th"
    });

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/expenses")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_expenses() {
    let app = setup_test_app();
    let user_id = seed_user(&app.db, "+15551234567");
    seed_expense(&app.db, user_id, 10.0, Category::Food);
    seed_expense(&app.db, user_id, 20.0, Category::Fuel);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/expenses/%2B15551234567")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_expenses_unknown_phone() {
    let app = setup_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/expenses/%2B15559999999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Summary API Tests ==========

#[tokio::test]
async fn test_summary_sends_message_and_returns_data() {
    let app = setup_test_app();
    let user_id = seed_user(&app.db, "+15551234567");
    seed_expense(&app.db, user_id, 42.5, Category::Groceries);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/summary/%2B15551234567?period=week")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);
    assert!(json["summary"].as_str().unwrap().len() > 0);
    assert!(json["messageSid"].as_str().unwrap().starts_with("SMmock"));
    assert_eq!(json["spendingData"]["categories"][0]["category"], "Groceries");

    let sent = app.messenger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "+15551234567");
}

#[tokio::test]
async fn test_summary_rejects_bad_phone() {
    let app = setup_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/summary/15551234567")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_rejects_bad_period() {
    let app = setup_test_app();
    seed_user(&app.db, "+15551234567");

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/summary/%2B15551234567?period=fortnight")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_unknown_user() {
    let app = setup_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/summary/%2B15559999999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Health Tests ==========

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "healthy");
}
