//! HTTP surface tests driving the router in-process

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Local;
use http_body_util::BodyExt;
use office_server::config::Environment;
use office_server::api::receipts::claim_existing_numbers;
use office_server::records::ReceiptRecord;
use office_server::store::{DocumentStore, MemoryStore, Repository};
use office_server::{create_router, AppState, Config};
use pretty_assertions::assert_eq;
use receipt::Issuer;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const COACH: &str = "coach@example.com";
const EMAIL_HEADER: &str = "x-auth-request-email";

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

fn test_app(environment: Environment) -> TestApp {
    let config = Config {
        environment,
        allowed_emails: vec![COACH.to_string()],
        issuer: Issuer {
            name: "佐藤 一郎".into(),
            title: "ライフコーチ".into(),
            address: "東京都港区4-5-6".into(),
        },
        ..Config::default()
    };
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(config, store.clone() as Arc<dyn DocumentStore>, None);
    TestApp {
        router: create_router(state),
        store,
    }
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        email: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(email) = email {
            builder = builder.header(EMAIL_HEADER, email);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(COACH), None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(COACH), Some(body)).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(COACH), Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(COACH), None).await
    }

    async fn create_client(&self, body: Value) -> String {
        let (status, client) = self.post("/api/clients", body).await;
        assert_eq!(status, StatusCode::CREATED, "{client}");
        client["id"].as_str().unwrap().to_string()
    }

    async fn create_receipt(&self, body: Value) -> (StatusCode, Value) {
        self.post("/api/receipts", body).await
    }
}

fn receipt_body(number: Option<&str>) -> Value {
    let mut body = json!({
        "issueDate": "2025-04-01",
        "recipientName": "山田 花子",
        "description": "コーチングセッション代として",
        "amount": 6000,
    });
    if let Some(number) = number {
        body["number"] = json!(number);
    }
    body
}

#[tokio::test]
async fn test_health_is_open() {
    let app = test_app(Environment::Production);
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["documents"], json!(false));
}

#[tokio::test]
async fn test_gate_denies_outside_allow_list() {
    let app = test_app(Environment::Production);

    let (status, body) = app.call(Method::GET, "/api/clients", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "認証が必要です", "details": null }));

    let (status, _) = app
        .call(Method::GET, "/api/clients", Some("stranger@example.com"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::GET, "/api/clients", Some("Coach@Example.com"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_development_mode_allows_same_identity() {
    let app = test_app(Environment::Development);
    let (status, _) = app
        .call(Method::GET, "/api/clients", Some("stranger@example.com"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::GET, "/api/settings", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_settings_expose_defaults() {
    let app = test_app(Environment::Production);
    let (status, body) = app.get("/api/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fees"]["トライアル"], json!(6000));
    assert_eq!(body["taxRate"], json!(10.0));
    assert_eq!(body["issuer"]["name"], json!("佐藤 一郎"));
    assert_eq!(body["clientStatuses"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_client_validation_reports_fields() {
    let app = test_app(Environment::Production);
    let (status, body) = app.post("/api/clients", json!({ "email": "broken" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("入力内容に誤りがあります"));
    assert_eq!(body["details"]["fields"]["名前"], json!("必須項目です"));
    assert!(body["details"]["fields"]["メールアドレス"].is_string());

    let (status, body) = app.get("/api/clients").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let app = test_app(Environment::Production);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/clients")
        .header(EMAIL_HEADER, COACH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["details"]["fields"]["body"].is_string());
}

#[tokio::test]
async fn test_client_soft_delete_keeps_record() {
    let app = test_app(Environment::Production);
    let id = app
        .create_client(json!({
            "name": "山田 花子",
            "email": "hanako@example.com",
            "phone": "090-1234-5678",
        }))
        .await;

    let (status, created) = app.get(&format!("/api/clients/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["ステータス"], json!("問い合わせ"));

    let (status, deleted) = app.delete(&format!("/api/clients/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["ステータス"], json!("削除済み"));

    let (status, after) = app.get(&format!("/api/clients/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["id"], created["id"]);
    assert_eq!(after["名前"], created["名前"]);
    assert_eq!(after["メールアドレス"], created["メールアドレス"]);
    assert_eq!(after["電話番号"], created["電話番号"]);
    assert_eq!(after["作成日時"], created["作成日時"]);
}

#[tokio::test]
async fn test_missing_records_are_404() {
    let app = test_app(Environment::Production);
    let (status, body) = app.get("/api/clients/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("見つかりません"));

    let (status, _) = app.delete("/api/sessions/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_legacy_status_reads_canonical_without_rewriting() {
    let app = test_app(Environment::Production);
    let legacy = json!({ "名前": "鈴木 太郎", "ステータス": "トライアル済" });
    app.store
        .insert("clients", "legacy-1", legacy.as_object().cloned().unwrap())
        .await
        .unwrap();

    for _ in 0..2 {
        let (status, list) = app.get("/api/clients").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["ステータス"], json!("トライアル後"));

        let (_, client) = app.get("/api/clients/legacy-1").await;
        assert_eq!(client["ステータス"], json!("トライアル後"));
    }

    let stored = app.store.get("clients", "legacy-1").await.unwrap().unwrap();
    assert_eq!(stored.data["ステータス"], json!("トライアル済"));
}

#[tokio::test]
async fn test_managed_fields_cannot_be_supplied() {
    let app = test_app(Environment::Production);
    let (status, client) = app
        .post(
            "/api/clients",
            json!({ "name": "山田 花子", "id": "chosen", "作成日時": "1999-01-01T00:00:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(client["id"], json!("chosen"));
    assert_ne!(client["作成日時"], json!("1999-01-01T00:00:00Z"));
}

#[tokio::test]
async fn test_sessions_filter_by_client() {
    let app = test_app(Environment::Production);
    let first = app.create_client(json!({ "name": "山田 花子" })).await;
    let second = app.create_client(json!({ "name": "鈴木 太郎" })).await;

    let schedule = [
        (&first, "2025-04-10 19:00"),
        (&first, "2025-04-24 19:00"),
        (&second, "2025-04-11 10:00"),
    ];
    for (client, date) in schedule {
        let (status, _) = app
            .post("/api/sessions", json!({ "clientId": client, "date": date, "type": "継続" }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, all) = app.get("/api/sessions").await;
    assert_eq!(all.as_array().unwrap().len(), 3);
    assert_eq!(all[0]["日時"], json!("2025-04-24T19:00:00"));

    let (_, mine) = app.get(&format!("/api/sessions?client_id={first}")).await;
    let dates: Vec<&str> = mine
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["日時"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2025-04-24T19:00:00", "2025-04-10T19:00:00"]);
}

#[tokio::test]
async fn test_session_for_unknown_client_is_rejected() {
    let app = test_app(Environment::Production);
    let (status, body) = app
        .post("/api/sessions", json!({ "clientId": "ghost", "date": "2025-04-10 19:00" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["fields"]["クライアントID"].is_string());
}

#[tokio::test]
async fn test_paid_payment_gets_todays_date() {
    let app = test_app(Environment::Production);
    let client = app.create_client(json!({ "name": "山田 花子" })).await;
    let today = Local::now().date_naive().to_string();

    let (status, payment) = app
        .post("/api/payments", json!({ "clientId": client, "category": "トライアル" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["金額"], json!(6000));
    assert_eq!(payment["ステータス"], json!("未払い"));
    assert_eq!(payment["支払日"], Value::Null);

    let id = payment["id"].as_str().unwrap();
    let (status, paid) = app
        .put(&format!("/api/payments/{id}"), json!({ "status": "支払済み" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["支払日"], json!(today));

    let (status, supplied) = app
        .post(
            "/api/payments",
            json!({
                "clientId": client,
                "category": "単発セッション",
                "status": "支払済み",
                "paidDate": "2025-05-01",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(supplied["支払日"], json!("2025-05-01"));
    assert_eq!(supplied["金額"], json!(22000));
}

#[tokio::test]
async fn test_non_numeric_amount_is_rejected() {
    let app = test_app(Environment::Production);
    let client = app.create_client(json!({ "name": "山田 花子" })).await;
    let (status, body) = app
        .post("/api/payments", json!({ "clientId": client, "category": "その他", "amount": "abc" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["fields"]["金額"].is_string());

    let (_, payments) = app.get("/api/payments").await;
    assert_eq!(payments, json!([]));
}

#[tokio::test]
async fn test_receipt_numbers_are_allocated_per_year() {
    let app = test_app(Environment::Production);

    let (status, first) = app.create_receipt(receipt_body(None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["領収書番号"], json!("R2025-0001"));
    assert_eq!(first["税率"], json!(10.0));
    assert_eq!(first["発行者名"], json!("佐藤 一郎"));
    assert_eq!(first["支払方法"], json!("bank_transfer"));

    let (_, second) = app.create_receipt(receipt_body(None)).await;
    assert_eq!(second["領収書番号"], json!("R2025-0002"));

    let mut next_year = receipt_body(None);
    next_year["issueDate"] = json!("2026-01-05");
    let (_, third) = app.create_receipt(next_year).await;
    assert_eq!(third["領収書番号"], json!("R2026-0001"));
}

#[tokio::test]
async fn test_duplicate_receipt_number_conflicts() {
    let app = test_app(Environment::Production);
    let (status, _) = app.create_receipt(receipt_body(Some("R2025-0003"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.create_receipt(receipt_body(Some("R2025-0003"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("既に存在します"));

    // Allocation skips numbers entered by hand
    let mut numbers = Vec::new();
    for _ in 0..3 {
        let (_, receipt) = app.create_receipt(receipt_body(None)).await;
        numbers.push(receipt["領収書番号"].as_str().unwrap().to_string());
    }
    assert_eq!(numbers, vec!["R2025-0001", "R2025-0002", "R2025-0004"]);

    let (_, list) = app.get("/api/receipts").await;
    let id = list
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["領収書番号"] == json!("R2025-0001"))
        .map(|r| r["id"].as_str().unwrap().to_string())
        .unwrap();
    let (status, _) = app
        .put(&format!("/api/receipts/{id}"), json!({ "number": "R2025-0002" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, renamed) = app
        .put(&format!("/api/receipts/{id}"), json!({ "number": "R2025-0001", "notes": "再発行" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["備考"], json!("再発行"));
}

#[tokio::test]
async fn test_receipt_numbers_are_freed_by_renumber_and_delete() {
    let app = test_app(Environment::Production);
    let (_, first) = app.create_receipt(receipt_body(Some("R2025-0010"))).await;
    let first_id = first["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .put(&format!("/api/receipts/{first_id}"), json!({ "number": "R2025-0011" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    // The old number is free, the new one is held
    let (status, second) = app.create_receipt(receipt_body(Some("R2025-0010"))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.create_receipt(receipt_body(Some("R2025-0011"))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let second_id = second["id"].as_str().unwrap();
    let (status, _) = app.delete(&format!("/api/receipts/{second_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.create_receipt(receipt_body(Some("R2025-0010"))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_stored_receipt_numbers_are_claimed_at_startup() {
    let app = test_app(Environment::Production);
    let repo = Repository::<ReceiptRecord>::new(app.store.clone() as Arc<dyn DocumentStore>);
    let stored = json!({
        "領収書番号": "R2025-0001",
        "発行日": "2025-04-01",
        "金額": 6000,
        "税率": 10.0,
    });
    repo.create(stored.as_object().cloned().unwrap()).await.unwrap();

    assert_eq!(claim_existing_numbers(&repo).await.unwrap(), 1);
    assert_eq!(claim_existing_numbers(&repo).await.unwrap(), 1);

    let (status, _) = app.create_receipt(receipt_body(Some("R2025-0001"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    // Allocation steps over it as well
    let (_, receipt) = app.create_receipt(receipt_body(None)).await;
    assert_eq!(receipt["領収書番号"], json!("R2025-0002"));
}

#[tokio::test]
async fn test_receipt_without_fonts_fails_without_details_in_production() {
    let app = test_app(Environment::Production);
    let (_, receipt) = app.create_receipt(receipt_body(None)).await;
    let id = receipt["id"].as_str().unwrap();

    let (status, body) = app.get(&format!("/api/receipts/{id}/pdf")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "内部エラーが発生しました", "details": null }));

    let dev = test_app(Environment::Development);
    let (_, receipt) = dev.create_receipt(receipt_body(None)).await;
    let id = receipt["id"].as_str().unwrap();
    let (status, body) = dev.get(&format!("/api/receipts/{id}/preview")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("書類の生成に失敗しました"));
    assert!(body["details"].as_str().unwrap().contains("FONT_REGULAR"));
}

#[tokio::test]
async fn test_unsaved_preview_validates_first() {
    let app = test_app(Environment::Production);
    let (status, body) = app
        .post("/api/receipts/preview", json!({ "recipientName": "山田 花子", "amount": "六千" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields = body["details"]["fields"].as_object().unwrap();
    assert!(fields.contains_key("但し書き"));
    assert!(fields.contains_key("金額"));
}

#[tokio::test]
async fn test_mail_compose_with_missing_address() {
    let app = test_app(Environment::Production);
    let client = app
        .create_client(json!({ "name": "山田 花子", "email": "hanako@example.com" }))
        .await;
    let (_, payment) = app
        .post("/api/payments", json!({ "clientId": client, "category": "トライアル" }))
        .await;

    let (status, mail) = app
        .post(
            "/api/mail/compose",
            json!({ "template": "receipt-notice", "clientId": client, "paymentId": payment["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let body = mail["body"].as_str().unwrap();
    assert!(body.starts_with("山田 花子 様"));
    assert!(body.contains("6,000 円のお支払い"));
    assert!(body.contains("送付先：\n"));
    assert!(!body.contains("undefined"));
    assert!(mail["mailto"]
        .as_str()
        .unwrap()
        .starts_with("mailto:hanako@example.com?subject="));
}

#[tokio::test]
async fn test_mail_compose_unknown_template() {
    let app = test_app(Environment::Production);
    let client = app.create_client(json!({ "name": "山田 花子" })).await;
    let (status, body) = app
        .post("/api/mail/compose", json!({ "template": "newsletter", "clientId": client }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["fields"]["template"].is_string());
}
