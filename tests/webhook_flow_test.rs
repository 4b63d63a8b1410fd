use std::sync::Arc;
use std::time::Duration;

use floodgate::testing;
use floodgate::webhooks::{
    EventStatus, EventStore, InMemoryEventStore, WebhookConfig, WebhookModule,
};
use floodgate::{App, AppContext, Config};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SECRET: &str = "whsec_test";

fn signature_header(secret: &str, body: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());
    format!("t={},v1={}", timestamp, digest)
}

fn test_webhook_config() -> WebhookConfig {
    WebhookConfig {
        secret: SECRET.to_string(),
        dispatch_timeout_seconds: 1,
        ..WebhookConfig::default()
    }
}

/// Build a test router plus a handle to its store for state assertions.
fn test_app(webhooks: WebhookConfig) -> (axum::Router, Arc<InMemoryEventStore>) {
    let store = Arc::new(InMemoryEventStore::new());

    let context = AppContext::builder()
        .with_store(store.clone())
        .with_webhook_config(webhooks.clone())
        .build();

    let config = Config {
        webhooks,
        ..Config::default()
    };

    let router = App::with_config(config)
        .with_context(context)
        .register_module(WebhookModule)
        .into_test_router();

    (router, store)
}

async fn wait_for_status(store: &Arc<InMemoryEventStore>, event_id: &str, status: EventStatus) {
    for _ in 0..200 {
        if store.get(event_id).await.unwrap().status == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("event {} never reached {:?}", event_id, status);
}

#[tokio::test]
async fn test_intake_accepts_signed_event() {
    let (app, store) = test_app(test_webhook_config());

    let body = r#"{"id":"evt_ok_1","type":"customer.subscription.updated","data":{"subscription_id":"sub_123","status":"active"}}"#;
    let header = signature_header(SECRET, body, 1700000000);

    testing::post(app, "/webhooks")
        .header("webhook-signature", &header)
        .raw_body(body)
        .execute()
        .await
        .assert_accepted()
        .assert_json_field("status", json!("accepted"))
        .await
        .assert_json_field("event_id", json!("evt_ok_1"))
        .await
        .assert_json_field("attempts", json!(0))
        .await;

    // The default dispatcher always succeeds; the detached task lands soon
    wait_for_status(&store, "evt_ok_1", EventStatus::Processed).await;
    let record = store.get("evt_ok_1").await.unwrap();
    assert_eq!(record.attempts, 1);
    assert!(record.processed_at.is_some());
    assert_eq!(record.metadata, json!({"subscription_id":"sub_123","status":"active"}));
}

#[tokio::test]
async fn test_duplicate_intake_is_acknowledged_without_reprocessing() {
    let (app, store) = test_app(test_webhook_config());

    let body = r#"{"id":"evt_dup_1","type":"invoice.paid","data":{}}"#;
    let header = signature_header(SECRET, body, 1700000000);

    testing::post(app.clone(), "/webhooks")
        .header("webhook-signature", &header)
        .raw_body(body)
        .execute()
        .await
        .assert_accepted()
        .assert_json_field("status", json!("accepted"))
        .await;

    wait_for_status(&store, "evt_dup_1", EventStatus::Processed).await;

    testing::post(app, "/webhooks")
        .header("webhook-signature", &header)
        .raw_body(body)
        .execute()
        .await
        .assert_accepted()
        .assert_json_field("status", json!("duplicate"))
        .await
        .assert_json_field("attempts", json!(1))
        .await;

    // No second attempt was scheduled
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.get("evt_dup_1").await.unwrap().attempts, 1);
}

#[tokio::test]
async fn test_intake_rejects_invalid_signature() {
    let (app, store) = test_app(test_webhook_config());

    let body = r#"{"id":"evt_invalid_1","type":"customer.subscription.created","data":{"id":"sub_1"}}"#;

    testing::post(app, "/webhooks")
        .header("webhook-signature", "t=0,v1=deadbeef")
        .raw_body(body)
        .execute()
        .await
        .assert_unauthorized();

    // No record is created for rejected deliveries
    assert!(store.get("evt_invalid_1").await.is_err());
}

#[tokio::test]
async fn test_intake_rejects_missing_signature_header() {
    let (app, _store) = test_app(test_webhook_config());

    testing::post(app, "/webhooks")
        .raw_body(r#"{"id":"evt_1","type":"x.y","data":{}}"#)
        .execute()
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_intake_rejects_malformed_signature_header() {
    let (app, _store) = test_app(test_webhook_config());

    testing::post(app, "/webhooks")
        .header("webhook-signature", "garbage")
        .raw_body(r#"{"id":"evt_1","type":"x.y","data":{}}"#)
        .execute()
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_intake_rejects_tampered_body() {
    let (app, _store) = test_app(test_webhook_config());

    let body = r#"{"id":"evt_1","type":"invoice.paid","data":{"amount":100}}"#;
    let header = signature_header(SECRET, body, 1700000000);
    let tampered = body.replace("100", "999");

    testing::post(app, "/webhooks")
        .header("webhook-signature", &header)
        .raw_body(tampered)
        .execute()
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_disabled_verification_skips_signature_check() {
    let webhooks = WebhookConfig {
        verify_signatures: false,
        ..test_webhook_config()
    };
    let (app, store) = test_app(webhooks);

    testing::post(app, "/webhooks")
        .raw_body(r#"{"id":"evt_unsigned","type":"x.y","data":{}}"#)
        .execute()
        .await
        .assert_accepted();

    wait_for_status(&store, "evt_unsigned", EventStatus::Processed).await;
}

#[tokio::test]
async fn test_intake_rejects_malformed_body() {
    let (app, _store) = test_app(test_webhook_config());

    let body = "{ not json }";
    let header = signature_header(SECRET, body, 1700000000);

    testing::post(app, "/webhooks")
        .header("webhook-signature", &header)
        .raw_body(body)
        .execute()
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_intake_rejects_short_id() {
    let (app, _store) = test_app(test_webhook_config());

    let body = r#"{"id":"e","type":"invoice.paid","data":{}}"#;
    let header = signature_header(SECRET, body, 1700000000);

    testing::post(app, "/webhooks")
        .header("webhook-signature", &header)
        .raw_body(body)
        .execute()
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_logs_list_records_in_intake_order() {
    let (app, store) = test_app(test_webhook_config());

    for id in ["evt_log_1", "evt_log_2", "evt_log_3"] {
        let body = format!(r#"{{"id":"{}","type":"invoice.paid","data":{{}}}}"#, id);
        let header = signature_header(SECRET, &body, 1700000000);
        testing::post(app.clone(), "/webhooks")
            .header("webhook-signature", &header)
            .raw_body(body)
            .execute()
            .await
            .assert_accepted();
        wait_for_status(&store, id, EventStatus::Processed).await;
    }

    let records: Vec<serde_json::Value> = testing::get(app, "/webhooks/logs")
        .execute()
        .await
        .assert_ok()
        .assert_json()
        .json()
        .await;

    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["event_id"], "evt_log_1");
    assert_eq!(records[1]["event_id"], "evt_log_2");
    assert_eq!(records[2]["event_id"], "evt_log_3");
    for record in &records {
        assert_eq!(record["status"], "processed");
        assert_eq!(record["attempts"], 1);
        assert_eq!(record["replay_count"], 0);
    }
}

#[tokio::test]
async fn test_logs_respect_status_filter_and_limit() {
    let (app, store) = test_app(test_webhook_config());

    for id in ["evt_f_1", "evt_f_2"] {
        let body = format!(r#"{{"id":"{}","type":"invoice.paid","data":{{}}}}"#, id);
        let header = signature_header(SECRET, &body, 1700000000);
        testing::post(app.clone(), "/webhooks")
            .header("webhook-signature", &header)
            .raw_body(body)
            .execute()
            .await
            .assert_accepted();
        wait_for_status(&store, id, EventStatus::Processed).await;
    }

    let processed: Vec<serde_json::Value> =
        testing::get(app.clone(), "/webhooks/logs?status=processed")
            .execute()
            .await
            .assert_ok()
            .json()
            .await;
    assert_eq!(processed.len(), 2);

    let failed: Vec<serde_json::Value> = testing::get(app.clone(), "/webhooks/logs?status=failed")
        .execute()
        .await
        .assert_ok()
        .json()
        .await;
    assert!(failed.is_empty());

    let limited: Vec<serde_json::Value> = testing::get(app, "/webhooks/logs?limit=1")
        .execute()
        .await
        .assert_ok()
        .json()
        .await;
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0]["event_id"], "evt_f_1");
}

#[tokio::test]
async fn test_replay_unknown_event_is_not_found() {
    let (app, _store) = test_app(test_webhook_config());

    testing::post(app, "/webhooks/replay/evt_missing")
        .execute()
        .await
        .assert_not_found();
}

#[tokio::test]
async fn test_replay_reprocesses_stored_event() {
    let (app, store) = test_app(test_webhook_config());

    let body = r#"{"id":"evt_replay_1","type":"invoice.paid","data":{"amount":5}}"#;
    let header = signature_header(SECRET, body, 1700000000);
    testing::post(app.clone(), "/webhooks")
        .header("webhook-signature", &header)
        .raw_body(body)
        .execute()
        .await
        .assert_accepted();
    wait_for_status(&store, "evt_replay_1", EventStatus::Processed).await;

    // Replay without any signature header
    testing::post(app, "/webhooks/replay/evt_replay_1")
        .execute()
        .await
        .assert_accepted()
        .assert_json_field("status", json!("replay_accepted"))
        .await
        .assert_json_field("event_id", json!("evt_replay_1"))
        .await
        .assert_json_field("replay_count", json!(1))
        .await;

    // The replayed attempt increments attempts by exactly one
    for _ in 0..200 {
        if store.get("evt_replay_1").await.unwrap().attempts == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let record = store.get("evt_replay_1").await.unwrap();
    assert_eq!(record.attempts, 2);
    assert_eq!(record.replay_count, 1);
    assert_eq!(record.status, EventStatus::Processed);
}

#[tokio::test]
async fn test_health_endpoint_reports_store() {
    let (app, _store) = test_app(test_webhook_config());

    testing::get(app, "/health")
        .execute()
        .await
        .assert_ok()
        .assert_json_field("status", json!("healthy"))
        .await
        .assert_json_field("checks.1.name", json!("event_store"))
        .await;
}
