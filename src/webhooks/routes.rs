use crate::app::AppContext;
use crate::error::{FloodgateError, Result};
use crate::http::RouteModule;
use crate::webhooks::types::{EventRecord, EventStatus, WebhookEvent};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

/// Header carrying the `t=<unix-ts>,v1=<hex>` signature value.
pub const SIGNATURE_HEADER: &str = "webhook-signature";

/// Route module exposing the webhook intake, logs, and replay endpoints.
pub struct WebhookModule;

impl RouteModule for WebhookModule {
    fn routes(&self) -> Router<AppContext> {
        Router::new()
            .route("/webhooks", post(receive_webhook))
            .route("/webhooks/logs", get(list_event_logs))
            .route("/webhooks/replay/:event_id", post(replay_event))
    }
}

/// Acknowledgment returned by the intake endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct IntakeAck {
    pub status: String,
    pub event_id: String,
    pub attempts: u32,
}

/// Acknowledgment returned by the replay endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplayAck {
    pub status: String,
    pub event_id: String,
    pub replay_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    /// Restrict the listing to one processing state.
    pub status: Option<EventStatus>,
    /// Cap the number of returned records (minimum 1).
    pub limit: Option<usize>,
}

/// Receive a webhook event.
///
/// Verifies the signature over the raw body (unless verification is
/// disabled), records the event exactly once, and schedules processing
/// detached from this request. The response never waits for processing.
async fn receive_webhook(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<IntakeAck>)> {
    if ctx.webhooks.verify_signatures {
        let signature_header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                FloodgateError::unauthorized("missing webhook signature header")
            })?;

        if !ctx
            .verifier
            .verify_signature(&body, signature_header)
            .await?
        {
            return Err(FloodgateError::unauthorized("invalid webhook signature"));
        }
    }

    let event: WebhookEvent = serde_json::from_slice(&body)?;
    if event.id.len() < 3 || event.event_type.len() < 3 {
        return Err(FloodgateError::bad_request(
            "event id and type must be at least 3 characters",
        ));
    }

    let (record, created) = ctx
        .store
        .create_if_absent(&event.id, &event.event_type, event.data.clone())
        .await?;

    if !created {
        tracing::debug!(event_id = %event.id, "Duplicate webhook delivery acknowledged");
        return Ok((
            StatusCode::ACCEPTED,
            Json(IntakeAck {
                status: "duplicate".to_string(),
                event_id: record.event_id,
                attempts: record.attempts,
            }),
        ));
    }

    ctx.processor.submit(event);

    Ok((
        StatusCode::ACCEPTED,
        Json(IntakeAck {
            status: "accepted".to_string(),
            event_id: record.event_id,
            attempts: record.attempts,
        }),
    ))
}

/// List webhook event records, oldest first.
async fn list_event_logs(
    State(ctx): State<AppContext>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<EventRecord>>> {
    let mut records = ctx.store.list(query.status).await?;

    if let Some(limit) = query.limit {
        records.truncate(limit.max(1));
    }

    Ok(Json(records))
}

/// Replay a previously recorded event.
///
/// Reprocesses the stored payload without contacting the origin and without
/// re-verifying signatures; authenticity was established at intake. Only
/// `replay_count` is touched here - attempt accounting belongs to the
/// processor.
async fn replay_event(
    State(ctx): State<AppContext>,
    Path(event_id): Path<String>,
) -> Result<(StatusCode, Json<ReplayAck>)> {
    let record = ctx
        .store
        .update(&event_id, Box::new(|r| r.replay_count += 1))
        .await?;

    tracing::info!(
        event_id = %event_id,
        replay_count = record.replay_count,
        "Webhook event replay scheduled"
    );

    ctx.processor.submit(record.to_event());

    Ok((
        StatusCode::ACCEPTED,
        Json(ReplayAck {
            status: "replay_accepted".to_string(),
            event_id: record.event_id,
            replay_count: record.replay_count,
        }),
    ))
}
