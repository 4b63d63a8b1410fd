use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An incoming webhook event as delivered by the origin.
///
/// The same shape is used for replays: the stored record's `metadata`
/// becomes `data` again so a replay reprocesses the original body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Origin-assigned event ID.
    pub id: String,
    /// Event type (e.g., "customer.subscription.updated").
    #[serde(rename = "type")]
    pub event_type: String,
    /// Opaque event payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Processing state of a stored event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Accepted, processing not yet attempted.
    Queued,
    /// Last attempt succeeded.
    Processed,
    /// Retry budget exhausted; terminal.
    Failed,
    /// Last attempt failed with attempts remaining.
    RetryScheduled,
}

impl EventStatus {
    /// Whether this state ends automatic processing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Failed)
    }
}

/// Tracked lifecycle of a single webhook event.
///
/// Owned exclusively by the event store. `attempts` moves only through the
/// processor; `replay_count` moves only through the replay endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: String,
    pub event_type: String,
    pub status: EventStatus,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub replay_count: u32,
    pub last_error: Option<String>,
    /// Original event payload, kept for replay reconstruction.
    pub metadata: serde_json::Value,
}

impl EventRecord {
    /// Create a freshly accepted record.
    pub fn new(event_id: String, event_type: String, metadata: serde_json::Value) -> Self {
        Self {
            event_id,
            event_type,
            status: EventStatus::Queued,
            received_at: Utc::now(),
            processed_at: None,
            attempts: 0,
            replay_count: 0,
            last_error: None,
            metadata,
        }
    }

    /// Rebuild the event descriptor this record was created from.
    pub fn to_event(&self) -> WebhookEvent {
        WebhookEvent {
            id: self.event_id.clone(),
            event_type: self.event_type.clone(),
            data: self.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let record = EventRecord::new(
            "evt_1".to_string(),
            "invoice.paid".to_string(),
            serde_json::json!({"amount": 100}),
        );

        assert_eq!(record.status, EventStatus::Queued);
        assert_eq!(record.attempts, 0);
        assert_eq!(record.replay_count, 0);
        assert!(record.processed_at.is_none());
        assert!(record.last_error.is_none());
    }

    #[test]
    fn test_record_round_trips_to_event() {
        let record = EventRecord::new(
            "evt_2".to_string(),
            "customer.created".to_string(),
            serde_json::json!({"customer": "cus_1"}),
        );

        let event = record.to_event();
        assert_eq!(event.id, "evt_2");
        assert_eq!(event.event_type, "customer.created");
        assert_eq!(event.data, serde_json::json!({"customer": "cus_1"}));
    }

    #[test]
    fn test_event_deserializes_type_field() {
        let event: WebhookEvent =
            serde_json::from_str(r#"{"id":"evt_3","type":"x.y","data":{"k":1}}"#).unwrap();
        assert_eq!(event.event_type, "x.y");
        assert_eq!(event.data["k"], 1);
    }

    #[test]
    fn test_event_data_defaults_to_null() {
        let event: WebhookEvent = serde_json::from_str(r#"{"id":"evt_4","type":"x.y"}"#).unwrap();
        assert!(event.data.is_null());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&EventStatus::RetryScheduled).unwrap(),
            "\"retry_scheduled\""
        );
        assert_eq!(
            serde_json::to_string(&EventStatus::Queued).unwrap(),
            "\"queued\""
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(EventStatus::Processed.is_terminal());
        assert!(EventStatus::Failed.is_terminal());
        assert!(!EventStatus::Queued.is_terminal());
        assert!(!EventStatus::RetryScheduled.is_terminal());
    }
}
