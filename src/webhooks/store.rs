use crate::error::{FloodgateError, Result};
use crate::webhooks::types::{EventRecord, EventStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A mutation applied to a record under the store's lock.
pub type RecordMutator = Box<dyn FnOnce(&mut EventRecord) + Send>;

/// Single source of truth for webhook event processing state
///
/// `create_if_absent` is the idempotency boundary: a second intake with the
/// same event id must return the existing record unchanged. `update` applies
/// its mutation atomically with respect to all other operations on the same
/// key, so concurrent intake, replay, and retries cannot interleave partial
/// updates.
///
/// Operations are fallible so a durable backend (database, log-structured
/// store) can be substituted without changing any caller.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a fresh record unless the id already exists.
    ///
    /// Returns the record and whether it was created by this call. An
    /// existing record is returned unchanged with `false`.
    async fn create_if_absent(
        &self,
        event_id: &str,
        event_type: &str,
        metadata: serde_json::Value,
    ) -> Result<(EventRecord, bool)>;

    /// Fetch a record by id.
    async fn get(&self, event_id: &str) -> Result<EventRecord>;

    /// Apply a mutation to a record and return the updated snapshot.
    async fn update(&self, event_id: &str, mutator: RecordMutator) -> Result<EventRecord>;

    /// List records ordered by `received_at` ascending, optionally filtered
    /// by status. Each call re-reads current state.
    async fn list(&self, filter: Option<EventStatus>) -> Result<Vec<EventRecord>>;

    /// Check if the store is operational.
    fn is_healthy(&self) -> bool;
}

/// In-memory event store (for development/testing and single-instance
/// deployments)
///
/// Records are never evicted within the process lifetime. In production, use
/// a database-backed store behind the same trait.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<HashMap<String, EventRecord>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn create_if_absent(
        &self,
        event_id: &str,
        event_type: &str,
        metadata: serde_json::Value,
    ) -> Result<(EventRecord, bool)> {
        let mut events = self.events.write().await;

        if let Some(existing) = events.get(event_id) {
            return Ok((existing.clone(), false));
        }

        let record = EventRecord::new(event_id.to_string(), event_type.to_string(), metadata);
        events.insert(event_id.to_string(), record.clone());
        Ok((record, true))
    }

    async fn get(&self, event_id: &str) -> Result<EventRecord> {
        let events = self.events.read().await;
        events
            .get(event_id)
            .cloned()
            .ok_or_else(|| FloodgateError::not_found(format!("webhook event {}", event_id)))
    }

    async fn update(&self, event_id: &str, mutator: RecordMutator) -> Result<EventRecord> {
        let mut events = self.events.write().await;
        let record = events
            .get_mut(event_id)
            .ok_or_else(|| FloodgateError::not_found(format!("webhook event {}", event_id)))?;

        mutator(record);
        Ok(record.clone())
    }

    async fn list(&self, filter: Option<EventStatus>) -> Result<Vec<EventRecord>> {
        let events = self.events.read().await;
        let mut records: Vec<EventRecord> = events
            .values()
            .filter(|r| filter.is_none_or(|status| r.status == status))
            .cloned()
            .collect();

        records.sort_by(|a, b| {
            a.received_at
                .cmp(&b.received_at)
                .then_with(|| a.event_id.cmp(&b.event_id))
        });
        Ok(records)
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
