//! Asynchronous webhook event processing
//!
//! The processor performs the side-effecting work outside the request path:
//! it increments the attempt counter, runs the dispatcher under a timeout,
//! and records the outcome on the event record. Business failures are never
//! raised to the caller; everything lands in the store.

use crate::webhooks::dispatch::{DeadLetterSink, EventDispatcher};
use crate::webhooks::store::EventStore;
use crate::webhooks::types::{EventStatus, WebhookEvent};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Executes webhook side effects with bounded retry.
///
/// Cloning is cheap; a clone is moved into each detached task.
#[derive(Clone)]
pub struct EventProcessor {
    store: Arc<dyn EventStore>,
    dispatcher: Arc<dyn EventDispatcher>,
    dead_letters: Arc<dyn DeadLetterSink>,
    max_attempts: u32,
    dispatch_timeout: Duration,
}

impl EventProcessor {
    pub fn new(
        store: Arc<dyn EventStore>,
        dispatcher: Arc<dyn EventDispatcher>,
        dead_letters: Arc<dyn DeadLetterSink>,
        max_attempts: u32,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            dispatcher,
            dead_letters,
            max_attempts,
            dispatch_timeout,
        }
    }

    /// Schedule processing detached from the calling request.
    ///
    /// Returns immediately; the spawned task contains its own failures.
    pub fn submit(&self, event: WebhookEvent) {
        let processor = self.clone();
        tokio::spawn(async move {
            processor.process(&event).await;
        });
    }

    /// Run one processing attempt and record the outcome.
    ///
    /// Increments `attempts`, executes the dispatcher bounded by the
    /// configured timeout, then transitions the record: success lands on
    /// `processed`, failure on `retry_scheduled` while attempts remain and
    /// on `failed` (terminal, dead-lettered) once the budget is spent.
    pub async fn process(&self, event: &WebhookEvent) {
        let attempt = match self
            .store
            .update(&event.id, Box::new(|r| r.attempts += 1))
            .await
        {
            Ok(record) => record.attempts,
            Err(e) => {
                tracing::error!(
                    event_id = %event.id,
                    error = %e,
                    "Cannot process webhook event without its record"
                );
                return;
            }
        };

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            attempt,
            "Processing webhook event"
        );

        let outcome = match tokio::time::timeout(
            self.dispatch_timeout,
            self.dispatcher.dispatch(event),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "dispatch timed out after {}s",
                self.dispatch_timeout.as_secs()
            )),
        };

        match outcome {
            Ok(()) => {
                let result = self
                    .store
                    .update(
                        &event.id,
                        Box::new(|r| {
                            r.status = EventStatus::Processed;
                            r.processed_at = Some(Utc::now());
                            r.last_error = None;
                        }),
                    )
                    .await;

                match result {
                    Ok(_) => tracing::info!(
                        event_id = %event.id,
                        attempt,
                        "Webhook event processed"
                    ),
                    Err(e) => tracing::error!(
                        event_id = %event.id,
                        error = %e,
                        "Failed to record processing success"
                    ),
                }
            }
            Err(error) => {
                let terminal = attempt >= self.max_attempts;
                let result = self
                    .store
                    .update(
                        &event.id,
                        Box::new(move |r| {
                            r.last_error = Some(error);
                            r.processed_at = None;
                            r.status = if terminal {
                                EventStatus::Failed
                            } else {
                                EventStatus::RetryScheduled
                            };
                        }),
                    )
                    .await;

                match result {
                    Ok(record) => {
                        tracing::warn!(
                            event_id = %event.id,
                            attempt,
                            terminal,
                            error = record.last_error.as_deref().unwrap_or(""),
                            "Webhook event processing failed"
                        );
                        if terminal {
                            if let Err(e) = self.dead_letters.deliver(&record).await {
                                tracing::error!(
                                    event_id = %event.id,
                                    error = %e,
                                    "Dead-letter delivery failed"
                                );
                            }
                        }
                    }
                    Err(e) => tracing::error!(
                        event_id = %event.id,
                        error = %e,
                        "Failed to record processing failure"
                    ),
                }
            }
        }
    }

    /// Start a background task that re-processes `retry_scheduled` records.
    ///
    /// Each sweep re-runs every record currently awaiting retry; the
    /// per-event attempt budget still bounds total work. Call
    /// [`RetrySweeperHandle::shutdown`] to stop the task cleanly.
    pub fn start_retry_sweeper(&self, interval: Duration) -> RetrySweeperHandle {
        let processor = self.clone();
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Retry sweeper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                let pending = match processor
                    .store
                    .list(Some(EventStatus::RetryScheduled))
                    .await
                {
                    Ok(records) => records,
                    Err(e) => {
                        tracing::error!(error = %e, "Retry sweep could not list events");
                        continue;
                    }
                };

                for record in pending {
                    let event = record.to_event();
                    tracing::info!(
                        event_id = %event.id,
                        attempts = record.attempts,
                        "Retry sweep re-processing event"
                    );
                    processor.process(&event).await;
                }
            }
        });

        RetrySweeperHandle {
            shutdown_tx,
            handle,
        }
    }
}

/// Handle to a running retry sweeper task.
pub struct RetrySweeperHandle {
    shutdown_tx: tokio::sync::mpsc::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl RetrySweeperHandle {
    /// Signal the sweeper to stop and wait briefly for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;

        match tokio::time::timeout(Duration::from_secs(5), self.handle).await {
            Ok(_) => tracing::debug!("Retry sweeper stopped cleanly"),
            Err(_) => tracing::warn!("Retry sweeper did not stop within timeout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FloodgateError, Result};
    use crate::webhooks::dispatch::TracingDeadLetter;
    use crate::webhooks::store::InMemoryEventStore;
    use crate::webhooks::types::EventRecord;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Dispatcher double that fails the first `fail_first` calls.
    struct FlakyDispatcher {
        calls: AtomicU32,
        fail_first: u32,
    }

    impl FlakyDispatcher {
        fn failing(times: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first: times,
            }
        }
    }

    #[async_trait]
    impl EventDispatcher for FlakyDispatcher {
        async fn dispatch(&self, _event: &WebhookEvent) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(FloodgateError::service_unavailable("downstream refused"))
            } else {
                Ok(())
            }
        }
    }

    /// Dispatcher that never returns within any reasonable timeout.
    struct StalledDispatcher;

    #[async_trait]
    impl EventDispatcher for StalledDispatcher {
        async fn dispatch(&self, _event: &WebhookEvent) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    /// Dead-letter double that counts deliveries.
    #[derive(Default)]
    struct CountingDeadLetter {
        delivered: AtomicU32,
    }

    #[async_trait]
    impl DeadLetterSink for CountingDeadLetter {
        async fn deliver(&self, _record: &EventRecord) -> Result<()> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn processor_with(
        store: Arc<dyn EventStore>,
        dispatcher: Arc<dyn EventDispatcher>,
        dead_letters: Arc<dyn DeadLetterSink>,
        max_attempts: u32,
    ) -> EventProcessor {
        EventProcessor::new(
            store,
            dispatcher,
            dead_letters,
            max_attempts,
            Duration::from_millis(200),
        )
    }

    async fn seeded_store(event_id: &str) -> (Arc<InMemoryEventStore>, WebhookEvent) {
        let store = Arc::new(InMemoryEventStore::new());
        let (record, _) = store
            .create_if_absent(event_id, "invoice.paid", json!({"n": 1}))
            .await
            .unwrap();
        (store, record.to_event())
    }

    #[tokio::test]
    async fn test_success_marks_processed() {
        let (store, event) = seeded_store("evt_1").await;
        let processor = processor_with(
            store.clone(),
            Arc::new(FlakyDispatcher::failing(0)),
            Arc::new(TracingDeadLetter),
            3,
        );

        processor.process(&event).await;

        let record = store.get("evt_1").await.unwrap();
        assert_eq!(record.status, EventStatus::Processed);
        assert_eq!(record.attempts, 1);
        assert!(record.processed_at.is_some());
        assert!(record.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failure_schedules_retry_below_budget() {
        let (store, event) = seeded_store("evt_1").await;
        let processor = processor_with(
            store.clone(),
            Arc::new(FlakyDispatcher::failing(10)),
            Arc::new(TracingDeadLetter),
            3,
        );

        processor.process(&event).await;

        let record = store.get("evt_1").await.unwrap();
        assert_eq!(record.status, EventStatus::RetryScheduled);
        assert_eq!(record.attempts, 1);
        assert!(record.processed_at.is_none());
        assert_eq!(record.last_error.as_deref(), Some("Service unavailable: downstream refused"));
    }

    #[tokio::test]
    async fn test_exhausted_budget_is_terminal_and_dead_lettered() {
        let (store, event) = seeded_store("evt_1").await;
        let dead_letters = Arc::new(CountingDeadLetter::default());
        let processor = processor_with(
            store.clone(),
            Arc::new(FlakyDispatcher::failing(10)),
            dead_letters.clone(),
            3,
        );

        for _ in 0..3 {
            processor.process(&event).await;
        }

        let record = store.get("evt_1").await.unwrap();
        assert_eq!(record.status, EventStatus::Failed);
        assert_eq!(record.attempts, 3);
        assert_eq!(dead_letters.delivered.load(Ordering::SeqCst), 1);

        // Further failed attempts stay terminal
        processor.process(&event).await;
        let record = store.get("evt_1").await.unwrap();
        assert_eq!(record.status, EventStatus::Failed);
        assert_eq!(record.attempts, 4);
    }

    #[tokio::test]
    async fn test_recovery_after_retry() {
        let (store, event) = seeded_store("evt_1").await;
        let processor = processor_with(
            store.clone(),
            Arc::new(FlakyDispatcher::failing(1)),
            Arc::new(TracingDeadLetter),
            3,
        );

        processor.process(&event).await;
        assert_eq!(
            store.get("evt_1").await.unwrap().status,
            EventStatus::RetryScheduled
        );

        processor.process(&event).await;
        let record = store.get("evt_1").await.unwrap();
        assert_eq!(record.status, EventStatus::Processed);
        assert_eq!(record.attempts, 2);
        assert!(record.last_error.is_none());
        assert!(record.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let (store, event) = seeded_store("evt_1").await;
        let processor = processor_with(
            store.clone(),
            Arc::new(StalledDispatcher),
            Arc::new(TracingDeadLetter),
            3,
        );

        processor.process(&event).await;

        let record = store.get("evt_1").await.unwrap();
        assert_eq!(record.status, EventStatus::RetryScheduled);
        assert!(record.last_error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_unknown_event_is_ignored() {
        let store = Arc::new(InMemoryEventStore::new());
        let processor = processor_with(
            store.clone(),
            Arc::new(FlakyDispatcher::failing(0)),
            Arc::new(TracingDeadLetter),
            3,
        );

        let event = WebhookEvent {
            id: "evt_ghost".to_string(),
            event_type: "x.y".to_string(),
            data: json!({}),
        };

        // Must not panic or create a record
        processor.process(&event).await;
        assert!(store.get("evt_ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_submit_is_detached() {
        let (store, event) = seeded_store("evt_1").await;
        let processor = processor_with(
            store.clone(),
            Arc::new(FlakyDispatcher::failing(0)),
            Arc::new(TracingDeadLetter),
            3,
        );

        processor.submit(event);

        // Poll until the detached task lands
        for _ in 0..100 {
            if store.get("evt_1").await.unwrap().status == EventStatus::Processed {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("detached processing never completed");
    }

    #[tokio::test]
    async fn test_retry_sweeper_drains_scheduled_events() {
        let (store, event) = seeded_store("evt_1").await;
        let processor = processor_with(
            store.clone(),
            Arc::new(FlakyDispatcher::failing(1)),
            Arc::new(TracingDeadLetter),
            3,
        );

        // First attempt fails and leaves the record awaiting retry
        processor.process(&event).await;
        assert_eq!(
            store.get("evt_1").await.unwrap().status,
            EventStatus::RetryScheduled
        );

        let sweeper = processor.start_retry_sweeper(Duration::from_millis(20));

        let mut processed = false;
        for _ in 0..100 {
            if store.get("evt_1").await.unwrap().status == EventStatus::Processed {
                processed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        sweeper.shutdown().await;

        assert!(processed, "sweeper never re-processed the event");
        assert_eq!(store.get("evt_1").await.unwrap().attempts, 2);
    }
}
