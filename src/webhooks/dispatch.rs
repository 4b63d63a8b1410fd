use crate::error::Result;
use crate::webhooks::types::{EventRecord, WebhookEvent};
use async_trait::async_trait;

/// Downstream side effect executed for each processing attempt
///
/// Implementations deliver the event to whatever consumes it: a notification
/// service, an internal queue, another HTTP endpoint. Errors returned here
/// are recorded on the event record and drive the retry policy; they never
/// reach an HTTP caller.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn dispatch(&self, event: &WebhookEvent) -> Result<()>;
}

/// Dispatcher that logs deliveries instead of forwarding them
///
/// The development default when no downstream URL is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatcher;

#[async_trait]
impl EventDispatcher for TracingDispatcher {
    async fn dispatch(&self, event: &WebhookEvent) -> Result<()> {
        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Webhook event dispatched (logging only)"
        );
        Ok(())
    }
}

/// Dispatcher that forwards events to a downstream HTTP endpoint
///
/// POSTs the event as JSON and treats any non-2xx response as a failed
/// attempt.
pub struct HttpEventDispatcher {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpEventDispatcher {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = endpoint
            .parse::<reqwest::Url>()
            .map_err(|e| crate::error::FloodgateError::bad_request(format!(
                "invalid notify URL {}: {}",
                endpoint, e
            )))?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }
}

#[async_trait]
impl EventDispatcher for HttpEventDispatcher {
    async fn dispatch(&self, event: &WebhookEvent) -> Result<()> {
        self.client
            .post(self.endpoint.clone())
            .json(event)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(
            event_id = %event.id,
            endpoint = %self.endpoint,
            "Webhook event forwarded downstream"
        );
        Ok(())
    }
}

/// Destination for events that exhausted their retry budget
///
/// Production deployments should wire a durable sink (database table, queue)
/// so terminally failed events survive for manual intervention.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn deliver(&self, record: &EventRecord) -> Result<()>;
}

/// Dead-letter sink that only logs
///
/// Terminal failures remain queryable through the logs endpoint, so the
/// default sink records them at error level and nothing more.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDeadLetter;

#[async_trait]
impl DeadLetterSink for TracingDeadLetter {
    async fn deliver(&self, record: &EventRecord) -> Result<()> {
        tracing::error!(
            event_id = %record.event_id,
            event_type = %record.event_type,
            attempts = record.attempts,
            last_error = record.last_error.as_deref().unwrap_or(""),
            "Webhook event exhausted retries"
        );
        Ok(())
    }
}
