use std::sync::Arc;
use std::time::Duration;

use crate::webhooks::config::WebhookConfig;
use crate::webhooks::dispatch::{
    DeadLetterSink, EventDispatcher, TracingDeadLetter, TracingDispatcher,
};
use crate::webhooks::processor::EventProcessor;
use crate::webhooks::store::{EventStore, InMemoryEventStore};
use crate::webhooks::verification::{NoVerification, SignatureVerifier, TimestampedHmacVerifier};

/// Application context for dependency injection and shared state
///
/// Holds the webhook components behind trait objects so alternative
/// backends (durable store, real downstream dispatcher) can be substituted
/// without touching the handlers.
#[derive(Clone)]
pub struct AppContext {
    /// Source of truth for event processing state.
    pub store: Arc<dyn EventStore>,
    /// Renders authenticity verdicts on intake requests.
    pub verifier: Arc<dyn SignatureVerifier>,
    /// Executes side effects detached from the request path.
    pub processor: Arc<EventProcessor>,
    /// Webhook policy knobs consulted by the handlers.
    pub webhooks: WebhookConfig,
}

impl AppContext {
    /// Context with in-memory store, logging dispatcher, and default config.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Builder pattern for constructing AppContext
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::new()
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for AppContext with fluent API
#[must_use = "builder does nothing until you call build()"]
pub struct AppContextBuilder {
    store: Option<Arc<dyn EventStore>>,
    verifier: Option<Arc<dyn SignatureVerifier>>,
    dispatcher: Option<Arc<dyn EventDispatcher>>,
    dead_letters: Option<Arc<dyn DeadLetterSink>>,
    webhooks: WebhookConfig,
}

impl AppContextBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            verifier: None,
            dispatcher: None,
            dead_letters: None,
            webhooks: WebhookConfig::default(),
        }
    }

    /// Set the event store backend
    pub fn with_store(mut self, store: Arc<dyn EventStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the signature verifier
    ///
    /// When not set, one is derived from the webhook config: a
    /// timestamp-bound HMAC verifier when verification is enabled, the
    /// accept-all verifier otherwise.
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Set the downstream event dispatcher
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Set the dead-letter sink for terminally failed events
    pub fn with_dead_letter_sink(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letters = Some(sink);
        self
    }

    /// Set the webhook configuration
    pub fn with_webhook_config(mut self, webhooks: WebhookConfig) -> Self {
        self.webhooks = webhooks;
        self
    }

    pub fn build(self) -> AppContext {
        let webhooks = self.webhooks;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryEventStore::new()));

        let verifier = self.verifier.unwrap_or_else(|| {
            if webhooks.verify_signatures {
                Arc::new(TimestampedHmacVerifier::new(
                    webhooks.secret.clone(),
                    webhooks.tolerance_seconds,
                ))
            } else {
                Arc::new(NoVerification)
            }
        });

        let dispatcher = self.dispatcher.unwrap_or_else(|| Arc::new(TracingDispatcher));
        let dead_letters = self
            .dead_letters
            .unwrap_or_else(|| Arc::new(TracingDeadLetter));

        let processor = Arc::new(EventProcessor::new(
            store.clone(),
            dispatcher,
            dead_letters,
            webhooks.max_attempts,
            Duration::from_secs(webhooks.dispatch_timeout_seconds),
        ));

        AppContext {
            store,
            verifier,
            processor,
            webhooks,
        }
    }
}

impl Default for AppContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
