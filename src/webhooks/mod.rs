//! Webhook intake, verification, and replay.
//!
//! The flow: the intake endpoint verifies the signature over the raw body,
//! records the event exactly once (idempotency on the origin-assigned id),
//! and hands processing to a detached task. The processor runs the
//! downstream dispatch under a timeout with a bounded retry budget, and the
//! replay endpoint re-drives a stored event through the same path without
//! re-verifying signatures.

pub mod config;
pub mod dispatch;
pub mod processor;
pub mod routes;
pub mod store;
pub mod types;
pub mod verification;

pub use config::WebhookConfig;
pub use dispatch::{
    DeadLetterSink, EventDispatcher, HttpEventDispatcher, TracingDeadLetter, TracingDispatcher,
};
pub use processor::{EventProcessor, RetrySweeperHandle};
pub use routes::{IntakeAck, ReplayAck, WebhookModule, SIGNATURE_HEADER};
pub use store::{EventStore, InMemoryEventStore, RecordMutator};
pub use types::{EventRecord, EventStatus, WebhookEvent};
pub use verification::{NoVerification, SignatureVerifier, TimestampedHmacVerifier};
