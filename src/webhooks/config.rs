//! Configuration for webhook intake and processing

use crate::utils::get_env_with_prefix;
use serde::{Deserialize, Serialize};

/// Configuration for webhook verification, processing, and retry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    /// Require a valid signature on every intake request.
    ///
    /// Disabling this skips verification entirely. That is an explicit
    /// development bypass, never a production default.
    #[serde(default = "default_verify_signatures")]
    pub verify_signatures: bool,

    /// Shared secret used for HMAC signature verification.
    ///
    /// Required (non-empty) whenever `verify_signatures` is on.
    #[serde(default)]
    pub secret: String,

    /// Optional freshness window in seconds for the signature timestamp.
    ///
    /// When set, signatures whose timestamp differs from the server clock by
    /// more than this value are rejected. `None` disables the check.
    #[serde(default)]
    pub tolerance_seconds: Option<i64>,

    /// Maximum processing attempts per event (replays included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Upper bound on a single downstream dispatch call, in seconds.
    #[serde(default = "default_dispatch_timeout_seconds")]
    pub dispatch_timeout_seconds: u64,

    /// Downstream URL to forward processed events to.
    ///
    /// When unset, deliveries are logged instead of forwarded.
    #[serde(default)]
    pub notify_url: Option<String>,

    /// Periodically re-process events left in the retry_scheduled state.
    ///
    /// Off by default: retries are operator-driven through the replay
    /// endpoint unless this sweep is enabled.
    #[serde(default)]
    pub retry_sweep_enabled: bool,

    /// Interval between retry sweeps, in seconds.
    #[serde(default = "default_retry_sweep_interval_seconds")]
    pub retry_sweep_interval_seconds: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            verify_signatures: default_verify_signatures(),
            secret: String::new(),
            tolerance_seconds: None,
            max_attempts: default_max_attempts(),
            dispatch_timeout_seconds: default_dispatch_timeout_seconds(),
            notify_url: None,
            retry_sweep_enabled: false,
            retry_sweep_interval_seconds: default_retry_sweep_interval_seconds(),
        }
    }
}

impl WebhookConfig {
    /// Load webhook configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(verify) = get_env_with_prefix("WEBHOOK_VERIFY_SIGNATURES") {
            config.verify_signatures = verify.parse().unwrap_or(true);
        }

        if let Some(secret) = get_env_with_prefix("WEBHOOK_SECRET") {
            config.secret = secret;
        }

        if let Some(tolerance) = get_env_with_prefix("WEBHOOK_TOLERANCE_SECONDS") {
            if let Ok(t) = tolerance.parse() {
                config.tolerance_seconds = Some(t);
            }
        }

        if let Some(attempts) = get_env_with_prefix("WEBHOOK_MAX_ATTEMPTS") {
            if let Ok(a) = attempts.parse() {
                config.max_attempts = a;
            }
        }

        if let Some(timeout) = get_env_with_prefix("WEBHOOK_DISPATCH_TIMEOUT_SECONDS") {
            if let Ok(t) = timeout.parse() {
                config.dispatch_timeout_seconds = t;
            }
        }

        if let Some(url) = get_env_with_prefix("WEBHOOK_NOTIFY_URL") {
            config.notify_url = Some(url);
        }

        if let Some(enabled) = get_env_with_prefix("WEBHOOK_RETRY_SWEEP_ENABLED") {
            config.retry_sweep_enabled = enabled.parse().unwrap_or(false);
        }

        if let Some(interval) = get_env_with_prefix("WEBHOOK_RETRY_SWEEP_INTERVAL_SECONDS") {
            if let Ok(i) = interval.parse() {
                config.retry_sweep_interval_seconds = i;
            }
        }

        config
    }
}

fn default_verify_signatures() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_dispatch_timeout_seconds() -> u64 {
    10
}

fn default_retry_sweep_interval_seconds() -> u64 {
    30
}
