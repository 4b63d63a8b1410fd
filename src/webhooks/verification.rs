use crate::error::{FloodgateError, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Trait for verifying webhook signatures
///
/// The verifier renders an authenticity verdict; deciding what to do with a
/// failed verdict (reject, log, bypass) belongs to the intake handler.
///
/// # Example
///
/// ```rust,ignore
/// use floodgate::webhooks::TimestampedHmacVerifier;
///
/// let verifier = TimestampedHmacVerifier::new("whsec_your_secret", None);
///
/// let payload = br#"{"id":"evt_1","type":"invoice.paid","data":{}}"#;
/// let header = "t=1700000000,v1=abc123..."; // From the webhook-signature header
/// let is_valid = verifier.verify_signature(payload, header).await?;
/// ```
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Verify the signature header against the raw payload bytes.
    ///
    /// Returns `Ok(true)` for an authentic signature, `Ok(false)` for a
    /// mismatched or stale one, and `Err` when the header is malformed.
    async fn verify_signature(&self, payload: &[u8], signature_header: &str) -> Result<bool>;
}

/// No-op verifier that accepts all webhooks
///
/// **WARNING:** accepts every request without verification. Only for
/// development environments or origins that cannot sign their deliveries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVerification;

#[async_trait]
impl SignatureVerifier for NoVerification {
    async fn verify_signature(&self, _payload: &[u8], _signature_header: &str) -> Result<bool> {
        tracing::warn!("NoVerification webhook verifier used - all webhooks accepted without verification");
        Ok(true)
    }
}

/// HMAC-SHA256 verifier with timestamp binding
///
/// Expects a header of the form `t=<unix-timestamp>,v1=<hex-hmac>` where the
/// HMAC is computed over `"{timestamp}.{raw_body}"`. Binding the timestamp
/// into the signed payload lets an optional freshness window reject captured
/// requests replayed at the transport level.
///
/// The secret is held in a [`SecretString`] so it cannot leak through debug
/// output or logs.
pub struct TimestampedHmacVerifier {
    secret: SecretString,
    /// Maximum allowed clock skew for the signature timestamp. `None`
    /// disables the freshness check.
    tolerance_seconds: Option<i64>,
}

impl TimestampedHmacVerifier {
    pub fn new(secret: impl Into<String>, tolerance_seconds: Option<i64>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            tolerance_seconds,
        }
    }

    /// Compute the expected HMAC over `"{timestamp}.{payload}"`.
    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

#[async_trait]
impl SignatureVerifier for TimestampedHmacVerifier {
    async fn verify_signature(&self, payload: &[u8], signature_header: &str) -> Result<bool> {
        let parts = parse_signature_header(signature_header)?;

        if let Some(tolerance) = self.tolerance_seconds {
            let now = chrono::Utc::now().timestamp();
            if (now - parts.timestamp).abs() > tolerance {
                tracing::debug!(
                    timestamp = parts.timestamp,
                    "Webhook signature timestamp outside freshness window"
                );
                return Ok(false);
            }
        }

        let provided = match hex::decode(&parts.signature) {
            Ok(bytes) => bytes,
            Err(_) => {
                tracing::debug!("Failed to decode webhook signature hex");
                return Ok(false);
            }
        };

        let expected = self.compute_signature(parts.timestamp, payload);

        let is_valid = constant_time_compare(&expected, &provided);
        if !is_valid {
            tracing::debug!("Webhook signature verification failed");
        }

        Ok(is_valid)
    }
}

/// Parsed signature header parts.
struct SignatureParts {
    timestamp: i64,
    signature: String,
}

/// Parse a `t=<unix-timestamp>,v1=<hex>` signature header.
///
/// Unknown keys (future signature versions) are ignored; missing `t` or `v1`
/// is a malformed header.
fn parse_signature_header(header: &str) -> Result<SignatureParts> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };

        match key.trim() {
            "t" => timestamp = value.parse().ok(),
            "v1" => signature = Some(value.to_string()),
            _ => {}
        }
    }

    match (timestamp, signature) {
        (Some(timestamp), Some(signature)) => Ok(SignatureParts {
            timestamp,
            signature,
        }),
        _ => Err(FloodgateError::unauthorized(
            "malformed webhook signature header",
        )),
    }
}

/// Constant-time comparison to prevent timing attacks
///
/// Uses the `subtle` crate, whose optimization barriers stop the compiler
/// from folding the comparison back into an early-exit branch.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}
