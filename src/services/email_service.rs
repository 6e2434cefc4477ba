//! Outgoing email.
//!
//! Two backends exist: the console backend logs each message, the relay
//! backend POSTs it as JSON to an HTTP mail relay. Relay requests carry an
//! `X-Relay-Signature: sha256=<hex>` header computed over the body with the
//! relay key, so the relay can verify the sender.

use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::EmailBackend;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("relay request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("relay rejected message with status {0}")]
    Rejected(u16),

    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Body sent to the relay.
#[derive(Debug, Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Deliver `message` through the configured backend.
pub async fn send(
    backend: &EmailBackend,
    client: &reqwest::Client,
    message: &EmailMessage,
) -> Result<(), EmailError> {
    match backend {
        EmailBackend::Console { from } => {
            tracing::info!(
                from = %from,
                to = %message.to,
                subject = %message.subject,
                "email (console backend)\n{}",
                message.body
            );
            Ok(())
        }
        EmailBackend::Relay { url, api_key, from } => {
            let payload = serde_json::to_string(&RelayPayload {
                from,
                to: &message.to,
                subject: &message.subject,
                text: &message.body,
            })?;
            let signature = generate_signature(api_key, &payload);

            let response = client
                .post(url)
                .timeout(Duration::from_secs(10))
                .header("Content-Type", "application/json")
                .header("X-Relay-Signature", signature)
                .body(payload)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(EmailError::Rejected(status.as_u16()));
            }
            tracing::debug!(to = %message.to, "email handed to relay");
            Ok(())
        }
    }
}

/// Generate an HMAC-SHA256 signature for a relay payload.
///
/// # Format
///
/// `sha256=<hex_encoded_hmac>`
fn generate_signature(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    let result = mac.finalize();
    format!("sha256={}", hex::encode(result.into_bytes()))
}
