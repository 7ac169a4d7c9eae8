//! The `POST /webhooks/ado` receiver: verifies the HMAC-SHA1 signature
//! over the raw request body, parses the event envelope, and schedules
//! formatting + dispatch as a background task so ADO gets its 200
//! response immediately rather than waiting on delivery fan-out.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha1::Sha1;
use tracing::info;

use crate::ado_events::WebhookEnvelope;
use crate::error::Error;
use crate::formatter;
use crate::state::AppState;

type HmacSha1 = Hmac<Sha1>;

pub fn routes() -> Router<AppState> {
    Router::new().route("/ado", post(receive))
}

async fn receive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<(StatusCode, Json<Value>), Error> {
    if let Some(secret) = &state.config.ado_webhook_secret {
        verify_signature(secret, &headers, &body)?;
    }

    let envelope: WebhookEnvelope = serde_json::from_slice(&body).map_err(|_| Error::Validation("malformed webhook payload".to_string()))?;
    if envelope.event_type.is_empty() {
        return Err(Error::MissingEventType);
    }

    info!("received ado webhook: {}", envelope.event_type);

    let event_type = envelope.event_type.clone();
    let store = Arc::clone(&state.store);
    let identity = Arc::clone(&state.identity);
    tokio::spawn(async move {
        let payload = serde_json::json!({
            "resource": envelope.resource,
            "resourceContainers": envelope.resource_containers,
        });
        let Some(notification) = formatter::format_webhook(&envelope.event_type, &payload, &identity).await else {
            return;
        };
        crate::dispatcher::dispatch(&store, &identity, notification).await;
    });

    Ok((StatusCode::OK, Json(json!({"status": "accepted", "eventType": event_type}))))
}

fn verify_signature(secret: &str, headers: &HeaderMap, body: &[u8]) -> Result<(), Error> {
    let header = headers
        .get("X-Hub-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::InvalidSignature)?;
    let digest = header.strip_prefix("sha1=").ok_or(Error::InvalidSignature)?;
    let expected = hex::decode(digest).map_err(|_| Error::InvalidSignature)?;

    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).map_err(|_| Error::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| Error::InvalidSignature)?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_verifies() {
        let body = br#"{"eventType":"build.complete"}"#;
        let sig = sign("my-secret", body);
        let mut headers = HeaderMap::new();
        headers.insert("X-Hub-Signature", sig.parse().unwrap());
        assert!(verify_signature("my-secret", &headers, body).is_ok());
    }

    #[test]
    fn tampered_body_fails_verification() {
        let body = br#"{"eventType":"build.complete"}"#;
        let sig = sign("my-secret", body);
        let mut headers = HeaderMap::new();
        headers.insert("X-Hub-Signature", sig.parse().unwrap());
        assert!(verify_signature("my-secret", &headers, b"{\"eventType\":\"tampered\"}").is_err());
    }

    #[test]
    fn missing_header_fails_verification() {
        let headers = HeaderMap::new();
        assert!(verify_signature("my-secret", &headers, b"{}").is_err());
    }

    #[test]
    fn malformed_header_fails_verification() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Hub-Signature", "not-hex-at-all".parse().unwrap());
        assert!(verify_signature("my-secret", &headers, b"{}").is_err());
    }
}
