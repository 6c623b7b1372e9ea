use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A received provider webhook call, recorded before its signature is even
/// checked so a replayed delivery can be recognized regardless of outcome (W1, W2).
/// `signature` is the raw header value as delivered; verification sets
/// `signature_valid` and is never retried once stamped.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebhookEvent {
    pub id: Uuid,
    pub provider_event_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub signature: String,
    pub signature_valid: bool,
    pub processed: bool,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl WebhookEvent {
    pub fn new(
        provider_event_id: String,
        event_type: String,
        payload: serde_json::Value,
        signature: String,
        signature_valid: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider_event_id,
            event_type,
            payload,
            signature,
            signature_valid,
            processed: false,
            received_at: Utc::now(),
            processed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_webhook_event_new_is_unprocessed() {
        let event = WebhookEvent::new(
            "evt_123".to_string(),
            "charge.success".to_string(),
            json!({ "reference": "ref-1" }),
            "deadbeef".to_string(),
            true,
        );
        assert!(!event.processed);
        assert!(event.processed_at.is_none());
        assert!(event.signature_valid);
    }
}
