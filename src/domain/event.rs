//! Append-only integration audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

entity_id!(
    /// Integration event identifier.
    EventId
);

labelled_enum! {
    pub enum EventStatus {
        Success => "Success",
        Error => "Error",
        Warning => "Warning",
    }
}

pub const ITEM_IMPORTED: &str = "item_imported";
pub const ITEM_SKIPPED: &str = "item_skipped";
pub const ITEM_FAILED: &str = "item_failed";
pub const QUERY_SYNC: &str = "query_sync";
pub const INTEGRATION_ENABLED: &str = "integration_enabled";
pub const INTEGRATION_DISABLED: &str = "integration_disabled";
pub const CONNECTION_TEST: &str = "connection_test";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationEvent {
    pub id: EventId,
    pub event_type: String,
    pub status: EventStatus,
    pub message: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl IntegrationEvent {
    pub fn new(
        event_type: &str,
        status: EventStatus,
        message: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type: event_type.to_string(),
            status,
            message: message.into(),
            payload,
            created_at: Utc::now(),
        }
    }
}
