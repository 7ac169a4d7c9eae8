//! The normalized data model shared by every component: registered
//! clients, the notification envelope the formatter produces, and the
//! delivery log entries the dispatcher appends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered notification endpoint on someone's workstation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub callback_url: String,
    pub ado_user_id: String,
    pub display_name: String,
    pub subscriptions: Vec<String>,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Client {
    pub fn new(
        name: String,
        callback_url: String,
        ado_user_id: String,
        display_name: String,
        subscriptions: Vec<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            callback_url,
            ado_user_id,
            display_name,
            subscriptions,
            active: true,
            registered_at: Utc::now(),
            last_seen: None,
        }
    }

    /// True if the client subscribes to `event_type`, either directly or via `"all"`.
    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.subscriptions.iter().any(|s| s == event_type || s == "all")
    }
}

/// The `{user_ids, names}` routing envelope attached to every notification.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mentions {
    pub user_ids: Vec<String>,
    pub names: Vec<String>,
}

impl Mentions {
    pub fn is_empty(&self) -> bool {
        self.user_ids.is_empty() && self.names.is_empty()
    }
}

/// The normalized envelope emitted by the formatter and stored verbatim in the log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub event_type: String,
    pub heading: String,
    pub body: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub project: String,
    pub avatar_b64: Option<String>,
    pub status_image: Option<String>,
    pub actor: String,
    pub actor_id: Option<String>,
    pub mentions: Mentions,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

/// One delivery attempt, appended to the rotating notification log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub client_id: String,
    pub event_type: String,
    pub payload: Notification,
    pub success: bool,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(
        client_id: String,
        event_type: String,
        payload: Notification,
        success: bool,
        error: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            client_id,
            event_type,
            payload,
            success,
            error,
            sent_at: Utc::now(),
        }
    }
}
