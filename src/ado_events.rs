//! Top-level shape of an Azure DevOps service hook payload.
//!
//! ADO payloads vary wildly in their `resource` shape across event
//! types (and even within one event type depending on server version),
//! so only the envelope is modeled as a typed struct; `resource` stays
//! a loosely-typed [`serde_json::Value`] tree that the formatter picks
//! apart field-by-field, the way `hooks/ado.rs`'s `events::Event` already
//! leaves `resource: Option<serde_json::Value>` untyped.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "eventType", default)]
    pub event_type: String,
    #[serde(default)]
    pub resource: serde_json::Value,
    #[serde(rename = "resourceContainers", default)]
    pub resource_containers: serde_json::Value,
}
