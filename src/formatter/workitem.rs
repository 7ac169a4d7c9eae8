use serde_json::Value;

use super::{build_mentions, clean_url, id_str, obj, str_or};
use crate::identity::Identity;
use crate::models::Notification;

pub async fn format(event_type: &str, resource: &Value, project: &str, identity: &Identity) -> Notification {
    let fields = obj(resource, "fields");
    let wi_id = id_str(resource, "id");
    let wi_type = str_or(&fields, "System.WorkItemType", "Work Item");
    let wi_title = str_or(&fields, "System.Title", "Untitled");
    let state = str_or(&fields, "System.State", "");

    // ADO serializes AssignedTo/ChangedBy as an identity dict on most
    // collections, but some older hooks still send a bare display string.
    let assigned_to_raw = obj(&fields, "System.AssignedTo");
    let assigned_to_name = match &assigned_to_raw {
        Value::Object(_) => assigned_to_raw.get("displayName").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        Value::String(s) => s.clone(),
        _ => String::new(),
    };

    let changed_by_raw = obj(&fields, "System.ChangedBy");
    let (actor_name, actor_id) = match &changed_by_raw {
        Value::Object(_) => (
            changed_by_raw.get("displayName").and_then(|v| v.as_str()).unwrap_or("Someone").to_string(),
            changed_by_raw.get("id").and_then(|v| v.as_str()).map(str::to_string),
        ),
        Value::String(s) if !s.is_empty() => (s.clone(), None),
        _ => ("Someone".to_string(), None),
    };

    let mut url = str_or(resource, "url", "");
    if url.contains("/_apis/") {
        url = url.replace("/_apis/wit/workItems/", "/_workitems/edit/");
    }

    let (heading, body) = match event_type {
        "workitem.created" => {
            let mut body = format!("{actor_name} created {wi_type} #{wi_id}: {wi_title}");
            if !assigned_to_name.is_empty() {
                body.push_str(&format!("\nAssigned to: {assigned_to_name}"));
            }
            (format!("New {wi_type}"), body)
        }
        "workitem.commented" => (
            format!("{wi_type} Comment"),
            format!("{actor_name} commented on {wi_type} #{wi_id}: {wi_title}"),
        ),
        "workitem.resolved" | "workitem.closed" => (
            format!("{wi_type} {state}"),
            format!("{actor_name} {} {wi_type} #{wi_id}: {wi_title}", state.to_lowercase()),
        ),
        _ => {
            let mut body = format!("✏{actor_name} updated {wi_type} #{wi_id}: {wi_title}");
            if !state.is_empty() {
                body.push_str(&format!(" [{state}]"));
            }
            (format!("{wi_type} Updated"), body)
        }
    };

    let status_image = if event_type == "workitem.commented" {
        "workitem comment".to_string()
    } else {
        wi_type.to_lowercase()
    };

    let avatar_b64 = identity.avatar(actor_id.as_deref()).await;

    let mentions = if assigned_to_raw.is_object() {
        build_mentions(&[&assigned_to_raw], actor_id.as_deref())
    } else {
        build_mentions(&[], actor_id.as_deref())
    };

    let mut meta = serde_json::Map::new();
    meta.insert("wi_id".to_string(), resource.get("id").cloned().unwrap_or(Value::Null));
    meta.insert("wi_type".to_string(), Value::String(wi_type));
    meta.insert("state".to_string(), Value::String(state));
    meta.insert("assigned_to".to_string(), Value::String(assigned_to_name));

    Notification {
        event_type: "workitem".to_string(),
        heading,
        body,
        url: clean_url(&url),
        project: project.to_string(),
        avatar_b64,
        status_image: Some(status_image),
        actor: actor_name,
        actor_id,
        mentions,
        meta,
    }
}
