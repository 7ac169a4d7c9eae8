//! Maps a raw Azure DevOps webhook payload to a normalized [`Notification`],
//! selecting one of three families by event-type prefix. Returns `None`
//! for event types we don't recognize — the caller logs and drops those.

mod pipeline;
mod pr;
mod workitem;

use serde_json::Value;
use tracing::debug;

use crate::identity::Identity;
use crate::models::{Mentions, Notification};

pub async fn format_webhook(event_type: &str, payload: &Value, identity: &Identity) -> Option<Notification> {
    let resource = obj(payload, "resource");
    let resource_containers = obj(payload, "resourceContainers");

    let project = resource_containers
        .get("project")
        .and_then(|p| p.get("name"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .or_else(|| resource.get("teamProject").and_then(|v| v.as_str()))
        .unwrap_or("")
        .to_string();

    match event_type {
        "git.pullrequest.created"
        | "git.pullrequest.updated"
        | "git.pullrequest.merged"
        | "ms.vss-code.git-pullrequest-comment-event" => {
            Some(pr::format(event_type, &resource, &project, identity).await)
        }
        "workitem.created"
        | "workitem.updated"
        | "workitem.commented"
        | "workitem.resolved"
        | "workitem.closed" => Some(workitem::format(event_type, &resource, &project, identity).await),
        "build.complete"
        | "ms.vss-release.release-created-event"
        | "ms.vss-release.deployment-completed-event"
        | "ms.vss-release.release-abandoned-event" => {
            Some(pipeline::format(event_type, &resource, &project, identity).await)
        }
        other => {
            debug!("unhandled event type: {other}");
            None
        }
    }
}

/// Build a mentions envelope from a set of ADO identity dicts. The actor
/// is excluded so they don't get notified of their own action (unless a
/// branch deliberately adds them back in afterward, as PR-merged does).
fn build_mentions(identities: &[&Value], actor_id: Option<&str>) -> Mentions {
    let mut user_ids = Vec::new();
    let mut names = Vec::new();

    for ident in identities {
        let Some(ident) = ident.as_object() else { continue };
        let uid = ident
            .get("id")
            .and_then(|v| v.as_str())
            .or_else(|| ident.get("uniqueName").and_then(|v| v.as_str()))
            .unwrap_or("");
        if uid.is_empty() || Some(uid) == actor_id || user_ids.iter().any(|u: &String| u == uid) {
            continue;
        }
        user_ids.push(uid.to_string());
        if let Some(name) = ident.get("displayName").and_then(|v| v.as_str()) {
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }

    Mentions { user_ids, names }
}

/// After assembly, raw ADO API URLs (anything under `/_apis/` that isn't
/// a work-item deep link) are never user-clickable — blank them out.
fn clean_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    if url.contains("/_apis/") && !url.contains("/_workitems") {
        return String::new();
    }
    url.to_string()
}

fn obj(v: &Value, key: &str) -> Value {
    v.get(key).cloned().unwrap_or(Value::Null)
}

fn arr(v: &Value, key: &str) -> Vec<Value> {
    v.get(key).and_then(|x| x.as_array()).cloned().unwrap_or_default()
}

/// `{dict}.get(key, default)` semantics: falls back to `default` whenever
/// the key is absent or not a string.
fn str_or(v: &Value, key: &str, default: &str) -> String {
    v.get(key)
        .and_then(|x| x.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

/// Read a field that may be a string or a number and render it as text,
/// e.g. a PR id that ADO sometimes serializes as an integer.
fn id_str(v: &Value, key: &str) -> String {
    match v.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mentions_excludes_actor_and_dedups() {
        let a = serde_json::json!({"id": "A", "displayName": "Alice"});
        let b = serde_json::json!({"id": "B", "displayName": "Bob"});
        let b_again = serde_json::json!({"id": "B", "displayName": "Bob"});
        let m = build_mentions(&[&a, &b, &b_again], Some("A"));
        assert_eq!(m.user_ids, vec!["B"]);
        assert_eq!(m.names, vec!["Bob"]);
    }

    #[test]
    fn mentions_falls_back_to_unique_name() {
        let a = serde_json::json!({"uniqueName": "alice@example.com"});
        let m = build_mentions(&[&a], None);
        assert_eq!(m.user_ids, vec!["alice@example.com"]);
        assert!(m.names.is_empty());
    }

    #[test]
    fn clean_url_blanks_raw_api_urls() {
        assert_eq!(clean_url(""), "");
        assert_eq!(clean_url("https://ado/_apis/wit/workItems/5"), "https://ado/_apis/wit/workItems/5");
        assert_eq!(clean_url("https://ado/project/_workitems/edit/5"), "https://ado/project/_workitems/edit/5");
        assert_eq!(clean_url("https://ado/_apis/git/repositories/1"), "");
    }

    #[test]
    fn title_case_handles_multi_word() {
        assert_eq!(title_case("succeeded"), "Succeeded");
        assert_eq!(title_case("partially succeeded"), "Partially Succeeded");
    }

    #[tokio::test]
    async fn unknown_event_type_returns_none() {
        let identity = Identity::new(&crate::config::Config {
            host: "0.0.0.0".into(),
            port: 8000,
            data_dir: "data".into(),
            log_max_bytes: 1,
            log_backup_count: 1,
            ado_organization_url: String::new(),
            ado_pat: String::new(),
            ado_api_version: "5.1-preview".into(),
            ado_tls_verify: true,
            ado_webhook_secret: None,
            server_public_url: "http://localhost:8000".into(),
        });
        let payload = serde_json::json!({"resource": {}});
        assert!(format_webhook("weird.event", &payload, &identity).await.is_none());
    }
}
