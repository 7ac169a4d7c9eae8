use serde_json::Value;

use super::{build_mentions, clean_url, id_str, obj, str_or, title_case};
use crate::identity::Identity;
use crate::models::Notification;

fn build_status_image(result: &str) -> Option<String> {
    match result {
        "succeeded" => Some("success".to_string()),
        "failed" | "partiallysucceeded" => Some("failure".to_string()),
        "canceled" | "cancelled" => Some("cancelled".to_string()),
        _ => None,
    }
}

fn deploy_status_image(status: &str) -> Option<String> {
    match status {
        "succeeded" => Some("success".to_string()),
        "rejected" | "failed" => Some("failure".to_string()),
        "canceled" | "cancelled" => Some("cancelled".to_string()),
        _ => None,
    }
}

pub async fn format(event_type: &str, resource: &Value, project: &str, identity: &Identity) -> Notification {
    let (heading, body, status_image, actor_name, actor_id, url, mentions) = match event_type {
        "build.complete" => {
            let build_id = id_str(resource, "id");
            let build_num = resource
                .get("buildNumber")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| build_id.clone());
            let definition = obj(resource, "definition").get("name").and_then(|v| v.as_str()).unwrap_or("Pipeline").to_string();
            let result = str_or(resource, "result", "unknown").to_lowercase();
            let requested_for = obj(resource, "requestedFor");
            let actor_name = requested_for.get("displayName").and_then(|v| v.as_str()).unwrap_or("Someone").to_string();
            let actor_id = requested_for.get("id").and_then(|v| v.as_str()).map(str::to_string);
            let url = resource
                .get("_links")
                .and_then(|l| l.get("web"))
                .and_then(|w| w.get("href"))
                .and_then(|v| v.as_str())
                .or_else(|| resource.get("url").and_then(|v| v.as_str()))
                .unwrap_or("")
                .to_string();

            let display_result = title_case(&result.replace("partiallysucceeded", "partially succeeded"));
            // Unlike PR/work-item events, a build result always mentions the
            // person who triggered it — no actor-exclusion here.
            let mentions = build_mentions(&[&requested_for], None);

            (
                format!("Build {display_result}"),
                format!("{definition} #{build_num} {result}\nTriggered by: {actor_name}"),
                build_status_image(&result),
                actor_name,
                actor_id,
                url,
                mentions,
            )
        }
        "ms.vss-release.release-created-event" => {
            let rel_name = str_or(resource, "name", "Release");
            let definition = obj(resource, "releaseDefinition").get("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
            let created_by = obj(resource, "createdBy");
            let actor_name = created_by.get("displayName").and_then(|v| v.as_str()).unwrap_or("Someone").to_string();
            let actor_id = created_by.get("id").and_then(|v| v.as_str()).map(str::to_string);
            let url = resource
                .get("_links")
                .and_then(|l| l.get("web"))
                .and_then(|w| w.get("href"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let mut body = format!("{actor_name} created {rel_name}");
            if !definition.is_empty() {
                body.push_str(&format!(" ({definition})"));
            }

            // Release-creation is a no-mentions notification: only the
            // subscription/broadcast rules route it, never a direct mention.
            let mentions = build_mentions(&[], actor_id.as_deref());

            ("Release Created".to_string(), body, None, actor_name, actor_id, url, mentions)
        }
        "ms.vss-release.deployment-completed-event" => {
            let env = obj(resource, "environment");
            let env_name = env.get("name").and_then(|v| v.as_str()).unwrap_or("Environment").to_string();
            let release = obj(resource, "release");
            let rel_name = release.get("name").and_then(|v| v.as_str()).unwrap_or("Release").to_string();
            let deploy_status = env.get("status").and_then(|v| v.as_str()).unwrap_or("unknown").to_lowercase();
            let deployment = obj(resource, "deployment");
            let requested_for = obj(&deployment, "requestedFor");
            let actor_name = requested_for.get("displayName").and_then(|v| v.as_str()).unwrap_or("Someone").to_string();
            let actor_id = requested_for.get("id").and_then(|v| v.as_str()).map(str::to_string);
            let url = release
                .get("_links")
                .and_then(|l| l.get("web"))
                .and_then(|w| w.get("href"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let mentions = build_mentions(&[&requested_for], None);

            (
                format!("Deployment {}", title_case(&deploy_status)),
                format!("{rel_name} → {env_name}: {deploy_status}"),
                deploy_status_image(&deploy_status),
                actor_name,
                actor_id,
                url,
                mentions,
            )
        }
        _ => {
            // ms.vss-release.release-abandoned-event
            let rel_name = str_or(resource, "name", "Release");
            let modified_by = obj(resource, "modifiedBy");
            let actor_name = modified_by.get("displayName").and_then(|v| v.as_str()).unwrap_or("Someone").to_string();
            let actor_id = modified_by.get("id").and_then(|v| v.as_str()).map(str::to_string);
            let url = resource
                .get("_links")
                .and_then(|l| l.get("web"))
                .and_then(|w| w.get("href"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let mentions = build_mentions(&[], actor_id.as_deref());

            (
                "Release Abandoned".to_string(),
                format!("{actor_name} abandoned {rel_name}"),
                Some("cancelled".to_string()),
                actor_name,
                actor_id,
                url,
                mentions,
            )
        }
    };

    let avatar_b64 = identity.avatar(actor_id.as_deref()).await;

    let mut meta = serde_json::Map::new();
    meta.insert("raw_event".to_string(), Value::String(event_type.to_string()));

    Notification {
        event_type: "pipeline".to_string(),
        heading,
        body,
        url: clean_url(&url),
        project: project.to_string(),
        avatar_b64,
        status_image,
        actor: actor_name,
        actor_id,
        mentions,
        meta,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;

    fn unconfigured_identity() -> Identity {
        Identity::new(&Config {
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
        })
    }

    #[tokio::test]
    async fn build_complete_formats_title_cased_result() {
        let resource = serde_json::json!({
            "id": 100,
            "buildNumber": "20260727.1",
            "definition": {"name": "CI"},
            "result": "partiallySucceeded",
            "requestedFor": {"id": "req-1", "displayName": "Requester"},
        });
        let identity = unconfigured_identity();
        let n = format("build.complete", &resource, "ProjA", &identity).await;

        assert_eq!(n.heading, "Build Partially Succeeded");
        assert!(n.body.contains("CI #20260727.1"));
        assert_eq!(n.status_image.as_deref(), Some("failure"));
    }

    #[tokio::test]
    async fn build_failed_mentions_the_triggering_user() {
        let resource = serde_json::json!({
            "id": 101,
            "buildNumber": "20260727.2",
            "definition": {"name": "CI"},
            "result": "failed",
            "requestedFor": {"id": "U", "displayName": "Requester"},
        });
        let identity = unconfigured_identity();
        let n = format("build.complete", &resource, "ProjA", &identity).await;

        assert_eq!(n.status_image.as_deref(), Some("failure"));
        assert_eq!(n.mentions.user_ids, vec!["U"]);
        assert_eq!(n.actor_id.as_deref(), Some("U"));
    }

    #[tokio::test]
    async fn release_created_has_no_mentions() {
        let resource = serde_json::json!({
            "name": "Release-5",
            "releaseDefinition": {"name": "Prod Release"},
            "createdBy": {"id": "creator-1", "displayName": "Creator"},
        });
        let identity = unconfigured_identity();
        let n = format("ms.vss-release.release-created-event", &resource, "ProjA", &identity).await;

        assert_eq!(n.heading, "Release Created");
        assert!(n.mentions.user_ids.is_empty());
    }

    #[tokio::test]
    async fn deployment_completed_mentions_requester() {
        let resource = serde_json::json!({
            "environment": {"name": "Production", "status": "succeeded"},
            "release": {"name": "Release-5"},
            "deployment": {"requestedFor": {"id": "req-1", "displayName": "Requester"}},
        });
        let identity = unconfigured_identity();
        let n = format("ms.vss-release.deployment-completed-event", &resource, "ProjA", &identity).await;

        assert_eq!(n.heading, "Deployment Succeeded");
        assert_eq!(n.mentions.user_ids, vec!["req-1"]);
    }
}
