use serde_json::Value;

use super::{arr, build_mentions, clean_url, id_str, obj, str_or};
use crate::identity::Identity;
use crate::models::Notification;

pub async fn format(event_type: &str, resource: &Value, project: &str, identity: &Identity) -> Notification {
    // The comment-event envelope nests the PR under `resource.pullRequest`;
    // the other three events put the PR fields directly on `resource`.
    let pr = if resource.get("pullRequestId").is_some() {
        resource.clone()
    } else {
        resource.get("pullRequest").cloned().unwrap_or_else(|| resource.clone())
    };

    let pr_id = id_str(&pr, "pullRequestId");
    let title = str_or(&pr, "title", "Pull Request");
    let repo = obj(&pr, "repository").get("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let source = str_or(&pr, "sourceRefName", "").trim_start_matches("refs/heads/").to_string();
    let target = str_or(&pr, "targetRefName", "").trim_start_matches("refs/heads/").to_string();
    let url = pr
        .get("_links")
        .and_then(|l| l.get("web"))
        .and_then(|w| w.get("href"))
        .and_then(|v| v.as_str())
        .or_else(|| pr.get("remoteUrl").and_then(|v| v.as_str()))
        .or_else(|| pr.get("url").and_then(|v| v.as_str()))
        .unwrap_or("")
        .to_string();
    let status = str_or(&pr, "status", "");
    let created_by = obj(&pr, "createdBy");
    let reviewers = arr(&pr, "reviewers");
    let reviewer_refs: Vec<&Value> = reviewers.iter().collect();

    let (heading, body, status_image, actor_name, actor_id, mentions) = match event_type {
        "ms.vss-code.git-pullrequest-comment-event" => {
            let comment_author = resource.get("comment").and_then(|c| c.get("author")).cloned().unwrap_or(Value::Null);
            let actor_name = comment_author.get("displayName").and_then(|v| v.as_str()).unwrap_or("Someone").to_string();
            let actor_id = comment_author.get("id").and_then(|v| v.as_str()).map(str::to_string);

            let mut idents: Vec<&Value> = vec![&created_by];
            idents.extend(reviewer_refs.iter());
            let mentions = build_mentions(&idents, actor_id.as_deref());

            (
                "PR Comment".to_string(),
                format!("💬 {actor_name} commented on PR #{pr_id}: {title}"),
                Some("pr comment".to_string()),
                actor_name,
                actor_id,
                mentions,
            )
        }
        "git.pullrequest.created" => {
            let actor_name = created_by.get("displayName").and_then(|v| v.as_str()).unwrap_or("Someone").to_string();
            let actor_id = created_by.get("id").and_then(|v| v.as_str()).map(str::to_string);
            let mentions = build_mentions(&reviewer_refs, actor_id.as_deref());

            (
                "New Pull Request".to_string(),
                format!("{actor_name} opened PR #{pr_id} in {repo}\n{source} → {target}"),
                Some("new pr".to_string()),
                actor_name,
                actor_id,
                mentions,
            )
        }
        "git.pullrequest.merged" => {
            let merged_by = resource.get("closedBy").cloned().unwrap_or_else(|| created_by.clone());
            let actor_name = merged_by.get("displayName").and_then(|v| v.as_str()).unwrap_or("Someone").to_string();
            let actor_id = merged_by.get("id").and_then(|v| v.as_str()).map(str::to_string);

            let mut mentions = build_mentions(&reviewer_refs, actor_id.as_deref());
            // The author always hears about their own PR getting merged, even if they merged it themselves.
            if let Some(author_id) = created_by.get("id").and_then(|v| v.as_str()) {
                if !mentions.user_ids.iter().any(|u| u == author_id) {
                    mentions.user_ids.push(author_id.to_string());
                    if let Some(author_name) = created_by.get("displayName").and_then(|v| v.as_str()) {
                        if !author_name.is_empty() && !mentions.names.iter().any(|n| n == author_name) {
                            mentions.names.push(author_name.to_string());
                        }
                    }
                }
            }

            (
                "PR Merged".to_string(),
                format!("PR #{pr_id} merged in {repo}\n{title}"),
                Some("pr merged".to_string()),
                actor_name,
                actor_id,
                mentions,
            )
        }
        _ => {
            // git.pullrequest.updated, and anything else that reaches this branch.
            let actor_name = created_by.get("displayName").and_then(|v| v.as_str()).unwrap_or("Someone").to_string();
            let actor_id = created_by.get("id").and_then(|v| v.as_str()).map(str::to_string);
            let mentions = build_mentions(&reviewer_refs, actor_id.as_deref());

            (
                "PR Updated".to_string(),
                format!("PR #{pr_id} updated ({status}): {title}"),
                Some("pr updated".to_string()),
                actor_name,
                actor_id,
                mentions,
            )
        }
    };

    let avatar_b64 = identity.avatar(actor_id.as_deref()).await;

    let mut meta = serde_json::Map::new();
    meta.insert("pr_id".to_string(), pr.get("pullRequestId").cloned().unwrap_or(Value::Null));
    meta.insert("status".to_string(), Value::String(status));
    meta.insert("repo".to_string(), Value::String(repo));

    Notification {
        event_type: "pr".to_string(),
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
