//! Manual notifications (operator-triggered, not derived from an ADO
//! event) and the delivery log query endpoint.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::dispatcher;
use crate::error::Error;
use crate::models::{LogEntry, Mentions, Notification};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/send", post(send_manual)).route("/logs", get(logs))
}

#[derive(Debug, Deserialize)]
struct ManualNotificationRequest {
    heading: String,
    body: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    project: String,
    #[serde(default)]
    avatar_b64: Option<String>,
}

#[derive(Debug, Serialize)]
struct ManualNotificationResponse {
    sent_to: usize,
}

async fn send_manual(
    State(state): State<AppState>,
    Json(req): Json<ManualNotificationRequest>,
) -> Result<Json<ManualNotificationResponse>, Error> {
    let notification = Notification {
        event_type: "manual".to_string(),
        heading: req.heading,
        body: req.body,
        url: req.url,
        project: req.project,
        avatar_b64: req.avatar_b64,
        status_image: None,
        actor: "Hermes".to_string(),
        actor_id: None,
        mentions: Mentions::default(),
        meta: Default::default(),
    };

    let results = dispatcher::dispatch_manual(&state.store, notification).await;
    Ok(Json(ManualNotificationResponse { sent_to: results.len() }))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    #[serde(default = "default_limit")]
    limit: usize,
    event_type: Option<String>,
    client_id: Option<String>,
}

fn default_limit() -> usize {
    100
}

async fn logs(State(state): State<AppState>, Query(q): Query<LogsQuery>) -> Json<Vec<LogEntry>> {
    let entries = state
        .store
        .read_logs(q.limit, q.event_type.as_deref(), q.client_id.as_deref())
        .await;
    Json(entries)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::identity::Identity;
    use crate::models::Client;
    use crate::store::Store;
    use std::sync::Arc;

    fn state(dir: &std::path::Path) -> AppState {
        let config = Config {
            host: "0.0.0.0".into(),
            port: 8000,
            data_dir: dir.to_str().unwrap().into(),
            log_max_bytes: 5 * 1024 * 1024,
            log_backup_count: 3,
            ado_organization_url: String::new(),
            ado_pat: String::new(),
            ado_api_version: "5.1-preview".into(),
            ado_tls_verify: true,
            ado_webhook_secret: None,
            server_public_url: "http://localhost:8000".into(),
        };
        let store = Arc::new(Store::init(dir.to_str().unwrap(), config.log_max_bytes, config.log_backup_count).unwrap());
        let identity = Arc::new(Identity::new(&config));
        AppState { store, identity, config: Arc::new(config) }
    }

    #[tokio::test]
    async fn manual_notification_only_reaches_manual_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let subscribed = Client::new("A".into(), "http://127.0.0.1:1/a".into(), "u1".into(), "A".into(), vec!["manual".into()]);
        let unsubscribed = Client::new("B".into(), "http://127.0.0.1:1/b".into(), "u2".into(), "B".into(), vec!["pr".into()]);
        state.store.save(subscribed).await.unwrap();
        state.store.save(unsubscribed).await.unwrap();

        let req = ManualNotificationRequest {
            heading: "Heads up".into(),
            body: "body".into(),
            url: String::new(),
            project: String::new(),
            avatar_b64: None,
        };
        let resp = send_manual(State(state.clone()), Json(req)).await.unwrap().0;
        assert_eq!(resp.sent_to, 1);
    }

    #[tokio::test]
    async fn logs_endpoint_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let notification = Notification {
            event_type: "manual".to_string(),
            heading: "h".into(),
            body: "b".into(),
            url: String::new(),
            project: String::new(),
            avatar_b64: None,
            status_image: None,
            actor: "Hermes".into(),
            actor_id: None,
            mentions: Mentions::default(),
            meta: Default::default(),
        };
        for _ in 0..3 {
            let entry = LogEntry::new("c1".into(), "manual".into(), notification.clone(), true, None);
            state.store.append_log(&entry).await;
        }

        let Json(entries) = logs(State(state), Query(LogsQuery { limit: 2, event_type: None, client_id: None })).await;
        assert_eq!(entries.len(), 2);
    }
}
