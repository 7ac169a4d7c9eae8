//! Concurrent fan-out: for a formatted notification, work out which
//! registered clients should receive it and POST it to each of them at
//! once. One delivery attempt per client per event — there is no retry
//! queue, and a failed client never blocks the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::warn;

use crate::identity::Identity;
use crate::models::{Client, LogEntry, Notification};
use crate::router;
use crate::store::Store;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn dispatch(store: &Arc<Store>, identity: &Arc<Identity>, notification: Notification) {
    let clients = match store.list_clients().await {
        Ok(c) => c,
        Err(e) => {
            warn!("dispatch: failed to list clients: {e}");
            return;
        }
    };

    let notification = Arc::new(notification);

    // Resolve relevance for every client concurrently — group-membership
    // lookups are the only part of this that hits the network.
    let mut relevance: JoinSet<(Client, bool)> = JoinSet::new();
    for client in clients {
        let identity = Arc::clone(identity);
        let notification = Arc::clone(&notification);
        relevance.spawn(async move {
            let needs_groups = !notification.mentions.names.is_empty()
                && client.active
                && client.subscribes_to(&notification.event_type)
                && !client.ado_user_id.is_empty();
            let group_names = if needs_groups {
                identity.groups(&client.ado_user_id).await.1
            } else {
                Vec::new()
            };
            let relevant = router::is_relevant(&client, &notification, &group_names);
            (client, relevant)
        });
    }

    let mut targets = Vec::new();
    while let Some(result) = relevance.join_next().await {
        match result {
            Ok((client, true)) => targets.push(client),
            Ok((_, false)) => {}
            Err(e) => warn!("dispatch: relevance task panicked: {e}"),
        }
    }

    // Deliver to every relevant client concurrently; each attempt is
    // independent and always records exactly one log entry.
    let http = reqwest::Client::new();
    let mut deliveries: JoinSet<()> = JoinSet::new();
    for client in targets {
        let store = Arc::clone(store);
        let notification = Arc::clone(&notification);
        let http = http.clone();
        deliveries.spawn(async move {
            send(&http, &store, client, &notification).await;
        });
    }
    while let Some(result) = deliveries.join_next().await {
        if let Err(e) = result {
            warn!("dispatch: delivery task panicked: {e}");
        }
    }
}

async fn send(http: &reqwest::Client, store: &Arc<Store>, client: Client, notification: &Notification) {
    let result = http
        .post(&client.callback_url)
        .timeout(CLIENT_TIMEOUT)
        .json(notification)
        .send()
        .await;

    let (success, error) = match result {
        Ok(resp) if resp.status().is_success() => (true, None),
        Ok(resp) => (false, Some(format!("client returned {}", resp.status()))),
        Err(e) => (false, Some(e.to_string())),
    };

    if success {
        let mut updated = client.clone();
        updated.last_seen = Some(chrono::Utc::now());
        if let Err(e) = store.save(updated).await {
            warn!("dispatch: failed to update last_seen for {}: {e}", client.id);
        }
    }

    let entry = LogEntry::new(client.id.clone(), notification.event_type.clone(), notification.clone(), success, error);
    store.append_log(&entry).await;
}

/// Send a notification that wasn't produced by the formatter — used by the
/// manual-notification endpoint, which targets only clients subscribed to
/// `"manual"` or `"all"` and bypasses actor/mention routing entirely.
pub async fn dispatch_manual(store: &Arc<Store>, notification: Notification) -> HashMap<String, bool> {
    let clients = match store.list_clients().await {
        Ok(c) => c,
        Err(e) => {
            warn!("manual dispatch: failed to list clients: {e}");
            return HashMap::new();
        }
    };

    let targets: Vec<Client> = clients
        .into_iter()
        .filter(|c| c.active && c.subscribes_to("manual"))
        .collect();

    let notification = Arc::new(notification);
    let http = reqwest::Client::new();

    let mut deliveries: JoinSet<String> = JoinSet::new();
    for client in targets {
        let store = Arc::clone(store);
        let notification = Arc::clone(&notification);
        let http = http.clone();
        deliveries.spawn(async move {
            let id = client.id.clone();
            send(&http, &store, client, &notification).await;
            id
        });
    }

    let mut results = HashMap::new();
    while let Some(result) = deliveries.join_next().await {
        match result {
            Ok(id) => {
                results.insert(id, true);
            }
            Err(e) => warn!("manual dispatch: delivery task panicked: {e}"),
        }
    }
    results
}
