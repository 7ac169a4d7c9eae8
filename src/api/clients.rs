//! The client registry: register/list/unregister a notification endpoint
//! and update its subscription list. Registration is idempotent on
//! `callback_url` — registering the same URL twice updates the existing
//! record in place rather than creating a duplicate.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::Client;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/", get(list))
        .route("/:id", delete(unregister))
        .route("/:id/subscriptions", put(update_subscriptions))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    name: String,
    callback_url: String,
    ado_user_id: String,
    display_name: String,
    #[serde(default = "default_subscriptions")]
    subscriptions: Vec<String>,
}

/// A client that doesn't specify a subscription list on registration gets
/// everything except manual broadcasts are implied separately by `"all"`.
fn default_subscriptions() -> Vec<String> {
    vec!["pr".to_string(), "workitem".to_string(), "pipeline".to_string(), "manual".to_string()]
}

#[derive(Debug, Serialize)]
struct ClientResponse {
    id: String,
    name: String,
    callback_url: String,
    ado_user_id: String,
    display_name: String,
    subscriptions: Vec<String>,
    active: bool,
    registered_at: chrono::DateTime<chrono::Utc>,
    last_seen: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Client> for ClientResponse {
    fn from(c: Client) -> Self {
        Self {
            id: c.id,
            name: c.name,
            callback_url: c.callback_url,
            ado_user_id: c.ado_user_id,
            display_name: c.display_name,
            subscriptions: c.subscriptions,
            active: c.active,
            registered_at: c.registered_at,
            last_seen: c.last_seen,
        }
    }
}

async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> Result<Json<ClientResponse>, Error> {
    let existing = state.store.get_by_callback(&req.callback_url).await?;

    let client = match existing {
        Some(mut c) => {
            c.name = req.name;
            c.ado_user_id = req.ado_user_id;
            c.display_name = req.display_name;
            c.subscriptions = req.subscriptions;
            c.active = true;
            c
        }
        None => Client::new(req.name, req.callback_url, req.ado_user_id, req.display_name, req.subscriptions),
    };

    let saved = state.store.save(client).await?;
    Ok(Json(saved.into()))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<ClientResponse>>, Error> {
    let clients = state.store.list_clients().await?;
    Ok(Json(clients.into_iter().map(ClientResponse::from).collect()))
}

async fn unregister(State(state): State<AppState>, Path(id): Path<String>) -> Result<(), Error> {
    if state.store.delete(&id).await? {
        Ok(())
    } else {
        Err(Error::ClientNotFound)
    }
}

async fn update_subscriptions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(subscriptions): Json<Vec<String>>,
) -> Result<Json<ClientResponse>, Error> {
    let mut client = state.store.get(&id).await?.ok_or(Error::ClientNotFound)?;
    client.subscriptions = subscriptions;
    let saved = state.store.save(client).await?;
    Ok(Json(saved.into()))
}
