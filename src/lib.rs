//! Library surface shared between the binary and the integration test
//! suite under `tests/`.

pub mod ado_events;
pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod identity;
pub mod models;
pub mod router;
pub mod state;
pub mod store;
pub mod webhook;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/webhooks", webhook::routes())
        .merge(api::routes())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

pub async fn build_state(config: config::Config) -> std::io::Result<AppState> {
    let store = Arc::new(store::Store::init(&config.data_dir, config.log_max_bytes, config.log_backup_count)?);
    let identity = Arc::new(identity::Identity::new(&config));
    Ok(AppState { store, identity, config: Arc::new(config) })
}
