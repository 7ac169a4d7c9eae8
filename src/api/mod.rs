mod clients;
mod notifications;

use axum::Router;

use crate::state::AppState;

/// The registry API and manual-notification endpoints, mounted at the
/// document root per the external interface contract — `/clients/...` and
/// `/notifications/...`, with no shared path prefix.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/clients", clients::routes())
        .nest("/notifications", notifications::routes())
}
