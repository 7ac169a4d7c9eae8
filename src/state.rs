//! Shared application state handed to every axum route, mirroring the
//! teacher's `AppState` shape but carrying the store/identity/config this
//! service actually needs instead of an Azure token credential.

use std::sync::Arc;

use crate::config::Config;
use crate::identity::Identity;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub identity: Arc<Identity>,
    pub config: Arc<Config>,
}
