//! Shared application state.

use std::sync::Arc;

use tally_db::Database;

use crate::auth::JwtManager;
use crate::config::WebConfig;

/// Handed to every handler via `State<AppState>`. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<WebConfig>,
}

impl AppState {
    pub fn new(db: Database, config: WebConfig) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.session_lifetime_secs);
        AppState {
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }
}
