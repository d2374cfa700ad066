use std::sync::Arc;

use oxadmin_core::site::AdminSite;

use crate::config::ServerConfig;
use crate::templates::Templates;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything besides the pool sits behind an `Arc` and is
/// read-only once the server is running.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: oxadmin_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Registered models and menus.
    pub site: Arc<AdminSite>,
    /// Compiled page templates.
    pub templates: Arc<Templates>,
}

impl AppState {
    /// Language for a request: the session's choice or the site default.
    pub fn language(&self, session: &crate::auth::session::SessionData) -> String {
        session
            .language
            .clone()
            .unwrap_or_else(|| self.site.default_language.clone())
    }
}
