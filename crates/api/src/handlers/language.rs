//! Handler for switching the interface language.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::{Form, Json};
use serde::Deserialize;

use crate::auth::session;
use crate::middleware::session::Session;
use crate::response::ActionResponse;
use crate::state::AppState;

/// Languages the interface can be switched to.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en_US", "zh_CN"];

#[derive(Debug, Deserialize)]
pub struct LanguageForm {
    #[serde(default)]
    pub language: String,
}

/// Supported language for `requested`, else the site default.
pub fn resolve_language(requested: &str, default: &str) -> String {
    let requested = requested.trim();
    if SUPPORTED_LANGUAGES.contains(&requested) {
        requested.to_string()
    } else {
        default.to_string()
    }
}

/// POST /<prefix>/set_language
///
/// Rewrites the session cookie with the chosen language. The signed-in
/// account, if any, is kept.
pub async fn set_language(
    State(state): State<AppState>,
    Session(mut current): Session,
    Form(input): Form<LanguageForm>,
) -> impl IntoResponse {
    let language = resolve_language(&input.language, &state.site.default_language);
    tracing::debug!(%language, "Language changed");
    current.language = Some(language);
    let cookie = session::set_cookie(
        &current,
        &state.config.session_secret,
        state.config.cookie_secure,
    );
    ([(SET_COOKIE, cookie)], Json(ActionResponse::ok("Language updated")))
}
