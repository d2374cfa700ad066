//! Handler for the admin landing page.

use axum::extract::State;
use axum::response::Html;

use crate::error::AppResult;
use crate::middleware::session::PageAdmin;
use crate::state::AppState;
use crate::templates::page_context;

/// GET /<prefix>
///
/// Lists every registered model grouped by menu.
pub async fn index(State(state): State<AppState>, admin: PageAdmin) -> AppResult<Html<String>> {
    let language = state.language(&admin.session);
    let context = page_context(&state, Some(&admin.user.username), &language);
    state.templates.render("index.html", &context)
}
