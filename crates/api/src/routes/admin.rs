//! Route definitions for the admin site.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{auth, dashboard, language, model, upload};
use crate::state::AppState;

/// Routes mounted under `prefix`.
///
/// ```text
/// GET  /                          dashboard
/// GET  /login                     login page
/// POST /login                     login
/// GET  /logout                    logout
/// POST /upload                    image upload
/// POST /set_language              language switch
///
/// GET  /{model}                   list page
/// GET  /{model}/data              rows as JSON
/// GET  /{model}/search            per-field search
/// GET  /{model}/export            CSV / Excel download
/// GET  /{model}/inline_data       inline child rows
/// POST /{model}/add               create
/// POST /{model}/batch_delete      delete selected
/// POST /{model}/{id}/edit         update
/// POST /{model}/{id}/delete       delete
/// ```
pub fn router(prefix: &str, max_upload_bytes: usize) -> Router<AppState> {
    let upload_route = Router::new()
        .route(&format!("{prefix}/upload"), post(upload::upload))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes));

    Router::new()
        .route(prefix, get(dashboard::index))
        .route(
            &format!("{prefix}/login"),
            get(auth::login_page).post(auth::login),
        )
        .route(&format!("{prefix}/logout"), get(auth::logout))
        .route(&format!("{prefix}/set_language"), post(language::set_language))
        .route(&format!("{prefix}/{{model}}"), get(model::list_page))
        .route(&format!("{prefix}/{{model}}/data"), get(model::data))
        .route(&format!("{prefix}/{{model}}/search"), get(model::search))
        .route(&format!("{prefix}/{{model}}/export"), get(model::export))
        .route(&format!("{prefix}/{{model}}/inline_data"), get(model::inline_data))
        .route(&format!("{prefix}/{{model}}/add"), post(model::add))
        .route(
            &format!("{prefix}/{{model}}/batch_delete"),
            post(model::batch_delete),
        )
        .route(&format!("{prefix}/{{model}}/{{id}}/edit"), post(model::edit))
        .route(&format!("{prefix}/{{model}}/{{id}}/delete"), post(model::delete))
        .merge(upload_route)
}
