//! Handlers for the login page, login form and logout.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use oxadmin_core::password::verify_password;
use oxadmin_db::repositories::AdminUserRepo;
use serde::Deserialize;
use validator::Validate;

use crate::auth::session::{self, SessionData};
use crate::error::{AppError, AppResult};
use crate::middleware::session::MaybeAdmin;
use crate::state::AppState;
use crate::templates::page_context;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Form body of `POST /<prefix>/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

fn login_page_with(state: &AppState, session: &SessionData, error: Option<&str>) -> AppResult<Response> {
    let language = state.language(session);
    let mut context = page_context(state, None, &language);
    context.insert("error", &error);
    let page = state.templates.render("login.html", &context)?;
    let status = if error.is_some() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::OK
    };
    Ok((status, page).into_response())
}

/// GET /<prefix>/login
pub async fn login_page(State(state): State<AppState>, admin: MaybeAdmin) -> AppResult<Response> {
    if admin.user.is_some() {
        return Ok(Redirect::to(state.site.prefix()).into_response());
    }
    login_page_with(&state, &admin.session, None)
}

/// POST /<prefix>/login
///
/// Verifies the credentials of an active account and stores its id in the
/// session cookie, keeping any language already chosen.
pub async fn login(
    State(state): State<AppState>,
    admin: MaybeAdmin,
    Form(input): Form<LoginForm>,
) -> AppResult<Response> {
    if let Err(errors) = input.validate() {
        tracing::debug!(%errors, "Rejected login form");
        return login_page_with(&state, &admin.session, Some(INVALID_CREDENTIALS));
    }

    let user = AdminUserRepo::find_by_username(&state.pool, input.username.trim()).await?;
    let Some(user) = user.filter(|u| u.is_active) else {
        tracing::info!(username = %input.username, "Login failed: unknown or inactive account");
        return login_page_with(&state, &admin.session, Some(INVALID_CREDENTIALS));
    };

    let valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !valid {
        tracing::info!(user_id = user.id, "Login failed: wrong password");
        return login_page_with(&state, &admin.session, Some(INVALID_CREDENTIALS));
    }

    AdminUserRepo::record_login(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, username = %user.username, "Admin logged in");

    let session = SessionData {
        user_id: Some(user.id),
        language: admin.session.language,
    };
    let cookie = session::set_cookie(
        &session,
        &state.config.session_secret,
        state.config.cookie_secure,
    );
    Ok((
        [(SET_COOKIE, cookie)],
        Redirect::to(state.site.prefix()),
    )
        .into_response())
}

/// GET /<prefix>/logout
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        [(SET_COOKIE, session::clear_cookie(state.config.cookie_secure))],
        Redirect::to(&state.site.login_url()),
    )
        .into_response()
}
