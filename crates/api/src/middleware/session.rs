//! Session-cookie extractors for Axum handlers.
//!
//! - [`CurrentAdmin`] for JSON endpoints: rejects with a 401 error body.
//! - [`PageAdmin`] for pages: rejects with a 303 redirect to the login page.
//! - [`MaybeAdmin`] never rejects; used by the login page itself.
//! - [`Session`] only verifies the cookie, without touching the database.
//!
//! The first three verify the signed cookie and load the account, which must
//! still exist and be active.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use oxadmin_core::error::CoreError;
use oxadmin_db::models::admin_user::AdminUser;
use oxadmin_db::repositories::AdminUserRepo;

use crate::auth::session::{self, SessionData};
use crate::error::AppError;
use crate::state::AppState;

/// Signed-in account behind a JSON endpoint.
///
/// ```ignore
/// async fn my_handler(admin: CurrentAdmin) -> AppResult<Json<()>> {
///     tracing::info!(user_id = admin.user.id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub user: AdminUser,
    pub session: SessionData,
}

/// Signed-in account behind a page.
#[derive(Debug, Clone)]
pub struct PageAdmin {
    pub user: AdminUser,
    pub session: SessionData,
}

/// Session and account when present.
#[derive(Debug, Clone)]
pub struct MaybeAdmin {
    pub user: Option<AdminUser>,
    pub session: SessionData,
}

/// The verified session, or an empty one.
pub fn session_of(parts: &Parts, state: &AppState) -> SessionData {
    session::from_headers(&parts.headers, &state.config.session_secret).unwrap_or_default()
}

async fn load_admin(state: &AppState, session: &SessionData) -> Result<Option<AdminUser>, sqlx::Error> {
    let Some(user_id) = session.user_id else {
        return Ok(None);
    };
    let user = AdminUserRepo::find_by_id(&state.pool, user_id).await?;
    Ok(user.filter(|u| u.is_active))
}

impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session_of(parts, state);
        let user = load_admin(state, &session).await?.ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Login required".into()))
        })?;
        Ok(CurrentAdmin { user, session })
    }
}

impl FromRequestParts<AppState> for PageAdmin {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session_of(parts, state);
        match load_admin(state, &session).await {
            Ok(Some(user)) => Ok(PageAdmin { user, session }),
            Ok(None) => Err(Redirect::to(&state.site.login_url()).into_response()),
            Err(err) => Err(AppError::from(err).into_response()),
        }
    }
}

impl FromRequestParts<AppState> for MaybeAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session_of(parts, state);
        let user = load_admin(state, &session).await?;
        Ok(MaybeAdmin { user, session })
    }
}

/// The verified session of the request; never rejects.
#[derive(Debug, Clone)]
pub struct Session(pub SessionData);

impl FromRequestParts<AppState> for Session {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Session(session_of(parts, state)))
    }
}
