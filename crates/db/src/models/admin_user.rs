//! Admin account entity and DTOs.

use oxadmin_core::schema::{AdminModel, Column, ColumnKind, ModelSchema};
use oxadmin_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Full row from the `admin_users` table.
///
/// Carries the password hash; use [`AdminUserResponse`] for anything that
/// leaves the process.
#[derive(Debug, Clone, FromRow)]
pub struct AdminUser {
    pub id: DbId,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AdminModel for AdminUser {
    fn schema() -> ModelSchema {
        ModelSchema::new("AdminUser", "admin_users")
            .column(Column::new("id", ColumnKind::Integer).primary_key().label("ID"))
            .column(Column::new("username", ColumnKind::Text))
            .column(Column::new("email", ColumnKind::Text).nullable())
            .column(Column::new("password_hash", ColumnKind::Text).label("Password"))
            .column(Column::new("is_active", ColumnKind::Boolean).label("Active"))
            .column(Column::new("is_superuser", ColumnKind::Boolean).label("Superuser"))
            .column(Column::new("last_login_at", ColumnKind::DateTime).nullable().label("Last login"))
            .column(Column::new("created_at", ColumnKind::DateTime))
            .column(Column::new("updated_at", ColumnKind::DateTime))
    }
}

/// Account data safe to render in pages.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUserResponse {
    pub id: DbId,
    pub username: String,
    pub email: Option<String>,
    pub is_superuser: bool,
    pub last_login_at: Option<Timestamp>,
}

impl From<&AdminUser> for AdminUserResponse {
    fn from(user: &AdminUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_superuser: user.is_superuser,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug)]
pub struct CreateAdminUser {
    pub username: String,
    pub email: Option<String>,
    /// Argon2id PHC string, never plaintext.
    pub password_hash: String,
    pub is_superuser: bool,
}
