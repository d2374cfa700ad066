//! Startup wiring: the site registry and the first superuser.

use anyhow::Context as _;
use oxadmin_core::definition::SiteDefinition;
use oxadmin_core::fields::{DisplayType, FormField, Formatter, Processor, SearchField, TableField};
use oxadmin_core::filters::FilterField;
use oxadmin_core::model_admin::ModelAdmin;
use oxadmin_core::password::hash_password;
use oxadmin_core::site::AdminSite;
use oxadmin_db::models::admin_user::{AdminUser, CreateAdminUser};
use oxadmin_db::repositories::AdminUserRepo;
use oxadmin_db::DbPool;

use crate::config::ServerConfig;

const DEFAULT_BOOTSTRAP_PASSWORD: &str = "admin";

fn yes_no() -> Formatter {
    Formatter::choices([("true", "Yes"), ("false", "No")])
}

/// Admin for the `admin_users` table.
pub fn admin_user_admin(admin: ModelAdmin) -> ModelAdmin {
    let password = FormField::new("password_hash")
        .label("Password")
        .field_type(DisplayType::Password)
        .processor(Processor::HashPassword);

    admin
        .verbose_name("Admin users")
        .menu("System", "bi bi-people", 100)
        .table_field(TableField::new("id"))
        .table_field(TableField::new("username").link())
        .table_field(TableField::new("email"))
        .table_field(TableField::new("is_active").formatter(yes_no()))
        .table_field(TableField::new("is_superuser").formatter(yes_no()))
        .table_field(TableField::new("last_login_at"))
        .table_field(TableField::new("created_at"))
        .form_field(FormField::new("username").required())
        .form_field(FormField::new("email").field_type(DisplayType::Email))
        .form_field(
            password
                .clone()
                .help_text("Leave blank to keep the current password"),
        )
        .form_field(FormField::new("is_active").field_type(DisplayType::Switch))
        .form_field(FormField::new("is_superuser").field_type(DisplayType::Switch))
        .add_form_field(FormField::new("username").required())
        .add_form_field(FormField::new("email").field_type(DisplayType::Email))
        .add_form_field(password.required())
        .add_form_field(
            FormField::new("is_active")
                .field_type(DisplayType::Switch)
                .default_value("true"),
        )
        .add_form_field(FormField::new("is_superuser").field_type(DisplayType::Switch))
        .search_field(SearchField::new("username"))
        .search_field(SearchField::new("email"))
        .filter_field(FilterField::boolean("is_active", "Active"))
        .default_ordering(["username"])
}

/// Build the registry: built-in models, then the optional site definition
/// file named by `ADMIN_SITE_PATH`.
pub fn build_site(config: &ServerConfig) -> anyhow::Result<AdminSite> {
    let mut site = AdminSite::new();
    site.set_prefix(&config.admin_prefix)?;
    site.site_title = config.site_title.clone();
    site.default_language = config.default_language.clone();

    site.register_model::<AdminUser>(admin_user_admin)?;

    if let Some(path) = &config.site_definition_path {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read site definition {}", path.display()))?;
        SiteDefinition::from_json(&raw)?.apply(&mut site)?;
        tracing::info!(path = %path.display(), "Site definition loaded");
    }

    tracing::info!(
        prefix = %site.prefix(),
        models = site.model_count(),
        "Admin site built"
    );
    Ok(site)
}

/// Create the bootstrap superuser when no account with its username exists.
pub async fn ensure_superuser(pool: &DbPool, config: &ServerConfig) -> anyhow::Result<()> {
    if AdminUserRepo::exists_by_username(pool, &config.bootstrap_username).await? {
        return Ok(());
    }
    let password_hash = hash_password(&config.bootstrap_password)?;
    let user = AdminUserRepo::create(
        pool,
        &CreateAdminUser {
            username: config.bootstrap_username.clone(),
            email: None,
            password_hash,
            is_superuser: true,
        },
    )
    .await?;
    tracing::info!(user_id = user.id, username = %user.username, "Bootstrap superuser created");
    if config.bootstrap_password == DEFAULT_BOOTSTRAP_PASSWORD {
        tracing::warn!(
            username = %user.username,
            "Bootstrap superuser uses the default password; change it after logging in"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs: 30,
            admin_prefix: "/backoffice".to_string(),
            site_title: "Bookstore".to_string(),
            default_language: "en_US".to_string(),
            session_secret: "secret".to_string(),
            cookie_secure: false,
            upload_root: std::env::temp_dir(),
            upload_url_prefix: "/static/uploads".to_string(),
            max_upload_bytes: 1024,
            max_export_rows: 100,
            site_definition_path: None,
            bootstrap_username: "admin".to_string(),
            bootstrap_password: "admin".to_string(),
        }
    }

    #[test]
    fn builtin_site_registers_admin_users() {
        let site = build_site(&config()).unwrap();
        assert_eq!(site.prefix(), "/backoffice");
        assert_eq!(site.site_title, "Bookstore");
        let admin = site.model("AdminUser").unwrap();
        assert!(admin.table_fields.iter().all(|f| f.name != "password_hash"));
        let password = admin
            .add_form_fields
            .iter()
            .find(|f| f.name == "password_hash")
            .unwrap();
        assert!(password.required);
        assert!(matches!(password.processor, Some(Processor::HashPassword)));
    }

    #[test]
    fn site_definition_file_adds_models() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "site_title": "Library",
                "models": [{{
                    "schema": {{
                        "name": "Author", "table": "authors",
                        "columns": [
                            {{ "name": "id", "kind": "integer", "primary_key": true }},
                            {{ "name": "name", "kind": "text" }}
                        ]
                    }}
                }}]
            }}"#
        )
        .unwrap();

        let mut config = config();
        config.site_definition_path = Some(file.path().to_path_buf());
        let site = build_site(&config).unwrap();
        assert_eq!(site.site_title, "Library");
        assert_eq!(site.model_count(), 2);
        assert!(site.model("Author").is_ok());
    }

    #[test]
    fn missing_site_definition_fails() {
        let mut config = config();
        config.site_definition_path = Some("/nonexistent/site.json".into());
        assert!(build_site(&config).is_err());
    }
}
