use std::path::PathBuf;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables (a `.env` file is honoured).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Mount point of the admin routes (default: `/admin`).
    pub admin_prefix: String,
    /// Title shown in the page header.
    pub site_title: String,
    /// Language used until a session picks one.
    pub default_language: String,
    /// Key used to sign the session cookie.
    pub session_secret: String,
    /// Add `Secure` to the session cookie.
    pub cookie_secure: bool,
    /// Directory uploaded files are written below.
    pub upload_root: PathBuf,
    /// URL prefix uploaded files are served from.
    pub upload_url_prefix: String,
    /// Largest accepted upload request body.
    pub max_upload_bytes: usize,
    /// Row cap for a single export.
    pub max_export_rows: i64,
    /// Optional JSON site definition registering additional models.
    pub site_definition_path: Option<PathBuf>,
    /// Username of the superuser created on first start.
    pub bootstrap_username: String,
    /// Password of the superuser created on first start.
    pub bootstrap_password: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `3000`                     |
    /// | `CORS_ORIGINS`             | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `ADMIN_PREFIX`             | `/admin`                   |
    /// | `SITE_TITLE`               | `Administration`           |
    /// | `DEFAULT_LANGUAGE`         | `en_US`                    |
    /// | `SESSION_SECRET`           | random per process         |
    /// | `COOKIE_SECURE`            | `false`                    |
    /// | `UPLOAD_ROOT`              | `./uploads`                |
    /// | `UPLOAD_URL_PREFIX`        | `/static/uploads`          |
    /// | `MAX_UPLOAD_BYTES`         | `10485760` (10 MiB)        |
    /// | `MAX_EXPORT_ROWS`          | `10000`                    |
    /// | `ADMIN_SITE_PATH`          | unset                      |
    /// | `ADMIN_BOOTSTRAP_USERNAME` | `admin`                    |
    /// | `ADMIN_BOOTSTRAP_PASSWORD` | `admin`                    |
    pub fn from_env() -> Self {
        let host = env_or("HOST", "0.0.0.0");

        let port: u16 = env_or("PORT", "3000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let session_secret = std::env::var("SESSION_SECRET").unwrap_or_else(|_| {
            tracing::warn!("SESSION_SECRET not set; sessions will not survive a restart");
            format!(
                "{}{}",
                uuid::Uuid::new_v4().simple(),
                uuid::Uuid::new_v4().simple()
            )
        });

        let cookie_secure = matches!(
            env_or("COOKIE_SECURE", "false").to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        );

        let max_upload_bytes: usize = env_or("MAX_UPLOAD_BYTES", "10485760")
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let max_export_rows: i64 = env_or("MAX_EXPORT_ROWS", "10000")
            .parse()
            .expect("MAX_EXPORT_ROWS must be a valid i64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            admin_prefix: env_or("ADMIN_PREFIX", oxadmin_core::site::DEFAULT_PREFIX),
            site_title: env_or("SITE_TITLE", oxadmin_core::site::DEFAULT_SITE_TITLE),
            default_language: env_or("DEFAULT_LANGUAGE", oxadmin_core::site::DEFAULT_LANGUAGE),
            session_secret,
            cookie_secure,
            upload_root: PathBuf::from(env_or("UPLOAD_ROOT", "./uploads")),
            upload_url_prefix: env_or("UPLOAD_URL_PREFIX", "/static/uploads"),
            max_upload_bytes,
            max_export_rows,
            site_definition_path: std::env::var("ADMIN_SITE_PATH").ok().map(PathBuf::from),
            bootstrap_username: env_or("ADMIN_BOOTSTRAP_USERNAME", "admin"),
            bootstrap_password: env_or("ADMIN_BOOTSTRAP_PASSWORD", "admin"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
