//! Server-rendered pages.
//!
//! Templates are compiled into the binary and loaded into one [`Tera`]
//! instance at startup. Autoescaping is on for every template; values that
//! are already trusted markup are marked `safe` in the template itself.

use axum::response::Html;
use tera::{Context, Tera};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("macros.html", include_str!("../templates/macros.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("model_list.html", include_str!("../templates/model_list.html")),
    ("model_form.html", include_str!("../templates/model_form.html")),
];

pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Parse the embedded templates; fails on a syntax error.
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> AppResult<Html<String>> {
        self.tera
            .render(name, context)
            .map(Html)
            .map_err(|e| AppError::InternalError(format!("Failed to render {name}: {e}")))
    }
}

/// Context shared by every page: site chrome, signed-in user, menu.
pub fn page_context(state: &AppState, username: Option<&str>, language: &str) -> Context {
    let mut context = Context::new();
    context.insert("site_title", &state.site.site_title);
    context.insert("prefix", state.site.prefix());
    context.insert("language", language);
    context.insert("username", &username);
    context.insert("menus", &state.site.menu_tree());
    context
}

/// JSON safe to embed inside a `<script>` element.
pub fn json_for_script(value: &serde_json::Value) -> String {
    value
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
