//! The admin site registry.
//!
//! Populated before the server starts and shared read-only afterwards
//! (`Arc<AdminSite>` in the API state).

use indexmap::IndexMap;

use crate::error::{CoreError, CoreResult};
use crate::menu::{MenuItem, MenuModel, MenuNode, MenuRegistry};
use crate::model_admin::ModelAdmin;
use crate::schema::AdminModel;

pub const DEFAULT_PREFIX: &str = "/admin";
pub const DEFAULT_SITE_TITLE: &str = "Administration";
pub const DEFAULT_LANGUAGE: &str = "en_US";

/// Path segments under the prefix taken by site-wide routes.
pub const RESERVED_MODEL_NAMES: &[&str] = &["login", "logout", "upload", "set_language"];

#[derive(Debug, Clone)]
pub struct AdminSite {
    prefix: String,
    pub site_title: String,
    pub default_language: String,
    models: IndexMap<String, ModelAdmin>,
    menus: MenuRegistry,
}

impl Default for AdminSite {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminSite {
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            site_title: DEFAULT_SITE_TITLE.to_string(),
            default_language: DEFAULT_LANGUAGE.to_string(),
            models: IndexMap::new(),
            menus: MenuRegistry::new(),
        }
    }

    /// Mount point, normalized to a leading slash and no trailing slash.
    pub fn set_prefix(&mut self, prefix: &str) -> CoreResult<()> {
        let trimmed = prefix.trim().trim_matches('/');
        if trimmed.is_empty()
            || !trimmed
                .split('/')
                .all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        {
            return Err(CoreError::Validation(format!(
                "invalid admin prefix '{prefix}'"
            )));
        }
        self.prefix = format!("/{trimmed}");
        Ok(())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Register (or replace) the admin for a model.
    pub fn register(&mut self, mut admin: ModelAdmin) -> CoreResult<()> {
        if RESERVED_MODEL_NAMES.contains(&admin.name()) {
            return Err(CoreError::Validation(format!(
                "model name '{}' is reserved for a site route",
                admin.name()
            )));
        }
        admin.prepare()?;
        let name = admin.name().to_string();
        if self.models.insert(name.clone(), admin).is_some() {
            tracing::warn!(model = %name, "Model registered again; previous registration replaced");
        } else {
            tracing::debug!(model = %name, "Model registered");
        }
        Ok(())
    }

    /// Register a type implementing [`AdminModel`], configuring its admin in
    /// `configure`.
    pub fn register_model<M: AdminModel>(
        &mut self,
        configure: impl FnOnce(ModelAdmin) -> ModelAdmin,
    ) -> CoreResult<()> {
        self.register(configure(ModelAdmin::new(M::schema())))
    }

    pub fn register_menu(&mut self, item: MenuItem) {
        if self.menus.register(item).is_some() {
            tracing::debug!("Menu item replaced");
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelAdmin> {
        self.models.get(name)
    }

    /// Like [`AdminSite::get`], as a not-found error.
    pub fn model(&self, name: &str) -> CoreResult<&ModelAdmin> {
        self.get(name).ok_or_else(|| CoreError::model_not_found(name))
    }

    /// Registered admins in registration order.
    pub fn models(&self) -> impl Iterator<Item = &ModelAdmin> {
        self.models.values()
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn model_url(&self, name: &str) -> String {
        format!("{}/{name}", self.prefix)
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.prefix)
    }

    pub fn menu_tree(&self) -> Vec<MenuNode> {
        self.menus.tree(self.models.values().map(|admin| {
            (
                admin.menu_group.clone(),
                MenuModel {
                    name: admin.name().to_string(),
                    label: admin.verbose_name.clone(),
                    icon: admin.menu_icon.clone().unwrap_or_default(),
                    url: self.model_url(admin.name()),
                    order: admin.menu_order,
                },
            )
        }))
    }
}
