//! Site definition documents: a JSON description of menus and model admins
//! the server binary loads at startup.
//!
//! ```json
//! {
//!   "site_title": "Bookstore",
//!   "menus": [{ "name": "Library", "icon": "bi bi-book", "order": 1 }],
//!   "models": [{
//!     "schema": {
//!       "name": "Author", "table": "authors",
//!       "columns": [
//!         { "name": "id", "kind": "integer", "primary_key": true },
//!         { "name": "name", "kind": "text" }
//!       ]
//!     },
//!     "menu_group": "Library",
//!     "search_fields": [{ "name": "name" }]
//!   }]
//! }
//! ```
//!
//! Custom formatters and processors can only be attached in code.

use serde::Deserialize;

use crate::error::{CoreError, CoreResult};
use crate::menu::MenuItem;
use crate::model_admin::ModelAdmin;
use crate::site::AdminSite;

#[derive(Debug, Clone, Deserialize)]
pub struct SiteDefinition {
    #[serde(default)]
    pub site_title: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub default_language: Option<String>,
    #[serde(default)]
    pub menus: Vec<MenuItem>,
    #[serde(default)]
    pub models: Vec<ModelAdmin>,
}

impl SiteDefinition {
    pub fn from_json(raw: &str) -> CoreResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| CoreError::Validation(format!("invalid site definition: {e}")))
    }

    /// Apply to `site`; settings present in the document win over the
    /// site's current values.
    pub fn apply(self, site: &mut AdminSite) -> CoreResult<()> {
        if let Some(prefix) = &self.prefix {
            site.set_prefix(prefix)?;
        }
        if let Some(title) = self.site_title {
            site.site_title = title;
        }
        if let Some(language) = self.default_language {
            site.default_language = language;
        }
        for menu in self.menus {
            site.register_menu(menu);
        }
        for admin in self.models {
            site.register(admin)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const BOOKSTORE: &str = r#"{
        "site_title": "Bookstore",
        "menus": [{ "name": "Library", "icon": "bi bi-book", "order": 1 }],
        "models": [{
            "schema": {
                "name": "Book", "table": "books",
                "columns": [
                    { "name": "id", "kind": "integer", "primary_key": true },
                    { "name": "title", "kind": "text" },
                    { "name": "publisher_id", "kind": "integer", "nullable": true }
                ]
            },
            "verbose_name": "Books",
            "menu_group": "Library",
            "per_page": 20,
            "table_fields": [
                { "name": "id" },
                { "name": "title", "sortable": true,
                  "formatter": { "type": "truncate", "length": 40 } },
                { "name": "publisher_name",
                  "related": { "table": "publishers", "foreign_key": "publisher_id", "display_field": "name" } }
            ],
            "search_fields": [{ "name": "title" }],
            "filter_fields": [{ "name": "title", "filter_type": "input", "operator": "istartswith" }],
            "default_ordering": ["-id"]
        }]
    }"#;

    #[test]
    fn applies_menus_and_models() {
        let mut site = AdminSite::new();
        SiteDefinition::from_json(BOOKSTORE)
            .unwrap()
            .apply(&mut site)
            .unwrap();
        assert_eq!(site.site_title, "Bookstore");
        let admin = site.get("Book").unwrap();
        assert_eq!(admin.per_page, 20);
        assert!(admin.allow_export);
        assert!(admin.get_field("title").unwrap().formatter.is_some());
        assert_eq!(
            admin.get_field("publisher_name").unwrap().related.as_ref().unwrap().primary_key,
            "id"
        );
        let tree = site.menu_tree();
        assert_eq!(tree[0].name, "Library");
        assert_eq!(tree[0].models[0].label, "Books");
    }

    #[test]
    fn malformed_documents_are_validation_errors() {
        assert_matches!(
            SiteDefinition::from_json("{ \"models\": 3 }"),
            Err(CoreError::Validation(_))
        );
        let bad = SiteDefinition::from_json(
            r#"{"models":[{"schema":{"name":"X","table":"x","columns":[{"name":"id","kind":"integer"}]}}]}"#,
        )
        .unwrap();
        assert_matches!(bad.apply(&mut AdminSite::new()), Err(CoreError::Validation(_)));
    }
}
