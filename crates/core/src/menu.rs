//! Sidebar menu: registered groups plus the models placed in them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    /// Icon class, e.g. `bi bi-people`.
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub order: i32,
}

impl MenuItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: String::new(),
            parent: None,
            order: 0,
        }
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// A model link inside a menu group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuModel {
    pub name: String,
    pub label: String,
    pub icon: String,
    pub url: String,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuNode {
    pub name: String,
    pub icon: String,
    pub order: i32,
    pub children: Vec<MenuNode>,
    pub models: Vec<MenuModel>,
}

impl MenuNode {
    fn from_item(item: &MenuItem) -> Self {
        Self {
            name: item.name.clone(),
            icon: item.icon.clone(),
            order: item.order,
            children: Vec::new(),
            models: Vec::new(),
        }
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut MenuNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MenuRegistry {
    items: IndexMap<String, MenuItem>,
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a menu item, replacing any item with the same name.
    pub fn register(&mut self, item: MenuItem) -> Option<MenuItem> {
        self.items.insert(item.name.clone(), item)
    }

    pub fn get(&self, name: &str) -> Option<&MenuItem> {
        self.items.get(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Build the menu tree.
    ///
    /// Roots are sorted by `order`; children hang under their registered root
    /// parent (items whose parent is not a root are dropped). Each model goes
    /// under the node named by its group; unregistered groups become implicit
    /// roots appended at the end.
    pub fn tree(&self, models: impl IntoIterator<Item = (String, MenuModel)>) -> Vec<MenuNode> {
        let mut roots: Vec<MenuNode> = self
            .items
            .values()
            .filter(|item| item.parent.is_none())
            .map(MenuNode::from_item)
            .collect();
        roots.sort_by_key(|node| node.order);

        for item in self.items.values() {
            let Some(parent) = &item.parent else { continue };
            if let Some(root) = roots.iter_mut().find(|r| &r.name == parent) {
                root.children.push(MenuNode::from_item(item));
            }
        }
        for root in &mut roots {
            root.children.sort_by_key(|node| node.order);
        }

        let mut implicit: Vec<MenuNode> = Vec::new();
        for (group, model) in models {
            let target = roots
                .iter_mut()
                .find_map(|root| root.find_mut(&group))
                .or_else(|| implicit.iter_mut().find(|n| n.name == group));
            match target {
                Some(node) => node.models.push(model),
                None => {
                    let mut node = MenuNode::from_item(&MenuItem::new(group));
                    node.models.push(model);
                    implicit.push(node);
                }
            }
        }
        roots.extend(implicit);

        fn sort_models(node: &mut MenuNode) {
            node.models.sort_by_key(|m| m.order);
            node.children.iter_mut().for_each(sort_models);
        }
        roots.iter_mut().for_each(sort_models);
        roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str, order: i32) -> MenuModel {
        MenuModel {
            name: name.to_string(),
            label: name.to_string(),
            icon: String::new(),
            url: format!("/admin/{name}"),
            order,
        }
    }

    #[test]
    fn register_overwrites_by_name() {
        let mut menus = MenuRegistry::new();
        assert!(menus.register(MenuItem::new("Library").order(1)).is_none());
        let previous = menus.register(MenuItem::new("Library").order(5));
        assert_eq!(previous.map(|p| p.order), Some(1));
        assert_eq!(menus.len(), 1);
        assert_eq!(menus.get("Library").unwrap().order, 5);
    }

    #[test]
    fn tree_orders_roots_and_children() {
        let mut menus = MenuRegistry::new();
        menus.register(MenuItem::new("Sales").order(2));
        menus.register(MenuItem::new("Library").order(1));
        menus.register(MenuItem::new("Reviews").parent("Library").order(2));
        menus.register(MenuItem::new("Catalog").parent("Library").order(1));
        menus.register(MenuItem::new("Orphan").parent("Nowhere"));
        menus.register(MenuItem::new("Deep").parent("Catalog"));

        let tree = menus.tree(Vec::new());
        let roots: Vec<_> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(roots, ["Library", "Sales"]);
        let children: Vec<_> = tree[0].children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(children, ["Catalog", "Reviews"]);
    }

    #[test]
    fn models_land_in_groups_sorted() {
        let mut menus = MenuRegistry::new();
        menus.register(MenuItem::new("Library"));
        menus.register(MenuItem::new("Catalog").parent("Library"));

        let tree = menus.tree(vec![
            ("Library".to_string(), model("Book", 2)),
            ("Library".to_string(), model("Author", 1)),
            ("Catalog".to_string(), model("Category", 0)),
            ("System".to_string(), model("AdminUser", 0)),
        ]);
        assert_eq!(tree.len(), 2);
        let library: Vec<_> = tree[0].models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(library, ["Author", "Book"]);
        assert_eq!(tree[0].children[0].models[0].name, "Category");
        assert_eq!(tree[1].name, "System");
        assert_eq!(tree[1].models[0].name, "AdminUser");
    }
}
