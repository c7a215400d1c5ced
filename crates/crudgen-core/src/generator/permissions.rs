//! Menu and permission rows granted for a generated module.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::generator::context::ModuleName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Menu,
    Api,
    Element,
}

impl PermissionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionKind::Menu => "menu",
            PermissionKind::Api => "api",
            PermissionKind::Element => "element",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub name: String,
    pub path: String,
    pub icon: String,
    pub sort: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionEntry {
    pub name: String,
    pub code: String,
    pub kind: PermissionKind,
    pub method: Option<String>,
    pub path: Option<String>,
}

impl PermissionEntry {
    fn new(kind: PermissionKind, name: String, code: String) -> Self {
        Self {
            name,
            code,
            kind,
            method: None,
            path: None,
        }
    }

    fn route(mut self, method: &str, path: String) -> Self {
        self.method = Some(method.to_string());
        self.path = Some(path);
        self
    }
}

/// Everything inserted for one module, as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionPlan {
    pub module: String,
    pub parent_menu: MenuEntry,
    /// Child of `parent_menu`; owns every permission row.
    pub list_menu: MenuEntry,
    pub permissions: Vec<PermissionEntry>,
    /// Role granted every permission.
    pub role_id: u64,
}

impl PermissionPlan {
    pub fn for_module(module: &ModuleName, menu_path: &str, role_id: u64) -> Self {
        let k = &module.kebab;
        let title = &module.title;
        let base = format!("/admin/{k}");

        let menu = [
            ("list", "List", base.clone()),
            ("create", "Create", format!("{base}/create")),
            ("edit", "Edit", format!("{base}/:id/edit")),
            ("view", "View", format!("{base}/:id")),
        ]
        .into_iter()
        .map(|(action, label, path)| {
            PermissionEntry::new(
                PermissionKind::Menu,
                format!("{title} {label} page"),
                format!("{k}:page:{action}"),
            )
            .route("GET", path)
        });

        let api = [
            ("index", "GET", base.clone()),
            ("store", "POST", base.clone()),
            ("update", "PUT", format!("{base}/:id")),
            ("destroy", "DELETE", format!("{base}/:id")),
        ]
        .into_iter()
        .map(|(action, method, path)| {
            PermissionEntry::new(
                PermissionKind::Api,
                format!("{title} {action} API"),
                format!("{k}:api:{action}"),
            )
            .route(method, path)
        });

        let element = ["create", "edit", "delete", "view"].into_iter().map(|action| {
            PermissionEntry::new(
                PermissionKind::Element,
                format!("{title} {action} button"),
                format!("{k}:{action}"),
            )
        });

        Self {
            module: module.name.clone(),
            parent_menu: MenuEntry {
                name: title.clone(),
                path: menu_path.to_string(),
                icon: "fa fa-folder".to_string(),
                sort: 0,
            },
            list_menu: MenuEntry {
                name: format!("{title} list"),
                path: base,
                icon: "fa fa-list".to_string(),
                sort: 1,
            },
            permissions: menu.chain(api).chain(element).collect(),
            role_id,
        }
    }
}

/// Ids assigned to the inserted rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionReceipt {
    pub parent_menu_id: u64,
    pub list_menu_id: u64,
    pub permission_ids: Vec<u64>,
}

/// Persists a [`PermissionPlan`].
///
/// Implementations insert the whole plan in one transaction: either every row
/// is written or none is.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn apply(&self, plan: &PermissionPlan) -> Result<PermissionReceipt>;
}
