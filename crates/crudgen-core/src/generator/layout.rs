use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where generated files land inside the target project.
///
/// Every directory is relative to `root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub views_dir: PathBuf,
    pub controllers_dir: PathBuf,
    pub services_dir: PathBuf,
    pub models_dir: PathBuf,
    pub routes_file: PathBuf,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            views_dir: PathBuf::from("resources/views"),
            controllers_dir: PathBuf::from("app/Controllers/Http"),
            services_dir: PathBuf::from("app/Services"),
            models_dir: PathBuf::from("app/Models"),
            routes_file: PathBuf::from("start/routes.js"),
        }
    }
}

impl ProjectLayout {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn view_dir(&self, module: &str) -> PathBuf {
        self.root.join(&self.views_dir).join(module)
    }

    pub fn controller_file(&self, pascal: &str) -> PathBuf {
        self.root
            .join(&self.controllers_dir)
            .join(format!("{pascal}Controller.js"))
    }

    pub fn service_file(&self, pascal: &str) -> PathBuf {
        self.root
            .join(&self.services_dir)
            .join(format!("{pascal}Service.js"))
    }

    pub fn model_file(&self, pascal: &str) -> PathBuf {
        self.root.join(&self.models_dir).join(format!("{pascal}.js"))
    }

    pub fn routes_path(&self) -> PathBuf {
        self.root.join(&self.routes_file)
    }

    /// Path as reported back to callers.
    pub fn display(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted() {
        let layout = ProjectLayout::with_root("/srv/app");
        assert_eq!(
            layout.controller_file("Orders"),
            PathBuf::from("/srv/app/app/Controllers/Http/OrdersController.js")
        );
        assert_eq!(layout.view_dir("orders"), PathBuf::from("/srv/app/resources/views/orders"));
        assert_eq!(layout.display(&layout.routes_path()), "start/routes.js");
    }
}
