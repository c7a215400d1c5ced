//! Template lookup: an optional override directory, then the built-in set.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ErrorCode, GeneratorError, Result};

const LIST: &str = include_str!("../../templates/frontend/list.edge.tpl");
const CREATE: &str = include_str!("../../templates/frontend/create.edge.tpl");
const EDIT: &str = include_str!("../../templates/frontend/edit.edge.tpl");
const VIEW: &str = include_str!("../../templates/frontend/view.edge.tpl");
const CONTROLLER: &str = include_str!("../../templates/backend/controller.js.tpl");
const SERVICE: &str = include_str!("../../templates/backend/service.js.tpl");
const MODEL: &str = include_str!("../../templates/backend/model.js.tpl");
const ROUTES: &str = include_str!("../../templates/config/routes.js.tpl");

/// Built-in templates, keyed by their path relative to the template root.
pub const BUILTIN: &[(&str, &str)] = &[
    ("frontend/list.edge.tpl", LIST),
    ("frontend/create.edge.tpl", CREATE),
    ("frontend/edit.edge.tpl", EDIT),
    ("frontend/view.edge.tpl", VIEW),
    ("backend/controller.js.tpl", CONTROLLER),
    ("backend/service.js.tpl", SERVICE),
    ("backend/model.js.tpl", MODEL),
    ("config/routes.js.tpl", ROUTES),
];

#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    dir: Option<PathBuf>,
}

impl TemplateStore {
    /// Built-in templates only.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Prefer files under `dir`, falling back to the built-in set.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn load(&self, name: &str) -> Result<Cow<'static, str>> {
        if let Some(dir) = &self.dir {
            let path = dir.join(name);
            if path.is_file() {
                debug!(template = name, path = %path.display(), "template override");
                return std::fs::read_to_string(&path).map(Cow::Owned).map_err(|e| {
                    GeneratorError::new(
                        ErrorCode::FileReadError,
                        format!("failed to read template {}: {e}", path.display()),
                    )
                });
            }
        }

        BUILTIN
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, source)| Cow::Borrowed(*source))
            .ok_or_else(|| {
                GeneratorError::new(
                    ErrorCode::TemplateNotFound,
                    format!("template `{name}` not found"),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_available() {
        let store = TemplateStore::builtin();
        for (name, _) in BUILTIN {
            assert!(!store.load(name).unwrap().is_empty(), "{name}");
        }
    }

    #[test]
    fn directory_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("backend")).unwrap();
        std::fs::write(dir.path().join("backend/service.js.tpl"), "custom").unwrap();

        let store = TemplateStore::with_dir(dir.path());
        assert_eq!(store.load("backend/service.js.tpl").unwrap(), "custom");
        assert_eq!(store.load("backend/model.js.tpl").unwrap(), MODEL);
    }

    #[test]
    fn unknown_template() {
        let err = TemplateStore::builtin().load("frontend/nope.tpl").unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateNotFound);
    }
}
