//! Generation orchestrator.
//!
//! One run walks `validate -> frontend -> backend -> config -> permissions`.
//! Each phase is fail-fast and its error is wrapped with a phase code. Files
//! written by earlier phases are left in place when a later one fails.

pub mod context;
pub mod layout;
pub mod permissions;
pub mod routes;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use crudgen_shared::GeneratorMetrics;
use tracing::{debug, info, instrument, warn};

use crate::error::{ErrorCode, GeneratorError, Result};
use crate::model::ParseResult;
use crate::template::{render, TemplateStore};

pub use context::{ModuleName, DEFAULT_PRIMARY_KEY};
pub use layout::ProjectLayout;
pub use permissions::{PermissionPlan, PermissionReceipt, PermissionStore};
pub use routes::RoutePatch;

/// Role granted the permissions of every generated module.
pub const DEFAULT_SUPER_ADMIN_ROLE_ID: u64 = 1;

const FRONTEND_TEMPLATES: &[(&str, &str)] = &[
    ("frontend/list.edge.tpl", "list.edge"),
    ("frontend/create.edge.tpl", "create.edge"),
    ("frontend/edit.edge.tpl", "edit.edge"),
    ("frontend/view.edge.tpl", "view.edge"),
];
const CONTROLLER_TEMPLATE: &str = "backend/controller.js.tpl";
const SERVICE_TEMPLATE: &str = "backend/service.js.tpl";
const MODEL_TEMPLATE: &str = "backend/model.js.tpl";
const ROUTES_TEMPLATE: &str = "config/routes.js.tpl";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Overwrite an existing module. Also skips the permissions phase.
    pub force_override: bool,
    pub menu_path: Option<String>,
    pub skip_permissions: bool,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub module_name: String,
    pub sql_info: ParseResult,
    pub primary_key: Option<String>,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(module_name: impl Into<String>, sql_info: ParseResult) -> Self {
        Self {
            module_name: module_name.into(),
            sql_info,
            primary_key: None,
            options: GenerationOptions::default(),
        }
    }

    /// Name the module after the main table of the statement.
    pub fn from_parse(sql_info: ParseResult) -> Self {
        let module = sql_info
            .main_table()
            .filter(|t| !t.derived)
            .map(|t| t.name.rsplit('.').next().unwrap_or(&t.name).to_string())
            .unwrap_or_default();
        Self::new(module, sql_info)
    }

    pub fn with_primary_key(mut self, primary_key: Option<String>) -> Self {
        self.primary_key = primary_key.filter(|pk| !pk.trim().is_empty());
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Paths written by one run, relative to the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub module: String,
    pub files: Vec<String>,
}

/// Validated inputs shared by every phase.
struct Run {
    module: ModuleName,
    context: Value,
    menu_path: String,
    force_override: bool,
    permissions: bool,
}

pub struct Generator {
    layout: ProjectLayout,
    templates: TemplateStore,
    permissions: Option<Arc<dyn PermissionStore>>,
    super_admin_role_id: u64,
}

impl Generator {
    pub fn new(layout: ProjectLayout, templates: TemplateStore) -> Self {
        Self {
            layout,
            templates,
            permissions: None,
            super_admin_role_id: DEFAULT_SUPER_ADMIN_ROLE_ID,
        }
    }

    pub fn with_permission_store(mut self, store: Arc<dyn PermissionStore>) -> Self {
        self.permissions = Some(store);
        self
    }

    pub fn with_super_admin_role(mut self, role_id: u64) -> Self {
        self.super_admin_role_id = role_id;
        self
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    #[instrument(skip(self, request), fields(module = %request.module_name))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationReport> {
        let run = self.validate(request)?;
        self.check_target(&run)?;

        let mut report = GenerationReport {
            module: run.module.name.clone(),
            files: Vec::new(),
        };

        // each timer records on drop, failed phases included
        let timer = GeneratorMetrics::phase_timer("frontend");
        self.frontend(&run, &mut report)
            .await
            .map_err(|e| e.wrap(ErrorCode::GeneratorFrontendError, "frontend generation failed"))?;
        timer.finish();

        let timer = GeneratorMetrics::phase_timer("backend");
        self.backend(&run, request, &mut report)
            .await
            .map_err(|e| e.wrap(ErrorCode::GeneratorBackendError, "backend generation failed"))?;
        timer.finish();

        let timer = GeneratorMetrics::phase_timer("config");
        self.config(&run, &mut report)
            .await
            .map_err(|e| e.wrap(ErrorCode::GeneratorConfigError, "route configuration failed"))?;
        timer.finish();

        if run.permissions {
            let timer = GeneratorMetrics::phase_timer("permissions");
            self.grant_permissions(&run).await.map_err(|e| {
                e.wrap(ErrorCode::GeneratorPermissionsError, "permission insertion failed")
            })?;
            timer.finish();
        }

        info!(module = %report.module, files = report.files.len(), "module generated");
        Ok(report)
    }

    fn validate(&self, request: &GenerationRequest) -> Result<Run> {
        let raw = request.module_name.trim();
        if raw.is_empty() {
            return Err(GeneratorError::new(
                ErrorCode::GeneratorParamsError,
                "module name is required",
            ));
        }
        if raw.contains(['/', '\\']) || raw.contains("..") {
            return Err(GeneratorError::new(
                ErrorCode::InvalidPath,
                format!("module name `{raw}` must not contain path separators"),
            )
            .wrap(ErrorCode::GeneratorParamsError, "invalid module name"));
        }
        if request.sql_info.fields.is_empty() {
            return Err(GeneratorError::new(
                ErrorCode::GeneratorError,
                "parse result has no fields to generate from",
            ));
        }

        let module = ModuleName::new(raw);
        if module.name.is_empty() {
            return Err(GeneratorError::new(
                ErrorCode::GeneratorParamsError,
                format!("module name `{raw}` has no usable characters"),
            ));
        }

        let primary_key = request
            .primary_key
            .clone()
            .or_else(|| request.sql_info.primary_key().map(|f| f.name.clone()))
            .unwrap_or_else(|| DEFAULT_PRIMARY_KEY.to_string());
        let menu_path = request
            .options
            .menu_path
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| format!("/admin/{}", module.kebab));

        let context = context::module_context(&module, &request.sql_info, &primary_key, &menu_path);
        let force_override = request.options.force_override;

        Ok(Run {
            permissions: !force_override && !request.options.skip_permissions,
            module,
            context,
            menu_path,
            force_override,
        })
    }

    /// Refuse to touch an existing module unless overriding.
    fn check_target(&self, run: &Run) -> Result<()> {
        let dir = self.layout.view_dir(&run.module.name);
        if dir.exists() && !run.force_override {
            return Err(GeneratorError::new(
                ErrorCode::DirectoryExists,
                format!(
                    "module directory {} already exists, use force_override to regenerate",
                    self.layout.display(&dir)
                ),
            ));
        }
        if dir.exists() {
            warn!(dir = %dir.display(), "overwriting existing module");
        }
        Ok(())
    }

    fn render(&self, template: &str, context: &Value) -> Result<String> {
        let source = self.templates.load(template)?;
        render(&source, context).map_err(|e| {
            let code = e.code;
            e.wrap(code, format!("rendering {template}"))
        })
    }

    async fn write(&self, path: &Path, content: &str, report: &mut GenerationReport) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                GeneratorError::new(
                    ErrorCode::FileWriteError,
                    format!("failed to create {}: {e}", parent.display()),
                )
            })?;
        }
        tokio::fs::write(path, content).await.map_err(|e| {
            GeneratorError::new(
                ErrorCode::FileWriteError,
                format!("failed to write {}: {e}", path.display()),
            )
        })?;
        debug!(path = %path.display(), bytes = content.len(), "file written");
        report.files.push(self.layout.display(path));
        Ok(())
    }

    async fn frontend(&self, run: &Run, report: &mut GenerationReport) -> Result<()> {
        let dir = self.layout.view_dir(&run.module.name);
        for (template, file) in FRONTEND_TEMPLATES {
            let content = self.render(template, &run.context)?;
            self.write(&dir.join(file), &content, report).await?;
        }
        Ok(())
    }

    async fn backend(
        &self,
        run: &Run,
        request: &GenerationRequest,
        report: &mut GenerationReport,
    ) -> Result<()> {
        let pascal = &run.module.pascal;

        let controller = self.render(CONTROLLER_TEMPLATE, &run.context)?;
        self.write(&self.layout.controller_file(pascal), &controller, report)
            .await?;

        let service = self.render(SERVICE_TEMPLATE, &run.context)?;
        self.write(&self.layout.service_file(pascal), &service, report)
            .await?;

        for table in request.sql_info.table_names() {
            let columns = request
                .sql_info
                .table_fields_by_name
                .get(table)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let ctx = context::table_context(&run.context, table, columns);
            let path = self.model_path(&ctx);
            if path.exists() {
                info!(table, path = %path.display(), "model exists, skipped");
                continue;
            }
            let content = self.render(MODEL_TEMPLATE, &ctx)?;
            self.write(&path, &content, report).await?;
        }
        Ok(())
    }

    fn model_path(&self, table_context: &Value) -> PathBuf {
        let pascal = table_context["table"]["pascal"].as_str().unwrap_or_default();
        self.layout.model_file(pascal)
    }

    async fn config(&self, run: &Run, report: &mut GenerationReport) -> Result<()> {
        let patch = RoutePatch::parse(&self.render(ROUTES_TEMPLATE, &run.context)?);
        let path = self.layout.routes_path();

        let existing = match tokio::fs::read_to_string(&path).await {
            Ok(existing) => Some(existing),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(GeneratorError::new(
                    ErrorCode::FileReadError,
                    format!("failed to read {}: {e}", path.display()),
                ))
            }
        };

        let content = match existing {
            None => patch.fresh(),
            Some(existing) => match patch.apply(&existing) {
                Some(patched) => patched,
                None => {
                    debug!(path = %path.display(), "routes already registered");
                    return Ok(());
                }
            },
        };
        self.write(&path, &content, report).await
    }

    async fn grant_permissions(&self, run: &Run) -> Result<()> {
        let Some(store) = &self.permissions else {
            info!("no permission store configured, skipping permissions");
            return Ok(());
        };
        let plan = PermissionPlan::for_module(&run.module, &run.menu_path, self.super_admin_role_id);
        let receipt = store.apply(&plan).await?;
        info!(
            module = %plan.module,
            permissions = receipt.permission_ids.len(),
            menu_id = receipt.list_menu_id,
            "permissions granted"
        );
        Ok(())
    }
}
