//! Wiring from [`CrudgenConfig`] to a ready [`ScaffoldService`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use crudgen_core::{
    Generator, PermissionStore, ProjectLayout, SchemaColumnMeta, SchemaProvider, ScaffoldService,
    StaticSchema, TemplateStore,
};
use crudgen_mysql::{
    ConnectionSettings, MySqlConnectionManager, MySqlPermissionStore, MySqlSchemaProvider,
    PermissionTables,
};
use crudgen_shared::{CrudgenConfig, PermissionsConfig, ProjectConfig};
use tracing::info;

/// Output layout described by the `project` section.
pub fn project_layout(config: &ProjectConfig) -> ProjectLayout {
    ProjectLayout {
        root: config.root.clone().into(),
        views_dir: config.views_dir.clone().into(),
        controllers_dir: config.controllers_dir.clone().into(),
        services_dir: config.services_dir.clone().into(),
        models_dir: config.models_dir.clone().into(),
        routes_file: config.routes_file.clone().into(),
    }
}

/// Built-in templates, overridden by `project.template_dir` when set.
pub fn template_store(config: &ProjectConfig) -> TemplateStore {
    match &config.template_dir {
        Some(dir) => TemplateStore::with_dir(dir),
        None => TemplateStore::builtin(),
    }
}

/// Menu and permission table names described by the `permissions` section.
pub fn permission_tables(config: &PermissionsConfig) -> PermissionTables {
    PermissionTables::default()
        .with_menus(&config.menus_table)
        .with_permissions(&config.permissions_table)
        .with_role_permissions(&config.role_permissions_table)
}

/// Read a JSON object of `table -> [column]` into a [`StaticSchema`].
///
/// Columns use the `SHOW FULL COLUMNS` shape:
/// `{"field", "type", "nullable", "key", "default", "extra", "comment"}`.
pub fn load_static_schema(path: &Path) -> anyhow::Result<StaticSchema> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema file {}", path.display()))?;
    let tables: HashMap<String, Vec<SchemaColumnMeta>> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing schema file {}", path.display()))?;

    Ok(tables
        .into_iter()
        .fold(StaticSchema::new(), |schema, (table, columns)| schema.with_table(table, columns)))
}

/// Schema source and optional permission store for one process.
pub struct Backends {
    /// Column metadata source
    pub schema: Arc<dyn SchemaProvider>,
    /// Menu and permission storage, absent when disabled or offline
    pub permissions: Option<Arc<dyn PermissionStore>>,
    /// Live pool, absent when running from a schema file
    pub connection: Option<MySqlConnectionManager>,
}

impl Backends {
    /// Offline backends over a fixed schema; permissions are never written.
    pub fn offline(schema: StaticSchema) -> Self {
        Self {
            schema: Arc::new(schema),
            permissions: None,
            connection: None,
        }
    }

    /// Connect to the configured MySQL server.
    pub async fn connect(config: &CrudgenConfig) -> anyhow::Result<Self> {
        let settings = ConnectionSettings::new(&config.database.url)
            .max_connections(config.database.max_connections)
            .acquire_timeout(config.database.connection_timeout)
            .idle_timeout(config.database.idle_timeout);
        let manager = MySqlConnectionManager::connect(&settings)
            .await
            .context("connecting to MySQL")?;
        info!("connected to MySQL {}", manager.version().await?);

        let pool = manager.pool().clone();
        let permissions: Option<Arc<dyn PermissionStore>> = if config.permissions.enabled {
            Some(Arc::new(
                MySqlPermissionStore::new(pool.clone())
                    .with_tables(permission_tables(&config.permissions)),
            ))
        } else {
            None
        };

        Ok(Self {
            schema: Arc::new(MySqlSchemaProvider::new(pool)),
            permissions,
            connection: Some(manager),
        })
    }
}

/// Build the service for `config` on top of `backends`.
pub fn scaffold_service(config: &CrudgenConfig, backends: &Backends) -> ScaffoldService {
    let mut generator = Generator::new(
        project_layout(&config.project),
        template_store(&config.project),
    )
    .with_super_admin_role(config.permissions.super_admin_role_id);

    if let Some(store) = &backends.permissions {
        generator = generator.with_permission_store(store.clone());
    }

    ScaffoldService::new(backends.schema.clone(), generator)
}
