//! Transactional storage of menu and permission rows

use async_trait::async_trait;
use chrono::Utc;
use crudgen_core::generator::permissions::MenuEntry;
use crudgen_core::{PermissionPlan, PermissionReceipt, PermissionStore, Result};
use crudgen_shared::PerfTimer;
use sqlx::{MySql, Pool, Transaction};
use tracing::{info, instrument};

use crate::config::PermissionTables;
use crate::database_error;
use crate::schema::quote_table;

/// [`PermissionStore`] writing to the admin menu tables.
///
/// The parent menu, the list menu, every permission row and the role grants
/// are inserted in one transaction. An error before commit drops the
/// transaction, which rolls it back.
#[derive(Clone)]
pub struct MySqlPermissionStore {
    pool: Pool<MySql>,
    tables: PermissionTables,
}

impl MySqlPermissionStore {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self {
            pool,
            tables: PermissionTables::default(),
        }
    }

    pub fn with_tables(mut self, tables: PermissionTables) -> Self {
        self.tables = tables;
        self
    }

    async fn insert_menu(
        &self,
        tx: &mut Transaction<'_, MySql>,
        parent_id: u64,
        menu: &MenuEntry,
    ) -> Result<u64> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(&menu_insert_sql(&self.tables)?)
            .bind(parent_id)
            .bind(&menu.name)
            .bind(&menu.path)
            .bind(&menu.icon)
            .bind(menu.sort)
            .bind(now)
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_err(|e| database_error(&format!("Failed to insert menu {}", menu.name), e))?;
        Ok(result.last_insert_id())
    }
}

#[async_trait]
impl PermissionStore for MySqlPermissionStore {
    #[instrument(skip(self, plan), fields(module = %plan.module))]
    async fn apply(&self, plan: &PermissionPlan) -> Result<PermissionReceipt> {
        let _timer = PerfTimer::new("crudgen_permission_insert_seconds");
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("Failed to begin transaction", e))?;

        let parent_menu_id = self.insert_menu(&mut tx, 0, &plan.parent_menu).await?;
        let list_menu_id = self.insert_menu(&mut tx, parent_menu_id, &plan.list_menu).await?;

        let permission_sql = permission_insert_sql(&self.tables)?;
        let grant_sql = grant_insert_sql(&self.tables)?;
        let mut permission_ids = Vec::with_capacity(plan.permissions.len());

        for permission in &plan.permissions {
            let now = Utc::now().naive_utc();
            let inserted = sqlx::query(&permission_sql)
                .bind(list_menu_id)
                .bind(&permission.name)
                .bind(&permission.code)
                .bind(permission.kind.as_str())
                .bind(permission.method.as_deref())
                .bind(permission.path.as_deref())
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    database_error(&format!("Failed to insert permission {}", permission.code), e)
                })?;
            let permission_id = inserted.last_insert_id();

            sqlx::query(&grant_sql)
                .bind(plan.role_id)
                .bind(permission_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| database_error("Failed to grant permission", e))?;

            permission_ids.push(permission_id);
        }

        tx.commit()
            .await
            .map_err(|e| database_error("Failed to commit permissions", e))?;

        info!(
            "granted {} permissions to role {}",
            permission_ids.len(),
            plan.role_id
        );
        Ok(PermissionReceipt {
            parent_menu_id,
            list_menu_id,
            permission_ids,
        })
    }
}

fn menu_insert_sql(tables: &PermissionTables) -> Result<String> {
    Ok(format!(
        "INSERT INTO {} (parent_id, name, path, icon, sort, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        quote_table(&tables.menus)?
    ))
}

fn permission_insert_sql(tables: &PermissionTables) -> Result<String> {
    Ok(format!(
        "INSERT INTO {} (menu_id, name, code, type, method, path, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        quote_table(&tables.permissions)?
    ))
}

fn grant_insert_sql(tables: &PermissionTables) -> Result<String> {
    Ok(format!(
        "INSERT INTO {} (role_id, permission_id) VALUES (?, ?)",
        quote_table(&tables.role_permissions)?
    ))
}
