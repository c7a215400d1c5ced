//! Database connection management

use crudgen_core::Result;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, Pool, Row};
use tracing::{info, instrument};

use crate::config::ConnectionSettings;
use crate::database_error;

/// MySQL connection manager
pub struct MySqlConnectionManager {
    pool: Pool<MySql>,
}

impl MySqlConnectionManager {
    /// Open a pool with the given settings
    #[instrument(skip(settings), fields(max_connections = settings.max_connections))]
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self> {
        info!("Creating MySQL connection pool");

        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_duration())
            .idle_timeout(settings.idle_duration())
            .connect(&settings.url)
            .await
            .map_err(|e| database_error("Failed to create pool", e))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &Pool<MySql> {
        &self.pool
    }

    /// Test database connectivity
    pub async fn test_connection(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| database_error("Connection test failed", e))?;

        Ok(())
    }

    /// Get database version
    pub async fn version(&self) -> Result<String> {
        let row = sqlx::query("SELECT VERSION() AS version")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| database_error("Failed to get version", e))?;

        row.try_get("version")
            .map_err(|e| database_error("Failed to read version", e))
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
