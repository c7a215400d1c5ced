//! Connection and table settings for the MySQL backends

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// MySQL connection URL
    pub url: String,

    /// Maximum pooled connections
    pub max_connections: u32,

    /// Seconds to wait for a free connection
    pub acquire_timeout_secs: u64,

    /// Seconds before an idle connection is closed
    pub idle_timeout_secs: u64,
}

impl ConnectionSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn acquire_timeout(mut self, secs: u64) -> Self {
        self.acquire_timeout_secs = secs;
        self
    }

    pub fn idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    pub(crate) fn acquire_duration(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub(crate) fn idle_duration(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Names of the tables receiving menu and permission rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionTables {
    pub menus: String,
    pub permissions: String,
    pub role_permissions: String,
}

impl Default for PermissionTables {
    fn default() -> Self {
        Self {
            menus: "menus".to_string(),
            permissions: "permissions".to_string(),
            role_permissions: "role_permissions".to_string(),
        }
    }
}

impl PermissionTables {
    pub fn with_menus(mut self, table: impl Into<String>) -> Self {
        self.menus = table.into();
        self
    }

    pub fn with_permissions(mut self, table: impl Into<String>) -> Self {
        self.permissions = table.into();
        self
    }

    pub fn with_role_permissions(mut self, table: impl Into<String>) -> Self {
        self.role_permissions = table.into();
        self
    }
}
