//! Schema introspection seam.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::SchemaColumnMeta;

/// Source of live column metadata for a table.
///
/// An empty result means the table does not exist.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn columns(&self, table: &str) -> Result<Vec<SchemaColumnMeta>>;
}

/// Fixed in-memory schema, for dry runs and fixtures.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    tables: HashMap<String, Vec<SchemaColumnMeta>>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, columns: Vec<SchemaColumnMeta>) -> Self {
        self.tables.insert(name.into(), columns);
        self
    }
}

#[async_trait]
impl SchemaProvider for StaticSchema {
    async fn columns(&self, table: &str) -> Result<Vec<SchemaColumnMeta>> {
        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }
}
