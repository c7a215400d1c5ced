//! Column metadata read from a live MySQL server

use async_trait::async_trait;
use crudgen_core::{ErrorCode, GeneratorError, Result, SchemaColumnMeta, SchemaProvider};
use crudgen_shared::PerfTimer;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};
use tracing::{debug, instrument};

use crate::database_error;

/// SQLSTATE for `ER_NO_SUCH_TABLE` (1146)
const NO_SUCH_TABLE: &str = "42S02";

/// [`SchemaProvider`] backed by `SHOW FULL COLUMNS`
#[derive(Clone)]
pub struct MySqlSchemaProvider {
    pool: Pool<MySql>,
}

impl MySqlSchemaProvider {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaProvider for MySqlSchemaProvider {
    #[instrument(skip(self))]
    async fn columns(&self, table: &str) -> Result<Vec<SchemaColumnMeta>> {
        let _timer = PerfTimer::new("crudgen_schema_query_seconds").with_label("table", table);
        let sql = format!("SHOW FULL COLUMNS FROM {}", quote_table(table)?);

        let rows = match sqlx::query(&sql).fetch_all(&self.pool).await {
            Ok(rows) => rows,
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(NO_SUCH_TABLE) => {
                debug!("table {} does not exist", table);
                return Ok(Vec::new());
            }
            Err(e) => return Err(database_error(&format!("Failed to read columns of {table}"), e)),
        };

        let columns = rows
            .iter()
            .map(|row| RawColumn::from_row(row).map(RawColumn::into_meta))
            .collect::<Result<Vec<_>>>()?;
        debug!("loaded {} columns for {}", columns.len(), table);
        Ok(columns)
    }
}

/// Quote a possibly schema-qualified table name.
///
/// Only `[A-Za-z0-9_$]` are accepted in each part; surrounding backticks are
/// stripped first.
pub fn quote_table(table: &str) -> Result<String> {
    let parts: Vec<&str> = table.trim().split('.').map(|p| p.trim_matches('`')).collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        });
    if !valid {
        return Err(GeneratorError::new(
            ErrorCode::TableFieldsError,
            format!("invalid table name: {table}"),
        ));
    }
    Ok(parts.iter().map(|p| format!("`{p}`")).collect::<Vec<_>>().join("."))
}

/// One row of `SHOW FULL COLUMNS` before interpretation.
#[derive(Debug, Default)]
struct RawColumn {
    field: String,
    column_type: String,
    null: String,
    key: String,
    default: Option<String>,
    extra: String,
    comment: String,
}

impl RawColumn {
    fn from_row(row: &MySqlRow) -> Result<Self> {
        Ok(Self {
            field: text(row, "Field")?.unwrap_or_default(),
            column_type: text(row, "Type")?.unwrap_or_default(),
            null: text(row, "Null")?.unwrap_or_default(),
            key: text(row, "Key")?.unwrap_or_default(),
            default: text(row, "Default")?,
            extra: text(row, "Extra")?.unwrap_or_default(),
            comment: text(row, "Comment")?.unwrap_or_default(),
        })
    }

    fn into_meta(self) -> SchemaColumnMeta {
        SchemaColumnMeta {
            field: self.field,
            column_type: self.column_type,
            nullable: self.null.eq_ignore_ascii_case("YES"),
            key: self.key,
            default: self.default,
            extra: self.extra,
            comment: self.comment,
        }
    }
}

// SHOW columns come back as VARBINARY on some servers, so decode bytes.
fn text(row: &MySqlRow, column: &str) -> Result<Option<String>> {
    let bytes: Option<Vec<u8>> = row
        .try_get(column)
        .map_err(|e| database_error(&format!("Failed to read column {column}"), e))?;
    Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
}
