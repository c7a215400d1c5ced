//! MySQL backends for crudgen
//!
//! - [`MySqlSchemaProvider`] reads column metadata with `SHOW FULL COLUMNS`
//! - [`MySqlPermissionStore`] inserts menu and permission rows in one transaction

pub mod config;
pub mod connection;
pub mod permissions;
pub mod schema;

pub use config::*;
pub use connection::*;
pub use permissions::*;
pub use schema::*;

use crudgen_core::{ErrorCode, GeneratorError};

/// Map a driver error onto the crate error type.
pub(crate) fn database_error(context: &str, err: sqlx::Error) -> GeneratorError {
    GeneratorError::new(ErrorCode::DatabaseError, format!("{context}: {err}"))
}
