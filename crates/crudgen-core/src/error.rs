//! Error types for crudgen

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Categorized error codes.
///
/// Every code has a symbolic name (`INVALID_SQL`) used by callers and logs, and
/// a namespaced identifier (`GEN-SQL-002`) grouping it by origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum ErrorCode {
    // SQL
    EmptySql,
    InvalidSql,
    UnsupportedSql,
    TableFieldsError,
    ExprStringifyError,
    FieldEnhanceError,

    // Templates
    TemplateNotFound,
    TemplateSyntaxError,
    TemplateRenderError,

    // Paths
    DirectoryExists,
    InvalidPath,

    // Files
    FileReadError,
    FileWriteError,

    // System
    DatabaseError,
    ConfigError,
    Unknown,

    // Generator phases
    GeneratorError,
    GeneratorParamsError,
    GeneratorFrontendError,
    GeneratorBackendError,
    GeneratorConfigError,
    GeneratorPermissionsError,
}

impl ErrorCode {
    /// Symbolic name, e.g. `INVALID_SQL`.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::EmptySql => "EMPTY_SQL",
            ErrorCode::InvalidSql => "INVALID_SQL",
            ErrorCode::UnsupportedSql => "UNSUPPORTED_SQL",
            ErrorCode::TableFieldsError => "TABLE_FIELDS_ERROR",
            ErrorCode::ExprStringifyError => "EXPR_STRINGIFY_ERROR",
            ErrorCode::FieldEnhanceError => "FIELD_ENHANCE_ERROR",
            ErrorCode::TemplateNotFound => "TEMPLATE_NOT_FOUND",
            ErrorCode::TemplateSyntaxError => "TEMPLATE_SYNTAX_ERROR",
            ErrorCode::TemplateRenderError => "TEMPLATE_RENDER_ERROR",
            ErrorCode::DirectoryExists => "DIRECTORY_EXISTS",
            ErrorCode::InvalidPath => "INVALID_PATH",
            ErrorCode::FileReadError => "FILE_READ_ERROR",
            ErrorCode::FileWriteError => "FILE_WRITE_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::Unknown => "UNKNOWN",
            ErrorCode::GeneratorError => "GENERATOR_ERROR",
            ErrorCode::GeneratorParamsError => "GENERATOR_PARAMS_ERROR",
            ErrorCode::GeneratorFrontendError => "GENERATOR_FRONTEND_ERROR",
            ErrorCode::GeneratorBackendError => "GENERATOR_BACKEND_ERROR",
            ErrorCode::GeneratorConfigError => "GENERATOR_CONFIG_ERROR",
            ErrorCode::GeneratorPermissionsError => "GENERATOR_PERMISSIONS_ERROR",
        }
    }

    /// Namespaced identifier, e.g. `GEN-SQL-002`.
    pub fn id(self) -> &'static str {
        match self {
            ErrorCode::EmptySql => "GEN-SQL-001",
            ErrorCode::InvalidSql => "GEN-SQL-002",
            ErrorCode::UnsupportedSql => "GEN-SQL-003",
            ErrorCode::TableFieldsError => "GEN-SQL-004",
            ErrorCode::ExprStringifyError => "GEN-SQL-005",
            ErrorCode::FieldEnhanceError => "GEN-SQL-006",
            ErrorCode::TemplateNotFound => "GEN-TPL-001",
            ErrorCode::TemplateSyntaxError => "GEN-TPL-002",
            ErrorCode::TemplateRenderError => "GEN-TPL-003",
            ErrorCode::DirectoryExists => "GEN-PATH-001",
            ErrorCode::InvalidPath => "GEN-PATH-002",
            ErrorCode::FileReadError => "GEN-FILE-001",
            ErrorCode::FileWriteError => "GEN-FILE-002",
            ErrorCode::DatabaseError => "GEN-SYS-001",
            ErrorCode::ConfigError => "GEN-SYS-002",
            ErrorCode::Unknown => "GEN-SYS-999",
            ErrorCode::GeneratorError => "GEN-GEN-001",
            ErrorCode::GeneratorParamsError => "GEN-GEN-002",
            ErrorCode::GeneratorFrontendError => "GEN-GEN-003",
            ErrorCode::GeneratorBackendError => "GEN-GEN-004",
            ErrorCode::GeneratorConfigError => "GEN-GEN-005",
            ErrorCode::GeneratorPermissionsError => "GEN-GEN-006",
        }
    }
}

impl From<ErrorCode> for &'static str {
    fn from(code: ErrorCode) -> Self {
        code.name()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

/// Where in a source text an error was detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorLocation {
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub position: usize,
    /// The offending source line
    pub context: String,
}

impl ErrorLocation {
    /// Locate a byte offset inside `source`.
    pub fn at_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = source[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or(source.len());
        Self {
            line,
            position: source[line_start..offset].chars().count() + 1,
            context: source[line_start..line_end].trim_end().to_string(),
        }
    }
}

/// The single error kind surfaced by crudgen.
#[derive(Error, Debug)]
#[error("[{}] {message}", .code.name())]
pub struct GeneratorError {
    pub code: ErrorCode,
    pub message: String,
    /// Correlation id shared by every wrapping of the same failure.
    pub track: String,
    pub location: Option<ErrorLocation>,
    #[source]
    cause: Option<Box<GeneratorError>>,
}

impl GeneratorError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            track: uuid::Uuid::new_v4().simple().to_string(),
            location: None,
            cause: None,
        }
    }

    pub fn with_location(mut self, location: ErrorLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Re-wrap with a phase specific code, keeping track id and location.
    pub fn wrap(self, code: ErrorCode, context: impl fmt::Display) -> Self {
        Self {
            code,
            message: format!("{context}: {}", self.message),
            track: self.track.clone(),
            location: self.location.clone(),
            cause: Some(Box::new(self)),
        }
    }

    /// The innermost error this one was wrapped around.
    pub fn root_cause(&self) -> &GeneratorError {
        let mut current = self;
        while let Some(cause) = current.cause.as_deref() {
            current = cause;
        }
        current
    }

    pub fn empty_sql() -> Self {
        Self::new(ErrorCode::EmptySql, "SQL statement is empty")
    }

    pub fn invalid_sql(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidSql, message)
    }

    pub fn unsupported_sql(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedSql, message)
    }

    pub fn template(code: ErrorCode, message: impl Into<String>, source: &str, offset: usize) -> Self {
        Self::new(code, message).with_location(ErrorLocation::at_offset(source, offset))
    }
}

pub type Result<T> = std::result::Result<T, GeneratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_symbolic_name() {
        let err = GeneratorError::invalid_sql("boom");
        assert_eq!(err.to_string(), "[INVALID_SQL] boom");
        assert_eq!(err.code.id(), "GEN-SQL-002");
    }

    #[test]
    fn wrap_keeps_track_and_chain() {
        let inner = GeneratorError::new(ErrorCode::FileWriteError, "disk full");
        let track = inner.track.clone();
        let outer = inner.wrap(ErrorCode::GeneratorFrontendError, "frontend generation failed");

        assert_eq!(outer.code, ErrorCode::GeneratorFrontendError);
        assert_eq!(outer.track, track);
        assert_eq!(outer.message, "frontend generation failed: disk full");
        assert_eq!(outer.root_cause().code, ErrorCode::FileWriteError);
        assert!(std::error::Error::source(&outer).is_some());
    }

    #[test]
    fn location_from_offset() {
        let src = "first\nsecond line\nthird";
        let loc = ErrorLocation::at_offset(src, 9);
        assert_eq!(loc.line, 2);
        assert_eq!(loc.position, 4);
        assert_eq!(loc.context, "second line");
    }

    #[test]
    fn code_serializes_as_name() {
        let json = serde_json::to_string(&ErrorCode::TableFieldsError).unwrap();
        assert_eq!(json, "\"TABLE_FIELDS_ERROR\"");
    }
}
