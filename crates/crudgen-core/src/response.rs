//! JSON envelopes returned to callers.

use serde::Serialize;

use crate::error::GeneratorError;
use crate::generator::GenerationReport;

#[derive(Debug, Clone, Serialize)]
pub struct GenerationResponse {
    pub code: i32,
    pub msg: String,
    pub data: GenerationReport,
}

impl GenerationResponse {
    pub fn ok(report: GenerationReport) -> Self {
        Self {
            code: 0,
            msg: format!("module {} generated", report.module),
            data: report,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorData {
    pub line: Option<usize>,
    pub position: Option<usize>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Namespaced code, e.g. `GEN-SQL-002`.
    pub code: String,
    pub msg: String,
    pub track: String,
    pub data: ErrorData,
}

impl From<&GeneratorError> for ErrorResponse {
    fn from(err: &GeneratorError) -> Self {
        let data = err
            .location
            .as_ref()
            .map(|loc| ErrorData {
                line: Some(loc.line),
                position: Some(loc.position),
                context: Some(loc.context.clone()),
            })
            .unwrap_or_default();
        Self {
            code: err.code.id().to_string(),
            msg: err.to_string(),
            track: err.track.clone(),
            data,
        }
    }
}
