//! Parse-then-generate entry point behind the admin endpoint.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, instrument};

use crate::error::Result;
use crate::generator::{GenerationOptions, GenerationReport, GenerationRequest, Generator};
use crate::response::{ErrorResponse, GenerationResponse};
use crate::schema::SchemaProvider;
use crate::sql::SqlParser;

/// Request body accepted by the scaffold endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScaffoldRequest {
    pub sql: String,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub menu_path: Option<String>,
    #[serde(default)]
    pub force_override: bool,
    #[serde(default)]
    pub skip_permissions: bool,
}

pub struct ScaffoldService {
    parser: SqlParser,
    generator: Generator,
}

impl ScaffoldService {
    pub fn new(schema: Arc<dyn SchemaProvider>, generator: Generator) -> Self {
        Self {
            parser: SqlParser::new(schema),
            generator,
        }
    }

    pub fn parser(&self) -> &SqlParser {
        &self.parser
    }

    #[instrument(skip(self, request), fields(module = ?request.module))]
    pub async fn scaffold(&self, request: &ScaffoldRequest) -> Result<GenerationReport> {
        let parsed = self.parser.parse(&request.sql).await?;

        let generation = match request.module.as_deref().map(str::trim) {
            Some(module) if !module.is_empty() => GenerationRequest::new(module, parsed),
            _ => GenerationRequest::from_parse(parsed),
        }
        .with_primary_key(request.primary_key.clone())
        .with_options(GenerationOptions {
            force_override: request.force_override,
            menu_path: request.menu_path.clone(),
            skip_permissions: request.skip_permissions,
        });

        self.generator.generate(&generation).await
    }

    /// Like [`scaffold`](Self::scaffold), folded into the JSON envelope.
    pub async fn respond(&self, request: &ScaffoldRequest) -> serde_json::Value {
        let envelope = match self.scaffold(request).await {
            Ok(report) => serde_json::to_value(GenerationResponse::ok(report)),
            Err(err) => {
                error!(code = err.code.id(), track = %err.track, "scaffold failed: {err}");
                serde_json::to_value(ErrorResponse::from(&err))
            }
        };
        envelope.unwrap_or_default()
    }
}
