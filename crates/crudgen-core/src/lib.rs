//! # Crudgen Core
//!
//! Scaffolds admin CRUD modules from a hand written `SELECT` statement.
//!
//! The pipeline:
//!
//! - **SQL**: parse one statement into tables and fields ([`sql`])
//! - **Schema**: reconcile fields with live column metadata ([`SchemaProvider`])
//! - **Enhancement**: derive widgets, validation and search flags ([`FieldEnhancer`])
//! - **Templates**: render scaffold files ([`template`])
//! - **Generation**: write views, controller, service, models and routes, then
//!   grant menu permissions ([`Generator`])

pub mod enhancer;
pub mod error;
pub mod generator;
pub mod model;
pub mod response;
pub mod schema;
pub mod service;
pub mod sql;
pub mod template;

#[cfg(test)]
mod testing;

pub use enhancer::FieldEnhancer;
pub use error::{ErrorCode, ErrorLocation, GeneratorError, Result};
pub use generator::{
    GenerationOptions, GenerationReport, GenerationRequest, Generator, PermissionPlan,
    PermissionReceipt, PermissionStore, ProjectLayout,
};
pub use model::{
    EnhancedField, FieldDef, FormType, HtmlType, JoinType, ParseResult, SchemaColumnMeta,
    SearchMode, TableRef, TypeTag,
};
pub use response::{ErrorResponse, GenerationResponse};
pub use schema::{SchemaProvider, StaticSchema};
pub use service::{ScaffoldRequest, ScaffoldService};
pub use sql::SqlParser;
pub use template::TemplateStore;
