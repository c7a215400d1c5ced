//! `crudgen`: convenience façade over the crudgen workspace crates.

#![deny(missing_docs)]

/// Re-export everything from crudgen-core at the crate root, so users can `use crudgen::*;`.
#[doc(inline)]
pub use crudgen_core::*;

/// crudgen-core as a nested module, for `crudgen::core::...` paths.
pub use crudgen_core as core;

/// MySQL schema provider and permission store.
pub use crudgen_mysql as mysql;

/// Configuration and observability.
pub use crudgen_shared as shared;

pub mod app;
