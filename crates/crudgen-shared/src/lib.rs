//! Shared configuration and observability for crudgen

pub mod config;
pub mod observability;

pub use config::*;
pub use observability::*;
