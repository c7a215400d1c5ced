//! Minimal directive template language used to render scaffold files.

pub mod engine;
pub mod filters;
pub mod lexer;
pub mod store;

pub use engine::render;
pub use store::TemplateStore;
