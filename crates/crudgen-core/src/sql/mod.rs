//! SQL handling: expression rendering, statement parsing, alias hygiene.

pub mod expr;
pub mod parser;
pub mod reserved;

pub use expr::{infer_type, stringify};
pub use parser::{parse_statement, ParsedStatement, SqlParser};
pub use reserved::{is_reserved, sanitize_alias};
