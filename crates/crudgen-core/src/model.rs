//! Data model shared by the parser, the enhancer and the generator.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, GeneratorError, Result};

/// Coarse semantic type of a selected expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Integer,
    Decimal,
    Datetime,
    Boolean,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Decimal => "decimal",
            TypeTag::Datetime => "datetime",
            TypeTag::Boolean => "boolean",
        }
    }

    pub fn is_number(self) -> bool {
        matches!(self, TypeTag::Integer | TypeTag::Decimal)
    }

    /// Map a MySQL column type (`int(11) unsigned`, `varchar(64)`, ...) to a tag.
    pub fn from_column_type(column_type: &str) -> Self {
        let lowered = column_type.trim().to_ascii_lowercase();
        if lowered.starts_with("tinyint(1)") || lowered == "bool" || lowered == "boolean" {
            return TypeTag::Boolean;
        }
        let base: String = lowered
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        match base.as_str() {
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => {
                TypeTag::Integer
            }
            "decimal" | "numeric" | "float" | "double" | "real" => TypeTag::Decimal,
            "date" | "datetime" | "timestamp" | "time" => TypeTag::Datetime,
            "bit" | "bool" | "boolean" => TypeTag::Boolean,
            _ => TypeTag::String,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a table takes part in the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Main,
    Left,
    Right,
    Inner,
    Cross,
}

impl JoinType {
    /// Normalize a join keyword as written in SQL (`LEFT OUTER`, `NATURAL`, ...).
    pub fn from_keyword(keyword: &str) -> Self {
        let normalized = keyword
            .split_whitespace()
            .map(|w| w.to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join(" ");
        match normalized.as_str() {
            "LEFT" | "LEFT OUTER" | "LEFT JOIN" | "LEFT OUTER JOIN" => JoinType::Left,
            "RIGHT" | "RIGHT OUTER" | "RIGHT JOIN" | "RIGHT OUTER JOIN" => JoinType::Right,
            "INNER" | "JOIN" | "INNER JOIN" | "NATURAL" | "NATURAL JOIN" => JoinType::Inner,
            _ => JoinType::Cross,
        }
    }
}

/// A table referenced by the parsed statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
    pub join_type: JoinType,
    pub on_condition: Option<String>,
    /// Set for `( SELECT ... )` sources; those have no schema of their own.
    #[serde(default)]
    pub derived: bool,
}

impl TableRef {
    /// The name columns are qualified with in the statement.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A selected column as written in the statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Source expression, e.g. `t.col` or `COUNT(*)`.
    pub original: String,
    /// Collision-safe display name.
    pub alias: String,
    pub inferred_type: TypeTag,
    /// Table qualifier of a plain column reference.
    pub qualifier: Option<String>,
    /// Unqualified column name when `original` is a plain column reference.
    pub column: Option<String>,
}

impl FieldDef {
    pub fn new(original: impl Into<String>, alias: impl Into<String>, inferred_type: TypeTag) -> Result<Self> {
        let original = original.into();
        let alias = alias.into();
        if original.trim().is_empty() {
            return Err(GeneratorError::new(
                ErrorCode::FieldEnhanceError,
                "field definition has no source expression",
            ));
        }
        if alias.trim().is_empty() {
            return Err(GeneratorError::new(
                ErrorCode::FieldEnhanceError,
                format!("field `{original}` has no name"),
            ));
        }
        Ok(Self {
            original,
            alias,
            inferred_type,
            qualifier: None,
            column: None,
        })
    }

    pub fn with_column(mut self, qualifier: Option<String>, column: impl Into<String>) -> Self {
        self.qualifier = qualifier;
        self.column = Some(column.into());
        self
    }

    /// Name used to match schema metadata.
    pub fn bare_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.alias)
    }
}

/// Live database column descriptor, as returned by `SHOW FULL COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumnMeta {
    pub field: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    pub key: String,
    pub default: Option<String>,
    pub extra: String,
    pub comment: String,
}

impl SchemaColumnMeta {
    pub fn new(field: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            column_type: column_type.into(),
            nullable: true,
            key: String::new(),
            default: None,
            extra: String::new(),
            comment: String::new(),
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary(mut self) -> Self {
        self.key = "PRI".to_string();
        self.nullable = false;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    pub fn is_primary(&self) -> bool {
        self.key.eq_ignore_ascii_case("PRI")
    }
}

/// HTML `<input type>` for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlType {
    Text,
    Email,
    Tel,
    Url,
    Password,
    Number,
    Date,
    Checkbox,
}

/// Form widget used on the create/edit pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    Text,
    Textarea,
    RichEditor,
    Select,
    Password,
    File,
    Image,
}

/// How a searchable field is matched in list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Exact,
    Like,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub message: String,
}

/// A field with every UI facing attribute derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedField {
    pub name: String,
    pub original: String,
    pub inferred_type: TypeTag,
    pub qualifier: Option<String>,
    pub column: Option<String>,
    /// Declared column type when schema metadata matched.
    pub db_type: Option<String>,
    pub primary: bool,
    pub required: bool,
    pub comment: String,
    pub html_type: HtmlType,
    pub form_type: FormType,
    pub validation: BTreeMap<String, ValidationRule>,
    pub editable: bool,
    pub listable: bool,
    pub searchable: bool,
    pub search_mode: Option<SearchMode>,
}

/// Everything the generator needs to know about one statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub tables: Vec<TableRef>,
    pub fields: Vec<EnhancedField>,
    pub has_rich_editor: bool,
    pub rich_editor_fields: Vec<EnhancedField>,
    pub table_fields_by_name: BTreeMap<String, Vec<SchemaColumnMeta>>,
    pub original_sql: String,
}

impl ParseResult {
    pub fn main_table(&self) -> Option<&TableRef> {
        self.tables.iter().find(|t| t.join_type == JoinType::Main)
    }

    /// Distinct physical tables, in statement order.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for table in self.tables.iter().filter(|t| !t.derived) {
            if !names.contains(&table.name.as_str()) {
                names.push(&table.name);
            }
        }
        names
    }

    /// First selected field backed by a primary key column.
    pub fn primary_key(&self) -> Option<&EnhancedField> {
        self.fields.iter().find(|f| f.primary)
    }
}
