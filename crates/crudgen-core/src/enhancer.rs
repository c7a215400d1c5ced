//! Derives UI facing attributes for parsed fields.
//!
//! Rule tables are ordered: the first matching entry wins, and name patterns
//! are always consulted before type based fallbacks.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ErrorCode, GeneratorError, Result};
use crate::model::{
    EnhancedField, FieldDef, FormType, HtmlType, SchemaColumnMeta, SearchMode, TypeTag,
    ValidationRule,
};

/// Generic validation message; clients localize by rule name.
pub const VALIDATION_MESSAGE: &str = "Please enter a valid value";

const REQUIRED_NAMES: &[&str] = &["name", "title", "code"];
const SEARCH_BLACKLIST: &[&str] = &["id", "created_at", "updated_at", "deleted_at", "password"];
const SYSTEM_FIELDS: &[&str] = &["id", "created_at", "updated_at", "deleted_at"];
const UNLISTED_FIELDS: &[&str] = &["password", "deleted_at"];

const LABELS: &[(&str, &str)] = &[
    ("id", "Primary key ID"),
    ("name", "Name"),
    ("title", "Title"),
    ("code", "Code"),
    ("username", "Username"),
    ("nickname", "Nickname"),
    ("email", "Email"),
    ("phone", "Phone"),
    ("mobile", "Mobile"),
    ("password", "Password"),
    ("avatar", "Avatar"),
    ("status", "Status"),
    ("type", "Type"),
    ("sort", "Sort order"),
    ("remark", "Remark"),
    ("description", "Description"),
    ("content", "Content"),
    ("created_at", "Created at"),
    ("updated_at", "Updated at"),
    ("deleted_at", "Deleted at"),
];

type NameRules<T> = Lazy<Vec<(Regex, T)>>;

fn rules<T>(entries: &[(&str, T)]) -> Vec<(Regex, T)>
where
    T: Copy,
{
    entries
        .iter()
        .map(|(pattern, result)| (Regex::new(pattern).unwrap(), *result))
        .collect()
}

static HTML_NAME_RULES: NameRules<HtmlType> = Lazy::new(|| {
    rules(&[
        ("email", HtmlType::Email),
        ("phone|mobile|tel", HtmlType::Tel),
        ("password", HtmlType::Password),
        ("(^|_)(url|link|website)$", HtmlType::Url),
    ])
});

static FORM_NAME_RULES: NameRules<FormType> = Lazy::new(|| {
    rules(&[
        ("password", FormType::Password),
        ("(^|_)(image|avatar|photo|picture|logo)s?$", FormType::Image),
        ("(^|_)(file|attachment)s?$", FormType::File),
        ("status|type|_id$", FormType::Select),
        ("content|description", FormType::RichEditor),
    ])
});

static VALIDATION_NAME_RULES: NameRules<&'static str> = Lazy::new(|| {
    rules(&[
        ("password", "password"),
        ("email", "emailAddress"),
        ("phone|mobile", "phone"),
        ("(^|_)(url|link|website)$", "url"),
        ("(^|_)ip($|_)", "ip"),
    ])
});

static RICH_TEXT_COLUMN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(long)?text\b").unwrap());
static VARCHAR_COLUMN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^varchar\((\d+)\)").unwrap());

fn first_match<T: Copy>(rules: &[(Regex, T)], name: &str) -> Option<T> {
    rules
        .iter()
        .find(|(pattern, _)| pattern.is_match(name))
        .map(|(_, result)| *result)
}

fn contains_any(name: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| name.contains(needle))
}

/// Turns a [`FieldDef`] plus optional schema metadata into an [`EnhancedField`].
///
/// Pure: the same inputs always produce the same output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldEnhancer;

impl FieldEnhancer {
    pub fn new() -> Self {
        Self
    }

    pub fn enhance(&self, field: &FieldDef, meta: Option<&SchemaColumnMeta>) -> Result<EnhancedField> {
        if field.original.trim().is_empty() || field.alias.trim().is_empty() {
            return Err(GeneratorError::new(
                ErrorCode::FieldEnhanceError,
                format!("field `{}` lacks a source expression or name", field.alias),
            ));
        }

        let name = field.alias.to_ascii_lowercase();
        let ty = field.inferred_type;
        let primary = meta.map(SchemaColumnMeta::is_primary).unwrap_or(false);

        let required = is_required(&name, meta);
        let html_type = html_type(&name, ty);
        let form_type = form_type(&name, meta);
        let searchable = is_searchable(&name, form_type);

        Ok(EnhancedField {
            name: field.alias.clone(),
            original: field.original.clone(),
            inferred_type: ty,
            qualifier: field.qualifier.clone(),
            column: field.column.clone(),
            db_type: meta.map(|m| m.column_type.clone()),
            primary,
            required,
            comment: comment(&name, &field.alias, meta),
            html_type,
            form_type,
            validation: validation(&name, required, html_type),
            editable: !primary && !contains_any(&name, SYSTEM_FIELDS),
            listable: !contains_any(&name, UNLISTED_FIELDS),
            searchable,
            search_mode: searchable.then(|| search_mode(ty, form_type)),
        })
    }
}

fn is_required(name: &str, meta: Option<&SchemaColumnMeta>) -> bool {
    if let Some(meta) = meta {
        if meta.is_primary() || !meta.nullable {
            return true;
        }
    }
    name.ends_with("_id") || REQUIRED_NAMES.contains(&name)
}

fn comment(name: &str, display: &str, meta: Option<&SchemaColumnMeta>) -> String {
    if let Some(comment) = meta.map(|m| m.comment.trim()).filter(|c| !c.is_empty()) {
        return comment.to_string();
    }
    LABELS
        .iter()
        .find(|(key, _)| name == *key)
        .or_else(|| {
            LABELS
                .iter()
                .find(|(key, _)| name.ends_with(&format!("_{key}")))
        })
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| display.to_string())
}

fn html_type(name: &str, ty: TypeTag) -> HtmlType {
    first_match(&HTML_NAME_RULES, name).unwrap_or(match ty {
        TypeTag::Integer | TypeTag::Decimal => HtmlType::Number,
        TypeTag::Datetime => HtmlType::Date,
        TypeTag::Boolean => HtmlType::Checkbox,
        TypeTag::String => HtmlType::Text,
    })
}

fn form_type(name: &str, meta: Option<&SchemaColumnMeta>) -> FormType {
    if let Some(form) = first_match(&FORM_NAME_RULES, name) {
        return form;
    }
    let Some(column_type) = meta.map(|m| m.column_type.to_ascii_lowercase()) else {
        return FormType::Text;
    };
    if RICH_TEXT_COLUMN.is_match(&column_type) {
        return FormType::RichEditor;
    }
    if let Some(caps) = VARCHAR_COLUMN.captures(&column_type) {
        let length: u32 = caps[1].parse().unwrap_or(0);
        return if length > 255 {
            FormType::Textarea
        } else {
            FormType::Text
        };
    }
    FormType::Text
}

fn is_searchable(name: &str, form: FormType) -> bool {
    if contains_any(name, SEARCH_BLACKLIST) {
        return false;
    }
    !matches!(
        form,
        FormType::RichEditor | FormType::Password | FormType::File | FormType::Image
    )
}

fn search_mode(ty: TypeTag, form: FormType) -> SearchMode {
    if form == FormType::Select || ty != TypeTag::String {
        SearchMode::Exact
    } else {
        SearchMode::Like
    }
}

fn validation(name: &str, required: bool, html: HtmlType) -> BTreeMap<String, ValidationRule> {
    let mut rules: Vec<&str> = Vec::new();
    if required {
        rules.push("notEmpty");
    }
    match html {
        HtmlType::Email => rules.push("emailAddress"),
        HtmlType::Tel => rules.push("phone"),
        HtmlType::Url => rules.push("url"),
        HtmlType::Number => rules.push("numeric"),
        _ => {}
    }
    rules.extend(
        VALIDATION_NAME_RULES
            .iter()
            .filter(|(pattern, _)| pattern.is_match(name))
            .map(|(_, rule)| *rule),
    );

    rules
        .into_iter()
        .map(|rule| {
            (
                rule.to_string(),
                ValidationRule {
                    message: VALIDATION_MESSAGE.to_string(),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: TypeTag) -> FieldDef {
        FieldDef::new(name, name, ty)
            .unwrap()
            .with_column(None, name)
    }

    fn enhance(name: &str, ty: TypeTag, meta: Option<&SchemaColumnMeta>) -> EnhancedField {
        FieldEnhancer::new().enhance(&field(name, ty), meta).unwrap()
    }

    #[test]
    fn users_example() {
        let id_meta = SchemaColumnMeta::new("id", "int(11)").primary();
        let name_meta = SchemaColumnMeta::new("name", "varchar(64)").not_null();
        let email_meta = SchemaColumnMeta::new("email", "varchar(128)");

        let id = enhance("id", TypeTag::Integer, Some(&id_meta));
        assert!(id.required);
        assert!(!id.editable);
        assert!(!id.searchable);
        assert!(id.primary);

        let name = enhance("name", TypeTag::String, Some(&name_meta));
        assert!(name.required);
        assert!(name.searchable);
        assert_eq!(name.search_mode, Some(SearchMode::Like));

        let email = enhance("email", TypeTag::String, Some(&email_meta));
        assert!(!email.required);
        assert_eq!(email.html_type, HtmlType::Email);
        assert!(email.searchable);
        assert!(email.validation.contains_key("emailAddress"));
        assert!(!email.validation.contains_key("notEmpty"));
    }

    #[test]
    fn required_by_name() {
        assert!(enhance("user_id", TypeTag::Integer, None).required);
        assert!(enhance("title", TypeTag::String, None).required);
        assert!(enhance("code", TypeTag::String, None).required);
        assert!(!enhance("remark", TypeTag::String, None).required);
    }

    #[test]
    fn comment_sources() {
        let meta = SchemaColumnMeta::new("status", "tinyint(4)").with_comment("Order state");
        assert_eq!(enhance("status", TypeTag::Integer, Some(&meta)).comment, "Order state");
        assert_eq!(enhance("email", TypeTag::String, None).comment, "Email");
        assert_eq!(enhance("contact_email", TypeTag::String, None).comment, "Email");
        assert_eq!(enhance("nonsense", TypeTag::String, None).comment, "nonsense");
    }

    #[test]
    fn html_type_name_patterns_win() {
        assert_eq!(enhance("mobile", TypeTag::Integer, None).html_type, HtmlType::Tel);
        assert_eq!(enhance("password", TypeTag::String, None).html_type, HtmlType::Password);
        assert_eq!(enhance("website", TypeTag::String, None).html_type, HtmlType::Url);
        assert_eq!(enhance("amount", TypeTag::Decimal, None).html_type, HtmlType::Number);
        assert_eq!(enhance("paid_at", TypeTag::Datetime, None).html_type, HtmlType::Date);
        assert_eq!(enhance("is_vip", TypeTag::Boolean, None).html_type, HtmlType::Checkbox);
        assert_eq!(enhance("remark", TypeTag::String, None).html_type, HtmlType::Text);
    }

    #[test]
    fn form_type_rules() {
        let body = SchemaColumnMeta::new("body", "longtext");
        let notes = SchemaColumnMeta::new("notes", "varchar(1000)");
        let label = SchemaColumnMeta::new("label", "varchar(100)");

        assert_eq!(enhance("password", TypeTag::String, None).form_type, FormType::Password);
        assert_eq!(enhance("status", TypeTag::Integer, None).form_type, FormType::Select);
        assert_eq!(enhance("category_id", TypeTag::Integer, None).form_type, FormType::Select);
        assert_eq!(enhance("content", TypeTag::String, None).form_type, FormType::RichEditor);
        assert_eq!(enhance("avatar", TypeTag::String, None).form_type, FormType::Image);
        assert_eq!(enhance("attachment", TypeTag::String, None).form_type, FormType::File);
        assert_eq!(enhance("body", TypeTag::String, Some(&body)).form_type, FormType::RichEditor);
        assert_eq!(enhance("notes", TypeTag::String, Some(&notes)).form_type, FormType::Textarea);
        assert_eq!(enhance("label", TypeTag::String, Some(&label)).form_type, FormType::Text);
        assert_eq!(enhance("label", TypeTag::String, None).form_type, FormType::Text);
    }

    #[test]
    fn searchable_blacklists() {
        assert!(!enhance("created_at", TypeTag::Datetime, None).searchable);
        assert!(!enhance("password", TypeTag::String, None).searchable);
        assert!(!enhance("content", TypeTag::String, None).searchable);
        assert!(!enhance("avatar", TypeTag::String, None).searchable);
        assert!(enhance("title", TypeTag::String, None).searchable);

        let status = enhance("status", TypeTag::Integer, None);
        assert!(status.searchable);
        assert_eq!(status.search_mode, Some(SearchMode::Exact));
        assert_eq!(enhance("password", TypeTag::String, None).search_mode, None);
    }

    #[test]
    fn editable_and_listable() {
        assert!(!enhance("updated_at", TypeTag::Datetime, None).editable);
        assert!(enhance("title", TypeTag::String, None).editable);
        let pk = SchemaColumnMeta::new("code", "varchar(32)").primary();
        assert!(!enhance("code", TypeTag::String, Some(&pk)).editable);

        assert!(!enhance("password", TypeTag::String, None).listable);
        assert!(!enhance("deleted_at", TypeTag::Datetime, None).listable);
        assert!(enhance("created_at", TypeTag::Datetime, None).listable);
    }

    #[test]
    fn validation_rules() {
        let price = enhance("price", TypeTag::Decimal, None);
        assert!(price.validation.contains_key("numeric"));

        let phone = enhance("phone", TypeTag::String, None);
        assert!(phone.validation.contains_key("phone"));

        let ip = enhance("login_ip", TypeTag::String, None);
        assert!(ip.validation.contains_key("ip"));

        let password = enhance("password", TypeTag::String, None);
        assert!(password.validation.contains_key("password"));

        assert!(price
            .validation
            .values()
            .all(|rule| rule.message == VALIDATION_MESSAGE));
    }

    #[test]
    fn enhancement_is_idempotent() {
        let meta = SchemaColumnMeta::new("email", "varchar(128)").not_null();
        let f = field("email", TypeTag::String);
        let enhancer = FieldEnhancer::new();
        let first = serde_json::to_string(&enhancer.enhance(&f, Some(&meta)).unwrap()).unwrap();
        let second = serde_json::to_string(&enhancer.enhance(&f, Some(&meta)).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_incomplete_field() {
        let mut f = field("x", TypeTag::String);
        f.original.clear();
        let err = FieldEnhancer::new().enhance(&f, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::FieldEnhanceError);
    }
}
