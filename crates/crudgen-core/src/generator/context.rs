//! Template data assembled from a parse result.

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToTitleCase, ToUpperCamelCase};
use serde::Serialize;
use serde_json::{json, Value};

use crate::enhancer::VALIDATION_MESSAGE;
use crate::model::{EnhancedField, FormType, JoinType, ParseResult, SchemaColumnMeta, TableRef};

/// Default primary key column when neither the request nor the schema names one.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Casings of a module name, as exposed to templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleName {
    pub name: String,
    pub pascal: String,
    pub camel: String,
    pub kebab: String,
    pub title: String,
}

impl ModuleName {
    pub fn new(raw: &str) -> Self {
        let name = raw.trim().to_snake_case();
        Self {
            pascal: name.to_upper_camel_case(),
            camel: name.to_lower_camel_case(),
            kebab: name.to_kebab_case(),
            title: name.to_title_case(),
            name,
        }
    }
}

/// Escape text for a single quoted JavaScript string.
pub fn js_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

fn join_keyword(join_type: JoinType) -> &'static str {
    match join_type {
        JoinType::Main | JoinType::Inner => "INNER JOIN",
        JoinType::Left => "LEFT JOIN",
        JoinType::Right => "RIGHT JOIN",
        JoinType::Cross => "CROSS JOIN",
    }
}

fn table_sql(table: &TableRef) -> String {
    match &table.alias {
        Some(alias) => format!("{} as {alias}", table.name),
        None => table.name.clone(),
    }
}

fn join_sql(table: &TableRef) -> String {
    let mut sql = format!("{} {}", join_keyword(table.join_type), table.name);
    if let Some(alias) = &table.alias {
        sql.push_str(" AS ");
        sql.push_str(alias);
    }
    match table.on_condition.as_deref() {
        Some(using) if using.starts_with("USING") => {
            sql.push(' ');
            sql.push_str(using);
        }
        Some(on) => {
            sql.push_str(" ON ");
            sql.push_str(on);
        }
        None => {}
    }
    sql
}

/// Whether writes through the main table can set this field.
fn writes_main_table(field: &EnhancedField, main: Option<&TableRef>, single_table: bool) -> bool {
    if field.column.is_none() || !field.editable || field.primary {
        return false;
    }
    match (field.qualifier.as_deref(), main) {
        (None, _) => single_table,
        (Some(qualifier), Some(main)) => {
            qualifier.eq_ignore_ascii_case(main.qualifier())
                || qualifier.eq_ignore_ascii_case(&main.name)
        }
        (Some(_), None) => false,
    }
}

fn field_value(field: &EnhancedField) -> Value {
    let mut value = serde_json::to_value(field).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        let rules: Vec<&str> = field.validation.keys().map(String::as_str).collect();
        map.insert("rules".into(), json!(rules));
        map.insert(
            "selectSql".into(),
            json!(js_string(&format!("{} AS {}", field.original, field.name))),
        );
        map.insert("original".into(), json!(js_string(&field.original)));
    }
    value
}

/// Context shared by every module level template.
pub fn module_context(
    module: &ModuleName,
    parse: &ParseResult,
    primary_key: &str,
    menu_path: &str,
) -> Value {
    let main = parse.main_table();
    let single_table = parse.table_names().len() <= 1;

    let fields: Vec<Value> = parse.fields.iter().map(field_value).collect();
    let pick = |keep: &dyn Fn(&EnhancedField) -> bool| -> Vec<Value> {
        parse
            .fields
            .iter()
            .filter(|f| keep(f))
            .map(field_value)
            .collect()
    };

    let list_fields = pick(&|f| f.listable);
    let form_fields = pick(&|f| writes_main_table(f, main, single_table));
    let search_fields = pick(&|f| f.searchable && f.column.is_some());
    // editors mount on form inputs, so only form fields qualify
    let rich_editor_fields = pick(&|f| {
        f.form_type == FormType::RichEditor && writes_main_table(f, main, single_table)
    });

    let joins: Vec<Value> = parse
        .tables
        .iter()
        .filter(|t| t.join_type != JoinType::Main)
        .map(|t| json!({ "name": t.name, "alias": t.alias, "sql": js_string(&join_sql(t)) }))
        .collect();

    let main_table = main.map(|t| {
        json!({
            "name": t.name,
            "alias": t.alias,
            "qualifier": t.qualifier(),
            "pascal": t.name.to_upper_camel_case(),
            "sql": js_string(&table_sql(t)),
        })
    });

    json!({
        "module": {
            "name": module.name,
            "pascal": module.pascal,
            "camel": module.camel,
            "kebab": module.kebab,
            "title": module.title,
            "menuPath": menu_path,
        },
        "primaryKey": primary_key,
        "fields": fields,
        "listFields": list_fields,
        "formFields": form_fields,
        "searchFields": search_fields,
        "hasRichEditor": !rich_editor_fields.is_empty(),
        "richEditorFields": rich_editor_fields,
        "mainTable": main_table,
        "joins": joins,
        "tables": parse.tables,
        "sql": parse.original_sql,
        "validationMessage": VALIDATION_MESSAGE,
    })
}

/// Context for one table model.
pub fn table_context(module: &Value, table: &str, columns: &[SchemaColumnMeta]) -> Value {
    let primary_key = columns
        .iter()
        .find(|c| c.is_primary())
        .map(|c| c.field.as_str())
        .unwrap_or(DEFAULT_PRIMARY_KEY);
    let has = |name: &str| columns.iter().any(|c| c.field.eq_ignore_ascii_case(name));

    let mut context = module.clone();
    if let Value::Object(map) = &mut context {
        map.insert(
            "table".into(),
            json!({
                "name": table,
                "pascal": table.to_upper_camel_case(),
                "primaryKey": primary_key,
                "timestamps": has("created_at") && has("updated_at"),
                "columns": columns,
            }),
        );
    }
    context
}
